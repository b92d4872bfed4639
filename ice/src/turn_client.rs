#[cfg(test)]
#[path = "turn_client_test.rs"]
mod turn_client_test;

use std::net::SocketAddr;

use md5::{Digest, Md5};
use stun::error_code::ErrorCodeAttribute;
use stun::fingerprint::Fingerprint;
use stun::integrity::MessageIntegrity;
use stun::message::*;
use stun::textattrs::{Nonce, Realm, TextAttribute, Username};
use stun::uattrs::UInt32Attribute;
use stun::xoraddr::XorMappedAddress;

use crate::error::{Error, Result};

/// REQUESTED-TRANSPORT value for UDP (protocol 17 in the top byte).
const REQUESTED_TRANSPORT_UDP: u32 = 17 << 24;
const DEFAULT_LIFETIME_SECONDS: u32 = 600;

/// What a TURN server response means for the allocation lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    /// 401 with fresh realm/nonce: repeat the request authenticated.
    RetryWithAuth,
    Allocated {
        relayed: SocketAddr,
        mapped: SocketAddr,
    },
    Refreshed,
    PermissionGranted,
    Failed(u16),
}

/// Client side of one TURN allocation (RFC 5766): Allocate with
/// long-term credentials, periodic Refresh, CreatePermission, and
/// Send/Data indications for relayed traffic.
pub struct TurnClient {
    pub server: SocketAddr,
    pub username: String,
    pub password: String,
    pub socket_index: usize,
    realm: Option<String>,
    nonce: Option<String>,
    pub relayed_address: Option<SocketAddr>,
    pub mapped_address: Option<SocketAddr>,
    pub lifetime_seconds: u32,
}

impl TurnClient {
    pub fn new(server: SocketAddr, username: String, password: String, socket_index: usize) -> Self {
        TurnClient {
            server,
            username,
            password,
            socket_index,
            realm: None,
            nonce: None,
            relayed_address: None,
            mapped_address: None,
            lifetime_seconds: DEFAULT_LIFETIME_SECONDS,
        }
    }

    /// key = MD5(username ":" realm ":" password) (RFC 5389 long-term).
    fn long_term_key(&self, realm: &str) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(format!("{}:{}:{}", self.username, realm, self.password));
        hasher.finalize().to_vec()
    }

    fn apply_auth(&self, m: &mut Message) -> Result<()> {
        if let (Some(realm), Some(nonce)) = (&self.realm, &self.nonce) {
            Username::add_to(m, &self.username);
            TextAttribute::new(ATTR_REALM, realm.clone()).add_to(m);
            TextAttribute::new(ATTR_NONCE, nonce.clone()).add_to(m);
            let key = self.long_term_key(realm);
            MessageIntegrity::new_long_term_md5(key).add_to(m)?;
        }
        Fingerprint::add_to(m)?;
        Ok(())
    }

    pub fn allocate_request(&self) -> Result<Message> {
        let mut m = Message::new(MessageType::new(Method::Allocate, MessageClass::Request));
        UInt32Attribute::add_to(&mut m, ATTR_REQUESTED_TRANSPORT, REQUESTED_TRANSPORT_UDP);
        self.apply_auth(&mut m)?;
        Ok(m)
    }

    pub fn refresh_request(&self) -> Result<Message> {
        let mut m = Message::new(MessageType::new(Method::Refresh, MessageClass::Request));
        UInt32Attribute::add_to(&mut m, ATTR_LIFETIME, self.lifetime_seconds);
        self.apply_auth(&mut m)?;
        Ok(m)
    }

    pub fn create_permission_request(&self, peer: SocketAddr) -> Result<Message> {
        let mut m = Message::new(MessageType::new(
            Method::CreatePermission,
            MessageClass::Request,
        ));
        XorMappedAddress(peer).add_to_as(&mut m, ATTR_XOR_PEER_ADDRESS);
        self.apply_auth(&mut m)?;
        Ok(m)
    }

    /// Digests a response to any of our requests.
    pub fn handle_response(&mut self, m: &Message) -> Result<TurnUpdate> {
        let method = m.method().ok_or(Error::ErrTurnAllocateFailed(0))?;
        match m.class() {
            Some(MessageClass::ErrorResponse) => {
                let code = ErrorCodeAttribute::get_from(m)
                    .map(|e| e.code)
                    .unwrap_or(500);
                if code == stun::error_code::CODE_UNAUTHORIZED
                    || code == stun::error_code::CODE_STALE_NONCE
                {
                    let realm = Realm::get_from(m)?;
                    let nonce = Nonce::get_from(m)?;
                    let first_challenge = self.realm.is_none();
                    self.realm = Some(realm);
                    self.nonce = Some(nonce);
                    if first_challenge || code == stun::error_code::CODE_STALE_NONCE {
                        return Ok(TurnUpdate::RetryWithAuth);
                    }
                }
                Ok(TurnUpdate::Failed(code))
            }
            Some(MessageClass::SuccessResponse) => match method {
                Method::Allocate => {
                    let relayed =
                        XorMappedAddress::get_from_as(m, ATTR_XOR_RELAYED_ADDRESS)?.0;
                    let mapped = XorMappedAddress::get_from(m)?.0;
                    if let Ok(lifetime) = UInt32Attribute::get_from(m, ATTR_LIFETIME) {
                        self.lifetime_seconds = lifetime;
                    }
                    self.relayed_address = Some(relayed);
                    self.mapped_address = Some(mapped);
                    Ok(TurnUpdate::Allocated { relayed, mapped })
                }
                Method::Refresh => Ok(TurnUpdate::Refreshed),
                Method::CreatePermission => Ok(TurnUpdate::PermissionGranted),
                _ => Ok(TurnUpdate::Failed(0)),
            },
            _ => Ok(TurnUpdate::Failed(0)),
        }
    }

    /// Wraps application data for a peer in a Send indication.
    pub fn send_indication(&self, peer: SocketAddr, data: &[u8]) -> Result<Message> {
        let mut m = Message::new(MessageType::new(Method::Send, MessageClass::Indication));
        XorMappedAddress(peer).add_to_as(&mut m, ATTR_XOR_PEER_ADDRESS);
        m.add(ATTR_DATA, data);
        Fingerprint::add_to(&mut m)?;
        Ok(m)
    }

    /// Unwraps a Data indication into (peer, payload).
    pub fn parse_data_indication(m: &Message) -> Result<(SocketAddr, Vec<u8>)> {
        let peer = XorMappedAddress::get_from_as(m, ATTR_XOR_PEER_ADDRESS)?.0;
        let data = m.get(ATTR_DATA)?.to_vec();
        Ok((peer, data))
    }
}
