use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;

use stun::fingerprint::Fingerprint;
use stun::message::{Message, BINDING_REQUEST};

use super::{Agent, AgentSocket, TxKind, GATHER_QUIESCENCE};
use crate::candidate::Candidate;
use crate::error::Result;
use crate::turn_client::TurnClient;
use crate::url::SchemeType;

pub(crate) const RECEIVE_MTU: usize = 8192;

/// A datagram delivered from one of the agent's sockets to the owning
/// transport task.
pub type InboundDatagram = (usize, SocketAddr, Vec<u8>);

/// Discovers the default-route local address without sending anything.
async fn default_route_ip() -> Option<IpAddr> {
    let probe = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    probe.connect("8.8.8.8:80").await.ok()?;
    probe.local_addr().ok().map(|a| a.ip())
}

impl Agent {
    /// Binds the host sockets, spawns their reader tasks (which forward
    /// datagrams to `packet_tx` for the owning task), and kicks off
    /// server-reflexive and relay gathering. End-of-gathering is
    /// signalled by a `GatheredCandidate(None)` event once the
    /// quiescence window passes without new candidates.
    pub async fn gather(&mut self, packet_tx: mpsc::Sender<InboundDatagram>) -> Result<()> {
        let now = Instant::now();

        let mut host_ips: Vec<IpAddr> = vec![];
        if let Some(ip) = default_route_ip().await {
            host_ips.push(ip);
        }
        if self.config.include_loopback || host_ips.is_empty() {
            host_ips.push(IpAddr::from([127, 0, 0, 1]));
        }

        for ip in host_ips {
            let socket = match UdpSocket::bind(SocketAddr::new(ip, 0)).await {
                Ok(s) => Arc::new(s),
                Err(e) => {
                    warn!("ice: bind on {ip} failed: {e}");
                    continue;
                }
            };
            let base = socket.local_addr()?;
            let socket_index = self.sockets.len();
            self.spawn_reader(socket_index, socket.clone(), packet_tx.clone());
            self.sockets.push(AgentSocket { socket, base });
            debug!("ice: host candidate {base}");
            self.add_local_candidate(
                Candidate::new_host(base.ip(), base.port(), socket_index),
                now,
            );
        }

        let urls = self.config.urls.clone();
        for url in urls {
            let server = match resolve(&url.host, url.port).await {
                Some(addr) => addr,
                None => {
                    warn!("ice: cannot resolve {url}");
                    continue;
                }
            };
            match url.scheme {
                SchemeType::Stun => {
                    for socket_index in 0..self.sockets.len() {
                        if self.sockets[socket_index].base.is_ipv4() != server.is_ipv4() {
                            continue;
                        }
                        let mut request = Message::new(BINDING_REQUEST);
                        Fingerprint::add_to(&mut request)?;
                        self.start_transaction(
                            TxKind::GatherBinding,
                            socket_index,
                            server,
                            &request,
                            now,
                        );
                    }
                }
                SchemeType::Turn => {
                    // the relay allocation runs over the first matching
                    // host socket
                    let socket_index = match (0..self.sockets.len())
                        .find(|&i| self.sockets[i].base.is_ipv4() == server.is_ipv4())
                    {
                        Some(i) => i,
                        None => continue,
                    };
                    let client = TurnClient::new(
                        server,
                        url.username.clone(),
                        url.password.clone(),
                        socket_index,
                    );
                    let request = client.allocate_request()?;
                    let turn_idx = self.turn_clients.len();
                    self.turn_clients.push(client);
                    self.start_transaction(
                        TxKind::TurnAllocate { turn_idx },
                        socket_index,
                        server,
                        &request,
                        now,
                    );
                }
            }
        }

        self.gather_deadline = Some(now + GATHER_QUIESCENCE);
        Ok(())
    }

    fn spawn_reader(
        &mut self,
        socket_index: usize,
        socket: Arc<UdpSocket>,
        packet_tx: mpsc::Sender<InboundDatagram>,
    ) {
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; RECEIVE_MTU];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, src)) => {
                        if packet_tx
                            .send((socket_index, src, buf[..n].to_vec()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        self.reader_handles.push(handle);
    }
}

async fn resolve(host: &str, port: u16) -> Option<SocketAddr> {
    lookup_host((host, port)).await.ok()?.next()
}
