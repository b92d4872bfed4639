#[cfg(test)]
#[path = "url_test.rs"]
mod url_test;

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeType {
    Stun,
    Turn,
}

/// A STUN or TURN server URL (RFC 7064 / RFC 7065), e.g.
/// `stun:stun.l.google.com:19302` or `turn:turn.example.com:3478?transport=udp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: SchemeType,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Url {
    pub fn parse(raw: &str) -> Result<Url> {
        let (scheme_str, rest) = raw.split_once(':').ok_or(Error::ErrSchemeType)?;
        let scheme = match scheme_str {
            "stun" => SchemeType::Stun,
            "turn" => SchemeType::Turn,
            _ => return Err(Error::ErrSchemeType),
        };
        // stun/turn URIs are opaque; synthesize an authority form the
        // url crate can digest
        let normalized = if rest.starts_with("//") {
            format!("{scheme_str}:{rest}")
        } else {
            format!("{scheme_str}://{rest}")
        };
        let parsed = url::Url::parse(&normalized).map_err(|_| Error::ErrHost)?;
        let host = parsed
            .host_str()
            .ok_or(Error::ErrHost)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_owned();
        if host.is_empty() {
            return Err(Error::ErrHost);
        }
        let port = parsed.port().unwrap_or(3478);
        Ok(Url {
            scheme,
            host,
            port,
            username: String::new(),
            password: String::new(),
        })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            SchemeType::Stun => "stun",
            SchemeType::Turn => "turn",
        };
        write!(f, "{}:{}:{}", scheme, self.host, self.port)
    }
}
