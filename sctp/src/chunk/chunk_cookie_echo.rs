/// COOKIE-ECHO returns the server's opaque state cookie verbatim
/// (RFC 4960 section 3.3.11).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkCookieEcho {
    pub cookie: Vec<u8>,
}

impl ChunkCookieEcho {
    pub(crate) fn marshal_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cookie);
    }
}
