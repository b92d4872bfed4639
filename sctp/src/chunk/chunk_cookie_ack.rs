/// COOKIE-ACK has an empty value (RFC 4960 section 3.3.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkCookieAck {}
