/// ServerHelloDone has an empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandshakeMessageServerHelloDone {}

impl HandshakeMessageServerHelloDone {
    pub fn marshal(&self, _out: &mut Vec<u8>) {}
}
