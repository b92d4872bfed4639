use std::fmt;

/*
  DTLS messages are grouped into a series of message flights; a flight
  is retransmitted as a unit until a message of the next flight arrives
  (RFC 6347 section 4.2.4).

  Client                                          Server
  ------                                          ------
  ClientHello             -------->                           Flight 1
                          <-------    HelloVerifyRequest      Flight 2
  ClientHello(cookie)     -------->                           Flight 3
                                             ServerHello    \
                                            Certificate      \
                                      ServerKeyExchange       Flight 4
                                     CertificateRequest*     /
                          <--------      ServerHelloDone    /
  Certificate*                                              \
  ClientKeyExchange                                          \
  CertificateVerify*                                          Flight 5
  [ChangeCipherSpec]                                         /
  Finished                -------->                         /
                                      [ChangeCipherSpec]    \ Flight 6
                          <--------             Finished    /
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// Server: waiting for the first ClientHello.
    Flight0,
    /// Client: ClientHello (no cookie) sent.
    Flight1,
    /// Server: HelloVerifyRequest sent; stateless, never retransmitted.
    Flight2,
    /// Client: ClientHello with cookie sent.
    Flight3,
    /// Server: ServerHello..ServerHelloDone sent.
    Flight4,
    /// Client: ClientKeyExchange..Finished sent.
    Flight5,
    /// Server: ChangeCipherSpec + Finished sent.
    Flight6,
    /// Handshake complete on this side.
    Established,
}

impl Flight {
    /// HelloVerifyRequest is generated statelessly on each ClientHello,
    /// so flight 2 has nothing to retransmit on a timer.
    pub fn has_retransmit(&self) -> bool {
        !matches!(self, Flight::Flight0 | Flight::Flight2 | Flight::Established)
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Flight::Flight0 => "Flight 0",
            Flight::Flight1 => "Flight 1",
            Flight::Flight2 => "Flight 2",
            Flight::Flight3 => "Flight 3",
            Flight::Flight4 => "Flight 4",
            Flight::Flight5 => "Flight 5",
            Flight::Flight6 => "Flight 6",
            Flight::Established => "Established",
        };
        write!(f, "{s}")
    }
}
