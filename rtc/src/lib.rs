#![warn(rust_2018_idioms)]
#![allow(dead_code)]

mod error;
pub mod fingerprint;
pub mod mux;
pub mod transport;

pub use error::{Error, Result};
pub use fingerprint::RtcFingerprint;
pub use transport::{Transport, TransportCommand, TransportConfig, TransportEvent};

pub use data::ChannelConfig;
pub use dtls::Role as DtlsRole;
pub use ice::IceConnectionState;
