#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod association;
pub mod chunk;
mod error;
pub mod packet;
pub mod param;
pub mod serial;
pub mod stream;

pub use association::{Association, AssociationConfig, AssociationEvent, AssociationState};
pub use chunk::chunk_payload_data::PayloadProtocolIdentifier;
pub use error::{Error, Result};
pub use stream::ReliabilityPolicy;
