#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod agent;
pub mod candidate;
mod error;
pub mod pair;
pub mod turn_client;
pub mod url;

pub use agent::{Agent, AgentConfig, IceConnectionState, IceEvent, InboundDatagram};
pub use candidate::{unmarshal_candidate, Candidate, CandidateType};
pub use error::{Error, Result};
pub use url::{SchemeType, Url};
