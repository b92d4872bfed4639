#![warn(rust_2018_idioms)]
#![allow(dead_code)]

mod error;
pub mod message;

pub use error::{Error, Result};
pub use message::{ChannelConfig, DcepMessage};
