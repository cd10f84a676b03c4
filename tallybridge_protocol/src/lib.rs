#![doc = include_str!("../README.md")]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate tracing;

mod buffer;
mod directive;
mod error;
mod snapshot;
mod state;

pub use crate::{
    buffer::{TallyStateBuffer, PAYLOAD_LENGTH},
    directive::TallyDirective,
    error::Error,
    snapshot::{ProgramSnapshot, OVERLAY_COUNT},
    state::ReceiverState,
};

/// Maximum number of tally receivers addressable by a broadcast.
pub const MAX_RECEIVERS: usize = 256;

/// Result type.
pub type Result<T = ()> = std::result::Result<T, Error>;
