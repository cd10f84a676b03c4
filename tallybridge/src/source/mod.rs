//! Switcher adapters.
//!
//! Each supported switcher implements [ProgramSource], which reports the
//! switcher's current shots as a [ProgramSnapshot].
use crate::{protocol::ProgramSnapshot, Result};
use std::future::Future;

mod vmix;
mod wirecast;

pub use self::{
    vmix::VmixSource,
    wirecast::{WirecastDocument, WirecastLayer, WirecastShotId, WirecastSource},
};

/// A switcher which can be polled for its current shots.
pub trait ProgramSource: Send {
    /// Human readable name of the switcher, for logs.
    fn name(&self) -> &str;

    /// Fetches the switcher's current shots.
    ///
    /// Any failure to reach the switcher, or to make sense of its response,
    /// is returned as an error. The bridge treats every error the same way:
    /// the switcher is considered unreachable until the next successful
    /// fetch.
    fn fetch(&mut self) -> impl Future<Output = Result<ProgramSnapshot>> + Send;
}
