#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

mod bridge;
mod error;
mod liveness;
mod source;
mod transport;

pub use {
    crate::{
        bridge::{BridgeConfig, TallyBridge},
        error::Error,
        liveness::{LivenessEvent, LivenessState, LivenessTracker},
        source::{
            ProgramSource, VmixSource, WirecastDocument, WirecastLayer, WirecastShotId,
            WirecastSource,
        },
        transport::{internet_facing_ipv4, BroadcastConfig, TallyBroadcaster, TallyListener},
    },
    tallybridge_protocol as protocol,
};
pub type Result<T = ()> = std::result::Result<T, Error>;
