use crate::{
    Error, ProgramSnapshot, ReceiverState, Result, TallyDirective, MAX_RECEIVERS,
};
use binrw::{binrw, BinRead, BinWrite};
use std::{io::Cursor, ops::Deref};

/// Length of a tally broadcast payload, in bytes.
pub const PAYLOAD_LENGTH: usize = MAX_RECEIVERS;

/// Tally state of every receiver.
///
/// A buffer is built from a [ProgramSnapshot] with [`rebuild()`][Self::rebuild],
/// and is not modified after that.
///
/// ## Packet format
///
/// * [`ReceiverState`] × [`MAX_RECEIVERS`]: state of each receiver, in
///   receiver order (receiver 1 first)
///
/// There is no header, padding or checksum: the datagram is exactly
/// [`PAYLOAD_LENGTH`] bytes.
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TallyStateBuffer {
    states: [ReceiverState; MAX_RECEIVERS],
}

impl Default for TallyStateBuffer {
    fn default() -> Self {
        Self {
            states: [ReceiverState::Clear; MAX_RECEIVERS],
        }
    }
}

impl TallyStateBuffer {
    /// Builds the tally state for the switcher's current shots.
    ///
    /// When `liveness` is `false` (the switcher couldn't be reached), every
    /// receiver is [`Clear`][ReceiverState::Clear], regardless of `snapshot`.
    ///
    /// Otherwise, receivers are assigned from the tally directives in:
    ///
    /// 1. the preview shot, as [`Preview`][ReceiverState::Preview]
    /// 2. the live shot, as [`Live`][ReceiverState::Live]
    /// 3. each active overlay shot, as [`Live`][ReceiverState::Live]
    ///
    /// A receiver referenced by more than one shot takes the highest priority
    /// state.
    pub fn rebuild(snapshot: &ProgramSnapshot, liveness: bool) -> Self {
        let mut o = Self::default();
        if !liveness {
            return o;
        }

        if let Some(preview) = &snapshot.preview {
            o.assign(&TallyDirective::parse(preview), ReceiverState::Preview);
        }

        if let Some(live) = &snapshot.live {
            o.assign(&TallyDirective::parse(live), ReceiverState::Live);
        }

        for overlay in snapshot.active_overlays() {
            o.assign(&TallyDirective::parse(overlay), ReceiverState::Live);
        }

        o
    }

    fn assign(&mut self, directive: &TallyDirective, state: ReceiverState) {
        for i in directive.iter() {
            // Directive indices are always < MAX_RECEIVERS
            let slot = &mut self.states[i];
            *slot = slot.merge(state);
        }
    }

    /// Gets the state of the 0-indexed receiver `index`, or [None] if out of
    /// range.
    pub fn get(&self, index: usize) -> Option<ReceiverState> {
        self.states.get(index).copied()
    }

    /// All receiver states, 0-indexed.
    #[inline]
    pub const fn states(&self) -> &[ReceiverState; MAX_RECEIVERS] {
        &self.states
    }

    /// Returns `true` if no receiver is in preview or live.
    pub fn is_clear(&self) -> bool {
        self.states.iter().all(|&s| s == ReceiverState::Clear)
    }

    /// Encodes the buffer as a broadcast payload.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::with_capacity(PAYLOAD_LENGTH));
        self.write(&mut out)?;
        Ok(out.into_inner())
    }

    /// Decodes a broadcast payload.
    ///
    /// ## Errors
    ///
    /// * [`Error::InvalidLength`] if `payload` is not exactly
    ///   [`PAYLOAD_LENGTH`] bytes
    /// * [`Error::BinRwError`] if `payload` contains an unknown state
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() != PAYLOAD_LENGTH {
            trace!(
                "expected {PAYLOAD_LENGTH} byte payload, got {} bytes",
                payload.len()
            );
            return Err(Error::InvalidLength);
        }

        Ok(Self::read(&mut Cursor::new(payload))?)
    }
}

impl Deref for TallyStateBuffer {
    type Target = [ReceiverState];

    fn deref(&self) -> &Self::Target {
        &self.states
    }
}
