use crate::Error;
use binrw::binrw;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tally state of a single receiver.
///
/// States are ordered by priority: a receiver which is [`Live`][Self::Live]
/// is never downgraded to [`Preview`][Self::Preview] or
/// [`Clear`][Self::Clear] within the same buffer.
///
/// ## Wire format
///
/// * `u8`: state (`0`, `1` or `2`)
#[binrw]
#[brw(repr = u8)]
#[derive(
    Default, Debug, FromPrimitive, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ReceiverState {
    /// Neither on-air nor queued.
    #[default]
    Clear = 0,
    /// Queued on the switcher's preview output (green).
    Preview = 1,
    /// On-air (red).
    Live = 2,
}

impl ReceiverState {
    /// Returns the higher priority of `self` and `other`.
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }
}

impl TryFrom<u8> for ReceiverState {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(Error::ParameterOutOfRange)
    }
}

impl From<ReceiverState> for u8 {
    fn from(value: ReceiverState) -> Self {
        value as u8
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Result;

    #[test]
    fn wire_values() -> Result {
        assert_eq!(0u8, ReceiverState::Clear.into());
        assert_eq!(1u8, ReceiverState::Preview.into());
        assert_eq!(2u8, ReceiverState::Live.into());

        assert_eq!(ReceiverState::Live, ReceiverState::try_from(2)?);
        assert!(matches!(
            ReceiverState::try_from(3),
            Err(Error::ParameterOutOfRange)
        ));
        Ok(())
    }

    #[test]
    fn live_wins() {
        use ReceiverState::*;
        assert_eq!(Live, Preview.merge(Live));
        assert_eq!(Live, Live.merge(Preview));
        assert_eq!(Live, Live.merge(Clear));
        assert_eq!(Preview, Clear.merge(Preview));
        assert_eq!(Preview, Preview.merge(Clear));
    }
}
