#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of overlay layers tracked in a [ProgramSnapshot].
pub const OVERLAY_COUNT: usize = 6;

/// Shot names currently selected on the switcher.
///
/// Switcher adapters build a fresh snapshot on every poll. An absent or empty
/// name contributes nothing to the tally state.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgramSnapshot {
    /// Name of the shot on the preview output.
    pub preview: Option<String>,
    /// Name of the shot on the program (live) output.
    pub live: Option<String>,
    /// Names of the shots on each overlay layer, 0-indexed (ie:
    /// `overlays[0]` is overlay 1).
    pub overlays: [Option<String>; OVERLAY_COUNT],
}

impl ProgramSnapshot {
    /// Creates a snapshot with only preview and live shots.
    pub fn new(preview: Option<String>, live: Option<String>) -> Self {
        Self {
            preview,
            live,
            ..Default::default()
        }
    }

    /// Iterates over the names of the active overlay layers.
    ///
    /// Empty names are treated as an inactive layer, and skipped.
    pub fn active_overlays(&self) -> impl Iterator<Item = &str> {
        self.overlays
            .iter()
            .filter_map(|o| o.as_deref())
            .filter(|o| !o.is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn active_overlays() {
        let mut snapshot = ProgramSnapshot::new(None, Some("Cam 1".to_string()));
        assert_eq!(0, snapshot.active_overlays().count());

        snapshot.overlays[0] = Some("Lower third [T:4]".to_string());
        snapshot.overlays[2] = Some(String::new());
        snapshot.overlays[5] = Some("Stinger".to_string());
        assert_eq!(
            vec!["Lower third [T:4]", "Stinger"],
            snapshot.active_overlays().collect::<Vec<_>>()
        );
    }
}
