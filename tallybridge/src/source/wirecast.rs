//! Wirecast object model adapter.
//!
//! Wirecast exposes its running document through an automation object model.
//! Tally follows a single layer of the first document: that layer's preview
//! and live shots.
use super::ProgramSource;
use crate::{protocol::ProgramSnapshot, Error, Result};
use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Mutex, TryLockError},
};
use tokio::task::spawn_blocking;

/// Identifier of a shot within a Wirecast document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WirecastShotId(pub i32);

/// A Wirecast master layer, numbered from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirecastLayer(u8);

impl WirecastLayer {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Creates a layer reference.
    ///
    /// ## Errors
    ///
    /// * [`Error::ParameterOutOfRange`] if `layer` is not between
    ///   [`MIN`][Self::MIN] and [`MAX`][Self::MAX]
    pub fn new(layer: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&layer) {
            error!(
                "invalid layer number {layer}, must be {}-{}",
                Self::MIN,
                Self::MAX
            );
            return Err(Error::ParameterOutOfRange);
        }
        Ok(Self(layer))
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for WirecastLayer {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for WirecastLayer {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for WirecastLayer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let layer = s.trim().parse::<u8>().map_err(|_| {
            error!("invalid layer number {s:?}");
            Error::ParameterOutOfRange
        })?;
        Self::new(layer)
    }
}

impl Display for WirecastLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binding to a running Wirecast document's object model.
///
/// Calls are blocking, and are made from tokio's blocking thread pool, one
/// request at a time. Implementations should return
/// [`Error::SourceUnavailable`] when Wirecast isn't running, or the document
/// can't be reached.
pub trait WirecastDocument: Send {
    /// `LayerByIndex(layer).PreviewShotID()`
    fn preview_shot_id(&mut self, layer: WirecastLayer) -> Result<WirecastShotId>;

    /// `LayerByIndex(layer).LiveShotID()`
    fn live_shot_id(&mut self, layer: WirecastLayer) -> Result<WirecastShotId>;

    /// `ShotByShotID(shot).Name`
    fn shot_name(&mut self, shot: WirecastShotId) -> Result<String>;

    /// `AutoLive`: when set, shots go live as soon as they're selected.
    fn auto_live(&mut self) -> Result<bool>;
}

/// Polls one layer of a Wirecast document.
///
/// While auto live is on, the preview shot is not reported, as selecting a
/// shot puts it straight on-air.
///
/// Document calls run on a blocking thread, so a hung Wirecast can't stall the
/// async runtime. If a fetch is abandoned (eg: by a timeout), its request keeps
/// running, and later fetches fail with [`Error::SourceUnavailable`] until it
/// finishes.
pub struct WirecastSource<D> {
    document: Arc<Mutex<D>>,
    layer: WirecastLayer,
    auto_live: Option<bool>,
}

/// Shot names and auto live state read from a document in one request.
struct LayerShots {
    preview: String,
    live: String,
    auto_live: bool,
}

impl LayerShots {
    fn read<D: WirecastDocument>(document: &mut D, layer: WirecastLayer) -> Result<Self> {
        let preview = document.preview_shot_id(layer)?;
        let preview = document.shot_name(preview)?;
        let live = document.live_shot_id(layer)?;
        let live = document.shot_name(live)?;
        let auto_live = document.auto_live()?;
        Ok(Self {
            preview,
            live,
            auto_live,
        })
    }
}

impl<D: WirecastDocument + 'static> WirecastSource<D> {
    pub fn new(document: D, layer: WirecastLayer) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            layer,
            auto_live: None,
        }
    }

    #[inline]
    pub const fn layer(&self) -> WirecastLayer {
        self.layer
    }

    /// The last observed auto live state, or [None] before the first
    /// successful fetch.
    #[inline]
    pub const fn auto_live(&self) -> Option<bool> {
        self.auto_live
    }
}

impl<D: WirecastDocument + 'static> ProgramSource for WirecastSource<D> {
    fn name(&self) -> &str {
        "Wirecast"
    }

    async fn fetch(&mut self) -> Result<ProgramSnapshot> {
        let document = Arc::clone(&self.document);
        let layer = self.layer;
        let shots = spawn_blocking(move || {
            let mut document = match document.try_lock() {
                Ok(document) => document,
                Err(TryLockError::WouldBlock) => {
                    return Err(Error::SourceUnavailable(
                        "previous Wirecast request still running".to_string(),
                    ));
                }
                // A binding which panicked mid-request leaves nothing half
                // written on our side.
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
            };
            LayerShots::read(&mut *document, layer)
        })
        .await
        .map_err(|e| {
            error!("Wirecast request failed: {e}");
            Error::UnexpectedState
        })??;

        let LayerShots {
            preview,
            live,
            auto_live,
        } = shots;

        if self.auto_live != Some(auto_live) {
            self.auto_live = Some(auto_live);
            info!("auto live: {}", if auto_live { "on" } else { "off" });
        }

        Ok(ProgramSnapshot::new(
            (!auto_live).then_some(preview),
            Some(live),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        collections::HashMap,
        time::{Duration, Instant},
    };
    use tokio::time::timeout;

    #[derive(Default)]
    struct TestDocument {
        running: bool,
        layers: HashMap<u8, (WirecastShotId, WirecastShotId)>,
        shots: HashMap<WirecastShotId, String>,
        auto_live: bool,
    }

    impl TestDocument {
        fn layer(&self, layer: WirecastLayer) -> Result<(WirecastShotId, WirecastShotId)> {
            if !self.running {
                return Err(Error::SourceUnavailable("Wirecast.Application".to_string()));
            }
            self.layers
                .get(&layer.get())
                .copied()
                .ok_or(Error::ParameterOutOfRange)
        }
    }

    impl WirecastDocument for TestDocument {
        fn preview_shot_id(&mut self, layer: WirecastLayer) -> Result<WirecastShotId> {
            Ok(self.layer(layer)?.0)
        }

        fn live_shot_id(&mut self, layer: WirecastLayer) -> Result<WirecastShotId> {
            Ok(self.layer(layer)?.1)
        }

        fn shot_name(&mut self, shot: WirecastShotId) -> Result<String> {
            self.shots
                .get(&shot)
                .cloned()
                .ok_or(Error::SourceUnavailable(format!("no shot {shot:?}")))
        }

        fn auto_live(&mut self) -> Result<bool> {
            Ok(self.auto_live)
        }
    }

    fn document() -> TestDocument {
        TestDocument {
            running: true,
            layers: HashMap::from([
                (3, (WirecastShotId(11), WirecastShotId(12))),
                (1, (WirecastShotId(13), WirecastShotId(13))),
            ]),
            shots: HashMap::from([
                (WirecastShotId(11), "Pulpit [T:2]".to_string()),
                (WirecastShotId(12), "Wide [T:1]".to_string()),
                (WirecastShotId(13), "Title card".to_string()),
            ]),
            auto_live: false,
        }
    }

    #[test]
    fn layers() {
        assert_eq!(3, WirecastLayer::default().get());
        for l in 1..=5 {
            assert_eq!(l, WirecastLayer::new(l).map(WirecastLayer::get).unwrap());
        }
        assert!(matches!(WirecastLayer::new(0), Err(Error::ParameterOutOfRange)));
        assert!(matches!(WirecastLayer::try_from(6), Err(Error::ParameterOutOfRange)));
        assert_eq!("4", WirecastLayer(4).to_string());
    }

    #[test]
    fn parse_layer() -> Result {
        assert_eq!(WirecastLayer(1), "1".parse()?);
        assert_eq!(WirecastLayer(5), " 5 ".parse()?);
        for bad in ["0", "6", "256", "-1", "", "three"] {
            assert!(
                matches!(bad.parse::<WirecastLayer>(), Err(Error::ParameterOutOfRange)),
                "{bad:?}"
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn fetch() -> Result {
        let mut source = WirecastSource::new(document(), WirecastLayer::default());
        assert_eq!(None, source.auto_live());

        let snapshot = source.fetch().await?;
        assert_eq!(Some("Pulpit [T:2]"), snapshot.preview.as_deref());
        assert_eq!(Some("Wide [T:1]"), snapshot.live.as_deref());
        assert!(snapshot.overlays.iter().all(Option::is_none));
        assert_eq!(Some(false), source.auto_live());

        let mut source = WirecastSource::new(document(), WirecastLayer::new(1)?);
        let snapshot = source.fetch().await?;
        assert_eq!(Some("Title card"), snapshot.live.as_deref());
        Ok(())
    }

    #[tokio::test]
    async fn auto_live_hides_preview() -> Result {
        let mut source = WirecastSource::new(
            TestDocument {
                auto_live: true,
                ..document()
            },
            WirecastLayer::default(),
        );

        let snapshot = source.fetch().await?;
        assert_eq!(None, snapshot.preview);
        assert_eq!(Some("Wide [T:1]"), snapshot.live.as_deref());
        assert_eq!(Some(true), source.auto_live());
        Ok(())
    }

    #[tokio::test]
    async fn not_running() {
        let mut source = WirecastSource::new(
            TestDocument {
                running: false,
                ..document()
            },
            WirecastLayer::default(),
        );

        assert!(matches!(
            source.fetch().await,
            Err(Error::SourceUnavailable(_))
        ));
        assert_eq!(None, source.auto_live());
    }

    /// Answers every request, but only after blocking for `delay`.
    struct SlowDocument {
        inner: TestDocument,
        delay: Duration,
    }

    impl WirecastDocument for SlowDocument {
        fn preview_shot_id(&mut self, layer: WirecastLayer) -> Result<WirecastShotId> {
            std::thread::sleep(self.delay);
            self.inner.preview_shot_id(layer)
        }

        fn live_shot_id(&mut self, layer: WirecastLayer) -> Result<WirecastShotId> {
            self.inner.live_shot_id(layer)
        }

        fn shot_name(&mut self, shot: WirecastShotId) -> Result<String> {
            self.inner.shot_name(shot)
        }

        fn auto_live(&mut self) -> Result<bool> {
            self.inner.auto_live()
        }
    }

    #[tokio::test]
    async fn hung_document_is_abandoned() -> Result {
        let mut source = WirecastSource::new(
            SlowDocument {
                inner: document(),
                delay: Duration::from_millis(400),
            },
            WirecastLayer::default(),
        );

        // The timeout fires while the document is still blocked.
        let started = Instant::now();
        assert!(timeout(Duration::from_millis(50), source.fetch())
            .await
            .is_err());
        assert!(started.elapsed() < Duration::from_millis(300));

        // The abandoned request still holds the document.
        assert!(matches!(
            source.fetch().await,
            Err(Error::SourceUnavailable(_))
        ));
        assert_eq!(None, source.auto_live());

        // Once it finishes, requests go through again.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let snapshot = source.fetch().await?;
        assert_eq!(Some("Wide [T:1]"), snapshot.live.as_deref());
        assert_eq!(Some(false), source.auto_live());
        Ok(())
    }

    #[tokio::test]
    async fn bridge_abandons_hung_document() -> Result {
        use crate::{
            BridgeConfig, BroadcastConfig, LivenessState, TallyBridge, TallyBroadcaster,
            TallyListener,
        };
        use std::net::{Ipv4Addr, SocketAddrV4};

        let listener = TallyListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).await?;
        let broadcaster = TallyBroadcaster::bind(&BroadcastConfig {
            group: Ipv4Addr::LOCALHOST,
            port: listener.local_addr()?.port(),
            ..Default::default()
        })
        .await?;
        let source = WirecastSource::new(
            SlowDocument {
                inner: document(),
                delay: Duration::from_secs(2),
            },
            WirecastLayer::default(),
        );
        let config = BridgeConfig::new(Duration::from_millis(250), Duration::from_millis(50))?;
        let mut bridge = TallyBridge::new(source, broadcaster, config)?;

        let started = Instant::now();
        let buffer = bridge.run_cycle().await;
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(buffer.is_clear());
        assert_eq!(LivenessState::Inactive, bridge.liveness());
        assert!(listener.recv().await?.0.is_clear());
        Ok(())
    }
}
