//! vMix web API adapter.
//!
//! vMix reports its state as an XML document from `GET /API`:
//!
//! ```xml
//! <vmix>
//!   <inputs>
//!     <input key="..." number="1" type="Capture" title="Wide [T:1]">Wide [T:1]</input>
//!     <input key="..." number="2" type="Capture" title="Close [T:2]">Close [T:2]</input>
//!   </inputs>
//!   <overlays>
//!     <overlay number="1">2</overlay>
//!     <overlay number="2" />
//!   </overlays>
//!   <preview>2</preview>
//!   <active>1</active>
//! </vmix>
//! ```
//!
//! `preview`, `active` and each `overlay` refer to inputs by `number`.
use super::ProgramSource;
use crate::{
    protocol::{ProgramSnapshot, OVERLAY_COUNT},
    Result,
};
use serde::Deserialize;

/// Polls vMix's web API.
pub struct VmixSource {
    client: reqwest::Client,
    url: String,
}

impl VmixSource {
    pub const DEFAULT_ADDRESS: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8088;

    /// Creates an adapter for the vMix web API at `address:port`.
    ///
    /// No connection is made until the first fetch.
    pub fn new(address: &str, port: u16) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: format!("http://{address}:{port}/API"),
        })
    }

    /// URL of the API endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ProgramSource for VmixSource {
    fn name(&self) -> &str {
        "vMix"
    }

    async fn fetch(&mut self) -> Result<ProgramSnapshot> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let state: VmixState = quick_xml::de::from_str(&body)?;
        Ok(state.into_snapshot())
    }
}

/// The parts of the `/API` document used for tally.
#[derive(Debug, Deserialize)]
struct VmixState {
    #[serde(default)]
    inputs: VmixInputs,
    #[serde(default)]
    overlays: VmixOverlays,
    /// Input number on preview.
    preview: String,
    /// Input number on program.
    active: String,
}

#[derive(Debug, Default, Deserialize)]
struct VmixInputs {
    #[serde(rename = "input", default)]
    inputs: Vec<VmixInput>,
}

#[derive(Debug, Deserialize)]
struct VmixInput {
    #[serde(rename = "@number")]
    number: String,
    #[serde(rename = "@title", default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct VmixOverlays {
    #[serde(rename = "overlay", default)]
    overlays: Vec<VmixOverlay>,
}

#[derive(Debug, Deserialize)]
struct VmixOverlay {
    /// 1-indexed overlay number.
    #[serde(rename = "@number", default)]
    number: Option<String>,
    /// Input number on this overlay, empty when the overlay is off.
    #[serde(rename = "$text", default)]
    input: Option<String>,
}

impl VmixOverlay {
    /// 0-indexed overlay slot, if it fits in a [ProgramSnapshot].
    fn slot(&self) -> Option<usize> {
        let n: usize = self.number.as_deref()?.trim().parse().ok()?;
        let slot = n.checked_sub(1)?;
        (slot < OVERLAY_COUNT).then_some(slot)
    }

    fn input(&self) -> Option<&str> {
        self.input
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
    }
}

impl VmixState {
    fn title(&self, number: &str) -> Option<String> {
        let number = number.trim();
        self.inputs
            .inputs
            .iter()
            .find(|i| i.number.trim() == number)
            .map(|i| i.title.clone())
    }

    fn into_snapshot(self) -> ProgramSnapshot {
        let mut snapshot = ProgramSnapshot::new(self.title(&self.preview), self.title(&self.active));

        for overlay in &self.overlays.overlays {
            let Some(slot) = overlay.slot() else {
                trace!("ignoring overlay {:?}", overlay.number);
                continue;
            };

            snapshot.overlays[slot] = overlay.input().and_then(|i| self.title(i));
        }

        snapshot
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        protocol::{ReceiverState, TallyStateBuffer},
        Error,
    };

    const API_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<vmix>
  <version>27.0.0.49</version>
  <edition>4K</edition>
  <inputs>
    <input key="0a8c1f2e" number="1" type="Capture" title="Wide [T:1]" state="Running" position="0" duration="0" loop="False">Wide [T:1]</input>
    <input key="5be1d4a0" number="2" type="Capture" title="Close [T:2,3]" state="Running" position="0" duration="0" loop="False">Close [T:2,3]<overlay index="0" key="0a8c1f2e" /></input>
    <input key="9d23c7b1" number="3" type="GT" title="Lower third [T:4]" state="Paused" position="0" duration="0" loop="False">Lower third [T:4]</input>
    <input key="e4a8f6c2" number="4" type="Colour" title="Black" state="Paused" position="0" duration="0" loop="False">Black</input>
  </inputs>
  <overlays>
    <overlay number="1">3</overlay>
    <overlay number="2" />
    <overlay number="3"></overlay>
    <overlay number="4">99</overlay>
    <overlay number="5" />
    <overlay number="6" />
    <overlay number="7">1</overlay>
  </overlays>
  <preview>2</preview>
  <active>1</active>
  <fadeToBlack>False</fadeToBlack>
  <recording>False</recording>
  <mix number="2"><preview>4</preview><active>3</active></mix>
</vmix>"#;

    #[test]
    fn parse_state() -> Result {
        let state: VmixState = quick_xml::de::from_str(API_RESPONSE)?;
        let snapshot = state.into_snapshot();

        assert_eq!(Some("Close [T:2,3]"), snapshot.preview.as_deref());
        assert_eq!(Some("Wide [T:1]"), snapshot.live.as_deref());
        assert_eq!(Some("Lower third [T:4]"), snapshot.overlays[0].as_deref());
        // Empty overlays, and overlays of unknown inputs, are inactive.
        assert!(snapshot.overlays[1..].iter().all(Option::is_none));

        let buffer = TallyStateBuffer::rebuild(&snapshot, true);
        assert_eq!(
            &[
                ReceiverState::Live,
                ReceiverState::Preview,
                ReceiverState::Preview,
                ReceiverState::Live,
                ReceiverState::Clear,
            ],
            &buffer[..5]
        );
        Ok(())
    }

    #[test]
    fn unknown_inputs() -> Result {
        let state: VmixState = quick_xml::de::from_str(
            "<vmix><inputs /><overlays /><preview>1</preview><active>2</active></vmix>",
        )?;
        assert_eq!(ProgramSnapshot::default(), state.into_snapshot());
        Ok(())
    }

    #[test]
    fn missing_program() {
        let r = quick_xml::de::from_str::<VmixState>(
            r#"<vmix><inputs><input number="1" title="A" /></inputs><preview>1</preview></vmix>"#,
        );
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn fetch() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/API")
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(API_RESPONSE)
            .create_async()
            .await;

        let addr = server.socket_address();
        let mut source = VmixSource::new(&addr.ip().to_string(), addr.port())?;
        assert_eq!(format!("http://{addr}/API"), source.url());

        let snapshot = source.fetch().await?;
        assert_eq!(Some("Wide [T:1]"), snapshot.live.as_deref());
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn fetch_errors() -> Result {
        let mut server = mockito::Server::new_async().await;
        let addr = server.socket_address();
        let mut source = VmixSource::new(&addr.ip().to_string(), addr.port())?;

        let mock = server
            .mock("GET", "/API")
            .with_status(500)
            .create_async()
            .await;
        assert!(matches!(source.fetch().await, Err(Error::Http(_))));
        mock.remove_async().await;

        server
            .mock("GET", "/API")
            .with_status(200)
            .with_body("<html><body>Not vMix</body></html>")
            .create_async()
            .await;
        assert!(matches!(source.fetch().await, Err(Error::Xml(_))));
        Ok(())
    }
}
