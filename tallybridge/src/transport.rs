//! UDP multicast transport for tally state.
//!
//! Every cycle, the full [TallyStateBuffer] is sent as a single datagram.
//! There are no acknowledgements or retries: a lost datagram is replaced by
//! the next cycle's.
use crate::{
    protocol::{TallyStateBuffer, PAYLOAD_LENGTH},
    Error, Result,
};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::UdpSocket;

/// Address used to find the internet facing network adapter. Nothing is sent
/// to it.
const ROUTE_PROBE_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 80);

/// Multicast destination and socket options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct BroadcastConfig {
    /// Multicast group the tally lights listen on.
    #[cfg_attr(feature = "clap", arg(long, default_value_t = BroadcastConfig::DEFAULT_GROUP))]
    pub group: Ipv4Addr,

    /// UDP port the tally lights listen on.
    #[cfg_attr(
        feature = "clap",
        arg(long = "mcast-port", default_value_t = BroadcastConfig::DEFAULT_PORT)
    )]
    pub port: u16,

    /// Multicast time-to-live (hop limit).
    #[cfg_attr(feature = "clap", arg(long, default_value_t = BroadcastConfig::DEFAULT_TTL))]
    pub ttl: u32,

    /// IPv4 address of the local network adapter to use, for hosts with
    /// multiple adapters.
    #[cfg_attr(feature = "clap", arg(long))]
    pub interface: Option<Ipv4Addr>,
}

impl BroadcastConfig {
    pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 20);
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_TTL: u32 = 2;

    /// Address datagrams are sent to.
    pub const fn destination(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.group, self.port)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            group: Self::DEFAULT_GROUP,
            port: Self::DEFAULT_PORT,
            ttl: Self::DEFAULT_TTL,
            interface: None,
        }
    }
}

/// Sends tally state to the multicast group.
///
/// The socket is opened once, and held for the life of the broadcaster.
pub struct TallyBroadcaster {
    sock: UdpSocket,
    dest: SocketAddrV4,
}

impl TallyBroadcaster {
    pub async fn bind(config: &BroadcastConfig) -> Result<Self> {
        let local = SocketAddrV4::new(config.interface.unwrap_or(Ipv4Addr::UNSPECIFIED), 0);
        let sock = UdpSocket::bind(local).await?;
        sock.set_multicast_ttl_v4(config.ttl)?;
        debug!(
            "broadcasting from {:?} to {}, ttl {}",
            sock.local_addr(),
            config.destination(),
            config.ttl
        );

        Ok(Self {
            sock,
            dest: config.destination(),
        })
    }

    #[inline]
    pub const fn destination(&self) -> SocketAddrV4 {
        self.dest
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.sock.local_addr()?)
    }

    /// Sends a single tally state datagram.
    pub async fn send(&self, buffer: &TallyStateBuffer) -> Result {
        let payload = buffer.to_payload()?;
        let l = self.sock.send_to(&payload, self.dest).await?;
        if l != payload.len() {
            return Err(Error::InvalidLength);
        }
        Ok(())
    }
}

/// Receives tally state datagrams, as a tally light would.
pub struct TallyListener {
    sock: UdpSocket,
}

impl TallyListener {
    /// Joins the multicast group in `config`.
    pub async fn join(config: &BroadcastConfig) -> Result<Self> {
        let sock = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port)).await?;
        sock.join_multicast_v4(
            config.group,
            config.interface.unwrap_or(Ipv4Addr::UNSPECIFIED),
        )?;
        Ok(Self { sock })
    }

    /// Listens for datagrams sent directly to `addr`.
    pub async fn bind(addr: SocketAddrV4) -> Result<Self> {
        let sock = UdpSocket::bind(addr).await?;
        Ok(Self { sock })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.sock.local_addr()?)
    }

    /// Waits for the next datagram, and decodes it.
    ///
    /// Returns the tally state, and the address of the bridge which sent it.
    pub async fn recv(&self) -> Result<(TallyStateBuffer, SocketAddr)> {
        // One byte larger than a payload, so oversized datagrams are caught.
        let mut b = [0u8; PAYLOAD_LENGTH + 1];
        let (l, src) = self.sock.recv_from(&mut b).await?;
        Ok((TallyStateBuffer::from_payload(&b[..l])?, src))
    }
}

/// Finds the IPv4 address of the network adapter with a route to the
/// internet.
pub async fn internet_facing_ipv4() -> Result<Ipv4Addr> {
    let sock = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
    sock.connect(ROUTE_PROBE_ADDR).await?;
    match sock.local_addr()? {
        SocketAddr::V4(addr) => Ok(*addr.ip()),
        SocketAddr::V6(addr) => {
            error!("expected IPv4 address, got {addr}");
            Err(Error::UnexpectedState)
        }
    }
}
