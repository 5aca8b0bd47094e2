//! Connection handle.
//!
//! Owns the TCP stream, the per-operation deadlines and the packet id counter.
//! It knows how to move single packets in and out but nothing about which
//! packets belong together; that is the job of [crate::client::Client].

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::{
    config::Settings,
    error::{RconError, Result},
    packet::{ClientPacket, ClientPacketType, Incoming, ServerPacket},
};

struct Stream {
    inner: TcpStream,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

pub struct Connection {
    stream: Option<Stream>,
    authenticated: bool,
    next_packet_id: i32,
    settings: Settings,
}

impl Connection {
    pub fn new(settings: Settings) -> Self {
        Connection {
            stream: None,
            authenticated: false,
            next_packet_id: 0,
            settings,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn set_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// Open the TCP stream. Fails without touching the existing stream if the
    /// handle is already connected.
    pub async fn dial<A: ToSocketAddrs>(&mut self, address: A) -> Result<()> {
        if self.is_connected() {
            return Err(RconError::AlreadyConnected);
        }

        let inner = with_deadline(self.settings.dial_timeout(), async {
            TcpStream::connect(address)
                .await
                .map_err(RconError::UnreachableHost)
        })
        .await?;

        if let Err(e) = inner.set_nodelay(true) {
            warn!("could not disable nagle on rcon stream: {}", e);
        }

        let local_addr = inner.local_addr().map_err(RconError::UnreachableHost)?;
        let peer_addr = inner.peer_addr().map_err(RconError::UnreachableHost)?;
        debug!("opened tcp stream {} -> {}", local_addr, peer_addr);

        self.stream = Some(Stream {
            inner,
            local_addr,
            peer_addr,
        });
        Ok(())
    }

    /// Shut the stream down. Every later operation fails with
    /// [RconError::NotConnected] until the handle is dialed again.
    pub async fn close(&mut self) -> Result<()> {
        let mut stream = self.stream.take().ok_or(RconError::NotConnected)?;
        self.authenticated = false;

        debug!("closing tcp stream to {}", stream.peer_addr);
        stream
            .inner
            .shutdown()
            .await
            .map_err(RconError::CloseError)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream
            .as_ref()
            .map(|s| s.local_addr)
            .ok_or(RconError::NotConnected)
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.stream
            .as_ref()
            .map(|s| s.peer_addr)
            .ok_or(RconError::NotConnected)
    }

    /// Hand out the current packet id and advance the counter.
    pub fn next_id(&mut self) -> i32 {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.wrapping_add(1);
        id
    }

    /// Build, encode and send a packet, arming the write deadline first.
    ///
    /// The packet takes the current id, but the counter only advances once
    /// the body is known to fit; an oversized body consumes nothing.
    pub async fn send(
        &mut self,
        packet_type: ClientPacketType,
        body: &str,
    ) -> Result<ClientPacket> {
        let deadline = self.settings.write_deadline();
        if self.stream.is_none() {
            return Err(RconError::NotConnected);
        }

        let packet = ClientPacket::new(self.next_packet_id, packet_type, body);
        let bytes = packet.pack()?;
        self.next_id();

        trace!(
            "sending packet id {} type {:?} ({} bytes)",
            packet.id(),
            packet.packet_type(),
            bytes.len()
        );

        let stream = self.stream.as_mut().ok_or(RconError::NotConnected)?;
        with_deadline(deadline, async {
            stream
                .inner
                .write_all(&bytes)
                .await
                .map_err(RconError::SendError)
        })
        .await?;

        Ok(packet)
    }

    /// Read a single packet, arming the read deadline first.
    pub async fn read_packet(&mut self) -> Result<Incoming> {
        let deadline = self.settings.read_deadline();
        let stream = self.stream.as_mut().ok_or(RconError::NotConnected)?;

        with_deadline(deadline, ServerPacket::read_from(&mut stream.inner)).await
    }
}

async fn with_deadline<T, F>(deadline: Option<Duration>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, future).await?,
        None => future.await,
    }
}
