//! Packet framing for the Source RCON protocol.
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────────┬──────────┐
//! │ Size (4) │  ID (4)  │ Type (4) │ Body (0..n)  │ 0x00 0x00│
//! └──────────┴──────────┴──────────┴──────────────┴──────────┘
//! ```
//!
//! All integers are signed 32-bit little-endian. Size does not count itself.

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{RconError, Result};

/// ID and type, both 32-bit signed integers.
pub const PACKET_HEADER_SIZE: i32 = 8;
pub const PACKET_TERMINATOR_SIZE: i32 = 2;
/// Largest value the size field may take.
pub const PACKET_MAXIMUM_SIZE: i32 = 4096;
pub const PACKET_MAXIMUM_BODY_SIZE: i32 =
    PACKET_MAXIMUM_SIZE - PACKET_HEADER_SIZE - PACKET_TERMINATOR_SIZE;
/// Commands are kept well below the body limit: responses larger than a
/// single packet are not reassembled.
pub const COMMAND_MAXIMUM_SIZE: usize = PACKET_MAXIMUM_BODY_SIZE as usize / 4;
/// Upper bound on the size field of packets we are willing to buffer.
pub const MAX_INCOMING_SIZE: i32 = 1024 * 1024;

/// Packet types sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPacketType {
    // SERVERDATA_RESPONSE_VALUE, used for multi-packet response checking.
    // Reserved, nothing sends it yet.
    ResponseCheck,
    // SERVERDATA_EXECCOMMAND
    ExecCommand,
    // SERVERDATA_AUTH
    Auth,
}

impl ClientPacketType {
    pub fn code(&self) -> i32 {
        match self {
            ClientPacketType::ResponseCheck => 0,
            ClientPacketType::ExecCommand => 2,
            ClientPacketType::Auth => 3,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.code().to_le_bytes()
    }
}

/// Packet types sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPacketType {
    // SERVERDATA_RESPONSE_VALUE
    ResponseValue,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    /// Undocumented type 4, sent by the Rust game server alongside its auth
    /// and command responses.
    Undocumented,
}

impl ServerPacketType {
    pub fn code(&self) -> i32 {
        match self {
            ServerPacketType::ResponseValue => 0,
            ServerPacketType::AuthResponse => 2,
            ServerPacketType::Undocumented => 4,
        }
    }
}

impl TryFrom<i32> for ServerPacketType {
    type Error = RconError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(ServerPacketType::ResponseValue),
            2 => Ok(ServerPacketType::AuthResponse),
            4 => Ok(ServerPacketType::Undocumented),
            other => Err(RconError::UnknownPacketType(other)),
        }
    }
}

/// Outbound packet. Built per request and consumed by [ClientPacket::pack].
#[derive(Debug, Clone)]
pub struct ClientPacket {
    id: i32,
    packet_type: ClientPacketType,
    body: String,
}

impl ClientPacket {
    pub fn new(id: i32, packet_type: ClientPacketType, body: impl Into<String>) -> Self {
        ClientPacket {
            id,
            packet_type,
            body: body.into(),
        }
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> usize {
        self.body.len() + (PACKET_HEADER_SIZE + PACKET_TERMINATOR_SIZE) as usize
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> ClientPacketType {
        self.packet_type
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    /// Encode into wire bytes, failing if the body does not fit in a packet.
    pub fn pack(&self) -> Result<Vec<u8>> {
        if self.size() > PACKET_MAXIMUM_SIZE as usize {
            return Err(RconError::PacketTooLarge {
                len: self.body.len(),
                max: PACKET_MAXIMUM_BODY_SIZE as usize,
            });
        }

        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::with_capacity(self.size() + 4);
        payload.extend_from_slice(&(self.size() as i32).to_le_bytes());
        payload.extend_from_slice(&self.id.to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(self.body.as_bytes());
        // null terminate the body, then null terminate the entire package
        payload.extend_from_slice(&[0u8, 0u8]);
        Ok(payload)
    }
}

/// Inbound packet as read off the wire.
#[derive(Debug, Clone)]
pub struct ServerPacket {
    size: i32,
    id: i32,
    packet_type: ServerPacketType,
    /// Body including the trailing terminator.
    body_bytes: Vec<u8>,
}

/// Outcome of decoding one inbound packet.
#[derive(Debug)]
pub enum Incoming {
    Packet(ServerPacket),
    /// A packet of the undocumented type. It is well-formed but carries
    /// nothing for us; the caller decides whether to read past it.
    Quirk(ServerPacket),
}

impl ServerPacket {
    /// Read exactly one packet from `reader`.
    ///
    /// Short reads are tolerated; a stream that closes before the declared
    /// size has arrived fails with [RconError::ReceiveError].
    pub async fn read_from<R>(reader: &mut R) -> Result<Incoming>
    where
        R: AsyncRead + Unpin,
    {
        let size = reader.read_i32_le().await.map_err(RconError::ReceiveError)?;
        let id = reader.read_i32_le().await.map_err(RconError::ReceiveError)?;
        let type_code = reader.read_i32_le().await.map_err(RconError::ReceiveError)?;

        if !(PACKET_HEADER_SIZE + PACKET_TERMINATOR_SIZE..=MAX_INCOMING_SIZE).contains(&size) {
            return Err(RconError::InvalidPacketSize(size));
        }

        let mut body_bytes = vec![0u8; (size - PACKET_HEADER_SIZE) as usize];
        reader
            .read_exact(&mut body_bytes)
            .await
            .map_err(RconError::ReceiveError)?;

        if !body_bytes.ends_with(&[0x00, 0x00]) {
            return Err(RconError::InvalidPacketTerminator);
        }

        let packet_type = ServerPacketType::try_from(type_code)?;
        trace!("read packet id {} type {:?} size {}", id, packet_type, size);

        let packet = ServerPacket {
            size,
            id,
            packet_type,
            body_bytes,
        };

        Ok(match packet_type {
            ServerPacketType::Undocumented => Incoming::Quirk(packet),
            _ => Incoming::Packet(packet),
        })
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> ServerPacketType {
        self.packet_type
    }

    /// Raw body bytes, terminator excluded.
    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes[..self.body_bytes.len() - PACKET_TERMINATOR_SIZE as usize]
    }

    pub fn body(&self) -> Result<&str> {
        Ok(std::str::from_utf8(self.body_bytes())?)
    }
}
