use thiserror::Error;
use tokio::time::error::Elapsed;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned if the host is down or behind a firewall.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] std::io::Error),
    /// The stream was established, but there was a problem writing to the
    /// socket.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// The stream was established, but there was a problem reading from the
    /// socket. A peer closing the stream mid-packet also ends up here.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
    #[error("cannot close connection to host")]
    CloseError(#[source] std::io::Error),
    /// An operation failed and tearing the connection down afterwards failed
    /// as well. `error` is the original failure.
    #[error("{error} (closing the connection afterwards also failed: {close})")]
    CloseAfterError {
        #[source]
        error: Box<RconError>,
        close: Box<RconError>,
    },
    /// Returned if the server did not respond in time, or a write did not
    /// complete before the write deadline.
    #[error("timeout")]
    TimeoutError(#[from] Elapsed),

    /// The last two bytes of a packet body were not `0x00 0x00`.
    #[error("the packet was not terminated correctly")]
    InvalidPacketTerminator,
    /// The size field cannot describe a well-formed packet.
    #[error("invalid packet size: {0}")]
    InvalidPacketSize(i32),
    /// Returned if we received a packet that does not have a type known to us.
    #[error("unknown rcon packet type: {0}")]
    UnknownPacketType(i32),
    #[error("packet body malformed (not valid ascii or utf-8)")]
    MalformedPacketBody(#[from] std::str::Utf8Error),

    /// The server answered an auth packet with something other than an auth
    /// response.
    #[error("the server responded with an invalid packet type for an auth packet")]
    InvalidAuthResponse,
    /// Returned if you can't remember the password.
    #[error("bad password")]
    AuthenticationError,
    /// The reply does not belong to the request we sent. The connection is
    /// out of sync and should be dropped.
    #[error("packet id mismatch: sent {expected}, received {actual}")]
    IdMismatch { expected: i32, actual: i32 },

    #[error("the command must not be a blank string")]
    EmptyCommand,
    #[error("command is {len} bytes long, at most {max} are allowed")]
    CommandTooLong { len: usize, max: usize },
    #[error("packet body is {len} bytes long, at most {max} fit in a packet")]
    PacketTooLarge { len: usize, max: usize },
    #[error("remote console is already connected")]
    AlreadyConnected,
    #[error("remote console is already authenticated")]
    AlreadyAuthenticated,
    #[error("remote console is not connected")]
    NotConnected,
    #[error("remote console is not authenticated")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, RconError>;
