use std::net::SocketAddr;

use log::{debug, trace, warn};
use tokio::net::ToSocketAddrs;
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    connection::Connection,
    error::{RconError, Result},
    packet::{
        ClientPacketType, Incoming, ServerPacket, ServerPacketType, COMMAND_MAXIMUM_SIZE,
    },
};

/// Asynchronous rcon client. Call `connect()` to establish a connection and
/// authenticate.
///
/// Only one request may be in flight at a time: replies carry no information
/// that would let us tell interleaved exchanges apart, so every exchange holds
/// the connection lock from the write until the matching read. A `Client` can
/// be shared between tasks (e.g. behind an `Arc`); concurrent callers simply
/// queue up.
///
/// ## Example
/// ```no_run
/// use rconsole::{client::Client, config::Settings};
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let client = Client::connect("127.0.0.1:27015", "<put rcon password here>", Settings::default()).await?;
///     let response = client.execute("echo hi").await?;
///
///     assert_eq!(response.body(), "hi");
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    conn: Mutex<Connection>,
}

/// Text returned by the server for a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: i32,
    body: String,
}

impl Response {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

/// Fold a failed close into the error that triggered it, so neither is lost.
fn with_close_result(error: RconError, close: Result<()>) -> RconError {
    match close {
        Ok(()) => error,
        Err(close) => {
            warn!("error closing connection after failed auth: {}", close);
            RconError::CloseAfterError {
                error: Box::new(error),
                close: Box::new(close),
            }
        }
    }
}

impl Client {
    /// Create an unconnected client.
    pub fn new(settings: Settings) -> Self {
        Client {
            conn: Mutex::new(Connection::new(settings)),
        }
    }

    /// Dial `address` and authenticate with `password`. If authentication
    /// fails the stream is closed again before the error is returned.
    pub async fn connect<A: ToSocketAddrs>(
        address: A,
        password: &str,
        settings: Settings,
    ) -> Result<Self> {
        let client = Client::new(settings);
        client.dial(address).await?;

        trace!("opened tcp stream, attempting auth");

        if let Err(e) = client.authenticate(password).await {
            return Err(with_close_result(e, client.close().await));
        }

        debug!("auth complete");
        Ok(client)
    }

    pub async fn dial<A: ToSocketAddrs>(&self, address: A) -> Result<()> {
        self.conn.lock().await.dial(address).await
    }

    pub async fn close(&self) -> Result<()> {
        self.conn.lock().await.close().await
    }

    pub async fn local_addr(&self) -> Result<SocketAddr> {
        self.conn.lock().await.local_addr()
    }

    pub async fn peer_addr(&self) -> Result<SocketAddr> {
        self.conn.lock().await.peer_addr()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.conn.lock().await.is_authenticated()
    }

    /// Send the auth packet and wait for the server's verdict.
    pub async fn authenticate(&self, password: &str) -> Result<()> {
        let mut conn = self.conn.lock().await;

        if conn.is_authenticated() {
            return Err(RconError::AlreadyAuthenticated);
        }
        if !conn.is_connected() {
            return Err(RconError::NotConnected);
        }

        trace!("sending auth packet to server");
        let auth_packet = conn.send(ClientPacketType::Auth, password).await?;

        let mut response = Self::read_response(&mut conn).await?;

        // some servers acknowledge with an empty response value before the
        // actual auth response
        if response.packet_type() == ServerPacketType::ResponseValue {
            trace!("skipping empty response value ahead of auth response");
            response = match conn.read_packet().await? {
                Incoming::Packet(packet) | Incoming::Quirk(packet) => packet,
            };
        }

        if response.packet_type() != ServerPacketType::AuthResponse {
            return Err(RconError::InvalidAuthResponse);
        }

        if response.id() == -1 {
            return Err(RconError::AuthenticationError);
        }

        if response.id() != auth_packet.id() {
            return Err(RconError::IdMismatch {
                expected: auth_packet.id(),
                actual: response.id(),
            });
        }

        conn.set_authenticated();
        Ok(())
    }

    /// Run a rcon command and return the server's reply.
    ///
    /// Responses spread over several packets are not reassembled, which is
    /// why commands are limited to a quarter of the packet body size.
    pub async fn execute(&self, command: &str) -> Result<Response> {
        let mut conn = self.conn.lock().await;

        if command.is_empty() {
            return Err(RconError::EmptyCommand);
        }
        if command.len() > COMMAND_MAXIMUM_SIZE {
            return Err(RconError::CommandTooLong {
                len: command.len(),
                max: COMMAND_MAXIMUM_SIZE,
            });
        }
        if !conn.is_connected() {
            return Err(RconError::NotConnected);
        }
        if !conn.is_authenticated() {
            return Err(RconError::NotAuthenticated);
        }

        let command_packet = conn.send(ClientPacketType::ExecCommand, command).await?;
        trace!("sent command packet {} to server", command_packet.id());

        let response = Self::read_response(&mut conn).await?;
        if response.id() != command_packet.id() {
            return Err(RconError::IdMismatch {
                expected: command_packet.id(),
                actual: response.id(),
            });
        }

        Ok(Response {
            id: response.id(),
            body: response.body()?.to_owned(),
        })
    }

    /// Read one packet, reading past a single undocumented packet if the
    /// server sends one first.
    async fn read_response(conn: &mut Connection) -> Result<ServerPacket> {
        match conn.read_packet().await? {
            Incoming::Packet(packet) => Ok(packet),
            Incoming::Quirk(quirk) => {
                debug!("ignoring undocumented packet type 4 (id {})", quirk.id());
                match conn.read_packet().await? {
                    Incoming::Packet(packet) => Ok(packet),
                    Incoming::Quirk(_) => Err(RconError::UnknownPacketType(
                        ServerPacketType::Undocumented.code(),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn clean_close_keeps_original_error() {
        let error = with_close_result(RconError::AuthenticationError, Ok(()));
        assert!(matches!(error, RconError::AuthenticationError));
    }

    #[test]
    fn failed_close_is_reported_with_original_error() {
        let close = RconError::CloseError(std::io::Error::from(std::io::ErrorKind::NotConnected));
        let error = with_close_result(RconError::AuthenticationError, Err(close));

        let RconError::CloseAfterError { error: ref first, close: ref second } = error else {
            panic!("expected both errors, got {error:?}");
        };
        assert!(matches!(**first, RconError::AuthenticationError));
        assert!(matches!(**second, RconError::CloseError(_)));
        assert_eq!(
            error.to_string(),
            "bad password (closing the connection afterwards also failed: cannot close connection to host)"
        );
        assert!(error.source().is_some());
    }
}
