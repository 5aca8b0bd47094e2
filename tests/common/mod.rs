//! Scripted in-process rcon server for driving the client in tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

pub const RESPONSE_VALUE: i32 = 0;
pub const AUTH_RESPONSE: i32 = 2;
pub const UNDOCUMENTED: i32 = 4;

pub const EXEC_COMMAND: i32 = 2;
pub const AUTH: i32 = 3;

/// Server side of a single accepted connection.
pub struct Peer {
    stream: TcpStream,
}

/// A packet as the server received it.
#[derive(Debug)]
pub struct Received {
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl Peer {
    pub async fn recv(&mut self) -> Received {
        let size = self.stream.read_i32_le().await.unwrap();
        let id = self.stream.read_i32_le().await.unwrap();
        let packet_type = self.stream.read_i32_le().await.unwrap();

        let mut body = vec![0u8; (size - 8) as usize];
        self.stream.read_exact(&mut body).await.unwrap();
        assert_eq!(&body[body.len() - 2..], &[0, 0], "client sent unterminated packet");
        body.truncate(body.len() - 2);

        Received {
            id,
            packet_type,
            body: String::from_utf8(body).unwrap(),
        }
    }

    /// Read until the client closes the stream. Returns false if anything
    /// else arrived first.
    pub async fn expect_eof(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.stream.read(&mut buf).await, Ok(0))
    }

    /// True if no bytes arrive from the client within `wait`.
    pub async fn nothing_pending(&mut self, wait: Duration) -> bool {
        let mut buf = [0u8; 1];
        tokio::time::timeout(wait, self.stream.peek(&mut buf))
            .await
            .is_err()
    }

    pub async fn send(&mut self, id: i32, packet_type: i32, body: &str) {
        self.send_raw(&packet(id, packet_type, body.as_bytes())).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Answer an auth packet the way a stock srcds does: an empty response
    /// value followed by the auth response.
    pub async fn accept_auth(&mut self, password: &str) -> i32 {
        let auth = self.recv().await;
        assert_eq!(auth.packet_type, AUTH);
        assert_eq!(auth.body, password);
        self.send(auth.id, RESPONSE_VALUE, "").await;
        self.send(auth.id, AUTH_RESPONSE, "").await;
        auth.id
    }
}

pub fn packet(id: i32, packet_type: i32, body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(body.len() as i32 + 10).to_le_bytes());
    bytes.extend_from_slice(&id.to_le_bytes());
    bytes.extend_from_slice(&packet_type.to_le_bytes());
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

/// Bind to an ephemeral port and run `script` against the first connection.
pub async fn serve<F, Fut>(script: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(Peer) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        script(Peer { stream }).await;
    });

    (addr, handle)
}
