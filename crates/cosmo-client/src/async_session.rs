//! Async session over tokio streams.
//!
//! Same id rules as the blocking [`Session`](crate::Session). Cancelling an
//! in-flight send may leave a partial frame in the transport buffer; there is
//! no rollback, so a cancelled session should be discarded.
//!
//! There is no async drop, so nothing sends `Close` for a session that is
//! dropped unclosed. That includes a panic inside a [`with_async_session`]
//! body: the panic unwinds past the scope and the host only sees the
//! connection go away.

use std::future::Future;
use std::pin::Pin;

use cosmo_frame::{CosmoCodec, Frame, FrameError, Message};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::ensure_sendable;

/// One logical async connection to a cosmo host.
///
/// There is no async drop, so a session dropped without [`AsyncSession::close`]
/// sends nothing. Use [`with_async_session`] for scoped use.
pub struct AsyncSession<R = OwnedReadHalf, W = OwnedWriteHalf> {
    reader: FramedRead<R, CosmoCodec>,
    writer: FramedWrite<W, CosmoCodec>,
    host: String,
    port: u16,
    msgid: u32,
}

impl<R, W> AsyncSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Assemble a session from already-connected halves. No handshake is sent.
    pub fn from_parts(
        reader: R,
        writer: W,
        host: impl Into<String>,
        port: u16,
        codec: CosmoCodec,
    ) -> Self {
        Self {
            reader: FramedRead::new(reader, codec.clone()),
            writer: FramedWrite::new(writer, codec),
            host: host.into(),
            port,
            msgid: 0,
        }
    }

    /// Announce the protocol version. Always id 0; the counter is untouched.
    pub async fn handshake(&mut self, version: u16) -> Result<()> {
        self.transmit(0, Message::handshake(version)).await
    }

    /// Send an id-bearing message and return the id it was sent with.
    ///
    /// A message that fails to encode or send still consumes its id.
    /// Handshake and Close are rejected with [`ClientError::Lifecycle`].
    pub async fn send(&mut self, message: Message) -> Result<u16> {
        ensure_sendable(&message)?;
        self.send_next(message).await
    }

    pub async fn write(&mut self, data: &str) -> Result<u16> {
        self.send(Message::write(data)).await
    }

    pub async fn get_register(&mut self, register_type: u8, name: &str) -> Result<u16> {
        self.send(Message::get_register(register_type, name)).await
    }

    pub async fn put_register(
        &mut self,
        register_type: u8,
        name: &str,
        data: &str,
    ) -> Result<u16> {
        self.send(Message::put_register(register_type, name, data))
            .await
    }

    pub async fn log(&mut self, level: u8, message: &str) -> Result<u16> {
        self.send(Message::log(level, message)).await
    }

    /// Wait for the next complete message from the host.
    pub async fn recv(&mut self) -> Result<Frame> {
        match self.reader.next().await {
            Some(Ok(frame)) => {
                debug!(kind = %frame.message.kind(), id = frame.id, "received message");
                Ok(frame)
            }
            Some(Err(err)) => Err(ClientError::from_recv(err)),
            None => Err(ClientError::from_recv(FrameError::ConnectionClosed)),
        }
    }

    /// Send the `Close` message and end the session.
    pub async fn close(mut self) -> Result<()> {
        self.send_next(Message::Close).await.map(|_| ())
    }

    /// Highest id drawn from the counter so far (0 before any send).
    pub fn last_id(&self) -> u32 {
        self.msgid
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn send_next(&mut self, message: Message) -> Result<u16> {
        self.msgid = self.msgid.saturating_add(1);
        let id = u16::try_from(self.msgid)
            .map_err(|_| ClientError::Encoding(FrameError::IdOutOfRange(self.msgid)))?;
        self.transmit(id, message).await?;
        Ok(id)
    }

    async fn transmit(&mut self, id: u16, message: Message) -> Result<()> {
        let kind = message.kind();
        self.writer
            .send(Frame::new(id, message))
            .await
            .map_err(ClientError::from_send)?;
        debug!(%kind, id, "sent message");
        Ok(())
    }
}

impl<R, W> std::fmt::Debug for AsyncSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("msgid", &self.msgid)
            .finish()
    }
}

/// Connect to a cosmo host and perform the handshake.
pub async fn connect_async(config: &ClientConfig) -> Result<AsyncSession> {
    let stream =
        cosmo_transport::connect_async(&config.host, config.port, config.connect_timeout).await?;
    stream
        .set_nodelay(true)
        .map_err(cosmo_transport::TransportError::Io)?;
    let (read_half, write_half) = stream.into_split();

    let mut session = AsyncSession::from_parts(
        read_half,
        write_half,
        config.host.clone(),
        config.port,
        codec_for(config),
    );
    session.handshake(config.protocol_version).await?;

    info!(
        addr = %config.addr(),
        version = config.protocol_version,
        "cosmo session established"
    );
    Ok(session)
}

fn codec_for(config: &ClientConfig) -> CosmoCodec {
    let codec = CosmoCodec::with_max_payload(config.frame.max_payload_size);
    match config.frame.max_write_size {
        Some(max) => codec.with_max_write(max),
        None => codec,
    }
}

/// Run `body` inside an async session scope.
///
/// Connects before `body` runs and sends `Close` afterwards, also when
/// `body` fails; in that case the close is best-effort and only logged.
/// The body receives the session by reference and returns a boxed future,
/// e.g. `|session| Box::pin(async move { session.write("hi").await })`.
pub async fn with_async_session<T, E, F>(
    config: &ClientConfig,
    body: F,
) -> std::result::Result<T, E>
where
    F: for<'a> FnOnce(
        &'a mut AsyncSession,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<T, E>> + 'a>>,
    E: From<ClientError>,
{
    let mut session = connect_async(config).await?;
    let outcome = body(&mut session).await;
    match outcome {
        Ok(value) => {
            session.close().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(close_err) = session.close().await {
                warn!(addr = %config.addr(), error = %close_err, "close after failed scope");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    /// Accept one connection and collect every frame until EOF.
    async fn spawn_recorder() -> (u16, tokio::task::JoinHandle<Vec<Frame>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut frames = FramedRead::new(stream, CosmoCodec::new());
            let mut out = Vec::new();
            while let Some(frame) = frames.next().await {
                out.push(frame.unwrap());
            }
            out
        });
        (port, handle)
    }

    #[tokio::test]
    async fn writes_then_close_use_sequential_ids() {
        let (port, server) = spawn_recorder().await;
        let config = ClientConfig::new("127.0.0.1", port);

        let mut session = connect_async(&config).await.unwrap();
        for data in ["a", "b", "c"] {
            session.write(data).await.unwrap();
        }
        session.close().await.unwrap();

        let frames = server.await.unwrap();
        let ids: Vec<u16> = frames.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(frames[0].message, Message::handshake(crate::PROTOCOL_VERSION));
        assert_eq!(frames[4].message, Message::Close);
    }

    #[tokio::test]
    async fn scope_closes_after_body() {
        let (port, server) = spawn_recorder().await;
        let config = ClientConfig::new("127.0.0.1", port);

        let id = with_async_session(&config, |session| {
            Box::pin(async move {
                session.put_register(1, "x", "y").await?;
                session.write("hi").await
            })
        })
        .await
        .unwrap();
        assert_eq!(id, 2);

        let frames = server.await.unwrap();
        assert_eq!(frames[1], Frame::new(1, Message::put_register(1, "x", "y")));
        assert_eq!(frames.last(), Some(&Frame::new(3, Message::Close)));
    }

    #[tokio::test]
    async fn scope_closes_after_failed_body() {
        let (port, server) = spawn_recorder().await;
        let config = ClientConfig::new("127.0.0.1", port);

        let result: std::result::Result<(), ClientError> =
            with_async_session(&config, |session| {
                Box::pin(async move {
                    session.write("partial").await?;
                    Err::<(), _>(ClientError::Encoding(FrameError::IdOutOfRange(0)))
                })
            })
            .await;
        assert!(result.unwrap_err().is_encoding());

        let frames = server.await.unwrap();
        assert_eq!(frames.last(), Some(&Frame::new(2, Message::Close)));
    }

    #[tokio::test]
    async fn recv_over_duplex() {
        let (client, server) = tokio::io::duplex(256);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        let mut session = AsyncSession::from_parts(
            client_read,
            client_write,
            "duplex",
            0,
            CosmoCodec::new(),
        );
        let mut host_in = FramedRead::new(server_read, CosmoCodec::new());
        let mut host_out = FramedWrite::new(server_write, CosmoCodec::new());

        let id = session.get_register(2, "sp").await.unwrap();
        let request = host_in.next().await.unwrap().unwrap();
        assert_eq!(request, Frame::new(id, Message::get_register(2, "sp")));

        host_out
            .send(Frame::new(id, Message::response(0, "0x7ff0")))
            .await
            .unwrap();
        let reply = session.recv().await.unwrap();
        assert_eq!(reply, Frame::new(1, Message::response(0, "0x7ff0")));
    }

    #[tokio::test]
    async fn send_refuses_lifecycle_messages() {
        let (client, server) = tokio::io::duplex(256);
        let (client_read, client_write) = tokio::io::split(client);
        let mut host_in = FramedRead::new(server, CosmoCodec::new());

        let mut session = AsyncSession::from_parts(
            client_read,
            client_write,
            "duplex",
            0,
            CosmoCodec::new(),
        );
        assert!(matches!(
            session.send(Message::handshake(0)).await.unwrap_err(),
            ClientError::Lifecycle(cosmo_frame::MessageKind::Handshake)
        ));
        assert!(matches!(
            session.send(Message::Close).await.unwrap_err(),
            ClientError::Lifecycle(cosmo_frame::MessageKind::Close)
        ));
        assert_eq!(session.last_id(), 0);

        session.close().await.unwrap();
        let only = host_in.next().await.unwrap().unwrap();
        assert_eq!(only, Frame::new(1, Message::Close));
    }

    #[tokio::test]
    async fn writes_past_decode_limit() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let mut host_in =
            FramedRead::new(server, CosmoCodec::with_max_payload(usize::MAX));

        let mut session = AsyncSession::from_parts(
            client_read,
            client_write,
            "duplex",
            0,
            CosmoCodec::new(),
        );
        let data = "a".repeat(cosmo_frame::DEFAULT_MAX_PAYLOAD + 1);
        let expected = Frame::new(1, Message::write(data.clone()));

        let host = tokio::spawn(async move { host_in.next().await.unwrap().unwrap() });
        assert_eq!(session.write(&data).await.unwrap(), 1);
        assert_eq!(host.await.unwrap(), expected);
    }

    #[test]
    fn codec_follows_frame_config() {
        let mut config = ClientConfig::new("127.0.0.1", 1);
        assert_eq!(codec_for(&config).max_write_size(), None);

        config.frame.max_payload_size = 64;
        config.frame.max_write_size = Some(32);
        let codec = codec_for(&config);
        assert_eq!(codec.max_payload_size(), 64);
        assert_eq!(codec.max_write_size(), Some(32));
    }

    #[tokio::test]
    async fn connect_refused_is_connection_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = connect_async(&ClientConfig::new("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(err.is_connection());
    }
}
