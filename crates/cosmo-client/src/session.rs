use std::io::{Read, Write};
use std::net::SocketAddr;

use cosmo_frame::{Frame, FrameError, FrameReader, FrameWriter, Message, MessageKind};
use cosmo_transport::CosmoStream;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// One logical connection to a cosmo host.
///
/// The session exclusively owns both halves of its transport and the
/// message-id counter. Every send takes `&mut self`, so messages leave in
/// call order and ids are strictly increasing.
///
/// Dropping a session that was never closed sends a best-effort `Close`
/// message; failures at that point are logged, not reported.
pub struct Session<R: Read = CosmoStream, W: Write = CosmoStream> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    host: String,
    port: u16,
    msgid: u32,
    closed: bool,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Assemble a session from already-connected halves. No handshake is sent.
    pub fn from_parts(
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            reader,
            writer,
            host: host.into(),
            port,
            msgid: 0,
            closed: false,
        }
    }

    /// Announce the protocol version. Always id 0; the counter is untouched.
    pub fn handshake(&mut self, version: u16) -> Result<()> {
        self.transmit(0, &Message::handshake(version))
    }

    /// Send an id-bearing message and return the id it was sent with.
    ///
    /// The counter is advanced before encoding and is not rolled back, so a
    /// message that fails to encode or send still consumes its id.
    /// Handshake and Close are rejected with [`ClientError::Lifecycle`]
    /// without touching the counter; use [`Session::handshake`] and
    /// [`Session::close`].
    pub fn send(&mut self, message: &Message) -> Result<u16> {
        ensure_sendable(message)?;
        self.send_next(message)
    }

    /// Send `data` as a `Write` message. Does not wait for acknowledgment.
    pub fn write(&mut self, data: &str) -> Result<u16> {
        self.send(&Message::write(data))
    }

    /// Ask the host for a register value. The reply arrives via [`Session::recv`].
    pub fn get_register(&mut self, register_type: u8, name: &str) -> Result<u16> {
        self.send(&Message::get_register(register_type, name))
    }

    pub fn put_register(&mut self, register_type: u8, name: &str, data: &str) -> Result<u16> {
        self.send(&Message::put_register(register_type, name, data))
    }

    pub fn log(&mut self, level: u8, message: &str) -> Result<u16> {
        self.send(&Message::log(level, message))
    }

    /// Block until the next complete message arrives from the host.
    pub fn recv(&mut self) -> Result<Frame> {
        let frame = self.reader.read_frame().map_err(ClientError::from_recv)?;
        debug!(kind = %frame.message.kind(), id = frame.id, "received message");
        Ok(frame)
    }

    /// Send the `Close` message and end the session.
    ///
    /// The transport itself is released when the session is dropped here.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.send_next(&Message::Close).map(|_| ())
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

    /// Mark the session as finished without sending `Close`.
    pub(crate) fn abandon(&mut self) {
        self.closed = true;
    }

    fn send_next(&mut self, message: &Message) -> Result<u16> {
        self.msgid = self.msgid.saturating_add(1);
        let id = u16::try_from(self.msgid)
            .map_err(|_| ClientError::Encoding(FrameError::IdOutOfRange(self.msgid)))?;
        self.transmit(id, message)?;
        Ok(id)
    }

    fn transmit(&mut self, id: u16, message: &Message) -> Result<()> {
        let bytes = self
            .writer
            .send(id, message)
            .map_err(ClientError::from_send)?;
        debug!(kind = %message.kind(), id, bytes, "sent message");
        Ok(())
    }
}

/// Only data messages may go through a generic send.
pub(crate) fn ensure_sendable(message: &Message) -> Result<()> {
    match message.kind() {
        kind @ (MessageKind::Handshake | MessageKind::Close) => Err(ClientError::Lifecycle(kind)),
        _ => Ok(()),
    }
}

impl Session<CosmoStream, CosmoStream> {
    /// Address of the remote host.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.writer.get_ref().peer_addr().map_err(Into::into)
    }
}

impl<R: Read, W: Write> Drop for Session<R, W> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.send_next(&Message::Close) {
            warn!(host = %self.host, port = self.port, error = %err, "close on drop failed");
        }
    }
}

impl<R: Read, W: Write> std::fmt::Debug for Session<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("msgid", &self.msgid)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind};
    use std::sync::{Arc, Mutex};

    use bytes::BytesMut;
    use cosmo_frame::{decode_message, encode_message, MessageKind};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn frames(&self) -> Vec<Frame> {
            let mut wire = BytesMut::from(self.0.lock().unwrap().as_slice());
            let mut out = Vec::new();
            while let Some(frame) = decode_message(&mut wire, usize::MAX).unwrap() {
                out.push(frame);
            }
            assert!(wire.is_empty(), "trailing bytes on the wire");
            out
        }
    }

    fn session(buf: &SharedBuf) -> Session<std::io::Empty, SharedBuf> {
        Session::from_parts(
            FrameReader::new(std::io::empty()),
            FrameWriter::new(buf.clone()),
            "test",
            1,
        )
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ids_count_from_one_and_handshake_uses_zero() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);

        s.handshake(0).unwrap();
        assert_eq!(s.write("a").unwrap(), 1);
        assert_eq!(s.write("b").unwrap(), 2);
        assert_eq!(s.write("c").unwrap(), 3);
        s.close().unwrap();

        let frames = buf.frames();
        let ids: Vec<u16> = frames.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(frames[0].message, Message::handshake(0));
        assert_eq!(frames[4].message, Message::Close);
    }

    #[test]
    fn handshake_never_touches_counter() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);

        s.write("first").unwrap();
        s.handshake(7).unwrap();
        s.write("second").unwrap();
        assert_eq!(s.last_id(), 2);
        s.close().unwrap();

        let got: Vec<(u16, MessageKind)> =
            buf.frames().iter().map(|f| (f.id, f.message.kind())).collect();
        assert_eq!(
            got,
            vec![
                (1, MessageKind::Write),
                (0, MessageKind::Handshake),
                (2, MessageKind::Write),
                (3, MessageKind::Close),
            ]
        );
    }

    #[test]
    fn counter_is_shared_across_message_kinds() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);

        assert_eq!(s.get_register(1, "pc").unwrap(), 1);
        assert_eq!(s.put_register(1, "pc", "0").unwrap(), 2);
        assert_eq!(s.log(3, "hi").unwrap(), 3);
        assert_eq!(s.write("data").unwrap(), 4);
        s.close().unwrap();

        let frames = buf.frames();
        assert_eq!(frames.last().unwrap(), &Frame::new(5, Message::Close));
    }

    #[test]
    fn write_bytes_on_the_wire() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);
        s.write("hi").unwrap();
        s.abandon();

        assert_eq!(
            buf.0.lock().unwrap().as_slice(),
            &[0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x68, 0x69]
        );
    }

    #[test]
    fn failed_send_still_consumes_id() {
        let mut s = Session::from_parts(
            FrameReader::new(std::io::empty()),
            FrameWriter::new(FailingWriter),
            "test",
            1,
        );

        let err = s.write("lost").unwrap_err();
        assert!(err.is_connection());
        assert_eq!(s.last_id(), 1);

        let err = s.write("lost again").unwrap_err();
        assert!(err.is_connection());
        assert_eq!(s.last_id(), 2);
        s.abandon();
    }

    #[test]
    fn id_past_u16_is_encoding_error_and_consumed() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);
        s.msgid = u32::from(u16::MAX) - 1;

        assert_eq!(s.write("last").unwrap(), u16::MAX);
        let err = s.write("overflow").unwrap_err();
        assert!(err.is_encoding());
        assert!(matches!(
            err,
            ClientError::Encoding(FrameError::IdOutOfRange(65_536))
        ));
        assert_eq!(s.last_id(), 65_536);
        s.abandon();

        assert_eq!(buf.frames().len(), 1);
    }

    #[test]
    fn drop_sends_close() {
        let buf = SharedBuf::default();
        {
            let mut s = session(&buf);
            s.write("x").unwrap();
        }

        let frames = buf.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], Frame::new(2, Message::Close));
    }

    #[test]
    fn close_is_sent_once() {
        let buf = SharedBuf::default();
        let s = session(&buf);
        s.close().unwrap();

        let frames = buf.frames();
        assert_eq!(frames, vec![Frame::new(1, Message::Close)]);
    }

    #[test]
    fn send_refuses_lifecycle_messages() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);

        assert!(matches!(
            s.send(&Message::handshake(0)).unwrap_err(),
            ClientError::Lifecycle(MessageKind::Handshake)
        ));
        assert!(matches!(
            s.send(&Message::Close).unwrap_err(),
            ClientError::Lifecycle(MessageKind::Close)
        ));
        assert_eq!(s.last_id(), 0);

        assert_eq!(s.send(&Message::write("x")).unwrap(), 1);
        drop(s);

        assert_eq!(
            buf.frames(),
            vec![
                Frame::new(1, Message::write("x")),
                Frame::new(2, Message::Close),
            ]
        );
    }

    #[test]
    fn default_session_writes_past_decode_limit() {
        let buf = SharedBuf::default();
        let mut s = session(&buf);
        let data = "a".repeat(cosmo_frame::DEFAULT_MAX_PAYLOAD + 1);

        assert_eq!(s.write(&data).unwrap(), 1);
        s.abandon();

        let wire = buf.0.lock().unwrap();
        assert_eq!(wire.len(), cosmo_frame::HEADER_SIZE + data.len());
        assert_eq!(&wire[3..7], &(data.len() as u32).to_be_bytes());
    }

    #[test]
    fn recv_decodes_host_messages() {
        let mut wire = BytesMut::new();
        encode_message(&Message::response(0, "value"), 1, &mut wire).unwrap();
        encode_message(&Message::log(2, "note"), 0, &mut wire).unwrap();

        let mut s = Session::from_parts(
            FrameReader::new(Cursor::new(wire.to_vec())),
            FrameWriter::new(std::io::sink()),
            "test",
            1,
        );

        assert_eq!(s.recv().unwrap(), Frame::new(1, Message::response(0, "value")));
        assert_eq!(s.recv().unwrap(), Frame::new(0, Message::log(2, "note")));
        assert!(s.recv().unwrap_err().is_connection());
    }

    #[test]
    fn recv_reports_protocol_errors() {
        let mut s = Session::from_parts(
            FrameReader::new(Cursor::new(vec![0x42, 0, 0, 0, 0, 0, 0])),
            FrameWriter::new(std::io::sink()),
            "test",
            1,
        );
        assert!(matches!(
            s.recv().unwrap_err(),
            ClientError::Protocol(FrameError::UnknownTag(0x42))
        ));
    }
}
