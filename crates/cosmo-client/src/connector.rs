use cosmo_frame::{FrameReader, FrameWriter};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::Session;

/// Connect to a cosmo host and perform the handshake.
pub fn connect(host: &str, port: u16) -> Result<Session> {
    connect_with_config(&ClientConfig::new(host, port))
}

/// Connect with explicit configuration.
///
/// Fails with [`ClientError::Connection`] if the transport cannot be
/// established. No retry is attempted.
pub fn connect_with_config(config: &ClientConfig) -> Result<Session> {
    let stream = match config.connect_timeout {
        Some(timeout) => cosmo_transport::connect_timeout(&config.host, config.port, timeout)?,
        None => cosmo_transport::connect(&config.host, config.port)?,
    };
    stream.set_nodelay(true)?;
    let reader_stream = stream.try_clone()?;

    let reader = FrameReader::with_config_stream(reader_stream, config.frame.clone())
        .map_err(ClientError::from_recv)?;
    let writer = FrameWriter::with_config_stream(stream, config.frame.clone())
        .map_err(ClientError::from_send)?;

    let mut session = Session::from_parts(reader, writer, config.host.clone(), config.port);
    if let Err(err) = session.handshake(config.protocol_version) {
        // Never entered, so no Close is owed.
        session.abandon();
        return Err(err);
    }

    info!(
        addr = %config.addr(),
        version = config.protocol_version,
        "cosmo session established"
    );
    Ok(session)
}

/// Run `body` inside a session scope.
///
/// Connects and handshakes before `body` runs and sends `Close` on every
/// exit path. If `body` fails, the close is best-effort: a close failure is
/// logged and the body's error is returned. A panic in `body` is covered by
/// the session's `Drop`.
pub fn with_session<T, E, F>(config: &ClientConfig, body: F) -> std::result::Result<T, E>
where
    F: FnOnce(&mut Session) -> std::result::Result<T, E>,
    E: From<ClientError>,
{
    let mut session = connect_with_config(config)?;
    match body(&mut session) {
        Ok(value) => {
            session.close()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(close_err) = session.close() {
                warn!(addr = %config.addr(), error = %close_err, "close after failed scope");
            }
            Err(err)
        }
    }
}
