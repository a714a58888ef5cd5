use std::time::Duration;

use cosmo_frame::FrameConfig;

/// Protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u16 = 0;

/// Environment variable consulted when no port is given.
pub const PORT_ENV: &str = "SCIFFI_PORT";

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Errors resolving a [`ClientConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No port was given and the environment variable is unset.
    #[error("no port given and {var} is not set")]
    MissingPort { var: &'static str },

    /// The environment variable does not hold a valid TCP port.
    #[error("{var}={value:?} is not a valid port")]
    InvalidPort { var: &'static str, value: String },
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote TCP port.
    pub port: u16,
    /// Version sent in the handshake payload.
    pub protocol_version: u16,
    /// Bound on connection establishment. `None` waits for the OS default.
    pub connect_timeout: Option<Duration>,
    /// Frame reader/writer limits and stream timeouts.
    pub frame: FrameConfig,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol_version: PROTOCOL_VERSION,
            connect_timeout: None,
            frame: FrameConfig::default(),
        }
    }

    /// Resolve host and port, falling back to [`DEFAULT_HOST`] and the
    /// [`PORT_ENV`] environment variable.
    pub fn resolve(host: Option<&str>, port: Option<u16>) -> Result<Self, ConfigError> {
        Self::resolve_with(host, port, |name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::resolve`] with an explicit variable lookup.
    ///
    /// A port of 0 counts as absent.
    pub fn resolve_with<F>(
        host: Option<&str>,
        port: Option<u16>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let port = match port.filter(|p| *p != 0) {
            Some(port) => port,
            None => {
                let value = lookup(PORT_ENV).ok_or(ConfigError::MissingPort { var: PORT_ENV })?;
                let parsed = value.trim().parse::<u16>().ok().filter(|p| *p != 0);
                parsed.ok_or(ConfigError::InvalidPort {
                    var: PORT_ENV,
                    value,
                })?
            }
        };
        Ok(Self::new(host.unwrap_or(DEFAULT_HOST), port))
    }

    pub fn with_protocol_version(mut self, version: u16) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// `host:port` for diagnostics.
    pub fn addr(&self) -> String {
        cosmo_transport::display_addr(&self.host, self.port)
    }
}
