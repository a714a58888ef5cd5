use std::time::Duration;

use clap::{Args, Subcommand};
use cosmo_client::ClientConfig;
use cosmo_frame::Message;

use crate::exit::{config_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod send;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write text to the host's output stream.
    Write(WriteArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Print the wire encoding of a message without connecting.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Write(args) => write::run(args, connect, format),
        Command::Send(args) => send::run(args, connect, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection options shared by every subcommand that talks to a host.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Host to connect to. Default: 127.0.0.1.
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// Port to connect to. Falls back to the SCIFFI_PORT environment variable.
    #[arg(long, short = 'p', global = true)]
    pub port: Option<u16>,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub connect_timeout: String,
}

impl ConnectArgs {
    pub fn to_config(&self) -> CliResult<ClientConfig> {
        let timeout = parse_duration(&self.connect_timeout)?;
        let config =
            ClientConfig::resolve(self.host.as_deref(), self.port).map_err(config_error)?;
        Ok(config.with_connect_timeout(timeout))
    }
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Text to write; each argument is sent as its own message.
    #[arg(conflicts_with = "stdin")]
    pub data: Vec<String>,
    /// Read lines from stdin and write each one.
    #[arg(long)]
    pub stdin: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Wait for one reply message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    #[command(subcommand)]
    pub message: MessageArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message id. Default: 0 for handshake, 1 otherwise.
    #[arg(long)]
    pub id: Option<u16>,
    #[command(subcommand)]
    pub message: MessageArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// A message given on the command line.
#[derive(Subcommand, Debug, Clone)]
pub enum MessageArgs {
    /// Protocol version announcement.
    Handshake {
        #[arg(long, default_value = "0")]
        version: u16,
    },
    /// Status code plus text.
    Response {
        #[arg(long, default_value = "0")]
        code: u8,
        data: String,
    },
    /// Request a register value.
    GetRegister {
        /// Register type byte.
        #[arg(long = "type", short = 't', default_value = "0")]
        register_type: u8,
        name: String,
    },
    /// Store a register value.
    PutRegister {
        /// Register type byte.
        #[arg(long = "type", short = 't', default_value = "0")]
        register_type: u8,
        name: String,
        data: String,
    },
    /// Text for the host's output stream.
    Write { data: String },
    /// Leveled log line.
    Log {
        #[arg(long, default_value = "0")]
        level: u8,
        message: String,
    },
    /// End-of-session marker.
    Close,
}

impl MessageArgs {
    pub fn into_message(self) -> Message {
        match self {
            MessageArgs::Handshake { version } => Message::handshake(version),
            MessageArgs::Response { code, data } => Message::response(code, data),
            MessageArgs::GetRegister {
                register_type,
                name,
            } => Message::get_register(register_type, name),
            MessageArgs::PutRegister {
                register_type,
                name,
                data,
            } => Message::put_register(register_type, name, data),
            MessageArgs::Write { data } => Message::write(data),
            MessageArgs::Log { level, message } => Message::log(level, message),
            MessageArgs::Close => Message::Close,
        }
    }
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use cosmo_frame::MessageKind;

    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("bad").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("  ").unwrap_err().code, USAGE);
    }

    #[test]
    fn message_args_map_to_their_kind() {
        let cases = [
            (MessageArgs::Handshake { version: 0 }, MessageKind::Handshake),
            (
                MessageArgs::Response {
                    code: 0,
                    data: "ok".into(),
                },
                MessageKind::Response,
            ),
            (
                MessageArgs::GetRegister {
                    register_type: 1,
                    name: "x".into(),
                },
                MessageKind::GetRegister,
            ),
            (
                MessageArgs::PutRegister {
                    register_type: 1,
                    name: "x".into(),
                    data: "y".into(),
                },
                MessageKind::PutRegister,
            ),
            (MessageArgs::Write { data: "hi".into() }, MessageKind::Write),
            (
                MessageArgs::Log {
                    level: 2,
                    message: "m".into(),
                },
                MessageKind::Log,
            ),
            (MessageArgs::Close, MessageKind::Close),
        ];

        for (args, kind) in cases {
            assert_eq!(args.into_message().kind(), kind);
        }
    }

    #[test]
    fn put_register_args_keep_fields() {
        let message = MessageArgs::PutRegister {
            register_type: 1,
            name: "x".into(),
            data: "y".into(),
        }
        .into_message();
        assert_eq!(message, Message::put_register(1, "x", "y"));
    }

    #[test]
    fn explicit_port_skips_environment() {
        let args = ConnectArgs {
            host: Some("10.0.0.2".into()),
            port: Some(4000),
            connect_timeout: "250ms".into(),
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 4000);
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn bad_connect_timeout_is_usage() {
        let args = ConnectArgs {
            host: None,
            port: Some(4000),
            connect_timeout: "soon".into(),
        };
        assert_eq!(args.to_config().unwrap_err().code, USAGE);
    }
}
