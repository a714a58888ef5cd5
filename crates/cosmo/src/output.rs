use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use cosmo_frame::{Frame, Message, MessageKind, HEADER_SIZE};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SentOutput<'a> {
    addr: &'a str,
    kind: &'static str,
    ids: &'a [u16],
}

pub fn print_sent(addr: &str, kind: MessageKind, ids: &[u16], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                addr,
                kind: kind.name(),
                ids,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "KIND", "ADDR"]);
            for id in ids {
                table.add_row(vec![id.to_string(), kind.name().to_string(), addr.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for id in ids {
                println!("sent {} id={} to {}", kind.name(), id, addr);
            }
        }
        OutputFormat::Raw => {
            for id in ids {
                println!("{id}");
            }
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    id: u16,
    kind: &'static str,
    fields: serde_json::Map<String, serde_json::Value>,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let fields = message_fields(&frame.message);
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                id: frame.id,
                kind: frame.message.kind().name(),
                fields: fields
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "KIND", "FIELDS"])
                .add_row(vec![
                    frame.id.to_string(),
                    frame.message.kind().name().to_string(),
                    pretty_fields(&fields),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "received {} id={} {}",
                frame.message.kind().name(),
                frame.id,
                pretty_fields(&fields)
            );
        }
        OutputFormat::Raw => {
            print_raw(message_text(&frame.message).as_bytes());
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    id: u16,
    kind: &'static str,
    size: usize,
    hex: &'a str,
}

pub fn print_encoded(message: &Message, id: u16, bytes: &[u8], format: OutputFormat) {
    let hex = grouped_hex(bytes);
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                id,
                kind: message.kind().name(),
                size: bytes.len(),
                hex: &hex,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "KIND", "SIZE", "BYTES"])
                .add_row(vec![
                    id.to_string(),
                    message.kind().name().to_string(),
                    bytes.len().to_string(),
                    hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(bytes),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Hex with the header split into tag, id and length groups:
/// `05 0001 00000002 6869`.
pub fn grouped_hex(bytes: &[u8]) -> String {
    let mut groups = Vec::with_capacity(4);
    let (header, payload) = bytes.split_at(bytes.len().min(HEADER_SIZE));
    let (tag, rest) = header.split_at(header.len().min(1));
    let (id, plen) = rest.split_at(rest.len().min(2));
    for group in [tag, id, plen, payload] {
        if !group.is_empty() {
            groups.push(hex(group));
        }
    }
    groups.join(" ")
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn message_fields(message: &Message) -> Vec<(&'static str, serde_json::Value)> {
    use serde_json::Value;

    match message {
        Message::Handshake { version } => vec![("version", Value::from(*version))],
        Message::Response { code, data } => {
            vec![("code", Value::from(*code)), ("data", Value::from(data.as_str()))]
        }
        Message::GetRegister {
            register_type,
            name,
        } => vec![
            ("register_type", Value::from(*register_type)),
            ("name", Value::from(name.as_str())),
        ],
        Message::PutRegister {
            register_type,
            name,
            data,
        } => vec![
            ("register_type", Value::from(*register_type)),
            ("name", Value::from(name.as_str())),
            ("data", Value::from(data.as_str())),
        ],
        Message::Write { data } => vec![("data", Value::from(data.as_str()))],
        Message::Log { level, message } => vec![
            ("level", Value::from(*level)),
            ("message", Value::from(message.as_str())),
        ],
        Message::Close => Vec::new(),
    }
}

fn pretty_fields(fields: &[(&'static str, serde_json::Value)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn message_text(message: &Message) -> &str {
    match message {
        Message::Response { data, .. }
        | Message::PutRegister { data, .. }
        | Message::Write { data } => data,
        Message::GetRegister { name, .. } => name,
        Message::Log { message, .. } => message,
        Message::Handshake { .. } | Message::Close => "",
    }
}
