use cosmo_client::{with_session, ClientError};
use cosmo_frame::{Message, MessageKind};

use crate::cmd::{parse_duration, ConnectArgs, SendArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, print_sent, OutputFormat};

pub fn run(args: SendArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let message = sendable(args.message.into_message())?;

    let mut config = connect.to_config()?;
    if args.wait {
        config.frame.read_timeout = Some(wait_timeout);
    }

    let (id, reply) = with_session(&config, |session| {
        let id = session.send(&message)?;
        let reply = if args.wait {
            Some(session.recv()?)
        } else {
            None
        };
        Ok::<_, ClientError>((id, reply))
    })
    .map_err(|err| client_error("send failed", err))?;

    print_sent(&config.addr(), message.kind(), &[id], format);
    if let Some(frame) = reply {
        print_frame(&frame, format);
    }

    Ok(SUCCESS)
}

/// Handshake and close belong to the session lifecycle.
fn sendable(message: Message) -> CliResult<Message> {
    match message.kind() {
        MessageKind::Handshake | MessageKind::Close => Err(CliError::new(
            USAGE,
            format!(
                "{} is sent by the session itself; use encode to inspect it",
                message.kind()
            ),
        )),
        _ => Ok(message),
    }
}
