use cosmo_frame::Message;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = args.message.into_message();
    let id = args.id.unwrap_or_else(|| default_id(&message));
    let bytes = message
        .to_bytes(id)
        .map_err(|err| frame_error("encode failed", err))?;

    print_encoded(&message, id, &bytes, format);
    Ok(SUCCESS)
}

fn default_id(message: &Message) -> u16 {
    match message {
        Message::Handshake { .. } => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_defaults_to_id_zero() {
        assert_eq!(default_id(&Message::handshake(0)), 0);
        assert_eq!(default_id(&Message::write("hi")), 1);
        assert_eq!(default_id(&Message::Close), 1);
    }
}
