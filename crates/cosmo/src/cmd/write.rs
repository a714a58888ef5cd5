use std::io::BufRead;

use cosmo_client::{with_session, ClientError};
use cosmo_frame::MessageKind;

use crate::cmd::{ConnectArgs, WriteArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: WriteArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let lines = resolve_lines(&args)?;
    let config = connect.to_config()?;

    let ids = with_session(&config, |session| {
        lines
            .iter()
            .map(|line| session.write(line))
            .collect::<Result<Vec<u16>, ClientError>>()
    })
    .map_err(|err| client_error("write failed", err))?;

    print_sent(&config.addr(), MessageKind::Write, &ids, format);
    Ok(SUCCESS)
}

fn resolve_lines(args: &WriteArgs) -> CliResult<Vec<String>> {
    if args.stdin {
        return std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| io_error("failed reading stdin", err));
    }
    if args.data.is_empty() {
        return Err(CliError::new(USAGE, "nothing to write: pass DATA or --stdin"));
    }
    Ok(args.data.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_args_are_usage_error() {
        let args = WriteArgs {
            data: Vec::new(),
            stdin: false,
        };
        assert_eq!(resolve_lines(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn data_args_are_sent_in_order() {
        let args = WriteArgs {
            data: vec!["a".into(), "b".into()],
            stdin: false,
        };
        assert_eq!(resolve_lines(&args).unwrap(), vec!["a", "b"]);
    }
}
