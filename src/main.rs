//! Purpose: `readrespond` CLI entry point.
//! Role: Binary crate root; parses args and runs the demo server or a one-shot stdin decode.
//! Invariants: Command output on stdout is a JSON envelope; failures go to stderr as envelopes.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use serde_json::Value;

mod serve;

use readrespond::api::{
    Codec, CodecConfig, Envelope, Error, ErrorKind, ResponseRecorder, to_exit_code,
};

const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "readrespond",
    version,
    about = "Strict single-object JSON decoding and JSON envelope responses"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Serve the demo JSON endpoints over HTTP (loopback by default)",
        after_help = r#"EXAMPLES
  $ readrespond serve
  $ readrespond serve --bind 127.0.0.1:9780 --max-body-bytes 4096
  $ curl -s -d '{"name":"ada"}' http://127.0.0.1:9780/v0/echo"#
    )]
    Serve(ServeArgs),
    #[command(
        about = "Decode one JSON value from stdin and print it wrapped in an envelope",
        after_help = r#"EXAMPLES
  $ echo '{"a":1}' | readrespond decode
  $ readrespond decode --max-body-bytes 64 < body.json"#
    )]
    Decode(DecodeArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:9780", help = "Bind address")]
    bind: String,
    #[arg(long, help = "Allow non-loopback binds")]
    allow_non_loopback: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        help = "Max request body size in bytes"
    )]
    max_body_bytes: u64,
}

#[derive(Args)]
struct DecodeArgs {
    #[arg(long, help = "Max body size in bytes (0 = unlimited)")]
    max_body_bytes: Option<u64>,
}

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                return Ok(0);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage).with_message(clap_error_summary(&err)));
            }
        },
    };

    match cli.command {
        Command::Serve(args) => {
            let config = serve_config_from_args(args)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(0)
        }
        Command::Decode(args) => decode_stdin(args),
    }
}

fn serve_config_from_args(args: ServeArgs) -> Result<serve::ServeConfig, Error> {
    let bind: SocketAddr = args.bind.parse().map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid --bind address: {}", args.bind))
            .with_source(err)
    })?;
    Ok(serve::ServeConfig {
        bind,
        allow_non_loopback: args.allow_non_loopback,
        max_body_bytes: args.max_body_bytes,
    })
}

fn decode_stdin(args: DecodeArgs) -> Result<i32, Error> {
    let mut config = CodecConfig::default();
    if let Some(limit) = args.max_body_bytes {
        config = config.with_max_body_bytes(limit);
    }
    let codec = Codec::new(config);

    let mut response = ResponseRecorder::new();
    let value: Value = codec.read_json(&mut response, io::stdin().lock())?;
    codec.write_json(
        &mut response,
        axum::http::StatusCode::OK,
        &Envelope::success(value),
        None,
    )?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(response.body()).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write stdout")
            .with_source(err)
    })?;
    Ok(0)
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        return;
    }

    let envelope: Envelope<()> = Envelope::failure(err.to_string());
    let json = serde_json::to_string(&envelope).unwrap_or_else(|_| {
        "{\"error\":true,\"message\":\"json encode failed\"}".to_string()
    });
    eprintln!("{json}");
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, ServeArgs, serve_config_from_args};
    use clap::Parser;
    use readrespond::api::ErrorKind;

    #[test]
    fn serve_defaults_are_loopback() {
        let cli = Cli::try_parse_from(["readrespond", "serve"]).expect("parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        let config = serve_config_from_args(args).expect("config");
        assert!(config.bind.ip().is_loopback());
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn bad_bind_is_usage_error() {
        let err = serve_config_from_args(ServeArgs {
            bind: "not-an-address".to_string(),
            allow_non_loopback: false,
            max_body_bytes: 1,
        })
        .err()
        .expect("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn decode_accepts_optional_limit() {
        let cli = Cli::try_parse_from(["readrespond", "decode", "--max-body-bytes", "64"])
            .expect("parse");
        let Command::Decode(args) = cli.command else {
            panic!("expected decode command");
        };
        assert_eq!(args.max_body_bytes, Some(64));
    }
}
