use clap::Parser;
use echoline::core::config::{self, CliOverrides};
use echoline::pipeline::{self, PipelineSettings, StopReason};
use echoline::terminal::{ByteSource, KeySource, ModeGuard, NoopTerminal, RawTerminal};
use echoline::{Display, OverflowPolicy};
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "echoline",
    about = "Echo keystrokes immediately while translating completed lines",
    after_help = "Markers: E ends a line, T stops, Ctrl-K aborts. \
                  In a line, a becomes z, X erases one character, K erases the line."
)]
struct Args {
    /// Config file (defaults to ~/.echoline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bytes per line frame
    #[arg(long)]
    frame_capacity: Option<usize>,

    /// What to do with lines longer than a frame
    #[arg(long, value_enum)]
    overflow: Option<OverflowPolicy>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not switch the terminal into raw mode; read stdin as plain bytes
    #[arg(long)]
    no_raw: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let file_config = match config::load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("echoline: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cli = CliOverrides {
        frame_capacity: args.frame_capacity,
        overflow: args.overflow,
        log_file: args.log_file.clone(),
    };
    let resolved = match config::resolve(&file_config, &cli) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("echoline: {e}");
            return ExitCode::FAILURE;
        }
    };

    // File logger: stdout is the display
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }

    let interactive = !args.no_raw && io::stdin().is_terminal();
    log::info!(
        "echoline starting ({} input)",
        if interactive { "raw terminal" } else { "byte stream" }
    );

    let terminal = if interactive {
        ModeGuard::enter(RawTerminal)
    } else {
        ModeGuard::enter(NoopTerminal)
    };
    let terminal = match terminal {
        Ok(t) => t,
        Err(e) => {
            eprintln!("echoline: cannot switch terminal mode: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = PipelineSettings::from(&resolved);
    let display = Display::new(io::stdout());
    let result = if interactive {
        pipeline::run(settings, KeySource::new(), display, terminal).await
    } else {
        pipeline::run(settings, ByteSource::new(io::stdin()), display, terminal).await
    };

    match result {
        Ok(shutdown) => {
            // Piped input: let pending echo and lines reach the display
            if shutdown.reason == StopReason::InputClosed {
                if let Some(detached) = shutdown.detached {
                    detached.drain().await;
                }
            }
            log::info!("echoline exiting after {:?}", shutdown.reason);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("echoline: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_raw_flag() {
        let args = Args::try_parse_from(["echoline", "--no-raw"]).unwrap();
        assert!(args.no_raw);
        let args = Args::try_parse_from(["echoline"]).unwrap();
        assert!(!args.no_raw);
    }

    #[test]
    fn test_overflow_flag_parses_policy() {
        let args = Args::try_parse_from(["echoline", "--overflow", "reject"]).unwrap();
        assert_eq!(args.overflow, Some(OverflowPolicy::Reject));
        assert!(Args::try_parse_from(["echoline", "--raw"]).is_err());
    }
}
