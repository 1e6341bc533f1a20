//! cococtl - Confidential Containers management CLI
//!
//! Unified management tool for Confidential Containers on Rancher
//! Desktop. Works across macOS (ARM64/Intel), Linux, and Windows (WSL2).
//!
//! ## Usage
//!
//! ```sh
//! cococtl check-prereqs
//! cococtl build [--config-dir <path>]
//! cococtl setup [--config-dir <path>]
//! cococtl validate
//! ```

use cococtl::ops::{self, Context};
use cococtl::ui::OutputStyle;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Debug)]
enum Command {
    CheckPrereqs,
    Build,
    Setup,
    Validate,
    Version,
    Help,
}

#[derive(Debug)]
struct Options {
    command: Command,
    config_dir: PathBuf,
    color: bool,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = std::env::args().collect();

    let mut command = None;
    let mut config_dir = PathBuf::from(".");
    let mut color = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "check-prereqs" => command = Some(Command::CheckPrereqs),
            "build" => command = Some(Command::Build),
            "setup" => command = Some(Command::Setup),
            "validate" => command = Some(Command::Validate),
            "version" | "--version" | "-V" => command = Some(Command::Version),
            "help" | "--help" | "-h" => command = Some(Command::Help),
            "--config-dir" | "-c" => {
                i += 1;
                let dir = args
                    .get(i)
                    .ok_or_else(|| "--config-dir requires a path".to_string())?;
                config_dir = PathBuf::from(dir);
            }
            "--no-color" => color = false,
            unknown => return Err(format!("unknown argument: {}", unknown)),
        }
        i += 1;
    }

    Ok(Options {
        command: command.unwrap_or(Command::Help),
        config_dir,
        color,
    })
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {}", e);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(opts.color)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to set tracing subscriber");
        return ExitCode::FAILURE;
    }

    let style = OutputStyle::new(opts.color);
    let ctx = Context::host(opts.config_dir, style);

    let result = match opts.command {
        Command::CheckPrereqs => ops::check_prereqs(&ctx).await,
        Command::Build => ops::build(&ctx).await,
        Command::Setup => ops::setup(&ctx).await,
        Command::Validate => ops::validate(&ctx).await,
        Command::Version => {
            print_version();
            Ok(())
        }
        Command::Help => {
            print_help();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_version() {
    println!("cococtl version {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!(
        r#"cococtl - Confidential Containers on Rancher Desktop

USAGE:
    cococtl <command> [options]

COMMANDS:
    check-prereqs   Check prerequisites (kubectl, cluster, KVM access)
    build           Build the custom CoCo payload image (multi-arch)
    setup           Install the operator and the CcRuntime resource
    validate        Validate the installation with a test pod
    version         Show version info
    help            Show this help

OPTIONS:
    --config-dir, -c <path>   Infrastructure directory holding config.yaml
                              and containers/coco-payload (default: .)
    --no-color                Disable colored output

EXAMPLES:
    cococtl check-prereqs
    cococtl build -c infrastructure
    cococtl setup -c infrastructure
    cococtl validate
"#
    );
}
