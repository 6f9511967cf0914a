//! Kickstart CLI - bootstrap a development environment

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;
use kickstart::util::diagnostic::emit;
use kickstart::util::errors::exit_code;
use kickstart::util::shell::ColorChoice;
use kickstart::util::{KickstartError, Shell};

fn main() {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over the --verbose default
    let default_filter = if cli.verbose {
        "kickstart=debug"
    } else {
        "kickstart=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let json = matches!(&cli.command, Commands::Status(args) if args.json);
    let shell = Shell::from_flags(cli.quiet, cli.verbose, color, json);

    // First Ctrl-C stops before the next tool, a second one exits immediately
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(exit_code::USER_INTERRUPT);
        }
        eprintln!("\ninterrupt received, finishing the current tool (press Ctrl-C again to abort)");
    }) {
        tracing::debug!("failed to install Ctrl-C handler: {}", e);
    }

    let session = Session { shell, cancel };
    let code = match run(cli.command, &session) {
        Ok(code) => code,
        Err(e) => report_error(&e, &session.shell),
    };

    std::process::exit(code);
}

fn run(command: Commands, session: &Session) -> Result<i32> {
    match command {
        Commands::Init(args) => commands::init::execute(args, session),
        Commands::Install(args) => commands::install::execute(args, session),
        Commands::Upgrade(args) => commands::upgrade::execute(args, session),
        Commands::Status(args) => commands::status::execute(args, session),
        Commands::SetupShell(args) => commands::setup_shell::execute(args, session),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report_error(err: &anyhow::Error, shell: &Shell) -> i32 {
    match err.downcast_ref::<KickstartError>() {
        Some(e) if shell.is_json() => {
            shell.error(e);
            e.exit_code()
        }
        Some(e) => {
            emit(&e.to_diagnostic(), shell.use_color());
            e.exit_code()
        }
        None => {
            eprintln!("error: {:#}", err);
            exit_code::GENERAL_ERROR
        }
    }
}
