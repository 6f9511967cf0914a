//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use kickstart::ToolId;

/// Kickstart - install and upgrade a development toolchain in one command
#[derive(Parser)]
#[command(name = "kickstart")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install every enabled tool in dependency order
    Init(InitArgs),

    /// Install one tool, or all of them with --all
    Install(InstallArgs),

    /// Upgrade one installed tool, or all of them with --all
    Upgrade(UpgradeArgs),

    /// Show which tools are installed
    Status(StatusArgs),

    /// Add ~/.local/bin to PATH in your shell's rc file
    SetupShell(SetupShellArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Flags shared by commands that run installers.
#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// Extra config file, applied on top of ~/.kickstartrc and ./.kickstartrc
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show what would be done without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Ask which tools to enable before installing
    #[arg(short, long)]
    pub interactive: bool,

    /// Reinstall tools that are already installed
    #[arg(short, long)]
    pub force: bool,

    /// Write the resolved configuration to ./.kickstartrc
    #[arg(long)]
    pub save_config: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Tool to install
    #[arg(value_name = "TOOL", conflicts_with = "all")]
    pub tool: Option<ToolId>,

    /// Install every enabled tool
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub run: RunArgs,

    /// Reinstall even if the tool is already installed
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct UpgradeArgs {
    /// Tool to upgrade
    #[arg(value_name = "TOOL", conflicts_with = "all")]
    pub tool: Option<ToolId>,

    /// Upgrade every installed tool
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Extra config file, used for mirror URLs
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print statuses as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SetupShellArgs {
    /// Show what would be added without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
