//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of the search path
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// repofile - manage a single file in an Azure DevOps git repository
#[derive(Parser, Debug)]
#[command(name = "repofile")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Push a declared file to its branch
    #[command(
        long_about = "Push a declared file to its branch.\n\n\
            Fails if the branch does not exist, or if the file already exists \
            and overwrite_on_create is not set. Concurrent writes to the branch \
            are retried until the push lands or the create timeout expires.",
        after_help = "\
EXAMPLES:
    # state.json holds repository_id, file, content and optionally branch/comment
    repofile create --state state.json"
    )]
    Create {
        /// JSON state file, rewritten on success
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },

    /// Refresh state from the repository
    #[command(
        long_about = "Refresh state from the repository.\n\n\
            If the file has been removed out of band, the stored id is cleared \
            and the command succeeds."
    )]
    Read {
        /// JSON state file, rewritten on success
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },

    /// Push new content for an existing file
    #[command(
        long_about = "Push new content for an existing file.\n\n\
            Without --desired, the content and comment in the state file are \
            pushed. With --desired, they are taken from that file instead; a \
            desired file naming another repository, path or branch is refused, \
            since that needs a delete and a create.",
        after_help = "\
EXAMPLES:
    repofile update --state state.json --desired next.json"
    )]
    Update {
        /// JSON state file, rewritten on success
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Declaration to move to; defaults to the state file itself
        #[arg(long, value_name = "FILE")]
        desired: Option<PathBuf>,
    },

    /// Delete the file from its branch
    Delete {
        /// JSON state file, rewritten on success
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },

    /// Adopt an existing file
    #[command(after_help = "\
EXAMPLES:
    # Default branch (from config, else refs/heads/master)
    repofile import my-repo/docs/README.md

    # Explicit branch
    repofile import my-repo/docs/README.md:refs/heads/feature --state state.json")]
    Import {
        /// `<repository>/<path>[:<branch>]`
        id: String,

        /// Write the imported state to this file
        #[arg(long, value_name = "FILE")]
        state: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
