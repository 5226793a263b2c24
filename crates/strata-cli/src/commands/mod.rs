//! Command-line surface and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

pub mod completions;
pub mod init;
pub mod log;
pub mod onto;
pub mod rebase;
pub mod rename;
pub mod restack;
pub mod stack;
pub mod track;
pub mod utils;

/// Stacked branches on top of git.
#[derive(Debug, Parser)]
#[command(name = "strata", version, about, propagate_version = true)]
pub struct Cli {
    /// Verbosity level (repeat for more detail, up to -vvvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors and essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize strata in the current repository.
    Init {
        /// Trunk branch. Defaults to the current branch.
        #[arg(long)]
        trunk: Option<String>,

        /// Remote that branches are pushed to.
        #[arg(long)]
        remote: Option<String>,
    },

    /// Start tracking a branch.
    Track {
        /// Branch to track. Defaults to the current branch.
        branch: Option<String>,

        /// Base branch. Guessed from history when omitted.
        #[arg(long, short)]
        base: Option<String>,

        /// Also track untracked branches found below the branch.
        #[arg(long, conflicts_with = "base")]
        downstack: bool,

        /// Never prompt; fail if a base is ambiguous.
        #[arg(long)]
        no_prompt: bool,
    },

    /// Stop tracking a branch. The git branch is kept.
    Untrack {
        /// Branch to forget.
        branch: String,
    },

    /// Rebase a branch onto the latest commit of its base.
    Restack {
        /// Branch to restack. Defaults to the current branch.
        branch: Option<String>,

        /// Restack the branch and everything above it.
        #[arg(long)]
        upstack: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Move a branch onto a different base, leaving its upstack in place.
    Onto {
        /// New base branch.
        onto: String,

        /// Branch to move. Defaults to the current branch.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Rename a tracked branch.
    Rename {
        /// `[OLD] NEW`; renames the current branch when OLD is omitted.
        #[arg(num_args = 1..=2, required = true, value_names = ["OLD", "NEW"])]
        names: Vec<String>,
    },

    /// Show tracked branches, or the history of state changes.
    Log {
        /// Show the state change history instead of the branch tree.
        #[arg(long)]
        history: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Operate on the stack of the current branch.
    Stack {
        #[command(subcommand)]
        command: StackCommands,
    },

    /// Continue an operation interrupted by a rebase conflict.
    Continue,

    /// Abort an interrupted rebase and drop queued operations.
    Abort,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum StackCommands {
    /// Reorder the branches of a linear stack in an editor.
    Edit {
        /// Editor to use. Defaults to $GIT_EDITOR, $VISUAL or $EDITOR.
        #[arg(long)]
        editor: Option<String>,
    },
}

/// Run a parsed command.
pub fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { trunk, remote } => init::run(trunk.as_deref(), remote.as_deref()),
        Commands::Track {
            branch,
            base,
            downstack,
            no_prompt,
        } => track::run(&track::TrackOptions {
            branch: branch.as_deref(),
            base: base.as_deref(),
            downstack,
            no_prompt,
        }),
        Commands::Untrack { branch } => track::run_untrack(&branch),
        Commands::Restack {
            branch,
            upstack,
            json,
        } => restack::run(branch.as_deref(), upstack, json),
        Commands::Onto { onto, branch } => onto::run(&onto, branch.as_deref()),
        Commands::Rename { names } => match names.as_slice() {
            [new] => rename::run(None, new),
            [old, new] => rename::run(Some(old.as_str()), new),
            _ => anyhow::bail!("expected `rename [OLD] NEW`"),
        },
        Commands::Log { history, json } => log::run(history, json),
        Commands::Stack {
            command: StackCommands::Edit { editor },
        } => stack::run_edit(editor.as_deref()),
        Commands::Continue => rebase::run_continue(),
        Commands::Abort => rebase::run_abort(),
        Commands::Completions { shell } => completions::run(shell),
    }
}
