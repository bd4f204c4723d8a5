//! CLI argument definitions for threads.

use clap::{Parser, Subcommand};

/// Version string with the commit and build time baked in by build.rs.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TH_GIT_COMMIT"),
    ", built ",
    env!("TH_BUILD_TIMESTAMP"),
    ")"
);

/// Package version from Cargo.toml.
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// threads - track threads of work and see them as a tree.
///
/// Start with `th init`, add work with `th thread new`, and look at it
/// with `th tree -H`.
#[derive(Parser, Debug)]
#[command(name = "th")]
#[command(author, version, long_version = LONG_VERSION, about = "Track threads of work and render them as a tree", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if th was started in <path> instead of the current directory.
    /// The path must exist. Bypasses git root detection.
    #[arg(short = 'C', long = "repo", global = true, env = "TH_REPO")]
    pub repo_path: Option<std::path::PathBuf>,

    /// Disable colored tree output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize threads storage for this repository
    Init,

    /// Thread management commands
    Thread {
        #[command(subcommand)]
        command: ThreadCommands,
    },

    /// Container management commands
    Container {
        #[command(subcommand)]
        command: ContainerCommands,
    },

    /// Group management commands
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Record a details snapshot on a thread or container
    Detail {
        /// Thread or container ID
        id: String,

        /// Details text
        content: String,
    },

    /// Remove a thread or container
    Rm {
        /// Thread or container ID
        id: String,
    },

    /// Show threads and containers as a tree, grouped
    Tree {
        /// Only show this group (ID or name)
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Import entity records from a JSON array file
    Import {
        /// Path to the JSON file
        file: std::path::PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show recent entries from the action log
    Log {
        /// Maximum number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

/// Thread subcommands
#[derive(Subcommand, Debug)]
pub enum ThreadCommands {
    /// Create a new thread
    New {
        /// Thread name
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Importance (1-5, higher is more important)
        #[arg(short, long)]
        importance: Option<u8>,

        /// Size (tiny, small, medium, large, huge)
        #[arg(short, long)]
        size: Option<String>,

        /// Status (active, paused, stopped, completed, archived)
        #[arg(long)]
        status: Option<String>,

        /// Parent thread or container ID
        #[arg(short, long)]
        parent: Option<String>,

        /// Group ID or name
        #[arg(short, long)]
        group: Option<String>,

        /// Tags for the thread
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// List threads
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Filter by group ID or name
        #[arg(short, long)]
        group: Option<String>,

        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show a thread with its progress log
    Show {
        /// Thread ID
        id: String,
    },

    /// Update a thread
    Update {
        /// Thread ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New status
        #[arg(long)]
        status: Option<String>,

        /// New importance
        #[arg(long)]
        importance: Option<u8>,

        /// New size
        #[arg(long)]
        size: Option<String>,

        /// New parent thread or container ID
        #[arg(long, conflicts_with = "no_parent")]
        parent: Option<String>,

        /// Make this thread a root
        #[arg(long)]
        no_parent: bool,

        /// New group ID or name
        #[arg(long, conflicts_with = "no_group")]
        group: Option<String>,

        /// Remove this thread from its group
        #[arg(long)]
        no_group: bool,

        /// Add a tag
        #[arg(long)]
        add_tag: Vec<String>,

        /// Remove a tag
        #[arg(long)]
        remove_tag: Vec<String>,
    },

    /// Append a note to a thread's progress log
    Progress {
        /// Thread ID
        id: String,

        /// Progress note
        note: String,
    },
}

/// Container subcommands
#[derive(Subcommand, Debug)]
pub enum ContainerCommands {
    /// Create a new container
    New {
        /// Container name
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Parent thread or container ID
        #[arg(short, long)]
        parent: Option<String>,

        /// Group ID or name
        #[arg(short, long)]
        group: Option<String>,

        /// Tags for the container
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// List containers
    List,
}

/// Group subcommands
#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Create a new group
    New {
        /// Group name
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List groups
    List,

    /// Remove a group (members become ungrouped)
    Rm {
        /// Group ID or name
        id: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved value of a key and where it came from
    Get {
        /// Config key (e.g., default-importance)
        key: String,
    },

    /// Set a key in this repository's config.kdl
    Set {
        /// Config key
        key: String,

        /// New value
        value: String,
    },

    /// List all resolved config values
    List,
}
