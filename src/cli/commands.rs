use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "findex",
    version,
    about = "Live search, delete/rename and file analysis over a native file index",
    after_help = "The index is built by an external indexer and kept current by an external \
                  monitor; `findex interactive` launches both in the background. Searches \
                  match path substrings and return at most 1000 rows."
)]
pub struct Cli {
    /// Application root (holds findex.toml and, by default, file_index.db)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive session: every line typed becomes the new search text.
    ///
    /// Launches the indexer and monitor in the background first. Row
    /// commands: `:open N`, `:del N`, `:ren N NAME`, `:ai N`, `:q`.
    Interactive {
        /// Do not launch the indexer or monitor
        #[arg(long)]
        no_bootstrap: bool,
    },

    /// Search indexed paths by substring (empty matches everything)
    Search {
        /// Search keyword
        #[arg(default_value = "")]
        keyword: String,
    },

    /// Show the index record for one path
    Show {
        /// Absolute path as stored in the index
        path: String,
    },

    /// Delete a file from disk and from the index
    Delete {
        /// Absolute path as stored in the index
        path: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Rename a file within its directory and update the index
    Rename {
        /// Absolute path as stored in the index
        path: String,
        /// New file name (no directory components)
        new_name: String,
    },

    /// Ask the analysis service about one or more files (run concurrently)
    Analyze {
        /// Absolute paths as stored in the index
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Open a file with the system's default application
    Open {
        /// Path to open
        path: String,
    },

    /// Show index statistics
    Stats,

    /// Create an empty index with the indexer's schema
    Init,
}
