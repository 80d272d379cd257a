//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "imago",
    version,
    about = "Image search over detected objects and caption embeddings",
    long_about = "Imago answers free-text prompts and reverse-image queries over an indexed \
                  image corpus by combining an inverted object-label index with caption \
                  embedding similarity ranking."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/imago/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the corpus with a text prompt
    Query {
        /// Free-text search prompt
        prompt: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find images sharing detected objects with an uploaded image
    Reverse {
        /// Path to the query image (png/jpg/jpeg)
        image: PathBuf,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Detector confidence threshold override
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show how a free-text token maps onto the label vocabulary
    Resolve {
        /// Token to resolve
        token: String,

        /// Number of similar labels to show when no exact match exists
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Index maintenance
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Rewrite index paths after the corpus directory has moved
    FixPaths {
        /// Old corpus root to strip
        #[arg(long)]
        from: PathBuf,

        /// New corpus root to prepend
        #[arg(long)]
        to: PathBuf,
    },

    /// Show label and image counts for the loaded indexes
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
