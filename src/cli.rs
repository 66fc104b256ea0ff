//! CLI definitions for tapi.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tapi - Render Twitter API tweets as linked HTML
#[derive(Parser, Debug)]
#[command(name = "tapi")]
#[command(version)]
#[command(about = "Render Twitter API tweets with linked hashtags, mentions, URLs and media")]
#[command(long_about = r#"
tapi reads tweet objects as returned by the Twitter REST API (v1.1) and
renders their text with every entity turned into a link.

Input is a JSON file containing one tweet object, an array of tweets, or a
search response with a "statuses" array. Use "-" to read from stdin.

Examples:
  tapi render tweet.json
  tapi render --format json timeline.json
  curl ... | tapi loop -
  tapi age "Wed Jun 05 14:03:11 +0000 2024"
"#)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// More logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Be quiet (errors only)
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file to use instead of the user config
    #[arg(long, env = "TAPI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render tweet text with entities linked
    Render(RenderArgs),

    /// Walk a list of tweets the way a theme loop would
    Loop(LoopArgs),

    /// Print the short timeline age of a Twitter date
    Age(AgeArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON file with a tweet or a list of tweets ("-" for stdin)
    pub input: PathBuf,

    /// Print the text as received instead of rendering it
    #[arg(long)]
    pub raw: bool,

    /// Link bare t.co URLs instead of using entities
    #[arg(long, conflicts_with = "raw")]
    pub linkify: bool,
}

#[derive(Args, Debug)]
pub struct LoopArgs {
    /// JSON file with a list of tweets ("-" for stdin)
    pub input: PathBuf,

    /// Wrap text at this width
    #[arg(long, short = 'w', default_value = "78")]
    pub width: usize,

    /// Stop after this many tweets
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AgeArgs {
    /// Date in Twitter's format, e.g. "Wed Jun 05 14:03:11 +0000 2024"
    pub created_at: String,

    /// Print the long relative form ("3 days ago")
    #[arg(long, short = 'r')]
    pub relative: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the effective configuration
    #[arg(long)]
    pub show: bool,

    /// Print the user config file path
    #[arg(long)]
    pub path: bool,

    /// Write a default config file if none exists
    #[arg(long)]
    pub init: bool,

    /// Print a single value by key, e.g. render.base_url
    #[arg(long)]
    pub get: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    /// Parse the `output.format` config value, falling back to text.
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or_default()
    }
}
