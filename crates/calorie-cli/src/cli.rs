//! CLI definition using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use calorie_types::{OutputFormat, Provider};

#[derive(Parser)]
#[command(name = "calorie-log")]
#[command(author = "yuuji")]
#[command(version)]
#[command(about = "Food photo calorie logging with a configurable day reset")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a food photo and log it as one serving
    Analyze {
        /// Path to image file
        image: PathBuf,

        /// Only print the estimate, do not log an entry
        #[arg(long)]
        dry_run: bool,
    },

    /// Log an entry by hand
    Add {
        description: String,

        /// Calories for one serving
        calories: u32,

        /// Photo to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// List today's entries, newest first
    List,

    /// Show today's totals against the target
    Status,

    /// Delete an entry
    Delete { id: Uuid },

    /// Change the serving count by DELTA (never below 1)
    Servings {
        id: Uuid,

        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Edit calories per serving and/or servings
    Edit {
        id: Uuid,

        #[arg(long)]
        calories: Option<u32>,

        /// Values below 1 are ignored
        #[arg(long)]
        servings: Option<u32>,
    },

    /// Remove the stored photo from an entry
    StripImage { id: Uuid },

    /// Show or update user settings
    Settings {
        /// Daily calorie target
        #[arg(long, allow_negative_numbers = true)]
        target: Option<i64>,

        /// Hour (0-23) at which the day rolls over
        #[arg(long)]
        reset_hour: Option<u32>,

        #[arg(long, value_enum)]
        provider: Option<Provider>,

        #[arg(long)]
        api_key: Option<String>,

        /// Print settings (default when nothing is changed)
        #[arg(long)]
        show: bool,
    },

    /// Send a sample meal photo to check the configured provider and key
    TestApi {
        /// Provider to test instead of the configured one
        #[arg(long, value_enum)]
        provider: Option<Provider>,
    },

    /// Handle an app link such as countingworms://camera
    Open {
        url: String,

        /// Photo to feed into the capture flow
        #[arg(long)]
        image: PathBuf,
    },

    /// Print the snapshot shared with the display widget
    Snapshot {
        /// Recompute and publish before printing
        #[arg(long)]
        publish: bool,
    },

    /// Manage configuration
    Config {
        /// Show current config
        #[arg(long)]
        show: bool,

        /// Set a value (KEY=VALUE), may be repeated
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}
