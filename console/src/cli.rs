//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// birdia - identify birds from their calls
#[derive(Parser, Debug)]
#[command(name = "birdia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (KEY=VALUE)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, overrides API_URL and BIRDIA_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Open species photos with the desktop image viewer
    #[arg(long, global = true)]
    pub open_image: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Parser used for lines typed into the interactive shell.
#[derive(Parser, Debug)]
#[command(name = "birdia", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "BIRDIA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create a researcher account
    Register {
        email: String,

        /// Full name
        #[arg(short, long)]
        name: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user and available commands
    Whoami,

    /// Identify a bird call from a file or the microphone
    Analyze {
        /// Audio file to upload
        #[arg(short, long, conflicts_with = "record")]
        file: Option<PathBuf>,

        /// Record from the microphone
        #[arg(short, long)]
        record: bool,

        /// Stop recording automatically after this many seconds
        #[arg(short, long, requires = "record")]
        seconds: Option<u64>,

        /// Discard the held capture instead of analysing
        #[arg(long, conflicts_with_all = ["file", "record"])]
        clear: bool,
    },

    /// Browse the species catalog
    Catalog {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Your past identifications
    History {
        #[command(subcommand)]
        action: Option<HistoryCommand>,

        /// Filter by species
        #[arg(short, long)]
        search: Option<String>,

        /// Extra pages to show
        #[arg(short, long, default_value = "0")]
        more: usize,
    },

    /// Totals over your history
    Summary,

    /// Sightings with coordinates
    Map {
        /// Filter by species or user
        #[arg(short, long)]
        search: Option<String>,

        /// Fly to a record
        #[arg(long)]
        select: Option<i64>,

        #[arg(short, long, default_value = "0")]
        more: usize,
    },

    /// Your account
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Administration (administrators only)
    #[command(subcommand)]
    Admin(AdminCommand),

    /// Interactive session with idle timeout
    Shell,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// Details of one record
    Show { id: i64 },

    /// Delete a record
    Delete {
        id: i64,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    Show,

    /// Change your display name
    Rename { name: String },

    /// Change your password; you will be signed out
    Password {
        #[arg(long)]
        current: Option<String>,
        #[arg(long)]
        new: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Platform metrics and top species
    Dashboard,

    /// Registered users
    Users {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value = "0")]
        more: usize,
    },

    /// Edit a user; fields not given keep their value
    EditUser {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        /// New password; blank keeps the current one
        #[arg(long, default_value = "")]
        password: String,
    },

    /// Sign-in audit log
    Sessions {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value = "0")]
        more: usize,
    },

    /// Recent backend errors
    Errors,

    /// Identifications by every user
    History {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value = "0")]
        more: usize,
    },
}
