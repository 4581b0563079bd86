//! CLI interface for the facility client

pub mod commands;
mod output;

pub use output::*;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::auth::UserRole;
use crate::facilities::TankStatus;

#[derive(Parser)]
#[command(name = "facility")]
#[command(author = "Krakaw")]
#[command(version)]
#[command(about = "Manage locations, tanks and permits from the command line", long_about = None)]
pub struct Cli {
    /// Path to facility.toml (searched upward from the current directory by default)
    #[arg(short, long, global = true, env = "FACILITY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a facility.toml with default settings
    Init,

    /// Log in and store the session
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "FACILITY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and remove the stored session
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Fetch the profile from the server instead of the cached copy
        #[arg(short, long)]
        refresh: bool,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Check whether the logged-in user holds a permission code
    Can {
        /// Permission code, e.g. facilities.change_tank
        code: String,
    },

    /// Edit your own profile
    Profile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        organization: Option<String>,
    },

    /// Change or reset a password
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },

    /// Manage locations
    Locations {
        #[command(subcommand)]
        action: LocationAction,
    },

    /// Manage tanks
    Tanks {
        #[command(subcommand)]
        action: TankAction,
    },

    /// Manage permits
    Permits {
        #[command(subcommand)]
        action: PermitAction,
    },

    /// Manage user accounts
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Inspect and assign permissions
    Permissions {
        #[command(subcommand)]
        action: PermissionAction,
    },
}

#[derive(Subcommand)]
pub enum PasswordAction {
    /// Change the logged-in user's password
    Change,

    /// Email a password reset link
    Reset {
        email: String,
    },

    /// Set a new password with the uid and token from the reset email
    Confirm {
        uid: String,
        token: String,
    },
}

#[derive(Subcommand)]
pub enum LocationAction {
    /// List all locations
    List {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one location
    Get {
        id: i64,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Create a location
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long, default_value = "")]
        city: String,

        #[arg(long, default_value = "")]
        state: String,

        #[arg(long, default_value = "")]
        zip: String,

        #[arg(long)]
        latitude: Option<f64>,

        #[arg(long)]
        longitude: Option<f64>,
    },

    /// Update fields of a location
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        zip: Option<String>,

        /// true or false
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a location
    Delete {
        id: i64,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum TankAction {
    /// List tanks
    List {
        /// Only tanks at this location
        #[arg(short, long)]
        location: Option<i64>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one tank
    Get {
        id: i64,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Register a tank at a location
    Create {
        #[arg(short, long)]
        location: i64,

        #[arg(long)]
        number: String,

        #[arg(long)]
        product: String,

        /// Capacity in gallons
        #[arg(long)]
        capacity: f64,

        #[arg(long, default_value = "")]
        material: String,

        /// Installation date (YYYY-MM-DD)
        #[arg(long)]
        installed: Option<NaiveDate>,

        #[arg(long)]
        status: Option<TankStatus>,
    },

    /// Update fields of a tank
    Update {
        id: i64,

        #[arg(short, long)]
        location: Option<i64>,

        #[arg(long)]
        number: Option<String>,

        #[arg(long)]
        product: Option<String>,

        #[arg(long)]
        capacity: Option<f64>,

        #[arg(long)]
        material: Option<String>,

        #[arg(long)]
        status: Option<TankStatus>,
    },

    /// Delete a tank
    Delete {
        id: i64,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum PermitAction {
    /// List permits
    List {
        /// Only permits held by this location
        #[arg(short, long)]
        location: Option<i64>,

        /// Only permits expiring within this many days
        #[arg(short, long)]
        expiring: Option<i64>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one permit
    Get {
        id: i64,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Record a permit for a location
    Create {
        #[arg(short, long)]
        location: i64,

        #[arg(long)]
        number: String,

        #[arg(long = "type")]
        permit_type: String,

        #[arg(long, default_value = "")]
        authority: String,

        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        issued: Option<NaiveDate>,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<NaiveDate>,
    },

    /// Update fields of a permit
    Update {
        id: i64,

        #[arg(long)]
        number: Option<String>,

        #[arg(long = "type")]
        permit_type: Option<String>,

        #[arg(long)]
        authority: Option<String>,

        #[arg(long)]
        issued: Option<NaiveDate>,

        #[arg(long)]
        expires: Option<NaiveDate>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a permit
    Delete {
        id: i64,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// List user accounts
    List {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one user
    Get {
        id: i64,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Create an account (the password is prompted)
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        #[arg(long, default_value = "viewer")]
        role: UserRole,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long)]
        organization: Option<String>,
    },

    /// Update an account
    Update {
        id: i64,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        role: Option<UserRole>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        organization: Option<String>,

        /// true or false
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete an account
    Delete {
        id: i64,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum PermissionAction {
    /// List every permission code
    List {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the permissions held by a user
    User {
        id: i64,
    },

    /// Grant a permission code to a user
    Grant {
        user_id: i64,
        code: String,
    },

    /// Revoke a permission code from a user
    Revoke {
        user_id: i64,
        code: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
