use crate::core::report::RangePreset;
use crate::export::ExportFormat;
use crate::models::Actor;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface definition for crewclock
/// Geofence attendance pipeline for construction crews, backed by SQLite
#[derive(Parser)]
#[command(
    name = "crewclock",
    version = env!("CARGO_PKG_VERSION"),
    about = "Geofenced crew attendance: record enter/exit events, backfill history and build compliance reports",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Use another configuration file
    #[arg(global = true, long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who is acting. Authentication happens upstream; the CLI trusts these flags.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    #[arg(long = "actor", help = "Acting user id")]
    pub actor: String,

    #[arg(long = "admin", help = "Act with the elevated (admin) role")]
    pub admin: bool,
}

impl ActorArgs {
    pub fn to_actor(&self, business: Option<&str>) -> Actor {
        let actor = if self.admin {
            Actor::admin(&self.actor)
        } else {
            Actor::member(&self.actor)
        };
        match business {
            Some(b) => actor.with_business(b),
            None => actor,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(long = "editor", help = "Specify the editor to use")]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Import memberships, profiles, projects and shifts from a JSON fixture
    Seed {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Record a single geofence or shift event
    Record {
        #[command(flatten)]
        who: ActorArgs,

        #[arg(long = "business", help = "Currently selected business (request context)")]
        business: Option<String>,

        #[arg(
            long = "type",
            help = "enter, exit, clock_in, clock_out, manager_clock_out or edit"
        )]
        event_type: String,

        #[arg(long = "project")]
        project: String,

        #[arg(long = "employee", help = "Employee the event belongs to (default: the actor)")]
        employee: Option<String>,

        #[arg(long = "shift", help = "Time entry (shift) id")]
        shift: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,

        #[arg(long = "at", help = "Occurred-at timestamp (RFC 3339); default: now")]
        at: Option<String>,

        #[arg(long = "source", help = "mobile, web or system")]
        source: Option<String>,
    },

    /// Find the job site(s) whose geofence contains a position
    Resolve {
        #[command(flatten)]
        who: ActorArgs,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Synthesize enter/exit events for historical shifts without any
    Backfill {
        #[arg(long = "business")]
        business: String,

        #[arg(long = "days", default_value_t = 30, help = "Lookback window in days")]
        days: u32,

        #[arg(
            long = "max-events",
            default_value_t = 3,
            value_parser = clap::value_parser!(u8).range(0..=3),
            help = "Per-shift event cap (0-3)"
        )]
        max_events: u8,

        #[arg(
            long = "dry-run",
            default_value_t = true,
            action = ArgAction::Set,
            help = "Only report what would be inserted (pass --dry-run false to write)"
        )]
        dry_run: bool,

        #[arg(long = "overwrite", help = "Also process shifts that already have events")]
        overwrite: bool,

        #[arg(long = "seed", help = "Seed for the random generator (reproducible runs)")]
        seed: Option<u64>,

        #[arg(long = "exit-probability", default_value_t = 0.8)]
        exit_probability: f64,

        #[arg(long = "reenter-probability", default_value_t = 0.7)]
        reenter_probability: f64,
    },

    /// Hours and geofence compliance report
    Report {
        #[command(flatten)]
        who: ActorArgs,

        #[arg(long = "business")]
        business: String,

        #[arg(long = "range", value_enum, default_value_t = RangePreset::Last7)]
        range: RangePreset,

        #[arg(long = "start", help = "Custom range start (YYYY-MM-DD)")]
        start: Option<String>,

        #[arg(long = "end", help = "Custom range end, inclusive (YYYY-MM-DD)")]
        end: Option<String>,

        #[arg(long = "project")]
        project: Option<String>,

        #[arg(long = "employee")]
        employee: Option<String>,

        #[arg(long = "format", value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        #[arg(long = "file", value_name = "FILE", help = "Write to a file instead of stdout")]
        file: Option<PathBuf>,

        #[arg(long = "force", help = "Overwrite an existing output file without asking")]
        force: bool,
    },

    /// Track the actor's open shift from a recorded position feed
    Track {
        #[command(flatten)]
        who: ActorArgs,

        #[arg(long = "business")]
        business: Option<String>,

        #[arg(long = "replay", value_name = "FILE", help = "Position feed: one 'lat,lng' per line")]
        replay: PathBuf,

        #[arg(long = "server", help = "Post events to a running server instead of the local DB")]
        server: Option<String>,

        #[arg(long = "interval-ms", help = "Override the polling interval")]
        interval_ms: Option<u64>,
    },

    /// Run the HTTP API
    Serve {
        #[arg(long = "bind", help = "Listen address (default from config)")]
        bind: Option<String>,
    },
}

impl Cli {
    /// Config file in effect: `--config` or the standard location.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::config_file)
    }
}
