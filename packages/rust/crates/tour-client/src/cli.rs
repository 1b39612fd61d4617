use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use tour_client::DEFAULT_RADIUS_M;

#[derive(Parser)]
#[command(name = "tour")]
#[command(about = "Tour planner: tune category weights, query points-of-interest, build tours.")]
pub(crate) struct Cli {
    /// Override config directory (holds `tour/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Verbose logging (debug level) unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Inspect or change scorer weights.
    Weights {
        #[command(subcommand)]
        action: WeightsAction,
    },
    /// Check that the backend is up.
    Health,
    /// Load scored points-of-interest around a location.
    Pois {
        #[command(flatten)]
        origin: Origin,

        /// Search radius in meters
        #[arg(long, default_value_t = DEFAULT_RADIUS_M)]
        radius_m: u32,
    },
    /// Build a walking tour.
    Build(BuildArgs),
}

#[derive(Subcommand)]
pub(crate) enum WeightsAction {
    /// Print current weights.
    Show {
        /// Print as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Set one category weight (clamped to the configured bounds).
    Set {
        category: String,
        /// New weight; non-numeric input becomes the minimum weight.
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Restore default weights.
    Reset,
}

#[derive(Args)]
pub(crate) struct Origin {
    /// Start latitude
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) lat: f64,

    /// Start longitude
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) lon: f64,
}

#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub(crate) origin: Origin,

    /// Time budget in minutes
    #[arg(long)]
    pub(crate) time_min: u32,

    /// Search radius in meters
    #[arg(long, default_value_t = DEFAULT_RADIUS_M)]
    pub(crate) radius_m: u32,

    /// Return to the start point (end point is ignored).
    #[arg(long)]
    pub(crate) roundtrip: bool,

    /// End latitude for one-way tours
    #[arg(long, allow_hyphen_values = true, requires = "end_lon")]
    pub(crate) end_lat: Option<f64>,

    /// End longitude for one-way tours
    #[arg(long, allow_hyphen_values = true, requires = "end_lat")]
    pub(crate) end_lon: Option<f64>,

    /// Routing engine (default from settings, else osrm)
    #[arg(long)]
    pub(crate) router: Option<String>,

    /// Routing engine url (default from settings, else http://osrm:5000)
    #[arg(long)]
    pub(crate) router_url: Option<String>,

    /// Do not snap the path to streets.
    #[arg(long)]
    pub(crate) no_snap_path: bool,
}
