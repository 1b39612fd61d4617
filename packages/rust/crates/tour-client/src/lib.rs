//! Tour planner client: backend calls weighted by the scorer settings store.
//!
//! Logging: set `RUST_LOG=tour_client=debug` to see request logs on stderr.

mod api;
mod settings;

pub use api::{
    ClientError, DEFAULT_API_URL, DEFAULT_RADIUS_M, DEFAULT_ROUTER, DEFAULT_ROUTER_URL,
    HealthStatus, PoiQuery, TourApiClient, TourRequest,
};
pub use settings::{
    ApiSettings, RuntimeSettings, ScorerSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};
