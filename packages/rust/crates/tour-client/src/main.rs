//! tour CLI: scorer weights, points-of-interest and tour building.
//!
//! Weights persist under `<PRJ_DATA_HOME>/tour` unless `scorer.storage_dir` is set.
//!
//! Logging: set `RUST_LOG=tour_client=debug,tour_scorer=debug` to see logs on stderr.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tour_client::{
    PoiQuery, RuntimeSettings, TourApiClient, TourRequest, load_runtime_settings,
    set_config_home_override,
};
use tour_scorer::ScorerStore;

use crate::cli::{BuildArgs, Cli, Command, WeightsAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "tour_client=debug,tour_scorer=debug"
        } else {
            "tour_client=info,tour_scorer=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = load_runtime_settings();
    let store = ScorerStore::initialize(
        settings.scorer_config(),
        Arc::new(settings.scorer_storage()),
        None,
    );
    let client = TourApiClient::new(settings.api_base_url());

    match cli.command {
        Command::Weights { action } => run_weights(&store, action),
        Command::Health => {
            let status = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::Pois { origin, radius_m } => {
            let query = PoiQuery {
                lat: origin.lat,
                lon: origin.lon,
                radius_m,
                cat_weights: store.weights(),
            };
            let pois = client.load_pois(&query).await?;
            println!("{}", serde_json::to_string_pretty(&pois)?);
            Ok(())
        }
        Command::Build(args) => {
            let request = tour_request(&settings, &store, args);
            let tour = client.build_tour(&request).await?;
            println!("{}", serde_json::to_string_pretty(&tour)?);
            Ok(())
        }
    }
}

fn run_weights(store: &ScorerStore, action: WeightsAction) -> anyhow::Result<()> {
    match action {
        WeightsAction::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.cat_weights_payload())?);
            } else {
                print_weights(store);
            }
        }
        WeightsAction::Set { category, value } => {
            let stored = store.set_weight(&category, value);
            println!("{category} = {stored}");
        }
        WeightsAction::Reset => {
            store.reset();
            print_weights(store);
        }
    }
    Ok(())
}

fn print_weights(store: &ScorerStore) {
    let weights = store.weights();
    let width = weights.keys().map(String::len).max().unwrap_or(0);
    for (category, weight) in &weights {
        let marker = if store.defaults().contains_key(category) {
            ""
        } else {
            "  (unknown category)"
        };
        println!("{category:<width$}  {weight:>5.2}{marker}");
    }
}

fn tour_request(settings: &RuntimeSettings, store: &ScorerStore, args: BuildArgs) -> TourRequest {
    let BuildArgs {
        origin,
        time_min,
        radius_m,
        roundtrip,
        end_lat,
        end_lon,
        router,
        router_url,
        no_snap_path,
    } = args;
    let weights = store.weights();
    let request = if roundtrip {
        TourRequest::round_trip(origin.lat, origin.lon, time_min, radius_m, weights)
    } else {
        let end = end_lat.zip(end_lon);
        TourRequest::one_way(origin.lat, origin.lon, end, time_min, radius_m, weights)
    };
    request
        .with_router(
            router.unwrap_or_else(|| settings.router()),
            router_url.unwrap_or_else(|| settings.router_url()),
        )
        .with_snap_path(!no_snap_path && settings.snap_path())
        .normalized()
}
