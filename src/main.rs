use std::sync::Arc;

use haulbid::api::DynAPI;
use haulbid::config::Config;
use haulbid::engine::Engine;
use haulbid::error::Error;
use haulbid::external::{DynFleet, FleetApi, MemoryFleet};
use haulbid::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let fleet: DynFleet = match &config.fleet_api_base {
        Some(base) => {
            tracing::info!("using fleet api at {}", base);
            Arc::new(FleetApi::new(base))
        }
        None => {
            tracing::warn!("FLEET_API_BASE not set, keeping loads in memory");
            Arc::new(MemoryFleet::new())
        }
    };

    let api: DynAPI = Arc::new(Engine::new(fleet)?);

    serve(api, config.addr).await
}
