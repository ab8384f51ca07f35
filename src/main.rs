use anyhow::Result;
use log::{error, info};

use depthwatch::background::processors::setup::{
    check_detector, initialize_logger, initialize_workspace,
};
use depthwatch::build_rocket;
use depthwatch::common::ROCKET_RUNTIME;
use depthwatch::common::errors::handle_error;
use depthwatch::config::DetectorConfig;

fn main() -> Result<()> {
    initialize_logger();

    let config = DetectorConfig::from_env().map_err(handle_error)?;
    check_detector(&config);
    let workspace = initialize_workspace(&config)
        .map_err(|err| handle_error(anyhow::Error::from(err)))?;

    ROCKET_RUNTIME.block_on(async {
        let rocket_instance = build_rocket(config, workspace).ignite().await?;
        let shutdown_handle = rocket_instance.shutdown();
        ROCKET_RUNTIME.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                shutdown_handle.notify();
            }
        });
        if let Err(e) = rocket_instance.launch().await {
            error!("Rocket server failed: {}", e);
            return Err(anyhow::Error::from(e));
        }
        Ok::<(), anyhow::Error>(())
    })
}
