use std::process::ExitCode;

use live_feed::collector;
use lta_datamall::AvailabilityCollector;
use tokio_util::sync::CancellationToken;
use web::{config::Config, start_web_server, StartupError, WebState};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            log::error!("{}", why);
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    log::debug!("Starting with {:?}", config);
    let state = WebState::from_config(&config)?;
    let shutdown = CancellationToken::new();

    // keeps the availability cache warm between queries
    let availability = state.availability.clone();
    let warming = collector::run(
        move || AvailabilityCollector::new(availability.clone()),
        shutdown.clone(),
    );

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(why) = tokio::signal::ctrl_c().await {
                log::error!("Cannot listen for ctrl-c: {}", why);
                return;
            }
            log::info!("Shutting down.");
            shutdown.cancel();
        }
    });

    let served = start_web_server(state, config.bind_address, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(why) = warming.await {
        log::error!("Availability collector did not stop cleanly: {}", why);
    }
    Ok(served?)
}
