use orbitdeck::config::AppConfig;
use orbitdeck::controller::{FeedState, Phase, RefreshController};
use orbitdeck::fetchers::default_fetchers;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env();
    info!("Configuration loaded successfully");

    // Start the refresh loop
    let fetchers = default_fetchers(&config)?;
    let handle = RefreshController::spawn(fetchers, &config.refresh);
    info!(
        "orbitdeck feed started (interval: {}s)",
        config.refresh.refresh_interval.as_secs()
    );

    // Log feed transitions until the channel closes or Ctrl-C arrives
    let mut state_rx = handle.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    warn!("Feed state channel closed");
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                log_state(&state);
            }
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    handle.shutdown().await;
    info!("orbitdeck stopped");
    Ok(())
}

/// Log one feed state transition.
fn log_state(state: &FeedState) {
    match state.phase {
        Phase::Idle => {}
        Phase::Fetching => info!("Refreshing all domains"),
        Phase::Retrying => warn!(
            "Snapshot invalid (attempt {}): {:?}",
            state.attempts, state.errors
        ),
        Phase::Ready => {
            let snapshot = match &state.snapshot {
                Some(s) => s,
                None => return,
            };
            info!(
                "Snapshot {} ready: quality {:?}, {}",
                snapshot.update_id, snapshot.quality, snapshot.source
            );
            if let Some(orbit) = snapshot.orbit() {
                info!(
                    "ISS at ({:.2}, {:.2}), {:.1} km up, {:.0} km/h",
                    orbit.latitude, orbit.longitude, orbit.altitude_km, orbit.velocity_kmh
                );
            }
            if let Some(crew) = snapshot.crew() {
                info!("Crew aboard: {}", crew.count);
            }
            if let Some(weather) = snapshot.space_weather() {
                info!("Kp index {:.1} ({})", weather.kp_index, weather.activity);
            }
            if let Some(mars) = snapshot.mars_sol() {
                info!(
                    "Mars sol {} ({:?}), est. {:.1} C",
                    mars.sol, mars.season, mars.est_temp_c
                );
            }
            if let Some(launch) = snapshot.launch() {
                info!(
                    "Next launch: {} at {} (T-minus {}s)",
                    launch.mission, launch.launch_at, launch.countdown_s
                );
            }
            for warning in &state.warnings {
                warn!("Validation warning: {}", warning);
            }
            for error in &state.errors {
                warn!("Validation error: {}", error);
            }
        }
    }
}
