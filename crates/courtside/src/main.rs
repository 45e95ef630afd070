// Courtside entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the match store (embedded SQLite or hosted collection)
// 4. Bind the companion page bridge
// 5. Create mpsc channels
// 6. Spawn app logic task
// 7. Run the TUI until the user quits
// 8. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use courtside::app;
use courtside::bridge;
use courtside::config::{self, StoreBackend, StoreConfig};
use courtside::tui;
use courtside_core::demo;
use courtside_core::store::remote::HttpMatchStore;
use courtside_core::store::sqlite::SqliteMatchStore;
use courtside_core::store::MatchStore;
use courtside_core::synth::RandomScoreSynthesizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Courtside starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {:?} store, {:?} selection, bridge port {}",
        config.store.backend, config.widget.selection, config.bridge.port
    );

    // 3. Open the match store
    let store = open_store(&config.store)?;

    // 4. Bind the companion page bridge
    let (bridge_server, bridge) = bridge::channel(256);
    let port = config.bridge.port;
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind bridge on 127.0.0.1:{port}"))?;
    let bridge_events = bridge.subscribe();
    let bridge_handle = tokio::spawn(async move {
        if let Err(e) = bridge::run(listener, bridge_server).await {
            error!("Bridge server error: {}", e);
        }
    });

    // 5. Create channels
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();

    let app_state = app::AppState::new(
        config,
        store,
        bridge,
        Box::new(RandomScoreSynthesizer::from_entropy()),
        ui_tx,
        feed_tx,
    );

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(feed_rx, bridge_events, cmd_rx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Run the TUI event loop (blocking until user quits)
    info!("Application ready. Companion page bridge on ws://127.0.0.1:{port}");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 8. Cleanup: give the app task time to unmount the widget
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    bridge_handle.abort();

    info!("Courtside shut down cleanly");
    Ok(())
}

fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn MatchStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let store = SqliteMatchStore::open(&config.db_path)
                .with_context(|| format!("failed to open match store at {}", config.db_path))?;
            if config.seed_demo {
                let seeded = store
                    .seed_if_empty(&demo::sample_matches(Utc::now()))
                    .context("failed to seed sample matches")?;
                if seeded > 0 {
                    info!("Seeded {} sample matches", seeded);
                }
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Remote => {
            let url = config
                .remote_url
                .as_deref()
                .context("store.remote_url is not set")?;
            let store = HttpMatchStore::new(url).context("invalid hosted store URL")?;
            info!("Using hosted match store at {}", store.collection_url());
            Ok(Arc::new(store))
        }
    }
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside=info,courtside_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
