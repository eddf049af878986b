mod clock;
mod config;
mod game;
mod network;
mod protocol;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use game::catalog::GameCatalog;
use game::economy::Economy;
use game::format::{format_number, format_play_time};
use game::handle::EconomyHandle;
use network::server::GameServer;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let mut catalog = match &config.catalog_path {
        Some(path) => GameCatalog::load_from_file(path),
        None => GameCatalog::default(),
    };
    if let Some(coins) = config.starting_coins {
        catalog.starting_coins = coins;
    }
    info!(
        "Starting economy: {} facilities, {} artifacts, goal \"{}\" at {} medals",
        catalog.facilities.len(),
        catalog.artifacts.len(),
        catalog.goal.name,
        format_number(catalog.goal.cost)
    );

    let handle = EconomyHandle::new(Economy::new(&catalog));
    let clock = clock::spawn_production_clock(handle.clone(), config.tick_interval);
    let server = GameServer::bind(&config.bind_addr, handle.clone(), config.refresh_interval).await?;
    info!("Game server listening on ws://{}", server.local_addr()?);

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    clock.abort();

    let summary = handle
        .read(|e| {
            format!(
                "{} medals, {} points, {} per click, {} reincarnations (next at {}), \
                 price factor {:.3}, goal {}",
                format_number(e.coins()),
                format_number(e.points()),
                format_number(e.click_rate()),
                e.generation_times(),
                format_number(e.generation_cost()),
                e.cost_discount(),
                if e.goal().is_completed() { "cleared" } else { "open" },
            )
        })
        .await;
    let played = handle.read(|e| e.elapsed()).await;
    info!("Session over after {}: {}", format_play_time(played), summary);
    Ok(())
}
