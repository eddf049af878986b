use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace};

use crate::game::format::format_number;
use crate::game::handle::EconomyHandle;

/// Spawns the production clock. It ticks the economy once per `period`
/// for as long as the task lives, whether or not any client is connected.
pub fn spawn_production_clock(handle: EconomyHandle, period: Duration) -> JoinHandle<()> {
    info!("Production clock running every {:?}", period);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; production starts one
        // period after launch.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let produced = handle.tick().await;
            trace!("Produced {} medals", format_number(produced));
        }
    })
}
