use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::protocol::{ClientCommand, EconomySnapshot, LogCategory, LogEntry};

use super::economy::{Currency, Economy, EconomyError, EconomyEvent, Outcome, SkipReason};
use super::format::format_number;

/// Shared access to the one economy. Every command, production tick and
/// snapshot read goes through the same lock, so operations are
/// linearized and readers never see a half-applied purchase.
#[derive(Clone)]
pub struct EconomyHandle {
    inner: Arc<Mutex<Economy>>,
}

impl EconomyHandle {
    pub fn new(economy: Economy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(economy)),
        }
    }

    /// Applies one client command. Clicking and reincarnating are refused
    /// once the goal has cleared the game; everything else keeps working.
    pub async fn execute(
        &self,
        command: ClientCommand,
    ) -> Result<(Outcome, LogEntry), EconomyError> {
        let mut economy = self.inner.lock().await;

        let outcome = match command {
            ClientCommand::Click | ClientCommand::Reincarnate if economy.is_cleared() => {
                Outcome::Skipped(SkipReason::GameCleared)
            }
            ClientCommand::Click => economy.click(),
            ClientCommand::PurchaseFacility { index, mode: None } => {
                economy.purchase_facility_with_current_mode(index)?
            }
            ClientCommand::PurchaseFacility {
                index,
                mode: Some(mode),
            } => economy.purchase_facility(index, mode)?,
            ClientCommand::SetPurchaseMode { mode } => economy.set_purchase_mode(mode),
            ClientCommand::TogglePurchaseMode => economy.toggle_purchase_mode(),
            ClientCommand::Reincarnate => economy.reincarnate(),
            ClientCommand::PurchaseArtifact { index } => economy.purchase_artifact(index)?,
            ClientCommand::CompleteGoal => economy.complete_goal(),
        };

        let log = describe(&economy, &outcome);
        match outcome {
            Outcome::Skipped(_) => debug!("{:?} skipped: {}", command, log.text),
            Outcome::Applied(EconomyEvent::Clicked { .. })
            | Outcome::Applied(EconomyEvent::PurchaseModeChanged { .. }) => {
                debug!("{}", log.text)
            }
            Outcome::Applied(_) => info!("{}", log.text),
        }

        Ok((outcome, log))
    }

    /// Runs one production interval.
    pub async fn tick(&self) -> u64 {
        self.inner.lock().await.tick()
    }

    pub async fn snapshot(&self) -> EconomySnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Runs `f` against the economy while holding the lock.
    pub async fn read<R>(&self, f: impl FnOnce(&Economy) -> R) -> R {
        let economy = self.inner.lock().await;
        f(&economy)
    }
}

fn currency_name(currency: Currency) -> &'static str {
    match currency {
        Currency::Medals => "medals",
        Currency::Points => "points",
    }
}

/// Human-readable account of an operation for the client log.
fn describe(economy: &Economy, outcome: &Outcome) -> LogEntry {
    let (category, text) = match *outcome {
        Outcome::Applied(EconomyEvent::Clicked { gained }) => (
            LogCategory::Economy,
            format!("Clicked for {} medals", format_number(gained)),
        ),
        Outcome::Applied(EconomyEvent::FacilityPurchased {
            index,
            count,
            total_cost,
        }) => (
            LogCategory::Economy,
            format!(
                "Bought {} x {} for {} medals, next costs {}",
                count,
                economy.facilities()[index].name,
                format_number(total_cost),
                economy
                    .facility_unit_cost(index)
                    .map(format_number)
                    .unwrap_or_default()
            ),
        ),
        Outcome::Applied(EconomyEvent::PurchaseModeChanged { .. }) => (
            LogCategory::Economy,
            format!("Purchase mode: {:?}", economy.purchase_mode()),
        ),
        Outcome::Applied(EconomyEvent::Reincarnated {
            generation,
            next_cost,
        }) => (
            LogCategory::Prestige,
            format!(
                "Reincarnation #{} complete, next one needs {} medals",
                generation,
                format_number(next_cost)
            ),
        ),
        Outcome::Applied(EconomyEvent::ArtifactPurchased { index, effect, paid }) => (
            LogCategory::Artifact,
            format!(
                "Bought {} ({}) for {} points",
                economy.artifacts()[index].name,
                effect.label(),
                format_number(paid)
            ),
        ),
        Outcome::Applied(EconomyEvent::GoalCompleted { .. }) => (
            LogCategory::Goal,
            format!("{} achieved. Congratulations!", economy.goal().name),
        ),
        Outcome::Skipped(SkipReason::InsufficientFunds {
            currency,
            needed,
            available,
        }) => (
            LogCategory::Rejected,
            format!(
                "Not enough {} (need {}, have {})",
                currency_name(currency),
                format_number(needed),
                format_number(available)
            ),
        ),
        Outcome::Skipped(SkipReason::AlreadyCompleted) => (
            LogCategory::Rejected,
            "Goal already completed".to_string(),
        ),
        Outcome::Skipped(SkipReason::GameCleared) => {
            (LogCategory::Rejected, "The game is already cleared".to_string())
        }
    };

    LogEntry {
        tick: economy.tick_count(),
        text,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::GameCatalog;
    use crate::game::economy::PurchaseMode;

    fn make_handle(starting_coins: u64) -> EconomyHandle {
        let catalog = GameCatalog {
            starting_coins,
            ..GameCatalog::default()
        };
        EconomyHandle::new(Economy::new(&catalog))
    }

    #[tokio::test]
    async fn click_command_credits_click_rate() {
        let handle = make_handle(0);
        let (outcome, log) = handle.execute(ClientCommand::Click).await.unwrap();
        assert_eq!(outcome, Outcome::Applied(EconomyEvent::Clicked { gained: 1 }));
        assert_eq!(log.category, LogCategory::Economy);
        assert_eq!(handle.read(|e| e.coins()).await, 1);
    }

    #[tokio::test]
    async fn purchase_without_mode_uses_stored_mode() {
        let handle = make_handle(200);
        handle.execute(ClientCommand::TogglePurchaseMode).await.unwrap();
        let (_, log) = handle
            .execute(ClientCommand::PurchaseFacility {
                index: 0,
                mode: None,
            })
            .await
            .unwrap();
        assert_eq!(log.text, "Bought 3 x Proxy Clicker Monokuma for 168 medals, next costs 70");
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.facilities[0].amount, 3);
        assert_eq!(snapshot.purchase_mode, PurchaseMode::Max);
    }

    #[tokio::test]
    async fn unaffordable_command_is_reported_not_raised() {
        let handle = make_handle(10);
        let (outcome, log) = handle
            .execute(ClientCommand::PurchaseFacility {
                index: 7,
                mode: Some(PurchaseMode::Single),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(log.category, LogCategory::Rejected);
        assert_eq!(log.text, "Not enough medals (need 100,000, have 10)");
    }

    #[tokio::test]
    async fn bad_index_is_an_error() {
        let handle = make_handle(10);
        let err = handle
            .execute(ClientCommand::PurchaseArtifact { index: 42 })
            .await
            .unwrap_err();
        assert_eq!(err, EconomyError::UnknownArtifact { index: 42, len: 5 });
    }

    #[tokio::test]
    async fn cleared_game_refuses_click_and_reincarnation() {
        let handle = make_handle(2_200_000);
        let (outcome, log) = handle.execute(ClientCommand::CompleteGoal).await.unwrap();
        assert!(matches!(outcome, Outcome::Applied(EconomyEvent::GoalCompleted { .. })));
        assert_eq!(log.category, LogCategory::Goal);

        for command in [ClientCommand::Click, ClientCommand::Reincarnate] {
            let (outcome, _) = handle.execute(command).await.unwrap();
            assert_eq!(outcome, Outcome::Skipped(SkipReason::GameCleared));
        }
        assert_eq!(handle.read(|e| e.coins()).await, 200_000);

        let (outcome, _) = handle.execute(ClientCommand::CompleteGoal).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::AlreadyCompleted));

        // Production and purchases keep running after the clear.
        handle
            .execute(ClientCommand::PurchaseFacility {
                index: 0,
                mode: None,
            })
            .await
            .unwrap();
        assert_eq!(handle.tick().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_clicks_and_ticks_all_land() {
        let handle = make_handle(0);
        handle
            .read(|e| assert_eq!(e.total_production(), 0.0))
            .await;

        let mut tasks = Vec::new();
        for _ in 0..5 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                h.execute(ClientCommand::Click).await.unwrap();
            }));
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                h.tick().await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Nothing is owned, so ticks add 0 and the five clicks add exactly 5.
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.coins, 5);
        assert_eq!(snapshot.total_clicks, 5);
        assert_eq!(snapshot.tick, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_credits_commute() {
        let handle = make_handle(100);
        handle
            .execute(ClientCommand::PurchaseFacility {
                index: 0,
                mode: Some(PurchaseMode::Single),
            })
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..40 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    h.execute(ClientCommand::Click).await.unwrap();
                } else {
                    h.tick().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // 50 left after buying, 20 clicks of 1, 20 ticks of 1.
        assert_eq!(handle.read(|e| e.coins()).await, 90);
    }
}
