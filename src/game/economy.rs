use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::protocol::{ArtifactSnapshot, EconomySnapshot, FacilitySnapshot, GoalSnapshot};

use super::artifact::{Artifact, ArtifactEffect, DISCOUNT_STEP};
use super::catalog::{GameCatalog, INITIAL_GENERATION_COST, REINCARNATION_CLICK_BONUS};
use super::facility::Facility;
use super::goal::{Goal, GoalEffect};

/// Reincarnation threshold once `generation_times` reincarnations have
/// happened: `100000 * (generation_times + 1)^2`.
pub fn generation_cost_for(generation_times: u64) -> u64 {
    let n = generation_times.saturating_add(1);
    INITIAL_GENERATION_COST.saturating_mul(n.saturating_mul(n))
}

// ── Operation results ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseMode {
    /// Buy exactly one unit.
    #[default]
    Single,
    /// Buy as many units as the balance affords.
    Max,
}

impl PurchaseMode {
    pub fn toggled(self) -> Self {
        match self {
            PurchaseMode::Single => PurchaseMode::Max,
            PurchaseMode::Max => PurchaseMode::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    /// Primary currency, earned by clicks and production.
    Medals,
    /// Secondary currency, earned per facility unit bought.
    Points,
}

/// Why an operation left the economy untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    InsufficientFunds {
        currency: Currency,
        needed: u64,
        available: u64,
    },
    AlreadyCompleted,
    GameCleared,
}

/// What an applied operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EconomyEvent {
    Clicked { gained: u64 },
    FacilityPurchased { index: usize, count: u64, total_cost: u64 },
    PurchaseModeChanged { mode: PurchaseMode },
    Reincarnated { generation: u64, next_cost: u64 },
    ArtifactPurchased { index: usize, effect: ArtifactEffect, paid: u64 },
    GoalCompleted { effect: GoalEffect },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Applied(EconomyEvent),
    Skipped(SkipReason),
}

/// Caller bugs: references to entities the economy does not own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EconomyError {
    #[error("facility index {index} out of range ({len} facilities)")]
    UnknownFacility { index: usize, len: usize },
    #[error("artifact index {index} out of range ({len} artifacts)")]
    UnknownArtifact { index: usize, len: usize },
}

fn insufficient(currency: Currency, needed: u64, available: u64) -> Outcome {
    Outcome::Skipped(SkipReason::InsufficientFunds {
        currency,
        needed,
        available,
    })
}

// ── Economy aggregate ───────────────────────────────────────────────

/// All mutable game state. Every rule of the game lives in the methods
/// below; callers only read snapshots and invoke operations.
#[derive(Debug, Clone)]
pub struct Economy {
    coins: u64,
    points: u64,
    click_rate: u64,
    cost_discount: f64,
    generation_times: u64,
    generation_cost: u64,
    facilities: Vec<Facility>,
    artifacts: Vec<Artifact>,
    goal: Goal,
    purchase_mode: PurchaseMode,
    cleared: bool,
    started_at: Instant,
    /// Sub-medal production carried to the next tick.
    fractional: f64,
    tick_count: u64,
    total_clicks: u64,
    lifetime_coins: u64,
}

impl Economy {
    pub fn new(catalog: &GameCatalog) -> Self {
        Self {
            coins: catalog.starting_coins,
            points: 0,
            click_rate: catalog.starting_click_rate.max(1),
            cost_discount: 1.0,
            generation_times: 0,
            generation_cost: generation_cost_for(0),
            facilities: catalog.facilities.iter().map(Facility::from_def).collect(),
            artifacts: catalog.artifacts.iter().map(Artifact::from_def).collect(),
            goal: Goal::from_def(&catalog.goal),
            purchase_mode: PurchaseMode::Single,
            cleared: false,
            started_at: Instant::now(),
            fractional: 0.0,
            tick_count: 0,
            total_clicks: 0,
            lifetime_coins: 0,
        }
    }

    fn credit(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
        self.lifetime_coins = self.lifetime_coins.saturating_add(amount);
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn click(&mut self) -> Outcome {
        let gained = self.click_rate;
        self.credit(gained);
        self.total_clicks = self.total_clicks.saturating_add(1);
        Outcome::Applied(EconomyEvent::Clicked { gained })
    }

    /// One production interval. Returns the medals credited.
    pub fn tick(&mut self) -> u64 {
        self.tick_count = self.tick_count.saturating_add(1);
        let produced = self.total_production() + self.fractional;
        let whole = produced.floor();
        self.fractional = if whole.is_finite() { produced - whole } else { 0.0 };
        // Saturates for huge values, 0 for NaN.
        let credited = whole as u64;
        self.credit(credited);
        credited
    }

    pub fn purchase_facility(
        &mut self,
        index: usize,
        mode: PurchaseMode,
    ) -> Result<Outcome, EconomyError> {
        let len = self.facilities.len();
        let facility = self
            .facilities
            .get(index)
            .ok_or(EconomyError::UnknownFacility { index, len })?;

        let next_cost = self.next_unit_cost(facility);
        let (count, total_cost) = match mode {
            PurchaseMode::Single if next_cost <= self.coins => (1, next_cost),
            PurchaseMode::Single => (0, 0),
            PurchaseMode::Max => facility.max_affordable(self.coins, self.cost_discount),
        };
        if count == 0 {
            return Ok(insufficient(Currency::Medals, next_cost, self.coins));
        }

        self.coins -= total_cost;
        self.facilities[index].add_units(count);
        self.points = self.points.saturating_add(count);

        Ok(Outcome::Applied(EconomyEvent::FacilityPurchased {
            index,
            count,
            total_cost,
        }))
    }

    /// Buys using the stored purchase mode.
    pub fn purchase_facility_with_current_mode(
        &mut self,
        index: usize,
    ) -> Result<Outcome, EconomyError> {
        self.purchase_facility(index, self.purchase_mode)
    }

    pub fn set_purchase_mode(&mut self, mode: PurchaseMode) -> Outcome {
        self.purchase_mode = mode;
        Outcome::Applied(EconomyEvent::PurchaseModeChanged { mode })
    }

    pub fn toggle_purchase_mode(&mut self) -> Outcome {
        self.set_purchase_mode(self.purchase_mode.toggled())
    }

    /// Trades all medals, points and facility units for a permanent
    /// production doubling and a flat click bonus. Artifacts and the cost
    /// discount carry over.
    pub fn reincarnate(&mut self) -> Outcome {
        if self.coins < self.generation_cost {
            return insufficient(Currency::Medals, self.generation_cost, self.coins);
        }

        self.coins = 0;
        self.click_rate = self.click_rate.saturating_add(REINCARNATION_CLICK_BONUS);
        self.generation_times += 1;
        // Uses the already incremented count.
        self.generation_cost = generation_cost_for(self.generation_times);
        self.points = 0;
        self.fractional = 0.0;
        for facility in &mut self.facilities {
            facility.reincarnate();
        }

        Outcome::Applied(EconomyEvent::Reincarnated {
            generation: self.generation_times,
            next_cost: self.generation_cost,
        })
    }

    pub fn purchase_artifact(&mut self, index: usize) -> Result<Outcome, EconomyError> {
        let len = self.artifacts.len();
        let artifact = self
            .artifacts
            .get(index)
            .ok_or(EconomyError::UnknownArtifact { index, len })?;
        let (cost, effect) = (artifact.cost, artifact.effect);

        if self.points < cost {
            return Ok(insufficient(Currency::Points, cost, self.points));
        }

        self.points -= cost;
        self.artifacts[index].record_purchase();
        self.apply_artifact_effect(effect);

        Ok(Outcome::Applied(EconomyEvent::ArtifactPurchased {
            index,
            effect,
            paid: cost,
        }))
    }

    fn apply_artifact_effect(&mut self, effect: ArtifactEffect) {
        match effect {
            ArtifactEffect::DoubleClickRate => {
                self.click_rate = self.click_rate.saturating_mul(2);
            }
            ArtifactEffect::ApplyCostDiscount => {
                self.cost_discount *= DISCOUNT_STEP;
            }
            ArtifactEffect::DoubleProductionRate => {
                for facility in &mut self.facilities {
                    facility.rate *= 2.0;
                }
            }
            ArtifactEffect::MultiplySecondaryCurrency => {
                self.points = self.points.saturating_mul(2);
            }
            ArtifactEffect::PercentBoostProduction => {
                for facility in &mut self.facilities {
                    facility.rate *= 1.0 + facility.total_purchased as f64 / 100.0;
                }
            }
        }
    }

    pub fn complete_goal(&mut self) -> Outcome {
        if self.goal.is_completed() {
            return Outcome::Skipped(SkipReason::AlreadyCompleted);
        }
        let cost = self.goal.cost;
        if self.coins < cost {
            return insufficient(Currency::Medals, cost, self.coins);
        }
        let Some(effect) = self.goal.mark_completed() else {
            return Outcome::Skipped(SkipReason::AlreadyCompleted);
        };

        self.coins -= cost;
        self.apply_goal_effect(effect);
        Outcome::Applied(EconomyEvent::GoalCompleted { effect })
    }

    fn apply_goal_effect(&mut self, effect: GoalEffect) {
        match effect {
            GoalEffect::EndGame => self.cleared = true,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn click_rate(&self) -> u64 {
        self.click_rate
    }

    pub fn cost_discount(&self) -> f64 {
        self.cost_discount
    }

    pub fn generation_times(&self) -> u64 {
        self.generation_times
    }

    pub fn generation_cost(&self) -> u64 {
        self.generation_cost
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn purchase_mode(&self) -> PurchaseMode {
        self.purchase_mode
    }

    /// True once the goal's `EndGame` effect has run.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_production(&self) -> f64 {
        self.facilities.iter().map(Facility::total_production).sum()
    }

    fn next_unit_cost(&self, facility: &Facility) -> u64 {
        facility.unit_cost(0, self.cost_discount)
    }

    /// Discounted price of the next unit of facility `index`.
    pub fn facility_unit_cost(&self, index: usize) -> Result<u64, EconomyError> {
        self.facilities
            .get(index)
            .map(|f| self.next_unit_cost(f))
            .ok_or(EconomyError::UnknownFacility {
                index,
                len: self.facilities.len(),
            })
    }

    /// The first tier is always shown; later tiers once the previous one
    /// owns at least one unit.
    pub fn is_facility_visible(&self, index: usize) -> bool {
        match index {
            0 => !self.facilities.is_empty(),
            i if i < self.facilities.len() => self.facilities[i - 1].amount > 0,
            _ => false,
        }
    }

    /// Artifacts are revealed after the first reincarnation.
    pub fn artifacts_visible(&self) -> bool {
        self.generation_times >= 1
    }

    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            coins: self.coins,
            points: self.points,
            click_rate: self.click_rate,
            cost_discount: self.cost_discount,
            production_per_tick: self.total_production(),
            generation_times: self.generation_times,
            generation_cost: self.generation_cost,
            purchase_mode: self.purchase_mode,
            cleared: self.cleared,
            elapsed_secs: self.elapsed().as_secs(),
            tick: self.tick_count,
            total_clicks: self.total_clicks,
            lifetime_coins: self.lifetime_coins,
            artifacts_visible: self.artifacts_visible(),
            facilities: self
                .facilities
                .iter()
                .enumerate()
                .map(|(i, f)| FacilitySnapshot {
                    name: f.name.clone(),
                    amount: f.amount,
                    total_purchased: f.total_purchased,
                    unit_cost: self.next_unit_cost(f),
                    list_cost: f.current_cost(),
                    rate: f.rate,
                    total_production: f.total_production(),
                    visible: self.is_facility_visible(i),
                })
                .collect(),
            artifacts: self
                .artifacts
                .iter()
                .map(|a| ArtifactSnapshot {
                    name: a.name.clone(),
                    description: a.description.clone(),
                    effect: a.effect,
                    cost: a.cost,
                    count: a.count,
                })
                .collect(),
            goal: GoalSnapshot {
                name: self.goal.name.clone(),
                cost: self.goal.cost,
                completed: self.goal.is_completed(),
            },
        }
    }
}
