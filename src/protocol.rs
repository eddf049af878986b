use serde::{Deserialize, Serialize};

use crate::game::artifact::ArtifactEffect;
use crate::game::economy::PurchaseMode;

pub type Tick = u64;

// ── Snapshots (Server → Client) ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySnapshot {
    pub name: String,
    pub amount: u64,
    pub total_purchased: u64,
    /// Discounted price of the next unit.
    pub unit_cost: u64,
    /// Price of the next unit before the discount.
    pub list_cost: u64,
    pub rate: f64,
    pub total_production: f64,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub name: String,
    pub description: String,
    pub effect: ArtifactEffect,
    pub cost: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub name: String,
    pub cost: u64,
    pub completed: bool,
}

/// Everything a front-end needs to draw one frame. Raw numbers only;
/// formatting is up to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub coins: u64,
    pub points: u64,
    pub click_rate: u64,
    pub cost_discount: f64,
    pub production_per_tick: f64,
    pub generation_times: u64,
    pub generation_cost: u64,
    pub purchase_mode: PurchaseMode,
    pub cleared: bool,
    pub elapsed_secs: u64,
    pub tick: Tick,
    pub total_clicks: u64,
    pub lifetime_coins: u64,
    pub artifacts_visible: bool,
    pub facilities: Vec<FacilitySnapshot>,
    pub artifacts: Vec<ArtifactSnapshot>,
    pub goal: GoalSnapshot,
}

// ── Logging ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: Tick,
    pub text: String,
    pub category: LogCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCategory {
    Economy,
    Prestige,
    Artifact,
    Goal,
    Rejected,
}

// ── Client → Server messages ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientCommand {
    Click,
    /// Buys facility `index`. Without an explicit mode the stored purchase
    /// mode is used.
    PurchaseFacility {
        index: usize,
        mode: Option<PurchaseMode>,
    },
    SetPurchaseMode {
        mode: PurchaseMode,
    },
    TogglePurchaseMode,
    Reincarnate,
    PurchaseArtifact {
        index: usize,
    },
    CompleteGoal,
}

/// Server-to-client message wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Periodic state refresh.
    Snapshot(EconomySnapshot),
    /// Result of a command sent by this client.
    Log(LogEntry),
    /// Undecodable frame or a command referring to something that does
    /// not exist.
    Error { message: String },
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(msg)
}

pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}
