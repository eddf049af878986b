use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::artifact::{ArtifactDef, ArtifactEffect, DEFAULT_ARTIFACT_GROWTH};
use super::facility::FacilityDef;
use super::goal::{GoalDef, GoalEffect};

/// Reincarnation threshold before the first reincarnation.
pub const INITIAL_GENERATION_COST: u64 = 100_000;

/// Flat click-rate bonus granted by every reincarnation.
pub const REINCARNATION_CLICK_BONUS: u64 = 10;

/// Everything a fresh economy is seeded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCatalog {
    pub facilities: Vec<FacilityDef>,
    pub artifacts: Vec<ArtifactDef>,
    pub goal: GoalDef,
    #[serde(default)]
    pub starting_coins: u64,
    #[serde(default = "default_click_rate")]
    pub starting_click_rate: u64,
}

fn default_click_rate() -> u64 {
    1
}

fn facility(name: &str, base_cost: u64, rate: f64) -> FacilityDef {
    FacilityDef {
        name: name.to_string(),
        base_cost,
        rate,
    }
}

fn artifact(name: &str, description: &str, effect: ArtifactEffect, cost: u64) -> ArtifactDef {
    ArtifactDef {
        name: name.to_string(),
        description: description.to_string(),
        effect,
        cost,
        growth: DEFAULT_ARTIFACT_GROWTH,
    }
}

impl Default for GameCatalog {
    fn default() -> Self {
        use ArtifactEffect::*;

        Self {
            facilities: vec![
                facility("Proxy Clicker Monokuma", 50, 1.0),
                facility("Part-timer Monokuma", 200, 5.0),
                facility("Office Worker Monokuma", 500, 15.0),
                facility("CEO Monokuma", 1_000, 35.0),
                facility("Shareholder Monokuma", 3_000, 120.0),
                facility("Landlord Monokuma", 10_000, 400.0),
                facility("Novelist Monokuma", 50_000, 2_300.0),
                facility("Athlete Monokuma", 100_000, 5_000.0),
            ],
            artifacts: vec![
                artifact("Robot Arm", "Clicks earn twice as many medals", DoubleClickRate, 5),
                artifact("Monokuma Outlet", "Facilities cost 20% less", ApplyCostDiscount, 10),
                artifact(
                    "Monokuma Training Center",
                    "Facility production doubles",
                    DoubleProductionRate,
                    20,
                ),
                artifact("Monokuma Mint", "Monokuma points double", MultiplySecondaryCurrency, 15),
                artifact(
                    "Monokuma Academy",
                    "Production grows 1% per facility bought",
                    PercentBoostProduction,
                    30,
                ),
            ],
            goal: GoalDef {
                name: "Clear the Game".to_string(),
                cost: 2_000_000,
                on_complete: GoalEffect::EndGame,
            },
            starting_coins: 0,
            starting_click_rate: 1,
        }
    }
}

impl GameCatalog {
    /// Load a catalog from a JSON file on disk.
    /// Falls back to the built-in catalog if the file is missing, malformed
    /// or defines no facilities.
    pub fn load_from_file(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(
                    "Failed to read catalog at {}: {}. Using built-in catalog.",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        match serde_json::from_str::<GameCatalog>(&contents) {
            Ok(catalog) if catalog.facilities.is_empty() => {
                warn!(
                    "Catalog at {} defines no facilities. Using built-in catalog.",
                    path.display()
                );
                Self::default()
            }
            Ok(catalog) => {
                info!(
                    "Loaded catalog with {} facilities and {} artifacts",
                    catalog.facilities.len(),
                    catalog.artifacts.len()
                );
                catalog
            }
            Err(e) => {
                warn!(
                    "Failed to parse catalog at {}: {}. Using built-in catalog.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
