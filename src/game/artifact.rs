use serde::{Deserialize, Serialize};

/// Price multiplier applied after each artifact purchase.
pub const DEFAULT_ARTIFACT_GROWTH: f64 = 1.2;

/// Factor `ApplyCostDiscount` multiplies the facility price discount by.
pub const DISCOUNT_STEP: f64 = 0.8;

// ── Effect catalogue ────────────────────────────────────────────────

/// The fixed set of effects an artifact can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactEffect {
    /// `click_rate *= 2`
    DoubleClickRate,
    /// `cost_discount *= 0.8`, compounding.
    ApplyCostDiscount,
    /// Every facility's rate doubles.
    DoubleProductionRate,
    /// The secondary currency balance doubles.
    MultiplySecondaryCurrency,
    /// Every facility's rate grows by `total_purchased` percent.
    PercentBoostProduction,
}

impl ArtifactEffect {
    pub fn label(self) -> &'static str {
        match self {
            ArtifactEffect::DoubleClickRate => "double click rate",
            ArtifactEffect::ApplyCostDiscount => "facility cost discount",
            ArtifactEffect::DoubleProductionRate => "double production",
            ArtifactEffect::MultiplySecondaryCurrency => "double points",
            ArtifactEffect::PercentBoostProduction => "percent production boost",
        }
    }
}

// ── Artifact definition ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDef {
    pub name: String,
    pub description: String,
    pub effect: ArtifactEffect,
    pub cost: u64,
    #[serde(default = "default_growth")]
    pub growth: f64,
}

fn default_growth() -> f64 {
    DEFAULT_ARTIFACT_GROWTH
}

// ── Owned artifact state ────────────────────────────────────────────

/// A repeatable upgrade bought with the secondary currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub description: String,
    pub effect: ArtifactEffect,
    pub count: u64,
    pub cost: u64,
    pub growth: f64,
}

impl Artifact {
    pub fn from_def(def: &ArtifactDef) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            effect: def.effect,
            count: 0,
            cost: def.cost,
            growth: def.growth,
        }
    }

    /// Records a purchase and raises the price. The new price is always
    /// strictly above the old one, even for tiny prices where
    /// `floor(cost * growth)` would not move.
    pub(crate) fn record_purchase(&mut self) {
        self.count = self.count.saturating_add(1);
        let grown = (self.cost as f64 * self.growth) as u64;
        self.cost = grown.max(self.cost.saturating_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot_arm() -> Artifact {
        Artifact::from_def(&ArtifactDef {
            name: "Robot Arm".to_string(),
            description: "Clicks earn twice as many medals".to_string(),
            effect: ArtifactEffect::DoubleClickRate,
            cost: 5,
            growth: DEFAULT_ARTIFACT_GROWTH,
        })
    }

    #[test]
    fn purchase_grows_cost_by_factor() {
        let mut a = robot_arm();
        a.record_purchase();
        assert_eq!(a.count, 1);
        assert_eq!(a.cost, 6); // floor(5 * 1.2)

        a.cost = 20;
        a.record_purchase();
        assert_eq!(a.cost, 24);
    }

    #[test]
    fn small_costs_still_increase() {
        let mut a = robot_arm();
        a.cost = 1;
        a.record_purchase();
        assert_eq!(a.cost, 2);
    }

    #[test]
    fn growth_defaults_when_missing_from_json() {
        let json = r#"{
            "name": "Outlet",
            "description": "Cheaper facilities",
            "effect": "ApplyCostDiscount",
            "cost": 10
        }"#;
        let def: ArtifactDef = serde_json::from_str(json).unwrap();
        assert_eq!(def.growth, DEFAULT_ARTIFACT_GROWTH);
        assert_eq!(def.effect, ArtifactEffect::ApplyCostDiscount);
    }
}
