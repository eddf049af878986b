use serde::{Deserialize, Serialize};

/// Per-unit price growth applied for every unit already owned.
pub const COST_GROWTH: f64 = 1.12;

/// Catalog entry a [`Facility`] is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityDef {
    pub name: String,
    pub base_cost: u64,
    pub rate: f64,
}

/// One tier of automated production.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub name: String,
    pub base_cost: u64,
    /// Production per owned unit per tick. Doubled by reincarnation and
    /// multiplied by artifacts.
    pub rate: f64,
    pub amount: u64,
    /// Lifetime units bought since the last reincarnation.
    pub total_purchased: u64,
}

impl Facility {
    pub fn new(name: impl Into<String>, base_cost: u64, rate: f64) -> Self {
        Self {
            name: name.into(),
            base_cost: base_cost.max(1),
            rate,
            amount: 0,
            total_purchased: 0,
        }
    }

    pub fn from_def(def: &FacilityDef) -> Self {
        Self::new(def.name.clone(), def.base_cost, def.rate)
    }

    /// Undiscounted price of the next unit: `floor(base_cost * 1.12^amount)`.
    pub fn current_cost(&self) -> u64 {
        (self.base_cost as f64 * COST_GROWTH.powf(self.amount as f64)) as u64
    }

    /// Discounted price of the unit `offset` positions past the current
    /// amount. Never below 1.
    pub fn unit_cost(&self, offset: u64, discount: f64) -> u64 {
        let exponent = self.amount.saturating_add(offset) as f64;
        let cost = self.base_cost as f64 * COST_GROWTH.powf(exponent) * discount;
        // `as` saturates on overflow and maps NaN to 0.
        (cost as u64).max(1)
    }

    pub fn total_production(&self) -> f64 {
        self.rate * self.amount as f64
    }

    /// How many units `balance` affords when buying them one after another,
    /// and what they cost in total.
    pub fn max_affordable(&self, balance: u64, discount: f64) -> (u64, u64) {
        let mut count = 0u64;
        let mut total = 0u64;
        loop {
            let cost = self.unit_cost(count, discount);
            match total.checked_add(cost) {
                Some(next) if next <= balance => {
                    total = next;
                    count += 1;
                }
                _ => break,
            }
        }
        (count, total)
    }

    pub(crate) fn add_units(&mut self, count: u64) {
        self.amount = self.amount.saturating_add(count);
        self.total_purchased = self.total_purchased.saturating_add(count);
    }

    pub(crate) fn reincarnate(&mut self) {
        self.amount = 0;
        self.total_purchased = 0;
        self.rate *= 2.0;
    }
}
