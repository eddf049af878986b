use serde::{Deserialize, Serialize};

/// What happens when the goal is bought. Closed set, applied exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalEffect {
    /// The run is over: manual clicking and reincarnation stop working.
    EndGame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDef {
    pub name: String,
    pub cost: u64,
    #[serde(default = "default_effect")]
    pub on_complete: GoalEffect,
}

fn default_effect() -> GoalEffect {
    GoalEffect::EndGame
}

/// The single terminal milestone.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub name: String,
    pub cost: u64,
    pub on_complete: GoalEffect,
    completed: bool,
}

impl Goal {
    pub fn from_def(def: &GoalDef) -> Self {
        Self {
            name: def.name.clone(),
            cost: def.cost,
            on_complete: def.on_complete,
            completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Flips the one-way flag. Returns the effect to apply only on the
    /// first call.
    pub(crate) fn mark_completed(&mut self) -> Option<GoalEffect> {
        if self.completed {
            return None;
        }
        self.completed = true;
        Some(self.on_complete)
    }
}
