use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{GroundStation, StationId};
use crate::scheduler::types::{Schedule, ScheduleEntry};

/// Scores a schedule; higher is better. The optimizer only ever compares
/// scores, so any scale works.
pub trait Objective: Sync {
    fn score(&self, schedule: &Schedule) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&Schedule) -> f64 + Sync,
{
    fn score(&self, schedule: &Schedule) -> f64 {
        self(schedule)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub priority_weight: f64,
    pub elevation_weight: f64,
    pub cost_weight: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            priority_weight: 1.0,
            elevation_weight: 0.5,
            cost_weight: 0.01,
        }
    }
}

/// Per entry: `priority_weight * priority + elevation_weight * peak / 90
/// - cost_weight * cost_per_minute * minutes`.
#[derive(Debug, Clone)]
pub struct WeightedObjective {
    weights: ObjectiveWeights,
    cost_per_minute: HashMap<StationId, f64>,
}

impl WeightedObjective {
    pub fn new(weights: ObjectiveWeights, stations: &[GroundStation]) -> Self {
        Self {
            weights,
            cost_per_minute: stations
                .iter()
                .map(|s| (s.id.clone(), s.cost_per_minute))
                .collect(),
        }
    }

    pub fn entry_score(&self, entry: &ScheduleEntry) -> f64 {
        let cost = self
            .cost_per_minute
            .get(&entry.station_id)
            .copied()
            .unwrap_or(0.0);
        self.weights.priority_weight * f64::from(entry.priority)
            + self.weights.elevation_weight * entry.peak_elevation_deg / 90.0
            - self.weights.cost_weight * cost * entry.minutes()
    }
}

impl Objective for WeightedObjective {
    fn score(&self, schedule: &Schedule) -> f64 {
        schedule.entries().iter().map(|e| self.entry_score(e)).sum()
    }
}
