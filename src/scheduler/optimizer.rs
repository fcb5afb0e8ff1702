use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

use chrono::Duration;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::abort::AbortHandle;
use crate::predict::{ContactCatalog, GroundStation, SatelliteId};
use crate::scheduler::assembler::{diagnose_unmet, reservation};
use crate::scheduler::objective::{Objective, ObjectiveWeights};
use crate::scheduler::timeline::{validate, Constraints};
use crate::scheduler::types::{
    DataDemand, InfeasibleDemand, Schedule, ScheduleEntry, ScheduleMetrics,
};

/// Moves must beat the current score by more than this to count.
const MIN_IMPROVEMENT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerStrategy {
    /// Steepest ascent: evaluate the whole neighbourhood, take the best move.
    #[default]
    Heuristic,
    /// Take the first improving move in neighbourhood order.
    FirstImprovement,
}

impl OptimizerStrategy {
    pub const ALL: [OptimizerStrategy; 2] = [
        OptimizerStrategy::Heuristic,
        OptimizerStrategy::FirstImprovement,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            OptimizerStrategy::Heuristic => {
                "Steepest ascent: scores every move each iteration and applies the best one"
            }
            OptimizerStrategy::FirstImprovement => {
                "Applies the first improving move found each iteration"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub strategy: OptimizerStrategy,
    pub max_iterations: u32,
    #[serde(with = "crate::config::humantime_duration")]
    pub time_budget: Duration,
    pub weights: ObjectiveWeights,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: OptimizerStrategy::default(),
            max_iterations: 200,
            time_budget: Duration::seconds(5),
            weights: ObjectiveWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Move {
    /// Move a scheduled demand to another of its satellite's windows.
    Reassign {
        demand_id: String,
        from_window: String,
        to_window: String,
    },
    /// Two demands of the same satellite trade windows.
    Swap { first: String, second: String },
    /// Schedule an unmet demand.
    Insert { demand_id: String, window_id: String },
    /// Evict a scheduled demand to make room for an unmet one.
    Exchange {
        evicted: String,
        demand_id: String,
        window_id: String,
    },
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Reassign {
                demand_id,
                from_window,
                to_window,
            } => write!(f, "moved {} from {} to {}", demand_id, from_window, to_window),
            Move::Swap { first, second } => write!(f, "swapped windows of {} and {}", first, second),
            Move::Insert {
                demand_id,
                window_id,
            } => write!(f, "scheduled {} in {}", demand_id, window_id),
            Move::Exchange {
                evicted,
                demand_id,
                window_id,
            } => write!(f, "replaced {} with {} in {}", evicted, demand_id, window_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    Iterations,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No improving move left.
    Converged,
    /// Stopped early; the proposal is the best schedule found so far.
    BudgetExceeded(Budget),
}

/// Advisory result of an optimizer run. Never committed on its own; an
/// explicit approval promotes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Proposal {
    pub id: String,
    pub strategy: OptimizerStrategy,
    pub baseline_score: f64,
    pub score: f64,
    pub score_delta: f64,
    pub schedule: Schedule,
    pub unmet: Vec<InfeasibleDemand>,
    pub moves: Vec<Move>,
    pub termination: Termination,
    pub iterations: u32,
    pub metrics: ScheduleMetrics,
    pub rationale: Vec<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum OptimizeError {
    #[error("optimization cancelled")]
    Cancelled,
}

/// Everything a candidate schedule is checked against.
pub struct Problem<'a> {
    pub catalog: &'a ContactCatalog,
    pub demands: &'a [DataDemand],
    pub stations: &'a [GroundStation],
    pub constraints: &'a Constraints,
    pub downlink_rate_mbps: f64,
}

impl Problem<'_> {
    fn demand(&self, id: &str) -> Option<&DataDemand> {
        self.demands.iter().find(|d| d.id == id)
    }

    /// Every move worth trying from `current`, in a fixed order.
    fn neighbourhood(&self, current: &Schedule) -> Vec<Move> {
        let by_id: HashMap<&str, &DataDemand> =
            self.demands.iter().map(|d| (d.id.as_str(), d)).collect();
        let mut moves = Vec::new();

        for entry in current.entries() {
            let Some(demand) = by_id.get(entry.demand_id.as_str()) else {
                continue;
            };
            for window in self.catalog.windows_for(entry.satellite_id) {
                if window.id != entry.window_id && reservation(demand, window).is_some() {
                    moves.push(Move::Reassign {
                        demand_id: entry.demand_id.clone(),
                        from_window: entry.window_id.clone(),
                        to_window: window.id.clone(),
                    });
                }
            }
        }

        let entries = current.entries();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                if a.satellite_id == b.satellite_id && a.window_id != b.window_id {
                    moves.push(Move::Swap {
                        first: a.demand_id.clone(),
                        second: b.demand_id.clone(),
                    });
                }
            }
        }

        let mut unmet: Vec<&DataDemand> = self
            .demands
            .iter()
            .filter(|d| !current.is_scheduled(&d.id))
            .collect();
        unmet.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

        for demand in unmet {
            for window in self.catalog.windows_for(demand.satellite_id) {
                let Some(slot) = reservation(demand, window) else {
                    continue;
                };
                moves.push(Move::Insert {
                    demand_id: demand.id.clone(),
                    window_id: window.id.clone(),
                });
                for blocker in entries.iter().filter(|e| blocks(e, &slot)) {
                    moves.push(Move::Exchange {
                        evicted: blocker.demand_id.clone(),
                        demand_id: demand.id.clone(),
                        window_id: window.id.clone(),
                    });
                }
            }
        }
        moves
    }

    /// `current` with `mv` applied, or `None` when the move cannot even be
    /// expressed (window too short, demand not scheduled). Feasibility is
    /// left to [`validate`].
    fn apply(&self, current: &Schedule, mv: &Move) -> Option<Schedule> {
        let mut next = current.clone();
        match mv {
            Move::Reassign {
                demand_id,
                to_window,
                ..
            } => {
                next.remove(demand_id)?;
                next.insert(self.slot(demand_id, to_window)?);
            }
            Move::Swap { first, second } => {
                let a = next.remove(first)?;
                let b = next.remove(second)?;
                next.insert(self.slot(first, &b.window_id)?);
                next.insert(self.slot(second, &a.window_id)?);
            }
            Move::Insert {
                demand_id,
                window_id,
            } => {
                next.insert(self.slot(demand_id, window_id)?);
            }
            Move::Exchange {
                evicted,
                demand_id,
                window_id,
            } => {
                next.remove(evicted)?;
                next.insert(self.slot(demand_id, window_id)?);
            }
        }
        Some(next)
    }

    fn slot(&self, demand_id: &str, window_id: &str) -> Option<ScheduleEntry> {
        reservation(self.demand(demand_id)?, self.catalog.get(window_id)?)
    }

    fn is_feasible(&self, schedule: &Schedule) -> bool {
        validate(
            schedule,
            self.catalog,
            self.demands,
            self.stations,
            self.constraints,
        )
        .is_ok()
    }
}

/// Would `entry` stand in the way of `slot`: same station or same
/// satellite, overlapping in time.
fn blocks(entry: &ScheduleEntry, slot: &ScheduleEntry) -> bool {
    (entry.station_id == slot.station_id || entry.satellite_id == slot.satellite_id)
        && entry.start < slot.end
        && slot.start < entry.end
}

/// Local search from `baseline` towards a higher `objective` score.
///
/// Each iteration builds the neighbourhood of the current schedule and
/// evaluates it on the rayon pool. Every candidate is validated before it
/// is scored; only improving, feasible candidates survive. The winner is
/// then accepted on this thread, so the current schedule only ever moves
/// between validated states.
pub fn optimize(
    problem: &Problem<'_>,
    baseline: &Schedule,
    objective: &dyn Objective,
    config: &OptimizerConfig,
    abort: &AbortHandle,
) -> Result<Proposal, OptimizeError> {
    let started = Instant::now();
    let time_budget = config.time_budget.to_std().unwrap_or_default();

    let baseline_score = objective.score(baseline);
    let mut current = baseline.clone();
    let mut current_score = baseline_score;
    let mut moves = Vec::new();
    let mut iterations = 0;

    let termination = loop {
        if abort.is_aborted() {
            return Err(OptimizeError::Cancelled);
        }
        if iterations >= config.max_iterations {
            break Termination::BudgetExceeded(Budget::Iterations);
        }
        if started.elapsed() >= time_budget {
            break Termination::BudgetExceeded(Budget::Time);
        }
        iterations += 1;

        let candidates = problem.neighbourhood(&current);
        let evaluate = |(index, mv): (usize, &Move)| {
            let next = problem.apply(&current, mv)?;
            if !problem.is_feasible(&next) {
                return None;
            }
            let score = objective.score(&next);
            (score > current_score + MIN_IMPROVEMENT).then_some((index, next, score))
        };

        let accepted = match config.strategy {
            OptimizerStrategy::Heuristic => candidates
                .par_iter()
                .enumerate()
                .filter_map(evaluate)
                .reduce_with(|a, b| match a.2.total_cmp(&b.2) {
                    std::cmp::Ordering::Less => b,
                    std::cmp::Ordering::Greater => a,
                    std::cmp::Ordering::Equal if a.0 <= b.0 => a,
                    std::cmp::Ordering::Equal => b,
                }),
            OptimizerStrategy::FirstImprovement => {
                candidates.par_iter().enumerate().find_map_first(evaluate)
            }
        };

        let Some((index, next, score)) = accepted else {
            break Termination::Converged;
        };
        log::debug!(
            "Iteration {}: {} (score {:.3} -> {:.3})",
            iterations,
            candidates[index],
            current_score,
            score
        );
        moves.push(candidates[index].clone());
        current = next;
        current_score = score;
    };

    let unmet = diagnose_unmet(problem.catalog, problem.demands, &current, problem.constraints);
    let rationale = rationale(
        problem,
        &current,
        &unmet,
        &moves,
        baseline_score,
        current_score,
        termination,
    );
    log::info!(
        "Optimizer ({:?}) finished after {} iterations: score {:.3} -> {:.3}, {:?}",
        config.strategy,
        iterations,
        baseline_score,
        current_score,
        termination
    );

    Ok(Proposal {
        id: uuid::Uuid::new_v4().to_string(),
        strategy: config.strategy,
        baseline_score,
        score: current_score,
        score_delta: current_score - baseline_score,
        metrics: ScheduleMetrics::compute(&current, problem.downlink_rate_mbps),
        schedule: current,
        unmet,
        moves,
        termination,
        iterations,
        rationale,
    })
}

fn rationale(
    problem: &Problem<'_>,
    schedule: &Schedule,
    unmet: &[InfeasibleDemand],
    moves: &[Move],
    baseline_score: f64,
    score: f64,
    termination: Termination,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Score {:.3} -> {:.3} ({:+.3}) after {} moves",
        baseline_score,
        score,
        score - baseline_score,
        moves.len()
    )];
    match termination {
        Termination::Converged if moves.is_empty() => {
            lines.push("Baseline is already locally optimal".to_string())
        }
        Termination::Converged => {}
        Termination::BudgetExceeded(Budget::Iterations) => {
            lines.push("Stopped at the iteration budget; further gains may exist".to_string())
        }
        Termination::BudgetExceeded(Budget::Time) => {
            lines.push("Stopped at the time budget; further gains may exist".to_string())
        }
    }
    lines.extend(moves.iter().map(|m| format!("Applied: {}", m)));

    let mut per_satellite: BTreeMap<SatelliteId, usize> = BTreeMap::new();
    for demand in unmet {
        *per_satellite.entry(demand.satellite_id).or_default() += 1;
    }
    for (satellite_id, count) in per_satellite {
        lines.push(format!(
            "Satellite {} still has {} unmet demand(s)",
            satellite_id, count
        ));
    }

    for station in problem.stations {
        if !schedule.entries().iter().any(|e| e.station_id == station.id) {
            lines.push(format!("Station {} has no scheduled contacts", station.id));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::propagation::tests::circular_leo;
    use crate::predict::{ElementCatalog, StalenessPolicy, VisibilityParams};
    use crate::scheduler::assembler::assemble;
    use crate::scheduler::assembler::tests::{catalog, demand, window};
    use crate::scheduler::objective::WeightedObjective;
    use crate::scheduler::timeline::tests::back_to_back;
    use crate::scheduler::types::tests::at;
    use approx::assert_relative_eq;

    fn stations() -> Vec<GroundStation> {
        vec![GroundStation::new("gs", 0.0, 0.0)]
    }

    fn problem<'a>(
        catalog: &'a ContactCatalog,
        demands: &'a [DataDemand],
        stations: &'a [GroundStation],
        constraints: &'a Constraints,
    ) -> Problem<'a> {
        Problem {
            catalog,
            demands,
            stations,
            constraints,
            downlink_rate_mbps: 10.0,
        }
    }

    #[test]
    fn reassigns_to_higher_pass() {
        let catalog = catalog(vec![
            window(1, "gs", 0, 10, 20, 20.0),
            window(1, "gs", 1, 100, 110, 80.0),
        ]);
        let demands = [demand("d", 1, 1, 5)];
        let stations = stations();
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;
        assert_eq!(baseline.entries()[0].window_id, "1/gs/0");

        let problem = problem(&catalog, &demands, &stations, &constraints);
        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        let proposal = optimize(
            &problem,
            &baseline,
            &objective,
            &OptimizerConfig::default(),
            &AbortHandle::new(),
        )
        .unwrap();

        assert_eq!(proposal.schedule.entries()[0].window_id, "1/gs/1");
        assert_eq!(proposal.termination, Termination::Converged);
        assert!(proposal.score_delta > 0.0);
        assert_eq!(
            proposal.moves,
            vec![Move::Reassign {
                demand_id: "d".into(),
                from_window: "1/gs/0".into(),
                to_window: "1/gs/1".into(),
            }]
        );
        // The baseline handed in is untouched.
        assert_eq!(baseline.entries()[0].window_id, "1/gs/0");
    }

    #[test]
    fn frees_a_slot_for_an_unmet_demand() {
        let catalog = catalog(vec![
            window(1, "gs", 0, 10, 20, 30.0),
            window(1, "gs", 1, 50, 60, 60.0),
            window(2, "gs", 0, 12, 22, 30.0),
        ]);
        let demands = [demand("a", 1, 2, 5), demand("b", 2, 1, 5)];
        let stations = stations();
        let constraints = back_to_back();
        let assembly = assemble(&catalog, &demands, &stations, &constraints);
        assert_eq!(assembly.unmet.len(), 1);

        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        for strategy in [OptimizerStrategy::Heuristic, OptimizerStrategy::FirstImprovement] {
            let config = OptimizerConfig {
                strategy,
                ..OptimizerConfig::default()
            };
            let proposal = optimize(
                &problem(&catalog, &demands, &stations, &constraints),
                &assembly.schedule,
                &objective,
                &config,
                &AbortHandle::new(),
            )
            .unwrap();

            assert_eq!(proposal.schedule.len(), 2, "{:?}", strategy);
            assert!(proposal.unmet.is_empty());
            assert_eq!(proposal.schedule.entry_for("a").unwrap().window_id, "1/gs/1");
            validate(&proposal.schedule, &catalog, &demands, &stations, &constraints).unwrap();
        }
    }

    #[test]
    fn custom_objective_drives_the_search() {
        let catalog = catalog(vec![
            window(1, "gs", 0, 10, 20, 80.0),
            window(1, "gs", 1, 300, 310, 10.0),
        ]);
        let demands = [demand("d", 1, 1, 5)];
        let stations = stations();
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;

        let latest = |s: &Schedule| {
            s.entries()
                .iter()
                .map(|e| e.start.timestamp() as f64)
                .sum::<f64>()
        };
        let proposal = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &latest,
            &OptimizerConfig::default(),
            &AbortHandle::new(),
        )
        .unwrap();
        assert_eq!(proposal.schedule.entries()[0].start, at(300));
    }

    #[test]
    fn zero_iteration_budget_returns_baseline() {
        let catalog = catalog(vec![
            window(1, "gs", 0, 10, 20, 20.0),
            window(1, "gs", 1, 100, 110, 80.0),
        ]);
        let demands = [demand("d", 1, 1, 5)];
        let stations = stations();
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;
        let config = OptimizerConfig {
            max_iterations: 0,
            ..OptimizerConfig::default()
        };
        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        let proposal = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &objective,
            &config,
            &AbortHandle::new(),
        )
        .unwrap();

        assert_eq!(proposal.termination, Termination::BudgetExceeded(Budget::Iterations));
        assert_eq!(proposal.schedule, baseline);
        assert_eq!(proposal.score_delta, 0.0);
    }

    #[test]
    fn abort_discards_the_search() {
        let catalog = catalog(vec![window(1, "gs", 0, 10, 20, 20.0)]);
        let demands = [demand("d", 1, 1, 5)];
        let stations = stations();
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;
        let abort = AbortHandle::new();
        abort.abort();
        let result = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &|s: &Schedule| s.len() as f64,
            &OptimizerConfig::default(),
            &abort,
        );
        assert_eq!(result, Err(OptimizeError::Cancelled));
    }

    #[test]
    fn never_regresses_on_real_passes() {
        let sets: ElementCatalog = [
            circular_leo(1, 51.6, 550.0),
            circular_leo(2, 97.6, 600.0),
            circular_leo(3, 45.0, 500.0),
        ]
        .into_iter()
        .collect();
        let stations = [
            GroundStation::new("nyc", 40.7, -74.0),
            GroundStation {
                cost_per_minute: 3.0,
                ..GroundStation::new("lisbon", 38.7, -9.1)
            },
            GroundStation::new("svalbard", 78.2, 15.4).with_mask(5.0),
        ];
        let catalog = ContactCatalog::build(
            &sets,
            &stations,
            &VisibilityParams::new(at(0), at(12 * 60)),
            &StalenessPolicy::default(),
            &AbortHandle::new(),
        )
        .unwrap();
        let demands: Vec<_> = (1..=3)
            .flat_map(|sat| {
                (0..5).map(move |i| demand(&format!("sat{}-{}", sat, i), sat, 1 + i as u32, 4))
            })
            .collect();
        let constraints = Constraints {
            turnaround: Duration::minutes(1),
            ..back_to_back()
        };
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;
        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        let proposal = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &objective,
            &OptimizerConfig::default(),
            &AbortHandle::new(),
        )
        .unwrap();

        assert!(proposal.score >= proposal.baseline_score);
        validate(&proposal.schedule, &catalog, &demands, &stations, &constraints).unwrap();
        assert_eq!(
            proposal.schedule.len() + proposal.unmet.len(),
            demands.len()
        );
        assert!(!proposal.rationale.is_empty());
    }

    #[test]
    fn swaps_windows_between_demands_of_one_satellite() {
        let catalog = catalog(vec![
            window(1, "pricey", 0, 10, 30, 40.0),
            window(1, "cheap", 0, 100, 120, 40.0),
        ]);
        let demands = [demand("long", 1, 1, 15), demand("short", 1, 1, 5)];
        let stations = [
            GroundStation {
                cost_per_minute: 10.0,
                ..GroundStation::new("pricey", 0.0, 0.0)
            },
            GroundStation {
                cost_per_minute: 0.0,
                ..GroundStation::new("cheap", 0.0, 0.0)
            },
        ];
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;
        assert_eq!(baseline.entry_for("long").unwrap().station_id, "pricey");
        assert_eq!(baseline.entry_for("short").unwrap().station_id, "cheap");

        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        let proposal = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &objective,
            &OptimizerConfig::default(),
            &AbortHandle::new(),
        )
        .unwrap();

        assert_eq!(
            proposal.moves,
            vec![Move::Swap {
                first: "long".into(),
                second: "short".into(),
            }]
        );
        assert_eq!(proposal.schedule.entry_for("long").unwrap().station_id, "cheap");
        assert_eq!(proposal.schedule.entry_for("short").unwrap().station_id, "pricey");
        assert_relative_eq!(proposal.score_delta, 1.0, epsilon = 1e-9);
        assert_eq!(proposal.termination, Termination::Converged);
        validate(&proposal.schedule, &catalog, &demands, &stations, &constraints).unwrap();
    }

    #[test]
    fn exchange_evicts_a_lower_value_entry() {
        let catalog = catalog(vec![
            window(1, "gs", 0, 10, 20, 40.0),
            window(2, "gs", 0, 10, 20, 40.0),
        ]);
        let low = demand("low", 1, 1, 5);
        let high = demand("high", 2, 5, 5);
        let demands = [low.clone(), high];
        let stations = stations();
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &[low], &stations, &constraints).schedule;
        assert!(baseline.is_scheduled("low"));

        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        let proposal = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &objective,
            &OptimizerConfig::default(),
            &AbortHandle::new(),
        )
        .unwrap();

        assert_eq!(
            proposal.moves,
            vec![Move::Exchange {
                evicted: "low".into(),
                demand_id: "high".into(),
                window_id: "2/gs/0".into(),
            }]
        );
        assert!(proposal.schedule.is_scheduled("high"));
        assert!(!proposal.schedule.is_scheduled("low"));
        let unmet: Vec<_> = proposal.unmet.iter().map(|u| u.demand_id.as_str()).collect();
        assert_eq!(unmet, ["low"]);
        assert!(proposal.score > proposal.baseline_score);
    }

    #[test]
    fn exhausted_time_budget_keeps_the_best_so_far() {
        let catalog = catalog(vec![
            window(1, "gs", 0, 10, 20, 20.0),
            window(1, "gs", 1, 100, 110, 80.0),
        ]);
        let demands = [demand("d", 1, 1, 5)];
        let stations = stations();
        let constraints = back_to_back();
        let baseline = assemble(&catalog, &demands, &stations, &constraints).schedule;
        let config = OptimizerConfig {
            time_budget: Duration::zero(),
            ..OptimizerConfig::default()
        };
        let objective = WeightedObjective::new(ObjectiveWeights::default(), &stations);
        let proposal = optimize(
            &problem(&catalog, &demands, &stations, &constraints),
            &baseline,
            &objective,
            &config,
            &AbortHandle::new(),
        )
        .unwrap();

        assert_eq!(proposal.termination, Termination::BudgetExceeded(Budget::Time));
        assert!(proposal.score >= proposal.baseline_score);
        assert_eq!(proposal.schedule, baseline);
        assert!(proposal.rationale.iter().any(|line| line.contains("time budget")));
    }

    #[test]
    fn strategies_are_listed_with_descriptions() {
        assert_eq!(OptimizerStrategy::ALL[0], OptimizerStrategy::default());
        assert!(OptimizerStrategy::ALL
            .iter()
            .all(|s| !s.description().is_empty()));
    }
}
