pub mod approval;
pub mod assembler;
pub mod objective;
pub mod optimizer;
pub mod request;
pub mod runner;
pub mod storage;
pub mod timeline;
pub mod types;

pub use approval::{ApprovalError, CommittedRecord, ProposedRecord};
pub use assembler::{assemble, Assembly};
pub use objective::{Objective, ObjectiveWeights, WeightedObjective};
pub use optimizer::{
    optimize, Budget, Move, OptimizeError, OptimizerConfig, OptimizerStrategy, Problem, Proposal,
    Termination,
};
pub use request::{ParseError, ScheduleRequest, StationRequest};
pub use runner::{contact_windows, preflight, run, RunError, RunReport};
pub use storage::{SavedRun, ScheduleState, ScheduleSummary, Storage, StorageError};
pub use timeline::{validate, Constraints, Timeline, Violation};
pub use types::{
    DataDemand, InfeasibleDemand, Schedule, ScheduleEntry, ScheduleMetrics, UnmetReason,
};
