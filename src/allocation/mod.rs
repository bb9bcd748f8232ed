// Allocation engine: agent selection, restock planning, two-phase ledger/agent transfers

mod engine;
mod plan;
mod policy;

pub use engine::{AllocationEngine, LoadReceipt, Relocation, RestockReceipt, UnloadReceipt};
pub use plan::{
    plan_route, restock_needs, restock_priority, PlanStep, RestockNeed, RestockOutcome,
    RestockPlan,
};
pub use policy::{FirstAvailable, SelectionPolicy};

/// Restock source location
pub const RECEIVING: &str = "receiving";

#[cfg(test)]
mod tests;
