pub mod processing_unit;
pub mod unit_flow;

pub use processing_unit::ProcessingUnit;
pub use unit_flow::{UnitFlow, UnitOutcome};
