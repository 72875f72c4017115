pub mod checkpoint;
pub mod codes;
pub mod engine;
pub mod kernel;
pub mod model;
pub mod payload;
pub mod policy;
pub mod scenario;
pub mod stress;

pub use engine::{AnalysisReport, AnalysisRequest, StressEngine};

pub struct EngineInfo;

impl EngineInfo {
    pub const fn name() -> &'static str {
        "deckstress"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
