pub mod checkpoint;
pub mod fixed;
pub mod operator;
pub mod probability;
pub mod status;

pub use checkpoint::Checkpoint;
pub use fixed::Fixed6;
pub use operator::{OperatorKind, StressOperator};
pub use probability::Probability;
pub use status::{Codes, Status};

/// Population size used for every combinatorial computation.
pub const DECK_SIZE: u32 = 99;
