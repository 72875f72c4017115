//! Diagnostic codes reported by every layer.
//!
//! Codes are plain upper-snake strings so downstream tooling can match on
//! them without depending on this crate's types.

// Checkpoint layer.
pub const NO_BUCKETS: &str = "NO_BUCKETS";
pub const POLICY_UNAVAILABLE: &str = "POLICY_UNAVAILABLE";
pub const CHECKPOINT_EFFECTIVE_N_FLOORED: &str = "CHECKPOINT_EFFECTIVE_N_FLOORED";
pub const BUCKET_K_INT_MISMATCH: &str = "BUCKET_K_INT_MISMATCH";
pub const BUCKET_DUPLICATE: &str = "BUCKET_DUPLICATE";
pub const BUCKET_FIELD_INVALID: &str = "BUCKET_FIELD_INVALID";
pub const KERNEL_FAILURE: &str = "KERNEL_FAILURE";

// Scenario selection.
pub const SELECTION_UNAVAILABLE: &str = "SELECTION_UNAVAILABLE";
pub const SELECTION_OVERRIDE_UNKNOWN: &str = "SELECTION_OVERRIDE_UNKNOWN";
pub const SELECTION_MODEL_UNREGISTERED: &str = "SELECTION_MODEL_UNREGISTERED";

// Operator field contracts.
pub const OPERATOR_KIND_MISSING: &str = "OPERATOR_KIND_MISSING";
pub const OPERATOR_KIND_UNKNOWN: &str = "OPERATOR_KIND_UNKNOWN";
pub const OPERATOR_COUNT_INVALID: &str = "OPERATOR_COUNT_INVALID";
pub const OPERATOR_BY_TURN_INVALID: &str = "OPERATOR_BY_TURN_INVALID";
pub const OPERATOR_BY_TURN_MISSING: &str = "OPERATOR_BY_TURN_MISSING";
pub const OPERATOR_SURVIVING_FRACTION_INVALID: &str = "OPERATOR_SURVIVING_FRACTION_INVALID";
pub const OPERATOR_TURNS_INVALID: &str = "OPERATOR_TURNS_INVALID";
pub const OPERATOR_GRAVEYARD_PENALTY_INVALID: &str = "OPERATOR_GRAVEYARD_PENALTY_INVALID";
pub const OPERATOR_INFLATION_INVALID: &str = "OPERATOR_INFLATION_INVALID";
pub const OPERATOR_PENALTY_INVALID: &str = "OPERATOR_PENALTY_INVALID";

// Stress pipeline preconditions.
pub const BUCKET_DATA_UNAVAILABLE: &str = "BUCKET_DATA_UNAVAILABLE";
pub const CHECKPOINT_DATA_UNAVAILABLE: &str = "CHECKPOINT_DATA_UNAVAILABLE";
pub const SCENARIO_UNAVAILABLE: &str = "SCENARIO_UNAVAILABLE";
pub const KERNEL_UNAVAILABLE: &str = "KERNEL_UNAVAILABLE";
