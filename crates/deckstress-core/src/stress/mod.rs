//! Stress transform pipeline.
//!
//! - `normalize`: revalidation, turn defaults, and deterministic ordering.
//! - `replay`: per-bucket running state and operator effects.

mod normalize;
mod replay;

pub use normalize::{ScheduledOperator, normalize_operators, order_operators};
pub use replay::{BucketImpact, BucketRunningState, OperatorEffect};

use serde::Serialize;
use tracing::{Level, event};

use crate::checkpoint::{BucketProbabilities, BucketState, CheckpointDraw, CheckpointProbability};
use crate::codes;
use crate::kernel::ProbabilityKernel;
use crate::model::{Checkpoint, Codes, Fixed6, Probability, Status, StressOperator};
use crate::policy::OperatorPolicy;
use crate::scenario::{ScenarioDefinition, SelectionSource};

/// Upstream snapshots for one pipeline run. Any `None` is a SKIP.
#[derive(Clone, Copy, Default)]
pub struct StressInputs<'a> {
    pub buckets: Option<&'a [BucketState]>,
    pub checkpoint_draws: Option<&'a [CheckpointDraw]>,
    pub scenario: Option<&'a ScenarioDefinition>,
    pub selection_source: Option<SelectionSource>,
    pub kernel: Option<&'a dyn ProbabilityKernel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustedEffectiveK {
    pub bucket: String,
    #[serde(rename = "effective_K_before")]
    pub effective_k_before: Fixed6,
    #[serde(rename = "K_int_before")]
    pub k_int_before: u32,
    #[serde(rename = "effective_K_after")]
    pub effective_k_after: Fixed6,
    #[serde(rename = "K_int_after")]
    pub k_int_after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorImpact {
    pub operator_index: usize,
    pub operator: StressOperator,
    pub bucket_impacts: Vec<BucketImpact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbabilityDelta {
    pub checkpoint: Checkpoint,
    pub p_before: Probability,
    pub p_after: Probability,
    pub delta: Fixed6,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketDeltas {
    pub bucket: String,
    pub deltas_by_checkpoint: Vec<ProbabilityDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressReport {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    pub codes: Codes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_source: Option<SelectionSource>,
    pub checkpoints: Vec<Checkpoint>,
    pub checkpoint_draws: Vec<CheckpointDraw>,
    pub operators_applied: Vec<StressOperator>,
    #[serde(rename = "stress_adjusted_effective_K")]
    pub stress_adjusted_effective_k: Vec<AdjustedEffectiveK>,
    pub stress_adjusted_probabilities_by_bucket: Vec<BucketProbabilities>,
    pub probability_deltas_by_bucket: Vec<BucketDeltas>,
    pub operator_impacts: Vec<OperatorImpact>,
}

impl StressReport {
    fn skipped(reason: &str, inputs: &StressInputs<'_>) -> Self {
        event!(
            target: "deckstress::stress",
            Level::INFO,
            reason,
            "stress pipeline skipped"
        );
        Self {
            status: Status::Skip,
            reason_code: Some(reason.to_string()),
            codes: Codes::new(),
            selected_model_id: inputs.scenario.map(|scenario| scenario.model_id.clone()),
            selection_source: inputs.selection_source,
            checkpoints: Checkpoint::ALL.to_vec(),
            checkpoint_draws: Vec::new(),
            operators_applied: Vec::new(),
            stress_adjusted_effective_k: Vec::new(),
            stress_adjusted_probabilities_by_bucket: Vec::new(),
            probability_deltas_by_bucket: Vec::new(),
            operator_impacts: Vec::new(),
        }
    }

    /// Final probability for one bucket and checkpoint, if computed.
    pub fn final_probability(&self, bucket: &str, checkpoint: Checkpoint) -> Option<Probability> {
        self.stress_adjusted_probabilities_by_bucket
            .iter()
            .find(|entry| entry.bucket == bucket)?
            .probabilities_by_checkpoint
            .iter()
            .find(|entry| entry.checkpoint == checkpoint)
            .map(|entry| entry.p_ge_1)
    }
}

/// Draws must cover every canonical checkpoint exactly once; returned in
/// ascending checkpoint order.
fn canonical_draws(draws: &[CheckpointDraw]) -> Option<Vec<CheckpointDraw>> {
    Checkpoint::ALL
        .iter()
        .map(|checkpoint| draws.iter().find(|draw| draw.checkpoint == *checkpoint).copied())
        .collect()
}

/// Replays the scenario's operators in policy order against each bucket's
/// baseline and records the trajectory.
pub fn run_stress_pipeline(inputs: StressInputs<'_>, policy: &OperatorPolicy) -> StressReport {
    let Some(buckets) = inputs.buckets.filter(|buckets| !buckets.is_empty()) else {
        return StressReport::skipped(codes::BUCKET_DATA_UNAVAILABLE, &inputs);
    };
    let Some(draws) = inputs.checkpoint_draws.and_then(canonical_draws) else {
        return StressReport::skipped(codes::CHECKPOINT_DATA_UNAVAILABLE, &inputs);
    };
    let Some(scenario) = inputs.scenario else {
        return StressReport::skipped(codes::SCENARIO_UNAVAILABLE, &inputs);
    };
    let Some(kernel) = inputs.kernel else {
        return StressReport::skipped(codes::KERNEL_UNAVAILABLE, &inputs);
    };

    let mut codes = Codes::new();
    codes.extend(&scenario.rejected);
    let scheduled = normalize_operators(&scenario.operators, policy, &mut codes);

    let mut ordered_buckets: Vec<&BucketState> = buckets.iter().collect();
    ordered_buckets.sort_by(|a, b| a.bucket.cmp(&b.bucket));
    ordered_buckets.dedup_by(|a, b| a.bucket == b.bucket);

    let mut baselines = Vec::with_capacity(ordered_buckets.len());
    for bucket in ordered_buckets {
        match BucketRunningState::baseline(bucket, &draws, kernel) {
            Ok(state) => baselines.push(state),
            Err(err) => {
                event!(
                    target: "deckstress::stress",
                    Level::ERROR,
                    bucket = %bucket.bucket,
                    error = %err,
                    reason = codes::KERNEL_FAILURE,
                );
                codes.error(codes::KERNEL_FAILURE);
            }
        }
    }

    let mut states = baselines.clone();
    let mut impacts = Vec::with_capacity(scheduled.len());
    for (operator_index, entry) in scheduled.iter().enumerate() {
        let effect = OperatorEffect::of(&entry.operator);
        let mut bucket_impacts = Vec::with_capacity(states.len());
        for state in states.iter_mut() {
            let before = state.clone();
            if let Err(err) = state.apply(effect, &draws, kernel) {
                event!(
                    target: "deckstress::stress",
                    Level::ERROR,
                    bucket = %state.bucket,
                    operator_index,
                    error = %err,
                    reason = codes::KERNEL_FAILURE,
                );
                codes.error(codes::KERNEL_FAILURE);
            }
            bucket_impacts.push(BucketImpact::between(&before, state));
        }
        if tracing::enabled!(Level::DEBUG) {
            event!(
                target: "deckstress::stress",
                Level::DEBUG,
                operator_index,
                operator = %entry.canonical,
                resource_effect = effect.affects_resources(),
                buckets = bucket_impacts.len(),
            );
        }
        if policy.record_impacts() {
            impacts.push(OperatorImpact {
                operator_index,
                operator: entry.operator.clone(),
                bucket_impacts,
            });
        }
    }

    let stress_adjusted_effective_k = baselines
        .iter()
        .zip(states.iter())
        .map(|(before, after)| AdjustedEffectiveK {
            bucket: after.bucket.clone(),
            effective_k_before: before.effective_k,
            k_int_before: before.k_int,
            effective_k_after: after.effective_k,
            k_int_after: after.k_int,
        })
        .collect();

    let stress_adjusted_probabilities_by_bucket = states
        .iter()
        .map(|state| BucketProbabilities {
            bucket: state.bucket.clone(),
            probabilities_by_checkpoint: state.probabilities_by_checkpoint(),
        })
        .collect();

    let probability_deltas_by_bucket = baselines
        .iter()
        .zip(states.iter())
        .map(|(before, after)| BucketDeltas {
            bucket: after.bucket.clone(),
            deltas_by_checkpoint: deltas(before, after),
        })
        .collect();

    let status = if codes.has_errors() { Status::Error } else { Status::Ok };
    event!(
        target: "deckstress::stress",
        Level::INFO,
        model_id = %scenario.model_id,
        status = status.as_str(),
        operators = scheduled.len(),
        buckets = states.len(),
    );

    StressReport {
        status,
        reason_code: None,
        codes,
        selected_model_id: Some(scenario.model_id.clone()),
        selection_source: inputs.selection_source,
        checkpoints: Checkpoint::ALL.to_vec(),
        checkpoint_draws: draws,
        operators_applied: scheduled.into_iter().map(|entry| entry.operator).collect(),
        stress_adjusted_effective_k,
        stress_adjusted_probabilities_by_bucket,
        probability_deltas_by_bucket,
        operator_impacts: impacts,
    }
}

fn deltas(before: &BucketRunningState, after: &BucketRunningState) -> Vec<ProbabilityDelta> {
    after
        .probabilities_by_checkpoint()
        .into_iter()
        .map(|CheckpointProbability { checkpoint, p_ge_1 }| {
            let p_before = before.probabilities.get(&checkpoint).copied().unwrap_or(p_ge_1);
            ProbabilityDelta {
                checkpoint,
                p_before,
                p_after: p_ge_1,
                delta: p_ge_1.delta_from(p_before),
            }
        })
        .collect()
}
