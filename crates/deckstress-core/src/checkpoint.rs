//! Baseline draw probabilities per resource bucket and checkpoint.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{Level, event};

use crate::codes;
use crate::kernel::ProbabilityKernel;
use crate::model::{Checkpoint, Codes, DECK_SIZE, Fixed6, Probability, Status};
use crate::payload::{DrawPolicyPayload, ResourceBucketsPayload};

/// Cards effectively seen by one checkpoint under the default draw policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckpointDraw {
    pub checkpoint: Checkpoint,
    pub effective_n: Fixed6,
    pub n_int: u32,
}

/// A validated resource bucket: effective K and its floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketState {
    pub bucket: String,
    #[serde(rename = "effective_K")]
    pub effective_k: Fixed6,
    #[serde(rename = "K_int")]
    pub k_int: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckpointProbability {
    pub checkpoint: Checkpoint,
    pub p_ge_1: Probability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketProbabilities {
    pub bucket: String,
    pub probabilities_by_checkpoint: Vec<CheckpointProbability>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointReport {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    pub codes: Codes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    pub checkpoints: Vec<Checkpoint>,
    pub checkpoint_draws: Vec<CheckpointDraw>,
    pub buckets: Vec<BucketState>,
    pub probabilities_by_bucket: Vec<BucketProbabilities>,
}

impl CheckpointReport {
    fn skipped(reason: &str, policy: Option<String>) -> Self {
        Self {
            status: Status::Skip,
            reason_code: Some(reason.to_string()),
            codes: Codes::new(),
            policy,
            checkpoints: Checkpoint::ALL.to_vec(),
            checkpoint_draws: Vec::new(),
            buckets: Vec::new(),
            probabilities_by_bucket: Vec::new(),
        }
    }
}

pub fn deck_bounds() -> (Fixed6, Fixed6) {
    (Fixed6::ZERO, Fixed6::from_int(DECK_SIZE as i64))
}

/// Clamps to `[0, N]` (the value is already rounded to six decimals) and floors.
pub fn clamp_and_floor(value: Fixed6) -> (Fixed6, u32) {
    let (lo, hi) = deck_bounds();
    let clamped = value.clamp_to(lo, hi);
    (clamped, clamped.floor_int() as u32)
}

/// Resolves the default policy's effective draws, one per canonical
/// checkpoint, in ascending checkpoint order. `None` when the policy or any
/// checkpoint is missing, or when either is listed more than once.
pub fn resolve_checkpoint_draws(payload: &DrawPolicyPayload) -> Option<Vec<CheckpointDraw>> {
    let mut matching = payload
        .policy_effective_n
        .iter()
        .filter(|entry| entry.policy == payload.default_policy);
    let policy = matching.next()?;
    if matching.next().is_some() {
        event!(
            target: "deckstress::checkpoint",
            Level::WARN,
            policy = %payload.default_policy,
            "draw policy listed more than once"
        );
        return None;
    }

    let mut by_checkpoint: BTreeMap<Checkpoint, f64> = BTreeMap::new();
    for entry in &policy.effective_n_by_checkpoint {
        let Some(checkpoint) = Checkpoint::from_value(entry.checkpoint) else {
            continue;
        };
        if by_checkpoint.insert(checkpoint, entry.effective_n).is_some() {
            event!(
                target: "deckstress::checkpoint",
                Level::WARN,
                policy = %payload.default_policy,
                checkpoint = checkpoint.value(),
                "checkpoint listed more than once"
            );
            return None;
        }
    }

    Checkpoint::ALL
        .iter()
        .map(|checkpoint| {
            let raw = by_checkpoint.get(checkpoint)?;
            let (effective_n, n_int) = clamp_and_floor(Fixed6::from_f64(*raw)?);
            Some(CheckpointDraw {
                checkpoint: *checkpoint,
                effective_n,
                n_int,
            })
        })
        .collect()
}

/// Validates buckets against their claimed floors. Buckets are returned
/// sorted by id; rejected ones are reported in `codes` and left out.
pub fn validate_buckets(payload: &ResourceBucketsPayload, codes: &mut Codes) -> Vec<BucketState> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for id in payload.buckets.iter().filter_map(|bucket| bucket.id()) {
        *seen.entry(id).or_default() += 1;
    }
    let duplicates: BTreeSet<&str> = seen
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| *id)
        .collect();

    let mut states = Vec::with_capacity(payload.buckets.len());
    for (index, bucket) in payload.buckets.iter().enumerate() {
        let fields = bucket
            .id()
            .zip(bucket.effective_k().and_then(Fixed6::from_f64))
            .zip(bucket.k_int());
        let Some(((id, raw), supplied_k_int)) = fields else {
            event!(
                target: "deckstress::checkpoint",
                Level::WARN,
                index,
                bucket = ?bucket.bucket,
                reason = codes::BUCKET_FIELD_INVALID,
            );
            codes.error(codes::BUCKET_FIELD_INVALID);
            continue;
        };
        if duplicates.contains(id) {
            codes.error(codes::BUCKET_DUPLICATE);
            continue;
        }
        let (effective_k, k_int) = clamp_and_floor(raw);
        if i64::from(k_int) != supplied_k_int {
            event!(
                target: "deckstress::checkpoint",
                Level::WARN,
                bucket = id,
                effective_k = %effective_k,
                expected_k_int = k_int,
                supplied_k_int,
                reason = codes::BUCKET_K_INT_MISMATCH,
            );
            codes.error(codes::BUCKET_K_INT_MISMATCH);
            continue;
        }
        states.push(BucketState {
            bucket: id.to_string(),
            effective_k,
            k_int,
        });
    }
    states.sort_by(|a, b| a.bucket.cmp(&b.bucket));
    states
}

/// Computes `P(at least one)` for every bucket at every checkpoint.
pub fn compute_checkpoint_probabilities(
    buckets: &ResourceBucketsPayload,
    draws: &DrawPolicyPayload,
    kernel: &dyn ProbabilityKernel,
) -> CheckpointReport {
    if buckets.buckets.is_empty() {
        return CheckpointReport::skipped(codes::NO_BUCKETS, None);
    }
    let policy = Some(draws.default_policy.clone());
    let Some(checkpoint_draws) = resolve_checkpoint_draws(draws) else {
        event!(
            target: "deckstress::checkpoint",
            Level::INFO,
            policy = %draws.default_policy,
            reason = codes::POLICY_UNAVAILABLE,
        );
        return CheckpointReport::skipped(codes::POLICY_UNAVAILABLE, policy);
    };

    let mut codes = Codes::new();
    for draw in &checkpoint_draws {
        if !draw.effective_n.is_integral() {
            codes.warn(codes::CHECKPOINT_EFFECTIVE_N_FLOORED);
        }
    }

    let states = validate_buckets(buckets, &mut codes);
    let mut probabilities_by_bucket = Vec::with_capacity(states.len());
    for state in &states {
        match bucket_probabilities(state, &checkpoint_draws, kernel) {
            Ok(probabilities) => probabilities_by_bucket.push(BucketProbabilities {
                bucket: state.bucket.clone(),
                probabilities_by_checkpoint: probabilities,
            }),
            Err(err) => {
                event!(
                    target: "deckstress::checkpoint",
                    Level::ERROR,
                    bucket = %state.bucket,
                    error = %err,
                    reason = codes::KERNEL_FAILURE,
                );
                codes.error(codes::KERNEL_FAILURE);
            }
        }
    }

    CheckpointReport {
        status: codes.status(),
        reason_code: None,
        codes,
        policy,
        checkpoints: Checkpoint::ALL.to_vec(),
        checkpoint_draws,
        buckets: states,
        probabilities_by_bucket,
    }
}

/// Kernel evaluation of one bucket across the given draws.
pub fn bucket_probabilities(
    state: &BucketState,
    draws: &[CheckpointDraw],
    kernel: &dyn ProbabilityKernel,
) -> Result<Vec<CheckpointProbability>, crate::kernel::KernelError> {
    draws
        .iter()
        .map(|draw| {
            kernel
                .p_ge_1(DECK_SIZE as i64, state.k_int as i64, draw.n_int as i64)
                .map(|p_ge_1| CheckpointProbability {
                    checkpoint: draw.checkpoint,
                    p_ge_1,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{ExactKernel, hypergeom_p_ge_1};
    use crate::payload::{BucketPayload, CheckpointEffectiveN, PolicyEffectiveN};

    fn draws(values: &[(u32, f64)]) -> DrawPolicyPayload {
        DrawPolicyPayload {
            default_policy: "london_keep7".to_string(),
            policy_effective_n: vec![
                PolicyEffectiveN {
                    policy: "aggressive".to_string(),
                    effective_n_by_checkpoint: Vec::new(),
                },
                PolicyEffectiveN {
                    policy: "london_keep7".to_string(),
                    effective_n_by_checkpoint: values
                        .iter()
                        .map(|(checkpoint, effective_n)| CheckpointEffectiveN {
                            checkpoint: *checkpoint,
                            effective_n: *effective_n,
                        })
                        .collect(),
                },
            ],
        }
    }

    fn bucket(id: &str, effective_k: f64, k_int: i64) -> BucketPayload {
        BucketPayload::new(id, effective_k, k_int)
    }

    fn standard_draws() -> DrawPolicyPayload {
        draws(&[(12, 12.0), (7, 7.0), (10, 10.0), (9, 9.0)])
    }

    #[test]
    fn empty_buckets_skip() {
        let report = compute_checkpoint_probabilities(
            &ResourceBucketsPayload::default(),
            &standard_draws(),
            &ExactKernel,
        );
        assert_eq!(report.status, Status::Skip);
        assert_eq!(report.reason_code.as_deref(), Some(codes::NO_BUCKETS));
    }

    #[test]
    fn missing_checkpoint_skips_with_policy_unavailable() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("RAMP", 12.5, 12)],
        };
        let report = compute_checkpoint_probabilities(
            &buckets,
            &draws(&[(7, 7.0), (9, 9.0), (10, 10.0)]),
            &ExactKernel,
        );
        assert_eq!(report.status, Status::Skip);
        assert_eq!(report.reason_code.as_deref(), Some(codes::POLICY_UNAVAILABLE));

        let mut unknown_policy = standard_draws();
        unknown_policy.default_policy = "missing".to_string();
        let report = compute_checkpoint_probabilities(&buckets, &unknown_policy, &ExactKernel);
        assert_eq!(report.reason_code.as_deref(), Some(codes::POLICY_UNAVAILABLE));
    }

    #[test]
    fn computes_sorted_probabilities() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("RAMP", 12.5, 12), bucket("DRAW", 8.0, 8)],
        };
        let report = compute_checkpoint_probabilities(&buckets, &standard_draws(), &ExactKernel);
        assert_eq!(report.status, Status::Ok);
        let ids: Vec<&str> = report
            .probabilities_by_bucket
            .iter()
            .map(|entry| entry.bucket.as_str())
            .collect();
        assert_eq!(ids, vec!["DRAW", "RAMP"]);
        let ramp = &report.probabilities_by_bucket[1].probabilities_by_checkpoint;
        let checkpoints: Vec<u32> = ramp.iter().map(|p| p.checkpoint.value()).collect();
        assert_eq!(checkpoints, vec![7, 9, 10, 12]);
        assert_eq!(ramp[3].p_ge_1, hypergeom_p_ge_1(99, 12, 12).unwrap());
    }

    #[test]
    fn fractional_effective_n_warns_but_proceeds() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("RAMP", 12.0, 12)],
        };
        let report = compute_checkpoint_probabilities(
            &buckets,
            &draws(&[(7, 7.4), (9, 9.0), (10, 10.0), (12, 12.0)]),
            &ExactKernel,
        );
        assert_eq!(report.status, Status::Warn);
        assert!(report.codes.contains(codes::CHECKPOINT_EFFECTIVE_N_FLOORED));
        assert_eq!(report.checkpoint_draws[0].n_int, 7);
        assert_eq!(report.probabilities_by_bucket.len(), 1);
    }

    #[test]
    fn mismatched_k_int_excludes_only_that_bucket() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("RAMP", 12.5, 13), bucket("DRAW", 8.0, 8)],
        };
        let report = compute_checkpoint_probabilities(
            &buckets,
            &draws(&[(7, 7.5), (9, 9.0), (10, 10.0), (12, 12.0)]),
            &ExactKernel,
        );
        assert_eq!(report.status, Status::Error);
        assert_eq!(
            report.codes.to_sorted_vec(),
            vec![
                codes::BUCKET_K_INT_MISMATCH.to_string(),
                codes::CHECKPOINT_EFFECTIVE_N_FLOORED.to_string()
            ]
        );
        assert_eq!(report.buckets.len(), 1);
        assert_eq!(report.probabilities_by_bucket[0].bucket, "DRAW");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("ALL", 150.0, 99), bucket("NONE", -3.0, 0)],
        };
        let report = compute_checkpoint_probabilities(
            &buckets,
            &draws(&[(7, 7.0), (9, 9.0), (10, 10.0), (12, 120.0)]),
            &ExactKernel,
        );
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.checkpoint_draws[3].n_int, 99);
        assert_eq!(report.buckets[0].effective_k, Fixed6::from_int(99));
        assert_eq!(report.buckets[1].effective_k, Fixed6::ZERO);
    }

    #[test]
    fn duplicate_bucket_ids_are_rejected_together() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![
                bucket("RAMP", 12.0, 12),
                bucket("RAMP", 6.0, 6),
                bucket("DRAW", 4.0, 4),
            ],
        };
        let report = compute_checkpoint_probabilities(&buckets, &standard_draws(), &ExactKernel);
        assert_eq!(report.status, Status::Error);
        assert!(report.codes.contains(codes::BUCKET_DUPLICATE));
        assert_eq!(report.buckets.len(), 1);
        assert_eq!(report.buckets[0].bucket, "DRAW");
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let forward = ResourceBucketsPayload {
            buckets: vec![bucket("A", 3.0, 3), bucket("B", 20.25, 20), bucket("C", 0.5, 0)],
        };
        let mut reversed = forward.clone();
        reversed.buckets.reverse();
        let a = compute_checkpoint_probabilities(&forward, &standard_draws(), &ExactKernel);
        let b = compute_checkpoint_probabilities(&reversed, &standard_draws(), &ExactKernel);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn repeated_checkpoint_entries_skip_regardless_of_order() {
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("RAMP", 12.5, 12)],
        };
        let forward = draws(&[(7, 7.0), (7, 8.0), (9, 9.0), (10, 10.0), (12, 12.0)]);
        let mut reversed = forward.clone();
        for entry in &mut reversed.policy_effective_n {
            entry.effective_n_by_checkpoint.reverse();
        }

        let a = compute_checkpoint_probabilities(&buckets, &forward, &ExactKernel);
        let b = compute_checkpoint_probabilities(&buckets, &reversed, &ExactKernel);
        assert_eq!(a.status, Status::Skip);
        assert_eq!(a.reason_code.as_deref(), Some(codes::POLICY_UNAVAILABLE));
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn repeated_default_policy_is_unavailable() {
        let mut payload = standard_draws();
        let mut twin = payload.policy_effective_n[1].clone();
        twin.effective_n_by_checkpoint[0].effective_n = 8.0;
        payload.policy_effective_n.push(twin);
        assert!(resolve_checkpoint_draws(&payload).is_none());

        payload.policy_effective_n.reverse();
        let buckets = ResourceBucketsPayload {
            buckets: vec![bucket("RAMP", 12.5, 12)],
        };
        let report = compute_checkpoint_probabilities(&buckets, &payload, &ExactKernel);
        assert_eq!(report.reason_code.as_deref(), Some(codes::POLICY_UNAVAILABLE));
    }

    #[test]
    fn malformed_bucket_is_excluded_alone() {
        let buckets: ResourceBucketsPayload = serde_json::from_value(serde_json::json!({
            "buckets": [
                {"bucket": "RAMP", "effective_K": 12.0, "K_int": 12.0},
                {"bucket": "DRAW", "effective_K": 8.0, "K_int": 8},
                {"bucket": "WINCON", "effective_K": "four", "K_int": 4},
                {"bucket": "LANDS", "effective_K": 36.0, "K_int": 36.5},
                {"effective_K": 3.0, "K_int": 3}
            ]
        }))
        .unwrap();
        let report = compute_checkpoint_probabilities(&buckets, &standard_draws(), &ExactKernel);
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.codes.to_sorted_vec(), vec![codes::BUCKET_FIELD_INVALID.to_string()]);
        let ids: Vec<&str> = report.buckets.iter().map(|b| b.bucket.as_str()).collect();
        assert_eq!(ids, vec!["DRAW", "RAMP"]);
        assert_eq!(report.probabilities_by_bucket.len(), 2);
    }
}
