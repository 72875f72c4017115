//! Sequential replay of scheduled operators against bucket state.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::checkpoint::{BucketState, CheckpointDraw, CheckpointProbability, clamp_and_floor};
use crate::kernel::{KernelError, ProbabilityKernel};
use crate::model::{Checkpoint, DECK_SIZE, Fixed6, Probability, StressOperator};

/// How one operator moves a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorEffect {
    /// Subtract whole cards from effective K.
    Deplete(Fixed6),
    /// Multiply effective K by a retention factor.
    Retain(Fixed6),
    /// Multiply probabilities by `1 - penalty`.
    Suppress(Fixed6),
    /// Divide probabilities by `1 + inflation`.
    Inflate(Fixed6),
}

impl OperatorEffect {
    pub fn of(operator: &StressOperator) -> Self {
        match operator {
            StressOperator::TargetedRemoval { count, .. } | StressOperator::HandDisruption { count, .. } => {
                OperatorEffect::Deplete(Fixed6::from_int(i64::from(*count)))
            }
            StressOperator::BoardWipe {
                surviving_fraction, ..
            } => OperatorEffect::Retain(*surviving_fraction),
            // The stored penalty is applied as-is, as the fraction retained.
            StressOperator::GraveyardHateWindow {
                graveyard_penalty, ..
            } => OperatorEffect::Retain(*graveyard_penalty),
            StressOperator::StaxTax { inflation, .. } => OperatorEffect::Inflate(*inflation),
            StressOperator::Wheel { penalty, .. } | StressOperator::CombatPressure { penalty, .. } => {
                OperatorEffect::Suppress(*penalty)
            }
        }
    }

    pub const fn affects_resources(self) -> bool {
        matches!(self, OperatorEffect::Deplete(_) | OperatorEffect::Retain(_))
    }
}

/// Per-invocation accumulator for one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRunningState {
    pub bucket: String,
    pub effective_k: Fixed6,
    pub k_int: u32,
    pub probabilities: BTreeMap<Checkpoint, Probability>,
}

impl BucketRunningState {
    pub fn baseline(
        state: &BucketState,
        draws: &[CheckpointDraw],
        kernel: &dyn ProbabilityKernel,
    ) -> Result<Self, KernelError> {
        let mut running = Self {
            bucket: state.bucket.clone(),
            effective_k: state.effective_k,
            k_int: state.k_int,
            probabilities: BTreeMap::new(),
        };
        running.recompute(draws, kernel)?;
        Ok(running)
    }

    fn recompute(&mut self, draws: &[CheckpointDraw], kernel: &dyn ProbabilityKernel) -> Result<(), KernelError> {
        let mut next = BTreeMap::new();
        for draw in draws {
            let p = kernel.p_ge_1(i64::from(DECK_SIZE), i64::from(self.k_int), i64::from(draw.n_int))?;
            next.insert(draw.checkpoint, p);
        }
        self.probabilities = next;
        Ok(())
    }

    /// Moves to a new effective K. K, K_int and probabilities change together
    /// or not at all.
    fn rebase(&mut self, value: Fixed6, draws: &[CheckpointDraw], kernel: &dyn ProbabilityKernel) -> Result<(), KernelError> {
        let (effective_k, k_int) = clamp_and_floor(value);
        let mut next = Self {
            bucket: self.bucket.clone(),
            effective_k,
            k_int,
            probabilities: BTreeMap::new(),
        };
        next.recompute(draws, kernel)?;
        *self = next;
        Ok(())
    }

    /// Applies one operator. Resource effects refloor K and recompute every
    /// checkpoint through the kernel; friction effects scale the existing
    /// probabilities and leave K untouched. On `Err` the state is unchanged.
    pub fn apply(
        &mut self,
        effect: OperatorEffect,
        draws: &[CheckpointDraw],
        kernel: &dyn ProbabilityKernel,
    ) -> Result<(), KernelError> {
        match effect {
            OperatorEffect::Deplete(cards) => self.rebase(self.effective_k.saturating_sub(cards), draws, kernel),
            OperatorEffect::Retain(fraction) => self.rebase(self.effective_k.mul_round(fraction), draws, kernel),
            OperatorEffect::Suppress(penalty) => {
                let factor = Fixed6::ONE.saturating_sub(penalty);
                for p in self.probabilities.values_mut() {
                    *p = p.scale(factor);
                }
                Ok(())
            }
            OperatorEffect::Inflate(inflation) => {
                for p in self.probabilities.values_mut() {
                    *p = p.deflate(inflation);
                }
                Ok(())
            }
        }
    }

    pub fn probabilities_by_checkpoint(&self) -> Vec<CheckpointProbability> {
        self.probabilities
            .iter()
            .map(|(checkpoint, p_ge_1)| CheckpointProbability {
                checkpoint: *checkpoint,
                p_ge_1: *p_ge_1,
            })
            .collect()
    }
}

/// Before/after snapshot of one bucket around one operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketImpact {
    pub bucket: String,
    #[serde(rename = "effective_K_before")]
    pub effective_k_before: Fixed6,
    #[serde(rename = "effective_K_after")]
    pub effective_k_after: Fixed6,
    #[serde(rename = "K_int_before")]
    pub k_int_before: u32,
    #[serde(rename = "K_int_after")]
    pub k_int_after: u32,
    pub probabilities_before: Vec<CheckpointProbability>,
    pub probabilities_after: Vec<CheckpointProbability>,
}

impl BucketImpact {
    pub fn between(before: &BucketRunningState, after: &BucketRunningState) -> Self {
        Self {
            bucket: after.bucket.clone(),
            effective_k_before: before.effective_k,
            effective_k_after: after.effective_k,
            k_int_before: before.k_int,
            k_int_after: after.k_int,
            probabilities_before: before.probabilities_by_checkpoint(),
            probabilities_after: after.probabilities_by_checkpoint(),
        }
    }
}
