use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointReport, compute_checkpoint_probabilities};
use crate::kernel::ExactKernel;
use crate::model::Status;
use crate::payload::{DrawPolicyPayload, ResourceBucketsPayload};
use crate::policy::OperatorPolicy;
use crate::scenario::{ScenarioCatalog, SelectionReport, SelectionRequest, select_scenario};
use crate::stress::{StressInputs, StressReport, run_stress_pipeline};

/// Inputs for one analysis. Read-only for the duration of the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub selection: SelectionRequest,
    pub buckets: ResourceBucketsPayload,
    pub draw_policy: DrawPolicyPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub engine: &'static str,
    pub version: &'static str,
    pub checkpoint: CheckpointReport,
    pub selection: SelectionReport,
    pub stress: StressReport,
}

/// Holds the immutable catalog and policy snapshots. Cheap to share by
/// reference; every `analyze` call builds its own running state.
#[derive(Debug, Clone)]
pub struct StressEngine {
    catalog: ScenarioCatalog,
    policy: OperatorPolicy,
    kernel: ExactKernel,
}

impl StressEngine {
    pub fn new(catalog: ScenarioCatalog, policy: OperatorPolicy) -> Self {
        Self {
            catalog,
            policy,
            kernel: ExactKernel,
        }
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &OperatorPolicy {
        &self.policy
    }

    /// Checkpoint layer, then scenario selection, then the stress pipeline.
    /// Partial upstream results still feed the pipeline; skipped stages
    /// surface as pipeline SKIP reasons.
    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisReport {
        let checkpoint = compute_checkpoint_probabilities(&request.buckets, &request.draw_policy, &self.kernel);
        let selection = select_scenario(&self.catalog, &request.selection);

        let baseline_ready = checkpoint.status != Status::Skip;
        let inputs = StressInputs {
            buckets: baseline_ready.then_some(checkpoint.buckets.as_slice()),
            checkpoint_draws: baseline_ready.then_some(checkpoint.checkpoint_draws.as_slice()),
            scenario: selection.scenario.as_ref(),
            selection_source: selection.selection_source,
            kernel: Some(&self.kernel),
        };
        let stress = run_stress_pipeline(inputs, &self.policy);

        AnalysisReport {
            engine: crate::EngineInfo::name(),
            version: crate::EngineInfo::version(),
            checkpoint,
            selection,
            stress,
        }
    }
}
