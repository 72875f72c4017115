use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use deckstress_core::model::Status;
use deckstress_core::payload::{
    DrawPolicyPayload, OperatorPolicyPayload, ResourceBucketsPayload, ScenarioCatalogPayload,
};
use deckstress_core::policy::{OperatorPolicy, PolicyError};
use deckstress_core::scenario::{CatalogError, ScenarioCatalog};
use deckstress_core::{AnalysisReport, AnalysisRequest, StressEngine};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{ResolvedOutputs, RunConfig};
use crate::summary::write_markdown;

/// Loads the payload snapshots once and runs one analysis against them.
pub struct StressRunner {
    config: RunConfig,
    outputs: ResolvedOutputs,
    engine: StressEngine,
    request: AnalysisRequest,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub status: Status,
    pub selected_model_id: Option<String>,
    pub operators_applied: usize,
    pub buckets: usize,
    pub report_path: PathBuf,
    pub summary_path: PathBuf,
}

impl StressRunner {
    /// Build a runner from a validated configuration, reading every payload.
    pub fn new(config: RunConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let buckets: ResourceBucketsPayload = read_json(&config.inputs.buckets)?;
        let draw_policy: DrawPolicyPayload = read_json(&config.inputs.draw_policy)?;
        let catalog_payload: ScenarioCatalogPayload = read_json(&config.inputs.scenario_catalog)?;
        let policy_payload: OperatorPolicyPayload = read_json(&config.inputs.operator_policy)?;

        let catalog = ScenarioCatalog::from_payload(catalog_payload)?;
        let policy = OperatorPolicy::load(&policy_payload)?;

        let request = AnalysisRequest {
            selection: config.request.selection_request(),
            buckets,
            draw_policy,
        };

        Ok(Self {
            engine: StressEngine::new(catalog, policy),
            config,
            outputs,
            request,
        })
    }

    pub fn analyze(&self) -> AnalysisReport {
        self.engine.analyze(&self.request)
    }

    /// Run the analysis and write the JSON report and Markdown summary.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.report_json.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let report = self.analyze();

        let mut writer = BufWriter::new(File::create(&self.outputs.report_json)?);
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        write_markdown(&self.outputs.summary_md, &self.config.run_id, &report)?;

        event!(
            target: "deckstress::runner",
            Level::INFO,
            run_id = %self.config.run_id,
            status = report.stress.status.as_str(),
            model_id = report.stress.selected_model_id.as_deref().unwrap_or("<none>"),
            report = %self.outputs.report_json.display(),
        );

        Ok(RunSummary {
            status: report.stress.status,
            selected_model_id: report.stress.selected_model_id.clone(),
            operators_applied: report.stress.operators_applied.len(),
            buckets: report.stress.stress_adjusted_effective_k.len(),
            report_path: self.outputs.report_json.clone(),
            summary_path: self.outputs.summary_md.clone(),
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, RunnerError> {
    let file = File::open(path).map_err(|source| RunnerError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| RunnerError::Payload {
        source,
        path: path.to_path_buf(),
    })
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to read payload {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse payload {path:?}: {source}")]
    Payload {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("scenario catalog rejected: {0}")]
    Catalog(#[from] CatalogError),
    #[error("operator policy rejected: {0}")]
    Policy(#[from] PolicyError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}
