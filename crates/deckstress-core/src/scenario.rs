//! Stress model selection from the scenario catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, event};

use crate::codes;
use crate::model::{Codes, Status, StressOperator};
use crate::payload::{FormatCatalogPayload, ModelPayload, ScenarioCatalogPayload};

/// A named, catalogued operator list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioDefinition {
    pub model_id: String,
    pub operators: Vec<StressOperator>,
    /// Codes raised by catalogued operators that failed their field contract.
    #[serde(skip)]
    pub rejected: Codes,
}

impl ScenarioDefinition {
    pub fn new(model_id: impl Into<String>, operators: Vec<StressOperator>) -> Self {
        Self {
            model_id: model_id.into(),
            operators,
            rejected: Codes::new(),
        }
    }

    /// Keeps the operators that parse and remembers why the others did not.
    pub fn from_model(model_id: impl Into<String>, model: &ModelPayload) -> Self {
        let mut rejected = Codes::new();
        let operators = salvage_operators(model, &mut rejected);
        Self {
            model_id: model_id.into(),
            operators,
            rejected,
        }
    }
}

/// Which rule produced the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    Override,
    ProfileBracket,
    Profile,
    Bracket,
    Default,
}

impl SelectionSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            SelectionSource::Override => "override",
            SelectionSource::ProfileBracket => "profile_bracket",
            SelectionSource::Profile => "profile",
            SelectionSource::Bracket => "bracket",
            SelectionSource::Default => "default",
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse scenario catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scenario catalog format key must not be empty")]
    EmptyFormat,
    #[error("format '{format}': model id must not be empty")]
    EmptyModelId { format: String },
}

/// Immutable catalog snapshot, built once and shared by reference across
/// invocations so a run never mixes old and new definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioCatalog {
    formats: BTreeMap<String, FormatCatalogPayload>,
}

impl ScenarioCatalog {
    pub fn from_payload(payload: ScenarioCatalogPayload) -> Result<Self, CatalogError> {
        for (format, catalog) in &payload.format_defaults {
            if format.trim().is_empty() {
                return Err(CatalogError::EmptyFormat);
            }
            if catalog.models.keys().any(|model_id| model_id.trim().is_empty()) {
                return Err(CatalogError::EmptyModelId {
                    format: format.clone(),
                });
            }
        }
        Ok(Self {
            formats: payload.format_defaults,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let payload: ScenarioCatalogPayload = serde_json::from_str(json)?;
        Self::from_payload(payload)
    }

    pub fn format(&self, format: &str) -> Option<&FormatCatalogPayload> {
        self.formats.get(format)
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub format: String,
    #[serde(default)]
    pub bracket_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub override_model_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    pub codes: Codes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_source: Option<SelectionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioDefinition>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// First matching rule wins: override, profile+bracket, profile, bracket, default.
fn resolve_model_id<'a>(
    catalog: &'a FormatCatalogPayload,
    request: &'a SelectionRequest,
    codes: &mut Codes,
) -> Option<(&'a str, SelectionSource)> {
    if let Some(override_id) = present(&request.override_model_id) {
        if catalog.models.contains_key(override_id) {
            return Some((override_id, SelectionSource::Override));
        }
        event!(
            target: "deckstress::selection",
            Level::WARN,
            override_model_id = override_id,
            reason = codes::SELECTION_OVERRIDE_UNKNOWN,
        );
        codes.warn(codes::SELECTION_OVERRIDE_UNKNOWN);
    }

    let rules = &catalog.selection;
    let profile = present(&request.profile_id);
    let bracket = present(&request.bracket_id);

    if let (Some(profile), Some(bracket)) = (profile, bracket) {
        if let Some(rule) = rules
            .by_profile_bracket
            .iter()
            .find(|rule| rule.profile_id == profile && rule.bracket_id == bracket)
        {
            return Some((rule.model_id.as_str(), SelectionSource::ProfileBracket));
        }
    }
    if let Some(model_id) = profile.and_then(|profile| rules.by_profile_id.get(profile)) {
        return Some((model_id.as_str(), SelectionSource::Profile));
    }
    if let Some(model_id) = bracket.and_then(|bracket| rules.by_bracket_id.get(bracket)) {
        return Some((model_id.as_str(), SelectionSource::Bracket));
    }
    present(&rules.default_model_id).map(|model_id| (model_id, SelectionSource::Default))
}

/// Validates every operator of a model, keeping the ones that parse.
pub fn salvage_operators(model: &ModelPayload, codes: &mut Codes) -> Vec<StressOperator> {
    let mut operators = Vec::with_capacity(model.operators.len());
    for (index, payload) in model.operators.iter().enumerate() {
        match StressOperator::from_payload(payload) {
            Ok(operator) => operators.push(operator),
            Err(problems) => {
                event!(
                    target: "deckstress::selection",
                    Level::WARN,
                    operator_index = index,
                    kind = payload.kind.as_deref().unwrap_or("<missing>"),
                    problems = ?problems,
                );
                for code in problems {
                    codes.error(code);
                }
            }
        }
    }
    operators
}

pub fn select_scenario(catalog: &ScenarioCatalog, request: &SelectionRequest) -> SelectionReport {
    let mut codes = Codes::new();
    let resolved = catalog
        .format(request.format.trim())
        .and_then(|format| resolve_model_id(format, request, &mut codes).map(|found| (format, found)));

    let Some((format, (model_id, source))) = resolved else {
        event!(
            target: "deckstress::selection",
            Level::INFO,
            format = %request.format,
            reason = codes::SELECTION_UNAVAILABLE,
        );
        return SelectionReport {
            status: Status::Skip,
            reason_code: Some(codes::SELECTION_UNAVAILABLE.to_string()),
            codes,
            selected_model_id: None,
            selection_source: None,
            scenario: None,
        };
    };

    let scenario = match format.models.get(model_id) {
        Some(model) => {
            let scenario = ScenarioDefinition::from_model(model_id, model);
            codes.extend(&scenario.rejected);
            Some(scenario)
        }
        None => {
            codes.error(codes::SELECTION_MODEL_UNREGISTERED);
            None
        }
    };

    event!(
        target: "deckstress::selection",
        Level::INFO,
        format = %request.format,
        model_id,
        source = source.as_str(),
        operators = scenario.as_ref().map(|s| s.operators.len()).unwrap_or(0),
    );

    SelectionReport {
        status: codes.status(),
        reason_code: None,
        codes,
        selected_model_id: Some(model_id.to_string()),
        selection_source: Some(source),
        scenario,
    }
}
