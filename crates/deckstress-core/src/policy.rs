//! Global operator policy: precedence, default turns, composition contract.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::OperatorKind;
use crate::payload::OperatorPolicyPayload;

pub const SUPPORTED_TIE_BREAK: &str = "name-then-canonical-serialization";
pub const SUPPORTED_COMPOSITION_MODE: &str = "sequential";

/// Load-time policy failures. A policy either loads completely or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl PolicyError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        PolicyError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorPolicy {
    precedence: Vec<OperatorKind>,
    default_by_turn: BTreeMap<OperatorKind, u32>,
    record_impacts: bool,
}

impl OperatorPolicy {
    pub fn load(payload: &OperatorPolicyPayload) -> Result<Self, PolicyError> {
        if payload.precedence.is_empty() {
            return Err(PolicyError::invalid("precedence", "precedence must not be empty"));
        }

        let mut precedence = Vec::with_capacity(payload.precedence.len());
        let mut seen = BTreeSet::new();
        for (index, raw) in payload.precedence.iter().enumerate() {
            let kind = raw.parse::<OperatorKind>().map_err(|_| {
                PolicyError::invalid(format!("precedence[{index}]"), format!("unknown operator kind '{raw}'"))
            })?;
            if !seen.insert(kind) {
                return Err(PolicyError::invalid(
                    format!("precedence[{index}]"),
                    format!("operator kind '{raw}' listed more than once"),
                ));
            }
            precedence.push(kind);
        }

        if payload.tie_break != SUPPORTED_TIE_BREAK {
            return Err(PolicyError::invalid(
                "tie_break",
                format!("unsupported tie break '{}', expected '{SUPPORTED_TIE_BREAK}'", payload.tie_break),
            ));
        }

        if payload.composition.mode != SUPPORTED_COMPOSITION_MODE {
            return Err(PolicyError::invalid(
                "composition.mode",
                format!(
                    "unsupported composition mode '{}', expected '{SUPPORTED_COMPOSITION_MODE}'",
                    payload.composition.mode
                ),
            ));
        }

        let mut default_by_turn = BTreeMap::new();
        for (raw, turn) in &payload.default_by_turn {
            let field = format!("default_by_turn.{raw}");
            let kind = raw
                .parse::<OperatorKind>()
                .ok()
                .filter(|kind| seen.contains(kind))
                .ok_or_else(|| PolicyError::invalid(field.clone(), "kind is not part of precedence"))?;
            let turn = u32::try_from(*turn)
                .ok()
                .filter(|turn| *turn >= 1)
                .ok_or_else(|| PolicyError::invalid(field, format!("turn {turn} must be a positive integer")))?;
            default_by_turn.insert(kind, turn);
        }

        Ok(Self {
            precedence,
            default_by_turn,
            record_impacts: payload.composition.record_impacts,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, PolicyLoadError> {
        let payload: OperatorPolicyPayload = serde_json::from_str(json)?;
        Ok(Self::load(&payload)?)
    }

    pub fn precedence(&self) -> &[OperatorKind] {
        &self.precedence
    }

    /// Position in the precedence list; unlisted kinds sort after all listed ones.
    pub fn rank(&self, kind: OperatorKind) -> usize {
        self.precedence
            .iter()
            .position(|listed| *listed == kind)
            .unwrap_or(self.precedence.len())
    }

    pub fn default_by_turn(&self, kind: OperatorKind) -> Option<u32> {
        self.default_by_turn.get(&kind).copied()
    }

    pub fn record_impacts(&self) -> bool {
        self.record_impacts
    }
}

#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to parse operator policy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid operator policy: {0}")]
    Invalid(#[from] PolicyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> OperatorPolicyPayload {
        serde_json::from_value(value).unwrap()
    }

    fn valid() -> serde_json::Value {
        json!({
            "precedence": ["BOARD_WIPE", "TARGETED_REMOVAL", "STAX_TAX"],
            "tie_break": "name-then-canonical-serialization",
            "default_by_turn": {"TARGETED_REMOVAL": 4, "STAX_TAX": 2},
            "composition": {"mode": "sequential", "record_impacts": true}
        })
    }

    #[test]
    fn loads_valid_policy() {
        let policy = OperatorPolicy::load(&payload(valid())).unwrap();
        assert_eq!(policy.rank(OperatorKind::BoardWipe), 0);
        assert_eq!(policy.rank(OperatorKind::StaxTax), 2);
        assert_eq!(policy.rank(OperatorKind::Wheel), 3);
        assert_eq!(policy.default_by_turn(OperatorKind::TargetedRemoval), Some(4));
        assert_eq!(policy.default_by_turn(OperatorKind::BoardWipe), None);
        assert!(policy.record_impacts());
    }

    #[test]
    fn rejects_empty_precedence() {
        let mut value = valid();
        value["precedence"] = json!([]);
        value["default_by_turn"] = json!({});
        let err = OperatorPolicy::load(&payload(value)).unwrap_err();
        assert_eq!(err.to_string(), "precedence: precedence must not be empty");
    }

    #[test]
    fn rejects_duplicate_or_unknown_kinds() {
        let mut value = valid();
        value["precedence"] = json!(["BOARD_WIPE", "BOARD_WIPE"]);
        assert!(OperatorPolicy::load(&payload(value)).is_err());

        let mut value = valid();
        value["precedence"] = json!(["BOARD_WIPE", "MILL"]);
        assert!(OperatorPolicy::load(&payload(value)).is_err());

        let mut value = valid();
        value["precedence"] = json!([" BOARD_WIPE", "TARGETED_REMOVAL", "STAX_TAX"]);
        let PolicyError::InvalidField { field, .. } = OperatorPolicy::load(&payload(value)).unwrap_err();
        assert_eq!(field, "precedence[0]");
    }

    #[test]
    fn rejects_unsupported_contracts() {
        let mut value = valid();
        value["tie_break"] = json!("random");
        let PolicyError::InvalidField { field, .. } = OperatorPolicy::load(&payload(value)).unwrap_err();
        assert_eq!(field, "tie_break");

        let mut value = valid();
        value["composition"]["mode"] = json!("parallel");
        let PolicyError::InvalidField { field, .. } = OperatorPolicy::load(&payload(value)).unwrap_err();
        assert_eq!(field, "composition.mode");
    }

    #[test]
    fn default_turn_keys_must_come_from_precedence() {
        let mut value = valid();
        value["default_by_turn"] = json!({"WHEEL": 3});
        let PolicyError::InvalidField { field, .. } = OperatorPolicy::load(&payload(value)).unwrap_err();
        assert_eq!(field, "default_by_turn.WHEEL");

        let mut value = valid();
        value["default_by_turn"] = json!({"STAX_TAX": 0});
        assert!(OperatorPolicy::load(&payload(value)).is_err());
    }

    #[test]
    fn from_json_surfaces_parse_errors() {
        assert!(matches!(OperatorPolicy::from_json("{"), Err(PolicyLoadError::Parse(_))));
        let policy = OperatorPolicy::from_json(&valid().to_string()).unwrap();
        assert_eq!(policy.precedence().len(), 3);
    }
}
