//! Wire contracts for the upstream collaborators.
//!
//! These mirror the JSON documents produced by the substitution engine, the
//! draw-policy model, and the rules catalog. They are intentionally loose;
//! the layers turn them into typed state and report field-level codes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceBucketsPayload {
    #[serde(default)]
    pub buckets: Vec<BucketPayload>,
}

/// One bucket as supplied. Fields stay untyped so a malformed entry is
/// rejected on its own instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketPayload {
    #[serde(default)]
    pub bucket: Value,
    #[serde(rename = "effective_K", default)]
    pub effective_k: Value,
    #[serde(rename = "K_int", default)]
    pub k_int: Value,
}

impl BucketPayload {
    pub fn new(bucket: &str, effective_k: f64, k_int: i64) -> Self {
        Self {
            bucket: Value::from(bucket),
            effective_k: Value::from(effective_k),
            k_int: Value::from(k_int),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.bucket.as_str().filter(|id| !id.is_empty())
    }

    pub fn effective_k(&self) -> Option<f64> {
        self.effective_k.as_f64().filter(|value| value.is_finite())
    }

    /// Whole numbers only; `12.0` reads as `12`.
    pub fn k_int(&self) -> Option<i64> {
        if let Some(whole) = self.k_int.as_i64() {
            return Some(whole);
        }
        let real = self.k_int.as_f64()?;
        if real.fract() == 0.0 && real.abs() <= i64::from(u32::MAX) as f64 {
            Some(real as i64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawPolicyPayload {
    pub default_policy: String,
    #[serde(default)]
    pub policy_effective_n: Vec<PolicyEffectiveN>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEffectiveN {
    pub policy: String,
    #[serde(default)]
    pub effective_n_by_checkpoint: Vec<CheckpointEffectiveN>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEffectiveN {
    pub checkpoint: u32,
    pub effective_n: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCatalogPayload {
    #[serde(default)]
    pub format_defaults: BTreeMap<String, FormatCatalogPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatCatalogPayload {
    #[serde(default)]
    pub selection: SelectionRulesPayload,
    #[serde(default)]
    pub models: BTreeMap<String, ModelPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRulesPayload {
    #[serde(default)]
    pub default_model_id: Option<String>,
    #[serde(default)]
    pub by_profile_id: BTreeMap<String, String>,
    #[serde(default)]
    pub by_bracket_id: BTreeMap<String, String>,
    #[serde(default)]
    pub by_profile_bracket: Vec<ProfileBracketRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBracketRule {
    pub profile_id: String,
    pub bracket_id: String,
    pub model_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPayload {
    #[serde(default)]
    pub operators: Vec<OperatorPayload>,
}

/// One loosely-typed operator entry: a `kind` tag plus arbitrary fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl OperatorPayload {
    pub fn new(kind: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: Some(kind.to_string()),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorPolicyPayload {
    #[serde(default)]
    pub precedence: Vec<String>,
    #[serde(default)]
    pub tie_break: String,
    #[serde(default)]
    pub default_by_turn: BTreeMap<String, i64>,
    pub composition: CompositionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionPayload {
    pub mode: String,
    #[serde(default = "default_record_impacts")]
    pub record_impacts: bool,
}

fn default_record_impacts() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bucket_payload_uses_upstream_field_names() {
        let payload: ResourceBucketsPayload = serde_json::from_value(json!({
            "buckets": [{"bucket": "RAMP", "effective_K": 12.5, "K_int": 12}]
        }))
        .unwrap();
        assert_eq!(payload.buckets[0].id(), Some("RAMP"));
        assert_eq!(payload.buckets[0].effective_k(), Some(12.5));
        assert_eq!(payload.buckets[0].k_int(), Some(12));
    }

    #[test]
    fn malformed_bucket_fields_do_not_fail_the_document() {
        let payload: ResourceBucketsPayload = serde_json::from_value(json!({
            "buckets": [
                {"bucket": "RAMP", "effective_K": 12.0, "K_int": 12.0},
                {"bucket": "DRAW", "effective_K": "eight", "K_int": 8},
                {"bucket": 7, "K_int": 1.5}
            ]
        }))
        .unwrap();
        assert_eq!(payload.buckets.len(), 3);
        assert_eq!(payload.buckets[0].k_int(), Some(12));
        assert_eq!(payload.buckets[1].effective_k(), None);
        assert_eq!(payload.buckets[1].k_int(), Some(8));
        assert_eq!(payload.buckets[2].id(), None);
        assert_eq!(payload.buckets[2].effective_k(), None);
        assert_eq!(payload.buckets[2].k_int(), None);
    }

    #[test]
    fn operator_payload_flattens_fields() {
        let payload: OperatorPayload = serde_json::from_value(json!({
            "kind": "BOARD_WIPE",
            "by_turn": 6,
            "surviving_fraction": 0.5
        }))
        .unwrap();
        assert_eq!(payload.kind.as_deref(), Some("BOARD_WIPE"));
        assert_eq!(payload.field("by_turn"), Some(&json!(6)));
        assert!(payload.field("kind").is_none());
    }

    #[test]
    fn null_fields_read_as_absent() {
        let payload = OperatorPayload::new("WHEEL", json!({"by_turn": null, "penalty": 0.2}));
        assert!(payload.field("by_turn").is_none());
        assert!(payload.field("penalty").is_some());
    }

    #[test]
    fn composition_records_impacts_by_default() {
        let payload: OperatorPolicyPayload = serde_json::from_value(json!({
            "precedence": ["BOARD_WIPE"],
            "tie_break": "name-then-canonical-serialization",
            "composition": {"mode": "sequential"}
        }))
        .unwrap();
        assert!(payload.composition.record_impacts);
        assert!(payload.default_by_turn.is_empty());
    }
}
