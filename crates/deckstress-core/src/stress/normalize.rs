//! Operator normalization and deterministic ordering.

use std::cmp::Ordering;

use crate::codes;
use crate::model::{Codes, StressOperator};
use crate::policy::OperatorPolicy;

/// An operator with its turn resolved and its sort key precomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledOperator {
    pub by_turn: u32,
    pub rank: usize,
    pub canonical: String,
    pub operator: StressOperator,
}

impl ScheduledOperator {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.by_turn
            .cmp(&other.by_turn)
            .then(self.rank.cmp(&other.rank))
            .then_with(|| self.operator.kind().as_str().cmp(other.operator.kind().as_str()))
            .then_with(|| self.canonical.cmp(&other.canonical))
    }
}

/// Revalidates each operator, resolves `by_turn` (explicit, then the
/// operator's own window, then the policy default), and drops operators that
/// cannot be scheduled.
pub fn normalize_operators(
    operators: &[StressOperator],
    policy: &OperatorPolicy,
    codes: &mut Codes,
) -> Vec<ScheduledOperator> {
    let mut scheduled = Vec::with_capacity(operators.len());
    for operator in operators {
        let problems = operator.validate();
        if !problems.is_empty() {
            for code in problems {
                codes.error(code);
            }
            continue;
        }
        let kind = operator.kind();
        let Some(by_turn) = operator
            .intrinsic_turn()
            .or_else(|| policy.default_by_turn(kind))
        else {
            codes.error(codes::OPERATOR_BY_TURN_MISSING);
            continue;
        };
        let operator = operator.clone().with_by_turn(by_turn);
        scheduled.push(ScheduledOperator {
            by_turn,
            rank: policy.rank(kind),
            canonical: operator.canonical_serialization(),
            operator,
        });
    }
    order_operators(&mut scheduled);
    scheduled
}

/// Sorts by (turn, precedence rank, kind name, canonical serialization).
pub fn order_operators(operators: &mut [ScheduledOperator]) {
    operators.sort_by(ScheduledOperator::key_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fixed6, OperatorKind};
    use crate::payload::OperatorPolicyPayload;
    use serde_json::json;

    fn policy() -> OperatorPolicy {
        let payload: OperatorPolicyPayload = serde_json::from_value(json!({
            "precedence": ["BOARD_WIPE", "STAX_TAX", "TARGETED_REMOVAL", "HAND_DISRUPTION"],
            "tie_break": "name-then-canonical-serialization",
            "default_by_turn": {"TARGETED_REMOVAL": 4, "STAX_TAX": 2},
            "composition": {"mode": "sequential"}
        }))
        .unwrap();
        OperatorPolicy::load(&payload).unwrap()
    }

    fn kinds(scheduled: &[ScheduledOperator]) -> Vec<OperatorKind> {
        scheduled.iter().map(|s| s.operator.kind()).collect()
    }

    #[test]
    fn fills_default_turns() {
        let mut codes = Codes::new();
        let ops = vec![StressOperator::TargetedRemoval { count: 2, by_turn: None }];
        let scheduled = normalize_operators(&ops, &policy(), &mut codes);
        assert!(codes.is_empty());
        assert_eq!(scheduled[0].by_turn, 4);
        assert_eq!(scheduled[0].operator.by_turn(), Some(4));
    }

    #[test]
    fn missing_turn_without_default_is_invalid() {
        let mut codes = Codes::new();
        let ops = vec![
            StressOperator::BoardWipe {
                surviving_fraction: Fixed6::ZERO,
                by_turn: None,
            },
            StressOperator::StaxTax {
                inflation: Fixed6::ONE,
                by_turn: None,
            },
        ];
        let scheduled = normalize_operators(&ops, &policy(), &mut codes);
        assert!(codes.contains(codes::OPERATOR_BY_TURN_MISSING));
        assert_eq!(kinds(&scheduled), vec![OperatorKind::StaxTax]);
    }

    #[test]
    fn orders_by_turn_then_precedence() {
        let mut codes = Codes::new();
        let ops = vec![
            StressOperator::StaxTax {
                inflation: Fixed6::ONE,
                by_turn: Some(6),
            },
            StressOperator::HandDisruption { count: 1, by_turn: Some(3) },
            StressOperator::BoardWipe {
                surviving_fraction: Fixed6::from_micros(500_000),
                by_turn: Some(6),
            },
        ];
        let scheduled = normalize_operators(&ops, &policy(), &mut codes);
        assert_eq!(
            kinds(&scheduled),
            vec![OperatorKind::HandDisruption, OperatorKind::BoardWipe, OperatorKind::StaxTax]
        );
    }

    #[test]
    fn unranked_kinds_tie_break_by_name_then_content() {
        let mut codes = Codes::new();
        let ops = vec![
            StressOperator::Wheel {
                penalty: Fixed6::from_micros(300_000),
                by_turn: Some(5),
            },
            StressOperator::CombatPressure {
                penalty: Fixed6::from_micros(100_000),
                by_turn: Some(5),
            },
            StressOperator::Wheel {
                penalty: Fixed6::from_micros(200_000),
                by_turn: Some(5),
            },
        ];
        let scheduled = normalize_operators(&ops, &policy(), &mut codes);
        let canonical: Vec<&str> = scheduled.iter().map(|s| s.canonical.as_str()).collect();
        assert_eq!(
            canonical,
            vec![
                r#"{"by_turn":5,"kind":"COMBAT_PRESSURE","penalty":0.1}"#,
                r#"{"by_turn":5,"kind":"WHEEL","penalty":0.2}"#,
                r#"{"by_turn":5,"kind":"WHEEL","penalty":0.3}"#,
            ]
        );
    }

    #[test]
    fn revalidates_typed_fields() {
        let mut codes = Codes::new();
        let ops = vec![StressOperator::BoardWipe {
            surviving_fraction: Fixed6::from_int(2),
            by_turn: Some(3),
        }];
        assert!(normalize_operators(&ops, &policy(), &mut codes).is_empty());
        assert!(codes.contains(codes::OPERATOR_SURVIVING_FRACTION_INVALID));
    }
}
