use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::fixed::Fixed6;
use crate::codes;
use crate::payload::OperatorPayload;

/// Discriminant of a stress operator. Names match the catalog vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorKind {
    TargetedRemoval,
    BoardWipe,
    GraveyardHateWindow,
    StaxTax,
    Wheel,
    HandDisruption,
    CombatPressure,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 7] = [
        OperatorKind::TargetedRemoval,
        OperatorKind::BoardWipe,
        OperatorKind::GraveyardHateWindow,
        OperatorKind::StaxTax,
        OperatorKind::Wheel,
        OperatorKind::HandDisruption,
        OperatorKind::CombatPressure,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OperatorKind::TargetedRemoval => "TARGETED_REMOVAL",
            OperatorKind::BoardWipe => "BOARD_WIPE",
            OperatorKind::GraveyardHateWindow => "GRAVEYARD_HATE_WINDOW",
            OperatorKind::StaxTax => "STAX_TAX",
            OperatorKind::Wheel => "WHEEL",
            OperatorKind::HandDisruption => "HAND_DISRUPTION",
            OperatorKind::CombatPressure => "COMBAT_PRESSURE",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// One modeled adversarial action.
///
/// `by_turn` is optional as catalogued; the stress pipeline fills it from the
/// operator policy before ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StressOperator {
    TargetedRemoval {
        count: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
    BoardWipe {
        surviving_fraction: Fixed6,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
    GraveyardHateWindow {
        turns: BTreeSet<u32>,
        graveyard_penalty: Fixed6,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
    StaxTax {
        inflation: Fixed6,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
    Wheel {
        penalty: Fixed6,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
    HandDisruption {
        count: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
    CombatPressure {
        penalty: Fixed6,
        #[serde(skip_serializing_if = "Option::is_none")]
        by_turn: Option<u32>,
    },
}

impl StressOperator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            StressOperator::TargetedRemoval { .. } => OperatorKind::TargetedRemoval,
            StressOperator::BoardWipe { .. } => OperatorKind::BoardWipe,
            StressOperator::GraveyardHateWindow { .. } => OperatorKind::GraveyardHateWindow,
            StressOperator::StaxTax { .. } => OperatorKind::StaxTax,
            StressOperator::Wheel { .. } => OperatorKind::Wheel,
            StressOperator::HandDisruption { .. } => OperatorKind::HandDisruption,
            StressOperator::CombatPressure { .. } => OperatorKind::CombatPressure,
        }
    }

    pub fn by_turn(&self) -> Option<u32> {
        match self {
            StressOperator::TargetedRemoval { by_turn, .. }
            | StressOperator::BoardWipe { by_turn, .. }
            | StressOperator::GraveyardHateWindow { by_turn, .. }
            | StressOperator::StaxTax { by_turn, .. }
            | StressOperator::Wheel { by_turn, .. }
            | StressOperator::HandDisruption { by_turn, .. }
            | StressOperator::CombatPressure { by_turn, .. } => *by_turn,
        }
    }

    /// Turn implied by the operator's own fields: explicit `by_turn`, or the
    /// opening turn of a graveyard-hate window.
    pub fn intrinsic_turn(&self) -> Option<u32> {
        match self {
            StressOperator::GraveyardHateWindow { turns, by_turn, .. } => {
                (*by_turn).or_else(|| turns.iter().next().copied())
            }
            other => other.by_turn(),
        }
    }

    pub fn with_by_turn(mut self, turn: u32) -> Self {
        match &mut self {
            StressOperator::TargetedRemoval { by_turn, .. }
            | StressOperator::BoardWipe { by_turn, .. }
            | StressOperator::GraveyardHateWindow { by_turn, .. }
            | StressOperator::StaxTax { by_turn, .. }
            | StressOperator::Wheel { by_turn, .. }
            | StressOperator::HandDisruption { by_turn, .. }
            | StressOperator::CombatPressure { by_turn, .. } => *by_turn = Some(turn),
        }
        self
    }

    /// Re-checks the field contract of an already-typed operator.
    pub fn validate(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if self.by_turn() == Some(0) {
            problems.push(codes::OPERATOR_BY_TURN_INVALID);
        }
        match self {
            StressOperator::TargetedRemoval { .. } | StressOperator::HandDisruption { .. } => {}
            StressOperator::BoardWipe {
                surviving_fraction, ..
            } => {
                if !is_unit_interval(*surviving_fraction) {
                    problems.push(codes::OPERATOR_SURVIVING_FRACTION_INVALID);
                }
            }
            StressOperator::GraveyardHateWindow {
                turns,
                graveyard_penalty,
                ..
            } => {
                if turns.is_empty() || turns.contains(&0) {
                    problems.push(codes::OPERATOR_TURNS_INVALID);
                }
                if !is_unit_interval(*graveyard_penalty) {
                    problems.push(codes::OPERATOR_GRAVEYARD_PENALTY_INVALID);
                }
            }
            StressOperator::StaxTax { inflation, .. } => {
                if *inflation < Fixed6::ZERO {
                    problems.push(codes::OPERATOR_INFLATION_INVALID);
                }
            }
            StressOperator::Wheel { penalty, .. } | StressOperator::CombatPressure { penalty, .. } => {
                if !is_unit_interval(*penalty) {
                    problems.push(codes::OPERATOR_PENALTY_INVALID);
                }
            }
        }
        problems
    }

    /// Compact JSON with sorted keys; the final ordering tie-breaker.
    pub fn canonical_serialization(&self) -> String {
        serde_json::to_value(self)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    /// Builds a typed operator from a catalog entry, collecting every field
    /// problem rather than stopping at the first.
    pub fn from_payload(payload: &OperatorPayload) -> Result<Self, Vec<&'static str>> {
        let Some(raw_kind) = payload.kind.as_deref() else {
            return Err(vec![codes::OPERATOR_KIND_MISSING]);
        };
        let Ok(kind) = raw_kind.parse::<OperatorKind>() else {
            return Err(vec![codes::OPERATOR_KIND_UNKNOWN]);
        };

        let mut problems = Vec::new();
        let by_turn = optional_field(payload, "by_turn", read_turn, codes::OPERATOR_BY_TURN_INVALID, &mut problems);

        let operator = match kind {
            OperatorKind::TargetedRemoval | OperatorKind::HandDisruption => {
                let count = required_field(payload, "count", read_count, codes::OPERATOR_COUNT_INVALID, &mut problems);
                count.map(|count| match kind {
                    OperatorKind::TargetedRemoval => StressOperator::TargetedRemoval { count, by_turn },
                    _ => StressOperator::HandDisruption { count, by_turn },
                })
            }
            OperatorKind::BoardWipe => required_field(
                payload,
                "surviving_fraction",
                read_unit_interval,
                codes::OPERATOR_SURVIVING_FRACTION_INVALID,
                &mut problems,
            )
            .map(|surviving_fraction| StressOperator::BoardWipe {
                surviving_fraction,
                by_turn,
            }),
            OperatorKind::GraveyardHateWindow => {
                let turns = required_field(payload, "turns", read_turns, codes::OPERATOR_TURNS_INVALID, &mut problems);
                let penalty_key = if payload.field("graveyard_penalty").is_some() {
                    "graveyard_penalty"
                } else {
                    "penalty"
                };
                let penalty = required_field(
                    payload,
                    penalty_key,
                    read_unit_interval,
                    codes::OPERATOR_GRAVEYARD_PENALTY_INVALID,
                    &mut problems,
                );
                match (turns, penalty) {
                    (Some(turns), Some(graveyard_penalty)) => Some(StressOperator::GraveyardHateWindow {
                        turns,
                        graveyard_penalty,
                        by_turn,
                    }),
                    _ => None,
                }
            }
            OperatorKind::StaxTax => required_field(
                payload,
                "inflation",
                read_non_negative,
                codes::OPERATOR_INFLATION_INVALID,
                &mut problems,
            )
            .map(|inflation| StressOperator::StaxTax { inflation, by_turn }),
            OperatorKind::Wheel | OperatorKind::CombatPressure => {
                let penalty = required_field(
                    payload,
                    "penalty",
                    read_unit_interval,
                    codes::OPERATOR_PENALTY_INVALID,
                    &mut problems,
                );
                penalty.map(|penalty| match kind {
                    OperatorKind::Wheel => StressOperator::Wheel { penalty, by_turn },
                    _ => StressOperator::CombatPressure { penalty, by_turn },
                })
            }
        };

        match operator {
            Some(operator) if problems.is_empty() => Ok(operator),
            _ => Err(problems),
        }
    }
}

fn is_unit_interval(value: Fixed6) -> bool {
    value >= Fixed6::ZERO && value <= Fixed6::ONE
}

fn required_field<T>(
    payload: &OperatorPayload,
    name: &str,
    read: fn(&Value) -> Option<T>,
    code: &'static str,
    problems: &mut Vec<&'static str>,
) -> Option<T> {
    let parsed = payload.field(name).and_then(read);
    if parsed.is_none() {
        problems.push(code);
    }
    parsed
}

fn optional_field<T>(
    payload: &OperatorPayload,
    name: &str,
    read: fn(&Value) -> Option<T>,
    code: &'static str,
    problems: &mut Vec<&'static str>,
) -> Option<T> {
    let raw = payload.field(name)?;
    let parsed = read(raw);
    if parsed.is_none() {
        problems.push(code);
    }
    parsed
}

fn read_whole_number(value: &Value) -> Option<u64> {
    if let Some(whole) = value.as_u64() {
        return Some(whole);
    }
    let real = value.as_f64()?;
    if real >= 0.0 && real.fract() == 0.0 && real <= u32::MAX as f64 {
        Some(real as u64)
    } else {
        None
    }
}

fn read_count(value: &Value) -> Option<u32> {
    read_whole_number(value).and_then(|whole| u32::try_from(whole).ok())
}

fn read_turn(value: &Value) -> Option<u32> {
    read_count(value).filter(|turn| *turn >= 1)
}

fn read_turns(value: &Value) -> Option<BTreeSet<u32>> {
    let items = value.as_array()?;
    let turns = items.iter().map(read_turn).collect::<Option<BTreeSet<u32>>>()?;
    if turns.is_empty() { None } else { Some(turns) }
}

fn read_fixed(value: &Value) -> Option<Fixed6> {
    value.as_f64().and_then(Fixed6::from_f64)
}

fn read_unit_interval(value: &Value) -> Option<Fixed6> {
    read_fixed(value).filter(|fixed| is_unit_interval(*fixed))
}

fn read_non_negative(value: &Value) -> Option<Fixed6> {
    read_fixed(value).filter(|fixed| *fixed >= Fixed6::ZERO)
}
