use core::fmt;

use serde::{Deserialize, Serialize};

/// Canonical turn-like milestone at which draw probability is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u8)]
pub enum Checkpoint {
    Seven = 7,
    Nine = 9,
    Ten = 10,
    Twelve = 12,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::Seven,
        Checkpoint::Nine,
        Checkpoint::Ten,
        Checkpoint::Twelve,
    ];

    pub const fn from_value(value: u32) -> Option<Self> {
        match value {
            7 => Some(Checkpoint::Seven),
            9 => Some(Checkpoint::Nine),
            10 => Some(Checkpoint::Ten),
            12 => Some(Checkpoint::Twelve),
            _ => None,
        }
    }

    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Checkpoint {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Checkpoint::from_value(value).ok_or_else(|| format!("unsupported checkpoint {value}"))
    }
}

impl From<Checkpoint> for u32 {
    fn from(checkpoint: Checkpoint) -> Self {
        checkpoint.value()
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::Checkpoint;

    #[test]
    fn all_is_ascending() {
        let values: Vec<u32> = Checkpoint::ALL.iter().map(|c| c.value()).collect();
        assert_eq!(values, vec![7, 9, 10, 12]);
    }

    #[test]
    fn from_value_rejects_unknown() {
        assert_eq!(Checkpoint::from_value(10), Some(Checkpoint::Ten));
        assert_eq!(Checkpoint::from_value(8), None);
    }

    #[test]
    fn serde_uses_numeric_value() {
        assert_eq!(serde_json::to_string(&Checkpoint::Twelve).unwrap(), "12");
        let parsed: Checkpoint = serde_json::from_str("9").unwrap();
        assert_eq!(parsed, Checkpoint::Nine);
        assert!(serde_json::from_str::<Checkpoint>("11").is_err());
    }
}
