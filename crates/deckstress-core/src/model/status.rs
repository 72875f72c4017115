use std::collections::BTreeSet;

use serde::{Serialize, Serializer};

/// Outcome classification shared by every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warn,
    Error,
    Skip,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warn => "WARN",
            Status::Error => "ERROR",
            Status::Skip => "SKIP",
        }
    }
}

/// Accumulates diagnostic codes by severity.
///
/// Serialises as a single sorted, deduplicated list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codes {
    errors: BTreeSet<String>,
    warnings: BTreeSet<String>,
}

impl Codes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, code: impl Into<String>) {
        self.errors.insert(code.into());
    }

    pub fn warn(&mut self, code: impl Into<String>) {
        self.warnings.insert(code.into());
    }

    pub fn extend(&mut self, other: &Codes) {
        self.errors.extend(other.errors.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.errors.contains(code) || self.warnings.contains(code)
    }

    /// ERROR beats WARN beats OK.
    pub fn status(&self) -> Status {
        if self.has_errors() {
            Status::Error
        } else if self.has_warnings() {
            Status::Warn
        } else {
            Status::Ok
        }
    }

    pub fn to_sorted_vec(&self) -> Vec<String> {
        let merged: BTreeSet<&String> = self.errors.iter().chain(self.warnings.iter()).collect();
        merged.into_iter().cloned().collect()
    }
}

impl Serialize for Codes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_sorted_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::{Codes, Status};

    #[test]
    fn status_follows_severity() {
        let mut codes = Codes::new();
        assert_eq!(codes.status(), Status::Ok);
        codes.warn("B_WARN");
        assert_eq!(codes.status(), Status::Warn);
        codes.error("A_ERROR");
        assert_eq!(codes.status(), Status::Error);
    }

    #[test]
    fn serialises_sorted_and_deduplicated() {
        let mut codes = Codes::new();
        codes.warn("ZETA");
        codes.error("ALPHA");
        codes.error("ALPHA");
        codes.warn("MID");
        assert_eq!(
            serde_json::to_string(&codes).unwrap(),
            r#"["ALPHA","MID","ZETA"]"#
        );
    }

    #[test]
    fn status_serialises_upper_case() {
        assert_eq!(serde_json::to_string(&Status::Skip).unwrap(), "\"SKIP\"");
        assert_eq!(Status::Warn.as_str(), "WARN");
    }
}
