use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Qualitative impact level of a finding, as reported by the scan engine.
///
/// Ordered most severe first so histogram keys and report rows come out in
/// triage order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Unknown,
    ];

    /// Fixed weight used for the aggregate severity score. The steps are
    /// wide enough that one CRITICAL outweighs up to 99 HIGH findings;
    /// dominance breaks at exactly 100.
    pub fn weight(self) -> u64 {
        match self {
            Self::Critical => 100_000_000,
            Self::High => 1_000_000,
            Self::Medium => 10_000,
            Self::Low => 100,
            Self::Unknown => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity level: {0}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}
