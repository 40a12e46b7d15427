//! Trace and metrics options for ad-hoc Query and Compile.

use serde::{Deserialize, Serialize};

/// Requested verbosity of the runtime's execution trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TraceLevel {
    /// No trace.
    #[serde(rename = "TRACE_LEVEL_OFF", alias = "off")]
    Off,
    /// Every evaluation step.
    #[serde(rename = "TRACE_LEVEL_FULL", alias = "full")]
    Full,
    /// Only `trace()` notes emitted by rules.
    #[serde(rename = "TRACE_LEVEL_NOTES", alias = "notes")]
    Notes,
    /// Only failed expressions.
    #[serde(rename = "TRACE_LEVEL_FAILS", alias = "fails")]
    Fails,
    /// Unset or unrecognized. Treated as [`TraceLevel::Off`].
    #[default]
    #[serde(rename = "TRACE_LEVEL_UNKNOWN", alias = "unknown", other)]
    Unknown,
}

/// Explain mode passed to the policy runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExplainMode {
    /// No explanation.
    #[default]
    Off,
    /// Full step trace.
    Full,
    /// Notes only.
    Notes,
    /// Failures only.
    Fails,
}

impl ExplainMode {
    /// Runtime query-parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Full => "full",
            Self::Notes => "notes",
            Self::Fails => "fails",
        }
    }
}

impl From<TraceLevel> for ExplainMode {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Unknown | TraceLevel::Off => Self::Off,
            TraceLevel::Full => Self::Full,
            TraceLevel::Notes => Self::Notes,
            TraceLevel::Fails => Self::Fails,
        }
    }
}

/// Caller options for Query and Compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Collect evaluation metrics.
    pub metrics: bool,
    /// Collect detailed instrumentation (implies metrics).
    pub instrument: bool,
    /// Trace verbosity.
    pub trace: TraceLevel,
    /// Render the trace as summary strings instead of structured entries.
    pub trace_summary: bool,
}

impl QueryOptions {
    /// Explain mode derived from the trace level.
    pub fn explain(&self) -> ExplainMode {
        self.trace.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_trace_level_means_off() {
        assert_eq!(ExplainMode::from(TraceLevel::Unknown), ExplainMode::Off);
        assert_eq!(QueryOptions::default().explain(), ExplainMode::Off);
    }

    #[test]
    fn trace_levels_map_one_to_one() {
        assert_eq!(ExplainMode::from(TraceLevel::Full), ExplainMode::Full);
        assert_eq!(ExplainMode::from(TraceLevel::Notes), ExplainMode::Notes);
        assert_eq!(ExplainMode::from(TraceLevel::Fails), ExplainMode::Fails);
    }

    #[test]
    fn options_deserialize_partially() {
        let opts: QueryOptions = serde_json::from_str(r#"{"trace":"TRACE_LEVEL_NOTES"}"#).unwrap();
        assert_eq!(opts.explain(), ExplainMode::Notes);
        assert!(!opts.metrics);
        let opts: QueryOptions = serde_json::from_str(r#"{"trace":"verbose"}"#).unwrap();
        assert_eq!(opts.trace, TraceLevel::Unknown);
    }
}
