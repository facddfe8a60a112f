//! Precedence relationships between tasks.
//!
//! # Semantics
//! For a link `(pred, succ, type, lag)` the successor is constrained by:
//!
//! | Type | Constraint |
//! |------|-----------|
//! | FS | `succ.start >= pred.end + lag` |
//! | SS | `succ.start >= pred.start + lag` |
//! | FF | `succ.end >= pred.end + lag` |
//! | SF | `succ.end >= pred.start + lag` |
//!
//! Lags are signed; negative lags (leads) are allowed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which endpoints of the two tasks a link relates.
///
/// Serializes as the two-letter code; deserializes from any spelling
/// [`FromStr`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum LinkType {
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

impl LinkType {
    /// Two-letter code.
    pub fn code(self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    /// Whether the predecessor side of the link is its finish.
    #[inline]
    pub fn from_pred_finish(self) -> bool {
        matches!(self, Self::FinishToStart | Self::FinishToFinish)
    }

    /// Whether the successor side of the link is its finish.
    #[inline]
    pub fn to_succ_finish(self) -> bool {
        matches!(self, Self::FinishToFinish | Self::StartToFinish)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned for an unrecognized link spelling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized link type '{0}'")]
pub struct ParseLinkTypeError(pub String);

impl FromStr for LinkType {
    type Err = ParseLinkTypeError;

    /// Accepts the spellings source files use: `FS`, `PR_FS`,
    /// `FINISH_START`, `Finish-to-Start`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let long = [
            ("FINISH_TO_START", Self::FinishToStart),
            ("FINISH_START", Self::FinishToStart),
            ("START_TO_START", Self::StartToStart),
            ("START_START", Self::StartToStart),
            ("FINISH_TO_FINISH", Self::FinishToFinish),
            ("FINISH_FINISH", Self::FinishToFinish),
            ("START_TO_FINISH", Self::StartToFinish),
            ("START_FINISH", Self::StartToFinish),
        ];
        if let Some((_, t)) = long.iter().find(|(k, _)| upper.contains(k)) {
            return Ok(*t);
        }
        let code = upper.strip_prefix("PR_").unwrap_or(&upper);
        match code {
            "FS" => Ok(Self::FinishToStart),
            "SS" => Ok(Self::StartToStart),
            "FF" => Ok(Self::FinishToFinish),
            "SF" => Ok(Self::StartToFinish),
            _ => Err(ParseLinkTypeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for LinkType {
    type Error = ParseLinkTypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A precedence link from `predecessor` to `successor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub predecessor: String,
    pub successor: String,
    #[serde(default)]
    pub link: LinkType,
    /// Signed lag in calendar days.
    #[serde(default)]
    pub lag_days: f64,
}

impl Relationship {
    /// Creates a zero-lag link of the given type.
    pub fn new(predecessor: impl Into<String>, successor: impl Into<String>, link: LinkType) -> Self {
        Self {
            predecessor: predecessor.into(),
            successor: successor.into(),
            link,
            lag_days: 0.0,
        }
    }

    /// Creates a zero-lag finish-to-start link.
    pub fn finish_to_start(predecessor: impl Into<String>, successor: impl Into<String>) -> Self {
        Self::new(predecessor, successor, LinkType::FinishToStart)
    }

    /// Sets the lag (calendar days, may be negative).
    pub fn with_lag_days(mut self, lag_days: f64) -> Self {
        self.lag_days = lag_days;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_spellings() {
        assert_eq!("FS".parse::<LinkType>().unwrap(), LinkType::FinishToStart);
        assert_eq!("PR_SS".parse::<LinkType>().unwrap(), LinkType::StartToStart);
        assert_eq!("FINISH_FINISH".parse::<LinkType>().unwrap(), LinkType::FinishToFinish);
        assert_eq!("Start-to-Finish".parse::<LinkType>().unwrap(), LinkType::StartToFinish);
        assert_eq!(" ff ".parse::<LinkType>().unwrap(), LinkType::FinishToFinish);
        assert!("XX".parse::<LinkType>().is_err());
    }

    #[test]
    fn test_endpoint_sides() {
        assert!(LinkType::FinishToStart.from_pred_finish());
        assert!(!LinkType::FinishToStart.to_succ_finish());
        assert!(!LinkType::StartToFinish.from_pred_finish());
        assert!(LinkType::StartToFinish.to_succ_finish());
    }

    #[test]
    fn test_relationship_json() {
        let r: Relationship =
            serde_json::from_str(r#"{"predecessor": "A", "successor": "B", "link": "SS", "lag_days": -1.5}"#)
                .unwrap();
        assert_eq!(r.link, LinkType::StartToStart);
        assert!((r.lag_days + 1.5).abs() < 1e-12);

        let d: Relationship = serde_json::from_str(r#"{"predecessor": "A", "successor": "B"}"#).unwrap();
        assert_eq!(d, Relationship::finish_to_start("A", "B"));
    }
}
