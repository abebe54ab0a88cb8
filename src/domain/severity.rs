use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity of a log record, ordered from least to most severe.
///
/// The eight levels follow RFC 5424 so records coming from syslog-style
/// frameworks map one to one. The derived ordering is what the minimum
/// severity filter compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown severity '{0}'. Valid values: debug, info, notice, warning, error, critical, alert, emergency")]
pub struct ParseSeverityError(pub String);

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Debug,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Alert,
        Severity::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Emergency => "emergency",
        }
    }

    /// Numeric code used by PSR-3/Monolog style frameworks (100..=600).
    pub fn code(&self) -> u16 {
        match self {
            Severity::Debug => 100,
            Severity::Info => 200,
            Severity::Notice => 250,
            Severity::Warning => 300,
            Severity::Error => 400,
            Severity::Critical => 500,
            Severity::Alert => 550,
            Severity::Emergency => 600,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let severity = match normalized.as_str() {
            "debug" | "trace" => Severity::Debug,
            "info" | "information" => Severity::Info,
            "notice" => Severity::Notice,
            "warning" | "warn" => Severity::Warning,
            "error" | "err" => Severity::Error,
            "critical" | "crit" | "fatal" => Severity::Critical,
            "alert" => Severity::Alert,
            "emergency" | "emerg" => Severity::Emergency,
            other => {
                return other
                    .parse::<u16>()
                    .ok()
                    .and_then(Severity::from_code)
                    .ok_or_else(|| ParseSeverityError(s.to_string()));
            }
        };
        Ok(severity)
    }
}

impl Serialize for Severity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Code(u16),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Name(name) => name.parse().map_err(serde::de::Error::custom),
            Raw::Code(code) => Severity::from_code(code).ok_or_else(|| {
                serde::de::Error::custom(ParseSeverityError(code.to_string()))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_follows_rfc5424() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Alert < Severity::Emergency);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Emergency));
    }

    #[test]
    fn test_parse_aliases_and_codes() {
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!(" error ".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("250".parse::<Severity>().unwrap(), Severity::Notice);
        assert!("loud".parse::<Severity>().is_err());
        assert!("150".parse::<Severity>().is_err());
    }

    #[test]
    fn test_serde_accepts_names_and_codes() {
        let level: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(level, Severity::Critical);
        let level: Severity = serde_json::from_str("400").unwrap();
        assert_eq!(level, Severity::Error);
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "\"info\"");
    }
}
