//! Typed X-Road actor identifiers and compact-form parsing

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type alias for identifier parsing
pub type IdentifierResult<T> = Result<T, IdentifierError>;

/// Errors produced when handling actor identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The compact form could not be parsed into an identifier
    Malformed(String),
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierError::Malformed(msg) => write!(f, "malformed identifier: {}", msg),
        }
    }
}

impl std::error::Error for IdentifierError {}

/// Structured name of an X-Road member or service.
///
/// The compact form is `CLASS/CODE`, optionally extended with a subsystem
/// and a service code (`CLASS/CODE/SUBSYSTEM/SERVICE`). The instance is not
/// part of the compact form; it comes from configuration and is injected
/// when the identifier is embedded into a request document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XRoadIdentifier {
    pub instance: String,
    pub member_class: String,
    pub member_code: String,
    pub subsystem: Option<String>,
    pub service_code: Option<String>,
}

impl XRoadIdentifier {
    /// Parse the compact slash-delimited form.
    ///
    /// Requires at least the member class and member code segments; every
    /// segment must be non-empty. Pure, no side effects.
    pub fn parse_compact(compact: &str) -> IdentifierResult<Self> {
        let segments: Vec<&str> = compact.split('/').collect();

        if segments.len() < 2 {
            return Err(IdentifierError::Malformed(format!(
                "'{compact}' has fewer than 2 segments (expected CLASS/CODE)"
            )));
        }

        if segments.len() > 4 {
            return Err(IdentifierError::Malformed(format!(
                "'{compact}' has more than 4 segments"
            )));
        }

        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(IdentifierError::Malformed(format!(
                "'{compact}' contains an empty segment"
            )));
        }

        Ok(Self {
            instance: String::new(),
            member_class: segments[0].to_string(),
            member_code: segments[1].to_string(),
            subsystem: segments.get(2).map(|s| s.to_string()),
            service_code: segments.get(3).map(|s| s.to_string()),
        })
    }

    /// Check that the member part is usable inside a request document.
    pub fn require_member(&self) -> IdentifierResult<()> {
        if self.member_class.is_empty() || self.member_code.is_empty() {
            return Err(IdentifierError::Malformed(
                "member class and code must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}
