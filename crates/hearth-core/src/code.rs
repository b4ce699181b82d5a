//! Code normalization and shape classification.
//!
//! Both code shapes travel the same validation path downstream, so the only
//! job here is to turn whatever a user typed or a deep link carried into one
//! canonical, tagged form. Pure and deterministic: a retry with the same raw
//! input always yields the same normalized code.

use crate::config::CodeConfig;
use crate::error::InviteError;

/// A cleaned-up code, tagged by shape.
///
/// Short codes are the human-typable kind a landlord reads out; long codes
/// are system-generated identifiers arriving via deep links. One tagged type
/// keeps the validator and redeemer single-sourced over both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedCode {
    Short(String),
    Long(String),
}

impl NormalizedCode {
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedCode::Short(s) | NormalizedCode::Long(s) => s,
        }
    }
}

/// Trims, upper-cases, strips separators, and classifies by length.
pub fn normalize(raw: &str, config: &CodeConfig) -> Result<NormalizedCode, InviteError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| config.alphabet.contains(*c))
        .collect();

    if cleaned.is_empty() {
        return Err(InviteError::MalformedCode(
            "enter the code from your invitation".into(),
        ));
    }
    if cleaned.len() > config.max_len {
        return Err(InviteError::MalformedCode(format!(
            "codes are at most {} characters",
            config.max_len
        )));
    }

    if cleaned.len() <= config.short_len {
        Ok(NormalizedCode::Short(cleaned))
    } else {
        Ok(NormalizedCode::Long(cleaned))
    }
}
