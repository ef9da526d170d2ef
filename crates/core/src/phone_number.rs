//! `PhoneNumber`: a leased E.164 DID.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// E.164, e.g. `+15551230001`.
    pub e164: String,
    pub provider_config_id: String,
    pub assigned_agent_id: Option<String>,
}

impl PhoneNumber {
    pub fn new(e164: impl Into<String>, provider_config_id: impl Into<String>) -> Result<Self> {
        let e164 = e164.into();
        if !is_e164(&e164) {
            return Err(CoreError::InvalidPhoneNumber(e164));
        }
        Ok(Self {
            e164,
            provider_config_id: provider_config_id.into(),
            assigned_agent_id: None,
        })
    }
}

/// `+` followed by 8-15 digits, per E.164.
fn is_e164(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('+') else {
        return false;
    };
    !digits.is_empty()
        && digits.len() <= 15
        && digits.len() >= 8
        && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_e164() {
        assert!(PhoneNumber::new("+15551230001", "p1").is_ok());
    }

    #[test]
    fn rejects_missing_plus() {
        assert!(PhoneNumber::new("15551230001", "p1").is_err());
    }

    #[test]
    fn rejects_too_short() {
        assert!(PhoneNumber::new("+1555", "p1").is_err());
    }
}
