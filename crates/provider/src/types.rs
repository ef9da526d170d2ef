use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateCallResult {
    pub provider_call_id: String,
    pub initial_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: String,
    pub duration_sec: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Set by carriers that perform answering-machine detection.
    pub answered_by: Option<AnsweredBy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnsweredBy {
    Human,
    Machine,
    Unknown,
}

/// Digits-only normalization with the 10-digit-implies-India rule the
/// TokenExchange driver's dial step applies to both legs.
pub fn normalize_digits(number: &str) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("91{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digit_numbers_get_india_country_code() {
        assert_eq!(normalize_digits("9876543210"), "919876543210");
    }

    #[test]
    fn already_prefixed_numbers_are_untouched() {
        assert_eq!(normalize_digits("+919876543210"), "919876543210");
    }
}
