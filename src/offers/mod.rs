//! Offer sub-model and validation.
//!
//! An offer rides along with a booking request and is frozen once the meeting
//! is created. Values arrive as form strings and are parsed here; the same
//! function backs pre-submission checks and server-side enforcement, so the
//! two call sites can never drift apart.

use serde::{Deserialize, Serialize};

pub const OFFER_TYPE_ECONOMIC: &str = "economic";
pub const OFFER_TYPE_NON_ECONOMIC: &str = "non_economic";

/// Minimum trimmed length for a non-economic contribution description.
pub const MIN_CONTRIBUTION_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub offer_type: String,
    /// Monetary amount, economic offers only.
    pub amount: Option<String>,
    /// Equity percentage in (0, 100], economic offers only.
    pub equity_percent: Option<String>,
    /// Free-text contribution, non-economic offers only.
    pub contribution: Option<String>,
}

impl Offer {
    pub fn economic(amount: &str, equity_percent: &str) -> Self {
        Self {
            offer_type: OFFER_TYPE_ECONOMIC.to_string(),
            amount: Some(amount.to_string()),
            equity_percent: Some(equity_percent.to_string()),
            contribution: None,
        }
    }

    pub fn non_economic(contribution: &str) -> Self {
        Self {
            offer_type: OFFER_TYPE_NON_ECONOMIC.to_string(),
            amount: None,
            equity_percent: None,
            contribution: Some(contribution.to_string()),
        }
    }
}

/// Pure validation: no side effects, same verdict for the same input.
pub fn validate_offer(offer: &Offer) -> Result<(), String> {
    match offer.offer_type.as_str() {
        OFFER_TYPE_ECONOMIC => {
            let amount = parse_number(offer.amount.as_deref(), "amount")?;
            if amount <= 0.0 {
                return Err("Amount must be greater than zero".to_string());
            }
            let equity = parse_number(offer.equity_percent.as_deref(), "equity percentage")?;
            if equity <= 0.0 || equity > 100.0 {
                return Err("Equity percentage must be greater than 0 and at most 100".to_string());
            }
            Ok(())
        }
        OFFER_TYPE_NON_ECONOMIC => {
            let contribution = offer.contribution.as_deref().unwrap_or("").trim();
            if contribution.chars().count() < MIN_CONTRIBUTION_LEN {
                return Err(format!(
                    "Contribution description must be at least {} characters",
                    MIN_CONTRIBUTION_LEN
                ));
            }
            Ok(())
        }
        other => Err(format!("Unknown offer type: {}", other)),
    }
}

fn parse_number(value: Option<&str>, field: &str) -> Result<f64, String> {
    let raw = value.unwrap_or("").trim();
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(format!("Invalid {}: {:?}", field, raw)),
    }
}

/// Human-readable one-liner used in notification events.
pub fn offer_summary(offer: &Offer) -> String {
    match offer.offer_type.as_str() {
        OFFER_TYPE_ECONOMIC => format!(
            "Economic offer: {} for {}% equity",
            offer.amount.as_deref().unwrap_or("?"),
            offer.equity_percent.as_deref().unwrap_or("?"),
        ),
        OFFER_TYPE_NON_ECONOMIC => format!(
            "Non-economic offer: {}",
            offer.contribution.as_deref().unwrap_or("").trim(),
        ),
        other => format!("Offer of unknown type: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_economic_offer_valid() {
        assert!(validate_offer(&Offer::economic("5000", "10")).is_ok());
        assert!(validate_offer(&Offer::economic("0.01", "100")).is_ok());
    }

    #[test]
    fn test_economic_offer_rejects_non_positive_amount() {
        // Amount <= 0 is rejected regardless of equity.
        assert!(validate_offer(&Offer::economic("0", "10")).is_err());
        assert!(validate_offer(&Offer::economic("-5000", "50")).is_err());
        assert!(validate_offer(&Offer::economic("-1", "100")).is_err());
    }

    #[test]
    fn test_economic_offer_rejects_bad_equity() {
        assert!(validate_offer(&Offer::economic("5000", "0")).is_err());
        assert!(validate_offer(&Offer::economic("5000", "-1")).is_err());
        assert!(validate_offer(&Offer::economic("5000", "100.5")).is_err());
        assert!(validate_offer(&Offer::economic("5000", "NaN")).is_err());
        assert!(validate_offer(&Offer::economic("5000", "inf")).is_err());
    }

    #[test]
    fn test_economic_offer_rejects_unparseable_values() {
        assert!(validate_offer(&Offer::economic("lots", "10")).is_err());
        assert!(validate_offer(&Offer::economic("", "10")).is_err());
        let missing = Offer {
            offer_type: OFFER_TYPE_ECONOMIC.to_string(),
            amount: None,
            equity_percent: Some("10".to_string()),
            contribution: None,
        };
        assert!(validate_offer(&missing).is_err());
    }

    #[test]
    fn test_non_economic_offer_minimum_length() {
        assert!(validate_offer(&Offer::non_economic("too short")).is_err());
        // Whitespace does not count toward the minimum.
        assert!(validate_offer(&Offer::non_economic("   padded        ")).is_err());
        assert!(validate_offer(&Offer::non_economic(
            "I can introduce you to three distribution partners"
        ))
        .is_ok());
    }

    #[test]
    fn test_unknown_offer_type_rejected() {
        let offer = Offer {
            offer_type: "barter".to_string(),
            amount: Some("5000".to_string()),
            equity_percent: Some("10".to_string()),
            contribution: None,
        };
        assert!(validate_offer(&offer).is_err());
    }

    #[test]
    fn test_validation_is_pure() {
        let offer = Offer::economic("5000", "10");
        assert_eq!(validate_offer(&offer).is_ok(), validate_offer(&offer).is_ok());
        let bad = Offer::economic("-1", "10");
        assert_eq!(validate_offer(&bad).is_err(), validate_offer(&bad).is_err());
    }

    #[test]
    fn test_offer_summary_mentions_terms() {
        let summary = offer_summary(&Offer::economic("5000", "10"));
        assert!(summary.contains("5000"));
        assert!(summary.contains("10"));
        let summary = offer_summary(&Offer::non_economic("Marketing help for your launch"));
        assert!(summary.contains("Marketing help"));
    }
}
