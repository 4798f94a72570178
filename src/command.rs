//! Parsing of textual payloads arriving on the command and stock feeds.

use crate::error::FeederError;

/// Order quantity from the command feed. Sign is kept so that the
/// coordinator can reject negative orders itself.
pub fn parse_quantity(payload: &str) -> Result<i64, FeederError> {
    parse_integer(payload, "order quantity")
}

/// Stock value pushed by the remote source of truth.
pub fn parse_stock(payload: &str) -> Result<i64, FeederError> {
    parse_integer(payload, "stock value")
}

fn parse_integer(payload: &str, what: &str) -> Result<i64, FeederError> {
    let trimmed = payload.trim();
    trimmed
        .parse::<i64>()
        .map_err(|e| FeederError::InvalidArgument(format!("malformed {what} '{trimmed}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_integers() {
        assert_eq!(Ok(12), parse_quantity("12"));
        assert_eq!(Ok(7), parse_quantity(" 7\n"));
        assert_eq!(Ok(-3), parse_quantity("-3"));
        assert_eq!(Ok(0), parse_stock("0"));
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        for payload in ["", "  ", "12abc", "1.5", "ten", "99999999999999999999"] {
            assert!(
                matches!(parse_quantity(payload), Err(FeederError::InvalidArgument(_))),
                "{payload:?} should be rejected"
            );
        }
    }
}
