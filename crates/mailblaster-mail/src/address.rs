use lettre::Address;

use crate::MailError;

/// Validate and normalize a user-supplied address.
///
/// Accepts what lettre accepts, but also requires a dotted domain so that
/// typos like `me@gmail` are caught before a code is sent.
pub fn parse_address(input: &str) -> Result<Address, MailError> {
    let trimmed = input.trim();
    let address: Address = trimmed.parse().map_err(|e: lettre::address::AddressError| {
        MailError::InvalidAddress {
            address: trimmed.to_string(),
            reason: e.to_string(),
        }
    })?;

    let domain = address.domain();
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(MailError::InvalidAddress {
            address: trimmed.to_string(),
            reason: "domain must be fully qualified".into(),
        });
    }

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        let addr = parse_address("  a.b+tag@example.co.uk ").unwrap();
        assert_eq!(addr.to_string(), "a.b+tag@example.co.uk");
        assert_eq!(addr.domain(), "example.co.uk");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "nobody", "a@", "@x.com", "a b@x.com", "me@gmail", "a@x.com."] {
            assert!(parse_address(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
