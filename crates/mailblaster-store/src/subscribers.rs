//! Line format for a guild's subscriber list.
//!
//! One subscriber per line, tab separated:
//! `address  status  code  requested_at  requested_by`, with `-` for absent
//! fields. A line holding only an address is a verified subscriber. Lines
//! whose address does not parse are dropped.

use chrono::{DateTime, Utc};
use tracing::warn;

use mailblaster_mail::parse_address;
use mailblaster_types::models::{Subscriber, SubscriberStatus};

const ABSENT: &str = "-";

pub fn encode(subscribers: &[Subscriber]) -> String {
    let mut out = String::new();
    for sub in subscribers {
        let code = sub
            .verification_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| ABSENT.into());
        let requested_at = sub
            .requested_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| ABSENT.into());
        let requested_by = sub
            .requested_by
            .map(|u| u.to_string())
            .unwrap_or_else(|| ABSENT.into());

        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            sub.email,
            sub.status.as_str(),
            code,
            requested_at,
            requested_by
        ));
    }
    out
}

/// Malformed lines are logged and skipped.
pub fn decode(text: &str) -> Vec<Subscriber> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match decode_line(line) {
            Some(sub) => Some(sub),
            None => {
                warn!(line = i + 1, "Skipping malformed subscriber line");
                None
            }
        })
        .collect()
}

fn decode_line(line: &str) -> Option<Subscriber> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if parse_address(fields[0]).is_err() {
        return None;
    }

    if fields.len() == 1 {
        return Some(Subscriber::verified(fields[0].to_string()));
    }
    if fields.len() != 5 {
        return None;
    }

    let status = SubscriberStatus::parse(fields[1])?;
    let verification_code = optional(fields[2], |s| s.parse::<u32>().ok())?;
    let requested_at = optional(fields[3], |s| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    })?;
    let requested_by = optional(fields[4], |s| s.parse::<u64>().ok())?;

    if status == SubscriberStatus::Pending && verification_code.is_none() {
        return None;
    }

    Some(Subscriber {
        email: fields[0].to_string(),
        status,
        verification_code,
        requested_at,
        requested_by,
    })
}

/// `Some(None)` for the absent marker, `None` if present but unparseable.
fn optional<T>(field: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<Option<T>> {
    if field == ABSENT {
        Some(None)
    } else {
        parse(field).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_verified_survive_encoding() {
        let now = DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let subs = vec![
            Subscriber::verified("a@x.com".into()),
            Subscriber::pending("b@x.com".into(), 123456, 42, now),
        ];

        let text = encode(&subs);
        assert_eq!(
            text,
            "a@x.com\tverified\t-\t-\t-\nb@x.com\tpending\t123456\t2026-10-19T12:00:00+00:00\t42\n"
        );
        assert_eq!(decode(&text), subs);
    }

    #[test]
    fn bare_address_is_verified() {
        let subs = decode("a@x.com\n\nb@x.com\n");
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.is_verified()));
    }

    #[test]
    fn invalid_addresses_are_skipped() {
        let subs = decode("not an email\na@x.com\nb@nodomain\tverified\t-\t-\t-\n");
        assert_eq!(subs, vec![Subscriber::verified("a@x.com".into())]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "a@x.com\tbogus\t-\t-\t-\n\
                    b@x.com\tpending\t-\t-\t-\n\
                    c@x.com\tverified\n\
                    d@x.com\tpending\t12\tnot-a-date\t1\n\
                    e@x.com\tverified\t-\t-\t-\n";
        let subs = decode(text);
        assert_eq!(subs, vec![Subscriber::verified("e@x.com".into())]);
    }
}
