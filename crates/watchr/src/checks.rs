//! Pure predicates used by the verifier.

use chrono::{DateTime, Duration, Utc};

/// Outcome of an expiration check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryVerdict {
    /// Threshold is zero or negative
    Disabled,
    /// Valid for more than `threshold` days
    Ok { days: i64 },
    /// Still valid, but for `threshold` days or fewer
    ExpiringSoon { days: i64 },
    /// Less than one whole day remains; `overdue` is zero until `valid_to` passes
    Expired { overdue: Duration },
}

impl ExpiryVerdict {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::ExpiringSoon { .. } | Self::Expired { .. })
    }
}

/// Classify `valid_to` against `now` and a day threshold
#[must_use]
pub fn expiry(valid_to: DateTime<Utc>, now: DateTime<Utc>, threshold: i64) -> ExpiryVerdict {
    if threshold <= 0 {
        return ExpiryVerdict::Disabled;
    }

    let remaining = valid_to - now;
    let days = remaining.num_days();
    if days <= 0 {
        return ExpiryVerdict::Expired {
            overdue: (-remaining).max(Duration::zero()),
        };
    }

    if days <= threshold {
        ExpiryVerdict::ExpiringSoon { days }
    } else {
        ExpiryVerdict::Ok { days }
    }
}

/// Whether `hostname` is covered by a certificate name, honoring single-label wildcards
#[must_use]
pub fn name_matches(hostname: &str, name: &str) -> bool {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let name = name.trim_end_matches('.').to_ascii_lowercase();

    match name.strip_prefix("*.") {
        Some(parent) => hostname
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == parent),
        None => hostname == name,
    }
}

/// Whether any of `names` (common name then SANs) covers `hostname`
#[must_use]
pub fn subject_matches<'a>(hostname: &str, names: impl IntoIterator<Item = &'a str>) -> bool {
    names.into_iter().any(|name| name_matches(hostname, name))
}

/// Lower-case hex with separators removed
#[must_use]
pub fn normalize_fingerprint(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ':' | ' '))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Upper-case hex without `0x` prefix, separators or leading zeros
#[must_use]
pub fn normalize_serial(value: &str) -> String {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let digits: String = digits
        .chars()
        .filter(|c| *c != ':')
        .collect::<String>()
        .to_ascii_uppercase();

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() && !digits.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Issuer matches when its organization or common name equals `expected`
#[must_use]
pub fn issuer_matches(
    organization: Option<&str>,
    common_name: Option<&str>,
    expected: &str,
) -> bool {
    let expected = expected.trim();
    [organization, common_name]
        .into_iter()
        .flatten()
        .any(|value| value.trim() == expected)
}

/// Largest whole unit of a duration, e.g. `3 days` or `1 hour`
#[must_use]
pub fn elapsed(duration: Duration) -> String {
    const UNITS: [(&str, i64); 6] = [
        ("year", 365 * 86_400),
        ("month", 30 * 86_400),
        ("day", 86_400),
        ("hour", 3_600),
        ("minute", 60),
        ("second", 1),
    ];

    let seconds = duration.num_seconds().abs();
    if seconds <= 30 {
        return "a moment".to_string();
    }

    UNITS
        .iter()
        .find(|(_, size)| seconds >= *size)
        .map_or_else(
            || "a moment".to_string(),
            |(unit, size)| {
                let count = seconds / size;
                if count == 1 {
                    format!("1 {unit}")
                } else {
                    format!("{count} {unit}s")
                }
            },
        )
}
