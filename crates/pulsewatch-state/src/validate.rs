//! Registration parameter validation.
//!
//! Targets may be http/https URLs or bare IP literals; email addresses
//! get a structural check (local part, `@`, dotted domain). Numeric
//! parameters are checked against the documented ranges.

use std::net::IpAddr;

use url::Url;

use crate::error::ValidationError;
use crate::types::*;

/// Validate a registration request against the documented ranges.
///
/// Returns the first violation found; the monitoring crates rely on a
/// spec having passed this check.
pub fn validate_spec(spec: &AppSpec) -> Result<(), ValidationError> {
    if !is_valid_target(&spec.url) {
        return Err(ValidationError::InvalidTarget(spec.url.clone()));
    }
    if let Some(email) = spec.notify_email.as_deref() {
        if !is_valid_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
    }
    check_range(
        "timeout",
        spec.timeout_secs,
        MIN_TIMEOUT_SECS,
        MAX_TIMEOUT_SECS,
    )?;
    check_range(
        "interval",
        spec.interval_secs,
        MIN_INTERVAL_SECS,
        MAX_INTERVAL_SECS,
    )?;
    check_range(
        "unhealthy_threshold",
        u64::from(spec.unhealthy_threshold),
        u64::from(MIN_UNHEALTHY_THRESHOLD),
        u64::from(MAX_UNHEALTHY_THRESHOLD),
    )?;
    check_range(
        "healthy_threshold",
        u64::from(spec.healthy_threshold),
        u64::from(MIN_HEALTHY_THRESHOLD),
        u64::from(MAX_HEALTHY_THRESHOLD),
    )?;
    Ok(())
}

fn check_range(
    name: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Whether `target` is an http/https URL with a host, or a bare IP literal.
pub fn is_valid_target(target: &str) -> bool {
    if target.parse::<IpAddr>().is_ok() {
        return true;
    }
    match Url::parse(target) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Structural email check: one `@`, non-empty local part, dotted domain,
/// no whitespace. Deliverability is the mail transport's problem.
pub fn is_valid_email(addr: &str) -> bool {
    if addr.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Domain needs at least one dot with labels on both sides.
    domain.split('.').count() >= 2 && domain.split('.').all(|label| !label.is_empty())
}
