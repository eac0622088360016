//! Input checks shared by the builders and the reconciler.

use crate::error::ValidationError;
use ipnet::IpNet;
use std::net::IpAddr;

/// Validate a single IP address or CIDR range
pub fn validate_ip_or_cidr(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.parse::<IpAddr>().is_ok() || value.parse::<IpNet>().is_ok() {
        return Ok(());
    }

    Err(ValidationError::InvalidIp {
        field,
        value: value.to_string(),
    })
}

/// Validate an allow/block list. Blank entries are ignored.
pub fn validate_ip_list(field: &'static str, values: &[String]) -> Result<(), ValidationError> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .try_for_each(|v| validate_ip_or_cidr(field, v))
}

/// Trimmed, non-blank entries of an IP list
#[must_use]
pub fn clean_ip_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Returns true if the domain carries an explicit `:port`.
///
/// Such domains cannot be host-matched and rely on listener separation.
#[must_use]
pub fn has_explicit_port(domain: &str) -> bool {
    domain.contains(':')
}

/// Port embedded in a `host:port` domain, if any
#[must_use]
pub fn domain_port(domain: &str) -> Option<u16> {
    let (_, port) = domain.rsplit_once(':')?;
    port.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ips_and_ranges() {
        assert!(validate_ip_or_cidr("allowed IPs", "10.0.0.1").is_ok());
        assert!(validate_ip_or_cidr("allowed IPs", "192.168.0.0/16").is_ok());
        assert!(validate_ip_or_cidr("allowed IPs", "2001:db8::/32").is_ok());
        assert!(validate_ip_or_cidr("allowed IPs", "::1").is_ok());
    }

    #[test]
    fn test_rejects_bad_cidr() {
        let err = validate_ip_or_cidr("blocked IPs", "300.1.1.1/40").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidIp {
                field: "blocked IPs",
                value: "300.1.1.1/40".into()
            }
        );
        assert!(validate_ip_or_cidr("blocked IPs", "example.com").is_err());
    }

    #[test]
    fn test_list_skips_blank_entries() {
        let list = vec![" 10.0.0.1 ".to_string(), String::new(), "  ".to_string()];
        assert!(validate_ip_list("allowed IPs", &list).is_ok());
        assert_eq!(clean_ip_list(&list), vec!["10.0.0.1".to_string()]);
    }

    #[test]
    fn test_domain_ports() {
        assert!(has_explicit_port("localhost:9801"));
        assert!(!has_explicit_port("example.com"));
        assert_eq!(domain_port("localhost:9801"), Some(9801));
        assert_eq!(domain_port("example.com"), None);
        assert_eq!(domain_port("example.com:http"), None);
    }
}
