//! Record validation
//!
//! Checks applied to tunnel and peer records when they are read from the
//! state file. Public keys are opaque here and are not checked.
//!
//! # Validation Rules
//!
//! - **Tunnel names**: Alphanumeric with hyphens, underscores and dots, 1-64 characters
//! - **Descriptions**: At most 256 characters
//! - **Endpoints**: Empty, an IP address, or a hostname (no port)
//! - **Ports**: Empty, or 1-65535
//!
//! # Examples
//!
//! ```
//! use wg_peers::store::validation::{parse_port, validate_tunnel_name};
//!
//! assert!(validate_tunnel_name("tun_wg0").is_ok());
//! assert!(validate_tunnel_name("").is_err());
//!
//! assert_eq!(parse_port("51820"), Ok(Some(51820)));
//! assert_eq!(parse_port(""), Ok(None));
//! assert!(parse_port("0").is_err());
//! ```

use std::net::IpAddr;

use thiserror::Error;

/// Maximum tunnel name length
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum description length
pub const MAX_DESCRIPTION_LENGTH: usize = 256;

/// Validation error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty
    #[error("Name cannot be empty")]
    EmptyName,

    /// Name is too long
    #[error("Name exceeds maximum length of {MAX_NAME_LENGTH} characters: {length}")]
    NameTooLong { length: usize },

    /// Name must start with alphanumeric
    #[error("Name must start with an alphanumeric character")]
    InvalidNameStart,

    /// Name contains invalid characters
    #[error("Name contains invalid characters: {name}")]
    InvalidNameCharacters { name: String },

    /// Description is too long
    #[error("Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters")]
    DescriptionTooLong,

    /// Endpoint host is invalid
    #[error("Invalid endpoint: {message}")]
    InvalidEndpoint { message: String },

    /// Port is not a number in 1-65535
    #[error("Invalid port: {value}")]
    InvalidPort { value: String },
}

/// Validate a tunnel name
///
/// # Examples
///
/// ```
/// use wg_peers::store::validation::validate_tunnel_name;
///
/// assert!(validate_tunnel_name("tun_wg0").is_ok());
/// assert!(validate_tunnel_name("wg-office.1").is_ok());
/// assert!(validate_tunnel_name("-wg").is_err());
/// ```
pub fn validate_tunnel_name(name: &str) -> Result<(), ValidationError> {
    let Some(first) = name.chars().next() else {
        return Err(ValidationError::EmptyName);
    };

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong { length: name.len() });
    }

    if !first.is_ascii_alphanumeric() {
        return Err(ValidationError::InvalidNameStart);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::InvalidNameCharacters { name: name.into() });
    }

    Ok(())
}

/// Validate a description
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

/// Validate a static endpoint host
///
/// The port is stored separately, so `host:port` forms are rejected unless
/// the whole string parses as an IPv6 address.
///
/// # Examples
///
/// ```
/// use wg_peers::store::validation::validate_endpoint_host;
///
/// assert!(validate_endpoint_host("").is_ok());
/// assert!(validate_endpoint_host("198.51.100.7").is_ok());
/// assert!(validate_endpoint_host("2001:db8::1").is_ok());
/// assert!(validate_endpoint_host("vpn.example.com").is_ok());
/// assert!(validate_endpoint_host("vpn.example.com:51820").is_err());
/// ```
pub fn validate_endpoint_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    for label in host.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(ValidationError::InvalidEndpoint {
                message: format!("Invalid hostname label in: {host}"),
            });
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ValidationError::InvalidEndpoint {
                message: format!("Invalid hostname characters in: {host}"),
            });
        }
    }

    Ok(())
}

/// Parse a persisted port value, empty meaning "no port"
pub fn parse_port(value: &str) -> Result<Option<u16>, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<u16>() {
        Ok(0) | Err(_) => Err(ValidationError::InvalidPort {
            value: value.into(),
        }),
        Ok(port) => Ok(Some(port)),
    }
}
