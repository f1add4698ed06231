//! Field-level validation, run before any write reaches storage.

use std::net::IpAddr;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Pure validation contract implemented by every entity input and patch.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldError>;
}

pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn non_negative(field: &'static str, value: i64) -> Result<(), FieldError> {
    if value < 0 {
        return Err(FieldError::new(field, "must be >= 0"));
    }
    Ok(())
}

pub(crate) fn email(field: &'static str, value: &str) -> Result<(), FieldError> {
    non_empty(field, value)?;
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FieldError::new(field, "must contain exactly one '@'"));
    };
    if local.is_empty() || domain.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(FieldError::new(field, "is not a valid address"));
    }
    Ok(())
}

pub(crate) fn ip_address(field: &'static str, value: &str) -> Result<(), FieldError> {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| FieldError::new(field, "is not a valid IPv4 or IPv6 address"))
}

pub(crate) fn currency(field: &'static str, value: &str) -> Result<(), FieldError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(FieldError::new(
            field,
            "must be a three-letter uppercase ISO 4217 code",
        ));
    }
    Ok(())
}

/// Generates a string-backed enum with `as_str`, `Display` and a `FromStr`
/// that rejects unknown values with a [`FieldError`].
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::validate::FieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::validate::FieldError::new(
                        $field,
                        format!("unknown value '{other}'"),
                    )),
                }
            }
        }
    };
}

pub(crate) use string_enum;
