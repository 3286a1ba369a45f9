//! Error types for PIV credential handling.
//!
//! This module defines the error taxonomy shared by the certificate decorator,
//! the object resolution protocol and the token backends. The one error callers
//! are expected to special-case is [`PivError::NotFound`]: a well-known slot that
//! simply has not been provisioned is not a hard failure.

use thiserror::Error;

/// Result type alias using [`PivError`].
pub type Result<T> = std::result::Result<T, PivError>;

/// Errors that can occur while decoding PIV certificates or talking to a token.
#[derive(Debug, Error)]
pub enum PivError {
    /// DER encoding/decoding error.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),

    /// Failed to parse an X.509 certificate.
    #[error("Certificate parsing error: {0}")]
    CertificateParsing(String),

    /// A PIV-relevant certificate extension could not be decoded.
    #[error("Malformed {extension} extension: {source}")]
    MalformedExtension {
        /// Human-readable extension name.
        extension: &'static str,
        /// Underlying decoder error.
        #[source]
        source: der::Error,
    },

    /// The requested object is not present on the token.
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one object matched a query that must be unique.
    #[error("The query resulted in too many objects ({count} matched)")]
    Ambiguous {
        /// Number of objects that matched.
        count: usize,
    },

    /// The token returned a number of attribute values other than one.
    #[error("The query resulted in {count} attribute values, expected exactly one")]
    TooManyAttributes {
        /// Number of attribute values returned.
        count: usize,
    },

    /// No slot satisfied the slot selection rule.
    #[error("Slot selection failed: {0}")]
    SlotSelection(String),

    /// PKCS#11 module or session error.
    #[error("PKCS#11 error: {0}")]
    Pkcs11(String),

    /// The token rejected the PIN.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// YubiKey PIV applet error.
    #[error("YubiKey error: {0}")]
    YubiKey(String),

    /// Biometric container envelope is structurally invalid.
    #[error("Biometric container error: {0}")]
    Biometric(String),

    /// FASC-N could not be decoded.
    #[error("Invalid FASC-N: {0}")]
    Fasc(String),

    /// One or more teardown steps failed.
    #[error("Token teardown failed: {}", .0.join("; "))]
    Teardown(Vec<String>),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PivError {
    /// Create a certificate parsing error with the given message.
    pub fn certificate_parsing(msg: impl Into<String>) -> Self {
        Self::CertificateParsing(msg.into())
    }

    /// Create a malformed extension error.
    pub fn malformed_extension(extension: &'static str, source: der::Error) -> Self {
        Self::MalformedExtension { extension, source }
    }

    /// Create a not found error naming the missing object.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a slot selection error.
    pub fn slot_selection(msg: impl Into<String>) -> Self {
        Self::SlotSelection(msg.into())
    }

    /// Create a PKCS#11 error with the given message.
    pub fn pkcs11(msg: impl Into<String>) -> Self {
        Self::Pkcs11(msg.into())
    }

    /// Create an authentication error with the given message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a YubiKey error with the given message.
    pub fn yubikey(msg: impl Into<String>) -> Self {
        Self::YubiKey(msg.into())
    }

    /// Create a biometric container error with the given message.
    pub fn biometric(msg: impl Into<String>) -> Self {
        Self::Biometric(msg.into())
    }

    /// Create a FASC-N error with the given message.
    pub fn fasc(msg: impl Into<String>) -> Self {
        Self::Fasc(msg.into())
    }

    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the error means the object is simply absent.
    ///
    /// Higher layers use this to keep probing other slots instead of aborting.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
