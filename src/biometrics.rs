// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Biometric data objects.
//!
//! PIV biometric objects ("Cardholder Facial Image", "Cardholder
//! Fingerprints") are stored as a BER-TLV data object wrapping a second TLV
//! that holds the CBEFF record:
//!
//! ```text
//! 53 LL                 outer PIV data object (no trailing bytes allowed)
//!    BC LL <CBEFF>      biometric object
//!    FE 00              error detection code
//! ```
//!
//! This module removes both layers and hands the CBEFF bytes to a
//! [`BiometricParser`]. CBEFF and the image codecs are not decoded here.

use der::{AnyRef, Decode, Reader, SliceReader, Tagged};
use tracing::debug;

use crate::error::{PivError, Result};

/// Strip the two TLV layers around a biometric record.
///
/// Fails if the outer element is followed by any trailing bytes. Bytes after
/// the inner element (such as the `FE 00` error detection code) are ignored.
pub fn unwrap_tlv_container(data: &[u8]) -> Result<&[u8]> {
    let mut reader = SliceReader::new(data)
        .map_err(|e| PivError::biometric(format!("outer wrapper: {}", e)))?;
    let outer = AnyRef::decode(&mut reader)
        .map_err(|e| PivError::biometric(format!("outer wrapper: {}", e)))?;

    let trailing = reader.remaining_len();
    if !reader.is_finished() {
        return Err(PivError::biometric(format!(
            "{} trailing bytes after the outer wrapper",
            u32::from(trailing)
        )));
    }

    let mut inner_reader = SliceReader::new(outer.value())
        .map_err(|e| PivError::biometric(format!("inner wrapper: {}", e)))?;
    let inner = AnyRef::decode(&mut inner_reader)
        .map_err(|e| PivError::biometric(format!("inner wrapper: {}", e)))?;

    debug!(
        "Unwrapped biometric container: outer tag {}, inner tag {}, {} bytes",
        outer.tag(),
        inner.tag(),
        inner.value().len()
    );

    Ok(inner.value())
}

/// Parser for the CBEFF record inside a biometric container.
pub trait BiometricParser {
    /// Parsed representation of the record.
    type Output;

    /// Parse the raw CBEFF bytes.
    fn parse(&self, cbeff: &[u8]) -> Result<Self::Output>;
}

/// Unwrapped biometric record as read from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricContainer {
    label: String,
    cbeff: Vec<u8>,
}

impl BiometricContainer {
    /// Unwrap the raw data object read under `label`.
    pub fn from_tlv(label: impl Into<String>, data: &[u8]) -> Result<Self> {
        let cbeff = unwrap_tlv_container(data)?.to_vec();
        Ok(Self {
            label: label.into(),
            cbeff,
        })
    }

    /// Object label the container was read from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The CBEFF record bytes.
    pub fn cbeff(&self) -> &[u8] {
        &self.cbeff
    }

    /// Consume the container, returning the CBEFF record bytes.
    pub fn into_cbeff(self) -> Vec<u8> {
        self.cbeff
    }

    /// Decode the record with an external parser.
    pub fn parse_with<P: BiometricParser>(&self, parser: &P) -> Result<P::Output> {
        parser.parse(&self.cbeff)
    }
}
