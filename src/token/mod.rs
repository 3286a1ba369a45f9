// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! PIV token access over a PKCS#11-shaped driver.
//!
//! This module provides the [`Module`] trait, a narrow view of the PKCS#11
//! calls needed to read PIV objects, and [`Token`], a session on one token
//! that resolves well-known objects by class and label.
//!
//! # Object resolution
//!
//! Every read goes through the same two steps:
//!
//! 1. [`Token::find_handles`] runs a find-objects search in batches of
//!    [`SEARCH_BATCH_SIZE`] and always finalizes the search.
//! 2. [`Token::find_unique`] requires exactly one match, failing with
//!    [`PivError::NotFound`](crate::PivError::NotFound) or
//!    [`PivError::Ambiguous`](crate::PivError::Ambiguous).
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "pkcs11")]
//! # fn example() -> usg_piv::Result<()> {
//! use usg_piv::token::{PivCredentials, Token};
//! use usg_piv::TokenConfig;
//!
//! let config = TokenConfig::detect()?.with_pin("123456");
//! let mut token = Token::open_pkcs11(config)?;
//!
//! match token.authentication_certificate() {
//!     Ok(cert) => println!("PIV Authentication: {}", cert.subject()),
//!     Err(e) if e.is_not_found() => println!("No PIV Authentication certificate"),
//!     Err(e) => return Err(e),
//! }
//!
//! token.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! - [`pkcs11::CryptokiModule`]: any PKCS#11 library via `cryptoki` (feature `pkcs11`)
//! - [`memory::MemoryModule`]: in-memory token for tests and tooling

pub mod memory;

#[cfg(feature = "pkcs11")]
pub mod pkcs11;

mod session;

pub use session::Token;

use crate::certificate::PivCertificate;
use crate::error::Result;

/// PKCS#11 label of the PIV Authentication certificate.
pub const AUTHENTICATION_CERTIFICATE_LABEL: &str = "Certificate for PIV Authentication";

/// PKCS#11 label of the Digital Signature certificate.
pub const DIGITAL_SIGNATURE_CERTIFICATE_LABEL: &str = "Certificate for Digital Signature";

/// PKCS#11 label of the Key Management certificate.
pub const KEY_MANAGEMENT_CERTIFICATE_LABEL: &str = "Certificate for Key Management";

/// PKCS#11 label of the Card Authentication certificate.
pub const CARD_AUTHENTICATION_CERTIFICATE_LABEL: &str = "Certificate for Card Authentication";

/// PKCS#11 label of the cardholder facial image data object.
pub const FACIAL_IMAGE_LABEL: &str = "Cardholder Facial Image";

/// PKCS#11 label of the cardholder fingerprints data object.
pub const FINGERPRINTS_LABEL: &str = "Cardholder Fingerprints";

/// Maximum number of handles requested per find-objects call.
pub const SEARCH_BATCH_SIZE: usize = 8;

/// Object class constraint values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    /// `CKO_CERTIFICATE`
    Certificate,
    /// `CKO_DATA`
    Data,
}

/// A single attribute constraint in a find-objects template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// `CKA_CLASS` equals the given class.
    Class(ObjectClass),
    /// `CKA_LABEL` equals the given label.
    Label(String),
}

/// Attribute selector for attribute value reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// `CKA_VALUE`
    Value,
    /// `CKA_LABEL`
    Label,
    /// `CKA_ID`
    Id,
}

/// Template matching the certificate object with `label`.
pub fn certificate_template(label: &str) -> Vec<Constraint> {
    vec![
        Constraint::Label(label.to_string()),
        Constraint::Class(ObjectClass::Certificate),
    ]
}

/// Template matching the data object with `label`.
pub fn data_template(label: &str) -> Vec<Constraint> {
    vec![
        Constraint::Label(label.to_string()),
        Constraint::Class(ObjectClass::Data),
    ]
}

/// The PKCS#11 driver calls used by [`Token`].
///
/// A module instance holds at most one open session; `Token` drives the
/// calls in PKCS#11 order and never uses a session it has not opened.
/// All calls block.
pub trait Module {
    /// Slot identifier.
    type Slot: Copy + std::fmt::Debug;

    /// Object handle returned by searches.
    type Handle: Copy + std::fmt::Debug + Eq;

    /// `C_Initialize`
    fn initialize(&mut self) -> Result<()>;

    /// `C_Finalize`
    fn finalize(&mut self) -> Result<()>;

    /// `C_GetSlotList` with `tokenPresent` set.
    fn slots_with_token(&mut self) -> Result<Vec<Self::Slot>>;

    /// Label from `C_GetTokenInfo`, with trailing padding removed.
    fn token_label(&mut self, slot: Self::Slot) -> Result<String>;

    /// `C_OpenSession` for a read-only serial session.
    fn open_session(&mut self, slot: Self::Slot) -> Result<()>;

    /// `C_CloseSession`
    fn close_session(&mut self) -> Result<()>;

    /// `C_Login` as the normal user.
    fn login(&mut self, pin: &str) -> Result<()>;

    /// `C_Logout`
    fn logout(&mut self) -> Result<()>;

    /// `C_FindObjectsInit`
    fn find_objects_init(&mut self, template: &[Constraint]) -> Result<()>;

    /// `C_FindObjects`, returning at most `max` handles.
    fn find_objects(&mut self, max: usize) -> Result<Vec<Self::Handle>>;

    /// `C_FindObjectsFinal`
    fn find_objects_final(&mut self) -> Result<()>;

    /// `C_GetAttributeValue` for one attribute type.
    ///
    /// Returns every value the driver reported for the attribute; callers
    /// decide how many values are acceptable.
    fn attribute_values(
        &mut self,
        handle: Self::Handle,
        attribute: AttributeKind,
    ) -> Result<Vec<Vec<u8>>>;
}

/// PIV card slots
///
/// Each slot serves a specific purpose and has different PIN requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PivSlot {
    /// Slot 9A - PIV Authentication
    Authentication,

    /// Slot 9C - Digital Signature
    DigitalSignature,

    /// Slot 9D - Key Management
    KeyManagement,

    /// Slot 9E - Card Authentication
    ///
    /// Does NOT require PIN (contactless access).
    CardAuthentication,
}

impl PivSlot {
    /// All certificate slots, in key reference order.
    pub const ALL: [PivSlot; 4] = [
        Self::Authentication,
        Self::DigitalSignature,
        Self::KeyManagement,
        Self::CardAuthentication,
    ];

    /// Get the PIV key reference (hex)
    pub fn slot_id(&self) -> u8 {
        match self {
            Self::Authentication => 0x9A,
            Self::DigitalSignature => 0x9C,
            Self::KeyManagement => 0x9D,
            Self::CardAuthentication => 0x9E,
        }
    }

    /// PKCS#11 label of the certificate object for this slot.
    pub fn certificate_label(&self) -> &'static str {
        match self {
            Self::Authentication => AUTHENTICATION_CERTIFICATE_LABEL,
            Self::DigitalSignature => DIGITAL_SIGNATURE_CERTIFICATE_LABEL,
            Self::KeyManagement => KEY_MANAGEMENT_CERTIFICATE_LABEL,
            Self::CardAuthentication => CARD_AUTHENTICATION_CERTIFICATE_LABEL,
        }
    }

    /// Whether this slot requires PIN for operations
    pub fn requires_pin(&self) -> bool {
        !matches!(self, Self::CardAuthentication)
    }

    /// Human-readable name for this slot
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authentication => "PIV Authentication",
            Self::DigitalSignature => "Digital Signature",
            Self::KeyManagement => "Key Management",
            Self::CardAuthentication => "Card Authentication",
        }
    }

    /// Parse slot from a PIV key reference
    pub fn from_slot_id(id: u8) -> Option<Self> {
        match id {
            0x9A => Some(Self::Authentication),
            0x9C => Some(Self::DigitalSignature),
            0x9D => Some(Self::KeyManagement),
            0x9E => Some(Self::CardAuthentication),
            _ => None,
        }
    }
}

impl std::fmt::Display for PivSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.slot_id())
    }
}

/// A source of PIV certificates.
///
/// Implemented by [`Token`] (PKCS#11 labels) and, with the `yubikey`
/// feature, by [`YubiKeyCredentials`](crate::yubikey_piv::YubiKeyCredentials)
/// (applet key references). An empty slot is reported as
/// [`PivError::NotFound`](crate::PivError::NotFound).
pub trait PivCredentials {
    /// Read and decorate the certificate in `slot`.
    fn certificate(&mut self, slot: PivSlot) -> Result<PivCertificate>;

    /// Certificate in slot 9A.
    fn authentication_certificate(&mut self) -> Result<PivCertificate> {
        self.certificate(PivSlot::Authentication)
    }

    /// Certificate in slot 9C.
    fn digital_signature_certificate(&mut self) -> Result<PivCertificate> {
        self.certificate(PivSlot::DigitalSignature)
    }

    /// Certificate in slot 9D.
    fn key_management_certificate(&mut self) -> Result<PivCertificate> {
        self.certificate(PivSlot::KeyManagement)
    }

    /// Certificate in slot 9E.
    fn card_authentication_certificate(&mut self) -> Result<PivCertificate> {
        self.certificate(PivSlot::CardAuthentication)
    }
}
