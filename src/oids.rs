// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Object identifiers consumed by the PIV certificate decorator.
//!
//! | Name | OID | Carried in |
//! |------|-----|------------|
//! | PIV NACI indicator | 2.16.840.1.101.3.6.9.1 | Certificate extension (BOOLEAN) |
//! | FASC-N | 2.16.840.1.101.3.6.6 | SAN otherName (OCTET STRING) |
//! | Microsoft UPN | 1.3.6.1.4.1.311.20.2.3 | SAN otherName (UTF8String) |
//! | UID | 0.9.2342.19200300.100.1.1 | Subject attribute |
//!
//! # References
//!
//! - [FIPS 201-3](https://nvlpubs.nist.gov/nistpubs/FIPS/NIST.FIPS.201-3.pdf) Appendix B
//! - [NIST SP 800-73-4](https://csrc.nist.gov/publications/detail/sp/800-73/4/final)

use const_oid::ObjectIdentifier;

/// PIV NACI indicator extension (`NACI-indicator ::= BOOLEAN`).
pub const PIV_NACI_INDICATOR: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.6.9.1");

/// FASC-N other-name form in the subject alternative name.
pub const PIV_FASC_N: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.6.6");

/// Microsoft User Principal Name other-name form.
pub const MS_UPN: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.20.2.3");

/// Directory `uid` attribute type (RFC 4519).
pub const USER_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("0.9.2342.19200300.100.1.1");

/// Common name attribute type.
pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Subject alternative name extension.
pub const SUBJECT_ALT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.17");

/// Certificate policies extension.
pub const CERTIFICATE_POLICIES: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32");

/// DoD certificate policy arc.
pub const DOD_POLICY_ARC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.2.1.11");

/// Federal PKI (FBCA and Common Policy) certificate policy arc.
pub const FPKI_POLICY_ARC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.3");
