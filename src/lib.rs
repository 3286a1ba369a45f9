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

//! # usg-piv
//!
//! PIV (FIPS 201) smart card credential handling: certificate decoding, federal
//! policy OID resolution and object retrieval from PIV tokens.
//!
//! ## Features
//!
//! - **PIV certificate decorator**: NACI indicator, FASC-N, UPN, email, UID and
//!   certificate policies extracted once at load time
//! - **Policy registry** of DoD, FBCA and Common policy OIDs with assurance levels
//! - **Token sessions** over any PKCS#11 library, with guaranteed teardown
//! - **YubiKey PIV** backend reading slot certificates without middleware
//! - **Biometric containers** (facial image, fingerprints) unwrapped to CBEFF
//!
//! ## Decoding a certificate
//!
//! ```no_run
//! use usg_piv::PivCertificate;
//!
//! # fn example() -> usg_piv::Result<()> {
//! let der = std::fs::read("auth.der")?;
//! let cert = PivCertificate::from_der(&der)?;
//!
//! println!("NACI complete: {:?}", cert.completed_naci());
//! for fasc in cert.fascs() {
//!     println!("FASC-N: {}", fasc);
//! }
//! println!("Assurance: {}", cert.policies().highest_assurance());
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading a token
//!
//! ```no_run
//! # #[cfg(feature = "pkcs11")]
//! # fn example() -> usg_piv::Result<()> {
//! use usg_piv::{PivCredentials, Token, TokenConfig};
//!
//! let config = TokenConfig::detect()?;
//! let mut token = Token::open_pkcs11(config)?;
//! let cert = token.card_authentication_certificate()?;
//! println!("{}", cert.subject());
//! # Ok(())
//! # }
//! ```
//!
//! ## Cargo Features
//!
//! - `pkcs11` (default): PKCS#11 backend using `cryptoki`
//! - `yubikey`: YubiKey PIV backend using the `yubikey` crate
//! - `cli` (default): the `pivtk` command line tool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod biometrics;
pub mod certificate;
pub mod config;
pub mod error;
pub mod fasc;
pub mod oids;
pub mod policy;
pub mod token;

#[cfg(feature = "yubikey")]
pub mod yubikey_piv;

// Re-export main types at crate root for convenience
pub use biometrics::{BiometricContainer, BiometricParser};
pub use certificate::PivCertificate;
pub use config::TokenConfig;
pub use error::{PivError, Result};
pub use fasc::Fasc;
pub use policy::{AssuranceLevel, Issued, Policies, Policy, PolicyRegistry};
pub use token::{Module, PivCredentials, PivSlot, Token};

#[cfg(feature = "yubikey")]
pub use yubikey_piv::YubiKeyCredentials;

// Re-export x509_cert::Certificate for convenience
pub use x509_cert::Certificate;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
