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

//! Token configuration.
//!
//! A [`TokenConfig`] names the PKCS#11 module to load, the PIN to log in with
//! (if any) and the label of the token to select when more than one reader is
//! attached. It can be built in code or loaded from TOML:
//!
//! ```toml
//! module = "/usr/lib/x86_64-linux-gnu/opensc-pkcs11.so"
//! token_label = "PIV_II"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PivError, Result};

/// Environment variable consulted by [`detect_pkcs11_middleware`].
pub const PKCS11_MODULE_ENV: &str = "PKCS11_MODULE";

/// Configuration for opening a token session.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Path to the PKCS#11 shared library.
    pub module: PathBuf,

    /// User PIN. When set, the session is logged in after it is opened.
    #[serde(default)]
    pub pin: Option<String>,

    /// Label of the token to use.
    ///
    /// Optional when exactly one token is present. An empty label is treated
    /// as unset.
    #[serde(default)]
    pub token_label: Option<String>,
}

impl TokenConfig {
    /// Create a configuration for the given module with no PIN and no label.
    pub fn new(module: impl Into<PathBuf>) -> Self {
        Self {
            module: module.into(),
            pin: None,
            token_label: None,
        }
    }

    /// Create a configuration for the first PKCS#11 middleware found on this host.
    pub fn detect() -> Result<Self> {
        detect_pkcs11_middleware()
            .map(Self::new)
            .ok_or_else(|| PivError::config("No PKCS#11 middleware found; set PKCS11_MODULE"))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, has unknown keys, or is
    /// missing `module`.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| PivError::config(format!("Invalid TOML: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PivError::config(format!("TOML serialize: {e}")))
    }

    /// Set the login PIN.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    /// Set the token label used for slot selection.
    pub fn with_token_label(mut self, label: impl Into<String>) -> Self {
        self.token_label = Some(label.into());
        self
    }

    /// The configured token label, with empty labels treated as unset.
    pub fn label(&self) -> Option<&str> {
        self.token_label.as_deref().filter(|l| !l.is_empty())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing every problem found. Only the shape of
    /// the configuration is checked; the PIN is judged by the token.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.module.as_os_str().is_empty() {
            errors.push("module is required".to_string());
        }

        if self.token_label.as_deref().is_some_and(|l| l.trim() != l) {
            errors.push("token_label must not have surrounding whitespace".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PivError::config(errors.join("; ")))
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("module", &self.module)
            .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
            .field("token_label", &self.token_label)
            .finish()
    }
}

/// Find a PKCS#11 middleware library for smart card access.
///
/// Checks common OpenSC, ActivClient, CoolKey and SafeNet install locations,
/// then falls back to the `PKCS11_MODULE` environment variable.
pub fn detect_pkcs11_middleware() -> Option<PathBuf> {
    let candidates = [
        // OpenSC (Linux)
        "/usr/lib/x86_64-linux-gnu/pkcs11/opensc-pkcs11.so",
        "/usr/lib/x86_64-linux-gnu/opensc-pkcs11.so",
        "/usr/lib/opensc-pkcs11.so",
        "/usr/lib64/opensc-pkcs11.so",
        // OpenSC (macOS)
        "/usr/local/lib/opensc-pkcs11.so",
        "/opt/homebrew/lib/opensc-pkcs11.so",
        // ActivClient (Linux)
        "/usr/lib/libacpkcs211.so",
        "/usr/lib64/libacpkcs211.so",
        // CoolKey (Linux)
        "/usr/lib/pkcs11/libcoolkeypk11.so",
        "/usr/lib64/pkcs11/libcoolkeypk11.so",
        // SafeNet (Linux)
        "/usr/lib/libeToken.so",
        "/usr/lib64/libeToken.so",
    ];

    for path in &candidates {
        if Path::new(path).exists() {
            return Some(PathBuf::from(path));
        }
    }

    std::env::var_os(PKCS11_MODULE_ENV).map(PathBuf::from)
}
