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

//! PKCS#11 token module on `cryptoki`.
//!
//! [`CryptokiModule`] loads a PKCS#11 library (OpenSC, ActivClient, CoolKey,
//! ...) and implements [`Module`] with a read-only serial session. Objects are
//! only read; no key operations are performed.
//!
//! # Example
//!
//! ```no_run
//! use usg_piv::token::{PivCredentials, Token};
//! use usg_piv::TokenConfig;
//!
//! # fn example() -> usg_piv::Result<()> {
//! let config = TokenConfig::new("/usr/lib/x86_64-linux-gnu/opensc-pkcs11.so");
//! let mut token = Token::open_pkcs11(config)?;
//! let cert = token.card_authentication_certificate()?;
//! println!("{}", cert.subject());
//! # Ok(())
//! # }
//! ```

use cryptoki::context::{CInitializeArgs, CInitializeFlags, Pkcs11};
use cryptoki::object::{Attribute, AttributeType, ObjectClass as CkObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::slot::Slot;
use cryptoki::types::AuthPin;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{AttributeKind, Constraint, Module, ObjectClass, Token};
use crate::config::TokenConfig;
use crate::error::{PivError, Result};

/// [`Module`] backed by a PKCS#11 shared library.
///
/// The library is loaded on [`Module::initialize`] and unloaded on
/// [`Module::finalize`].
pub struct CryptokiModule {
    library: PathBuf,
    context: Option<Pkcs11>,
    session: Option<Session>,
    search: Option<VecDeque<ObjectHandle>>,
}

impl CryptokiModule {
    /// Create a module for the library at `library`. Nothing is loaded yet.
    pub fn new(library: impl AsRef<Path>) -> Self {
        Self {
            library: library.as_ref().to_path_buf(),
            context: None,
            session: None,
            search: None,
        }
    }

    /// Path of the PKCS#11 library.
    pub fn library(&self) -> &Path {
        &self.library
    }

    fn context(&self) -> Result<&Pkcs11> {
        self.context
            .as_ref()
            .ok_or_else(|| PivError::pkcs11("PKCS#11 library not initialized"))
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| PivError::pkcs11("No open PKCS#11 session"))
    }
}

impl std::fmt::Debug for CryptokiModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptokiModule")
            .field("library", &self.library)
            .field("initialized", &self.context.is_some())
            .field("session", &self.session.is_some())
            .finish()
    }
}

fn to_attribute(constraint: &Constraint) -> Attribute {
    match constraint {
        Constraint::Class(ObjectClass::Certificate) => Attribute::Class(CkObjectClass::CERTIFICATE),
        Constraint::Class(ObjectClass::Data) => Attribute::Class(CkObjectClass::DATA),
        Constraint::Label(label) => Attribute::Label(label.as_bytes().to_vec()),
    }
}

impl Module for CryptokiModule {
    type Slot = Slot;
    type Handle = ObjectHandle;

    fn initialize(&mut self) -> Result<()> {
        let pkcs11 = Pkcs11::new(&self.library).map_err(|e| {
            PivError::pkcs11(format!(
                "Failed to load PKCS#11 library at {}: {}",
                self.library.display(),
                e
            ))
        })?;

        let init_args = CInitializeArgs::new(CInitializeFlags::empty());
        pkcs11
            .initialize(init_args)
            .map_err(|e| PivError::pkcs11(format!("Failed to initialize PKCS#11: {}", e)))?;

        debug!("Initialized PKCS#11 library {}", self.library.display());
        self.context = Some(pkcs11);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.search = None;
        self.session = None;
        // Dropping the last context reference calls C_Finalize.
        self.context
            .take()
            .map(drop)
            .ok_or_else(|| PivError::pkcs11("PKCS#11 library not initialized"))
    }

    fn slots_with_token(&mut self) -> Result<Vec<Slot>> {
        self.context()?
            .get_slots_with_token()
            .map_err(|e| PivError::pkcs11(format!("Failed to get PKCS#11 slots: {}", e)))
    }

    fn token_label(&mut self, slot: Slot) -> Result<String> {
        let info = self
            .context()?
            .get_token_info(slot)
            .map_err(|e| PivError::pkcs11(format!("Failed to get token info: {}", e)))?;
        Ok(info.label().trim_end().to_string())
    }

    fn open_session(&mut self, slot: Slot) -> Result<()> {
        let session = self
            .context()?
            .open_ro_session(slot)
            .map_err(|e| PivError::pkcs11(format!("Failed to open session: {}", e)))?;
        self.session = Some(session);
        Ok(())
    }

    fn close_session(&mut self) -> Result<()> {
        self.search = None;
        // Session closes itself on drop.
        self.session
            .take()
            .map(drop)
            .ok_or_else(|| PivError::pkcs11("No open PKCS#11 session"))
    }

    fn login(&mut self, pin: &str) -> Result<()> {
        let auth_pin = AuthPin::new(pin.to_owned().into());
        self.session()?
            .login(UserType::User, Some(&auth_pin))
            .map_err(|e| PivError::authentication(format!("Failed to login to token: {}", e)))
    }

    fn logout(&mut self) -> Result<()> {
        self.session()?
            .logout()
            .map_err(|e| PivError::pkcs11(format!("Failed to logout: {}", e)))
    }

    fn find_objects_init(&mut self, template: &[Constraint]) -> Result<()> {
        if self.search.is_some() {
            return Err(PivError::pkcs11("A find-objects operation is already active"));
        }
        let attributes: Vec<Attribute> = template.iter().map(to_attribute).collect();
        // Session::iter_objects_with_cache_size pages natively but borrows the
        // session, so it cannot be held next to it across Module calls. The
        // handles are collected here and batches are served from them.
        let handles = self
            .session()?
            .find_objects(&attributes)
            .map_err(|e| PivError::pkcs11(format!("Failed to find objects: {}", e)))?;
        self.search = Some(handles.into());
        Ok(())
    }

    fn find_objects(&mut self, max: usize) -> Result<Vec<ObjectHandle>> {
        let search = self
            .search
            .as_mut()
            .ok_or_else(|| PivError::pkcs11("No active find-objects operation"))?;
        let take = max.min(search.len());
        Ok(search.drain(..take).collect())
    }

    fn find_objects_final(&mut self) -> Result<()> {
        self.search
            .take()
            .map(drop)
            .ok_or_else(|| PivError::pkcs11("No active find-objects operation"))
    }

    fn attribute_values(
        &mut self,
        handle: ObjectHandle,
        attribute: AttributeKind,
    ) -> Result<Vec<Vec<u8>>> {
        let attribute_type = match attribute {
            AttributeKind::Value => AttributeType::Value,
            AttributeKind::Label => AttributeType::Label,
            AttributeKind::Id => AttributeType::Id,
        };
        let attributes = self
            .session()?
            .get_attributes(handle, &[attribute_type])
            .map_err(|e| PivError::pkcs11(format!("Failed to get attributes: {}", e)))?;

        Ok(attributes
            .into_iter()
            .filter_map(|a| match a {
                Attribute::Value(v) | Attribute::Label(v) | Attribute::Id(v) => Some(v),
                _ => None,
            })
            .collect())
    }
}

impl Token<CryptokiModule> {
    /// Open a session through the PKCS#11 library named in `config`.
    pub fn open_pkcs11(config: TokenConfig) -> Result<Self> {
        let module = CryptokiModule::new(&config.module);
        Token::open(module, config)
    }
}
