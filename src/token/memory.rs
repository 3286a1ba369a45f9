// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! In-memory token module.
//!
//! [`MemoryModule`] implements [`Module`] over tokens held in memory. It
//! follows PKCS#11 call ordering rules (no session before initialize, one
//! active search per session, no logout without login) and records every
//! call in a shared [`CallLog`], so lifecycle behaviour can be checked
//! without hardware. Failures can be injected per call.
//!
//! # Example
//!
//! ```
//! use usg_piv::token::memory::{MemoryModule, MemoryObject, MemoryToken};
//! use usg_piv::token::Token;
//! use usg_piv::TokenConfig;
//!
//! let module = MemoryModule::new().with_token(
//!     MemoryToken::new("PIV_II").with_object(MemoryObject::data("Cardholder Facial Image", vec![0x53, 0x02, 0xBC, 0x00])),
//! );
//! let mut token = Token::open(module, TokenConfig::new("memory")).unwrap();
//! let facial = token.facial_image().unwrap();
//! assert!(facial.cbeff().is_empty());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use super::{AttributeKind, Constraint, Module, ObjectClass};
use crate::error::{PivError, Result};

/// A driver call made against a [`MemoryModule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// [`Module::initialize`]
    Initialize,
    /// [`Module::finalize`]
    Finalize,
    /// [`Module::slots_with_token`]
    SlotsWithToken,
    /// [`Module::token_label`]
    TokenLabel,
    /// [`Module::open_session`]
    OpenSession,
    /// [`Module::close_session`]
    CloseSession,
    /// [`Module::login`]
    Login,
    /// [`Module::logout`]
    Logout,
    /// [`Module::find_objects_init`]
    FindObjectsInit,
    /// [`Module::find_objects`]
    FindObjects,
    /// [`Module::find_objects_final`]
    FindObjectsFinal,
    /// [`Module::attribute_values`]
    GetAttributeValue,
}

#[derive(Debug, Default)]
struct LogState {
    calls: Vec<Call>,
    opened_slot: Option<usize>,
}

/// Shared record of the calls made against a [`MemoryModule`].
///
/// Clones observe the same log, so a test can keep one after moving the
/// module into a [`Token`](super::Token).
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<LogState>>,
}

impl CallLog {
    fn with<T>(&self, f: impl FnOnce(&mut LogState) -> T) -> T {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    /// Index of the slot most recently passed to `open_session`.
    pub fn opened_slot(&self) -> Option<usize> {
        self.with(|s| s.opened_slot)
    }

    fn record(&self, call: Call) {
        self.with(|s| s.calls.push(call));
    }
}

/// An object stored on a [`MemoryToken`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    class: ObjectClass,
    label: String,
    id: Vec<u8>,
    values: Vec<Vec<u8>>,
}

impl MemoryObject {
    /// A certificate object holding `der`.
    pub fn certificate(label: impl Into<String>, der: Vec<u8>) -> Self {
        Self::new(ObjectClass::Certificate, label, der)
    }

    /// A data object holding `value`.
    pub fn data(label: impl Into<String>, value: Vec<u8>) -> Self {
        Self::new(ObjectClass::Data, label, value)
    }

    fn new(class: ObjectClass, label: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            class,
            label: label.into(),
            id: Vec::new(),
            values: vec![value],
        }
    }

    /// Set `CKA_ID`.
    pub fn with_id(mut self, id: Vec<u8>) -> Self {
        self.id = id;
        self
    }

    /// Report these values for `CKA_VALUE` instead of the single value.
    pub fn with_values(mut self, values: Vec<Vec<u8>>) -> Self {
        self.values = values;
        self
    }

    fn matches(&self, template: &[Constraint]) -> bool {
        template.iter().all(|constraint| match constraint {
            Constraint::Class(class) => self.class == *class,
            Constraint::Label(label) => self.label == *label,
        })
    }
}

/// A token in a [`MemoryModule`] slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryToken {
    label: String,
    pin: Option<String>,
    objects: Vec<MemoryObject>,
}

impl MemoryToken {
    /// An empty token with the given label that accepts any PIN.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pin: None,
            objects: Vec::new(),
        }
    }

    /// Require `pin` for login.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    /// Add an object. Handles are assigned in insertion order from zero.
    pub fn with_object(mut self, object: MemoryObject) -> Self {
        self.objects.push(object);
        self
    }
}

#[derive(Debug, Default)]
struct Failures {
    always: Vec<Call>,
    once: Vec<Call>,
}

/// In-memory [`Module`].
#[derive(Debug, Default)]
pub struct MemoryModule {
    tokens: Vec<MemoryToken>,
    log: CallLog,
    failures: Failures,
    initialized: bool,
    session: Option<usize>,
    logged_in: bool,
    search: Option<VecDeque<usize>>,
}

impl MemoryModule {
    /// A module with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot holding `token`. Slots are numbered from zero.
    pub fn with_token(mut self, token: MemoryToken) -> Self {
        self.tokens.push(token);
        self
    }

    /// Make every `call` fail.
    pub fn fail_on(mut self, call: Call) -> Self {
        self.failures.always.push(call);
        self
    }

    /// Make the next `call` fail.
    pub fn fail_once(mut self, call: Call) -> Self {
        self.failures.once.push(call);
        self
    }

    /// A handle on this module's call log.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    fn enter(&mut self, call: Call) -> Result<()> {
        self.log.record(call);
        if let Some(pos) = self.failures.once.iter().position(|c| *c == call) {
            self.failures.once.remove(pos);
            return Err(PivError::pkcs11(format!("{:?}: injected failure", call)));
        }
        if self.failures.always.contains(&call) {
            return Err(PivError::pkcs11(format!("{:?}: injected failure", call)));
        }
        Ok(())
    }

    fn require_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(PivError::pkcs11("CKR_CRYPTOKI_NOT_INITIALIZED"));
        }
        Ok(())
    }

    fn session_token(&self) -> Result<&MemoryToken> {
        self.require_initialized()?;
        self.session
            .and_then(|slot| self.tokens.get(slot))
            .ok_or_else(|| PivError::pkcs11("CKR_SESSION_HANDLE_INVALID"))
    }
}

impl Module for MemoryModule {
    type Slot = usize;
    type Handle = usize;

    fn initialize(&mut self) -> Result<()> {
        self.enter(Call::Initialize)?;
        if self.initialized {
            return Err(PivError::pkcs11("CKR_CRYPTOKI_ALREADY_INITIALIZED"));
        }
        self.initialized = true;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.enter(Call::Finalize)?;
        self.require_initialized()?;
        self.initialized = false;
        self.session = None;
        self.logged_in = false;
        self.search = None;
        Ok(())
    }

    fn slots_with_token(&mut self) -> Result<Vec<usize>> {
        self.enter(Call::SlotsWithToken)?;
        self.require_initialized()?;
        Ok((0..self.tokens.len()).collect())
    }

    fn token_label(&mut self, slot: usize) -> Result<String> {
        self.enter(Call::TokenLabel)?;
        self.require_initialized()?;
        self.tokens
            .get(slot)
            .map(|t| t.label.clone())
            .ok_or_else(|| PivError::pkcs11("CKR_SLOT_ID_INVALID"))
    }

    fn open_session(&mut self, slot: usize) -> Result<()> {
        self.enter(Call::OpenSession)?;
        self.require_initialized()?;
        if slot >= self.tokens.len() {
            return Err(PivError::pkcs11("CKR_SLOT_ID_INVALID"));
        }
        if self.session.is_some() {
            return Err(PivError::pkcs11("session already open"));
        }
        self.session = Some(slot);
        self.log.with(|s| s.opened_slot = Some(slot));
        Ok(())
    }

    fn close_session(&mut self) -> Result<()> {
        self.enter(Call::CloseSession)?;
        self.session_token()?;
        self.session = None;
        self.logged_in = false;
        self.search = None;
        Ok(())
    }

    fn login(&mut self, pin: &str) -> Result<()> {
        self.enter(Call::Login)?;
        let accepted = self
            .session_token()?
            .pin
            .as_deref()
            .map_or(true, |expected| expected == pin);
        if self.logged_in {
            return Err(PivError::authentication("CKR_USER_ALREADY_LOGGED_IN"));
        }
        if !accepted {
            return Err(PivError::authentication("CKR_PIN_INCORRECT"));
        }
        self.logged_in = true;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.enter(Call::Logout)?;
        self.session_token()?;
        if !self.logged_in {
            return Err(PivError::pkcs11("CKR_USER_NOT_LOGGED_IN"));
        }
        self.logged_in = false;
        Ok(())
    }

    fn find_objects_init(&mut self, template: &[Constraint]) -> Result<()> {
        self.enter(Call::FindObjectsInit)?;
        let token = self.session_token()?;
        if self.search.is_some() {
            return Err(PivError::pkcs11("CKR_OPERATION_ACTIVE"));
        }
        let matches = token
            .objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.matches(template))
            .map(|(handle, _)| handle)
            .collect();
        self.search = Some(matches);
        Ok(())
    }

    fn find_objects(&mut self, max: usize) -> Result<Vec<usize>> {
        self.enter(Call::FindObjects)?;
        self.session_token()?;
        let search = self
            .search
            .as_mut()
            .ok_or_else(|| PivError::pkcs11("CKR_OPERATION_NOT_INITIALIZED"))?;
        let take = max.min(search.len());
        Ok(search.drain(..take).collect())
    }

    fn find_objects_final(&mut self) -> Result<()> {
        self.enter(Call::FindObjectsFinal)?;
        self.session_token()?;
        if self.search.take().is_none() {
            return Err(PivError::pkcs11("CKR_OPERATION_NOT_INITIALIZED"));
        }
        Ok(())
    }

    fn attribute_values(&mut self, handle: usize, attribute: AttributeKind) -> Result<Vec<Vec<u8>>> {
        self.enter(Call::GetAttributeValue)?;
        let object = self
            .session_token()?
            .objects
            .get(handle)
            .ok_or_else(|| PivError::pkcs11("CKR_OBJECT_HANDLE_INVALID"))?;
        Ok(match attribute {
            AttributeKind::Value => object.values.clone(),
            AttributeKind::Label => vec![object.label.clone().into_bytes()],
            AttributeKind::Id => vec![object.id.clone()],
        })
    }
}
