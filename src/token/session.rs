// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Token session lifecycle and object resolution.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    certificate_template, data_template, AttributeKind, Constraint, Module, PivCredentials,
    PivSlot, FACIAL_IMAGE_LABEL, FINGERPRINTS_LABEL, SEARCH_BATCH_SIZE,
};
use crate::biometrics::BiometricContainer;
use crate::certificate::PivCertificate;
use crate::config::TokenConfig;
use crate::error::{PivError, Result};
use crate::policy::PolicyRegistry;

/// An open session on one PIV token.
///
/// Created with [`Token::open`], which either returns a fully opened (and, if
/// a PIN is configured, logged in) session or releases everything it acquired
/// before returning the error. Call [`Token::close`] to observe teardown
/// failures; dropping an open token closes it and only logs failures.
///
/// A `Token` is not shared between threads. Distinct tokens are independent.
pub struct Token<M: Module> {
    module: M,
    config: TokenConfig,
    registry: Arc<PolicyRegistry>,
    initialized: bool,
    session: Option<M::Slot>,
    logged_in: bool,
}

impl<M: Module> Token<M> {
    /// Initialize `module`, select a slot, open a session and log in.
    ///
    /// # Slot selection
    ///
    /// With no token label configured and exactly one slot present, that slot
    /// is used. Otherwise the first slot whose token label equals the
    /// configured label is used. Anything else is a
    /// [`PivError::SlotSelection`] error.
    ///
    /// The configuration is validated first, before the module is touched. A
    /// configured PIN is passed to the module as is, so a rejected PIN
    /// surfaces as the module's own authentication error.
    pub fn open(module: M, config: TokenConfig) -> Result<Self> {
        config.validate()?;
        let mut token = Self {
            module,
            config,
            registry: PolicyRegistry::builtin(),
            initialized: false,
            session: None,
            logged_in: false,
        };

        if let Err(e) = token.establish() {
            if let Err(teardown) = token.close() {
                warn!("Cleanup after failed open: {}", teardown);
            }
            return Err(e);
        }

        info!(
            "Opened PIV token session (slot {:?}, logged in: {})",
            token.session, token.logged_in
        );
        Ok(token)
    }

    fn establish(&mut self) -> Result<()> {
        self.module.initialize()?;
        self.initialized = true;

        let slots = self.module.slots_with_token()?;
        debug!("Found {} slot(s) with a token", slots.len());
        let slot = self.select_slot(&slots)?;

        self.module.open_session(slot)?;
        self.session = Some(slot);

        if let Some(pin) = self.config.pin.as_deref() {
            self.module.login(pin)?;
            self.logged_in = true;
        }
        Ok(())
    }

    fn select_slot(&mut self, slots: &[M::Slot]) -> Result<M::Slot> {
        let Some(wanted) = self.config.label().map(str::to_owned) else {
            return match slots {
                [only] => {
                    debug!("Selected only slot {:?}", only);
                    Ok(*only)
                }
                [] => Err(PivError::slot_selection("no slots with a token present")),
                _ => Err(PivError::slot_selection(format!(
                    "{} slots present and no token label configured",
                    slots.len()
                ))),
            };
        };

        for &slot in slots {
            let label = self.module.token_label(slot)?;
            if label == wanted {
                debug!("Selected slot {:?} with token label {:?}", slot, label);
                return Ok(slot);
            }
        }

        Err(PivError::slot_selection(format!(
            "no token labelled {:?} among {} slot(s)",
            wanted,
            slots.len()
        )))
    }

    /// Tear down the session.
    ///
    /// Logs out (if logged in), closes the session (if open) and finalizes the
    /// module (if initialized). Every step is attempted even when an earlier
    /// one fails; failures are returned together as
    /// [`PivError::Teardown`]. Calling `close` again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let mut failures = Vec::new();

        if self.logged_in {
            self.logged_in = false;
            if let Err(e) = self.module.logout() {
                warn!("Logout failed: {}", e);
                failures.push(format!("logout: {}", e));
            }
        }

        if self.session.take().is_some() {
            if let Err(e) = self.module.close_session() {
                warn!("Closing session failed: {}", e);
                failures.push(format!("close session: {}", e));
            }
        }

        if self.initialized {
            self.initialized = false;
            if let Err(e) = self.module.finalize() {
                warn!("Finalizing module failed: {}", e);
                failures.push(format!("finalize: {}", e));
            }
            info!("Closed PIV token session");
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PivError::Teardown(failures))
        }
    }

    /// Whether the session is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the session is logged in.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Configuration the session was opened with.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// The driver.
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Policy registry used to decorate certificates.
    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    /// Decorate certificates against `registry` instead of the built-in one.
    pub fn with_registry(mut self, registry: Arc<PolicyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn ensure_open(&self) -> Result<()> {
        if self.session.is_none() {
            return Err(PivError::pkcs11("token session is closed"));
        }
        Ok(())
    }

    /// Find every object matching `template`, in discovery order.
    ///
    /// The search is finalized on every path once it has been started.
    pub fn find_handles(&mut self, template: &[Constraint]) -> Result<Vec<M::Handle>> {
        self.ensure_open()?;
        self.module.find_objects_init(template)?;

        let collected = self.collect_handles();
        let finalized = self.module.find_objects_final();

        let handles = collected?;
        finalized?;
        debug!("Search {:?} matched {} object(s)", template, handles.len());
        Ok(handles)
    }

    fn collect_handles(&mut self) -> Result<Vec<M::Handle>> {
        let mut handles = Vec::new();
        loop {
            let batch = self.module.find_objects(SEARCH_BATCH_SIZE)?;
            let done = batch.len() < SEARCH_BATCH_SIZE;
            handles.extend(batch);
            if done {
                return Ok(handles);
            }
        }
    }

    /// Find the single object matching `template`.
    ///
    /// # Errors
    ///
    /// [`PivError::NotFound`] when nothing matches and
    /// [`PivError::Ambiguous`] when more than one object matches.
    pub fn find_unique(&mut self, template: &[Constraint]) -> Result<M::Handle> {
        let handles = self.find_handles(template)?;
        match handles.as_slice() {
            [] => Err(PivError::not_found(describe(template))),
            [handle] => Ok(*handle),
            _ => Err(PivError::Ambiguous {
                count: handles.len(),
            }),
        }
    }

    /// Read one attribute of the single object matching `template`.
    ///
    /// # Errors
    ///
    /// Those of [`Token::find_unique`], and [`PivError::TooManyAttributes`]
    /// when the driver does not return exactly one value.
    pub fn read_attribute(
        &mut self,
        template: &[Constraint],
        attribute: AttributeKind,
    ) -> Result<Vec<u8>> {
        let handle = self.find_unique(template)?;
        let mut values = self.module.attribute_values(handle, attribute)?;
        if values.len() != 1 {
            return Err(PivError::TooManyAttributes {
                count: values.len(),
            });
        }
        debug!("Read {:?} of {:?}", attribute, handle);
        Ok(values.remove(0))
    }

    /// Read and decorate the certificate object labelled `label`.
    pub fn certificate_for(&mut self, label: &str) -> Result<PivCertificate> {
        let der = self.read_attribute(&certificate_template(label), AttributeKind::Value)?;
        PivCertificate::decorate_der(&der, &self.registry)
    }

    /// Read and unwrap the biometric data object labelled `label`.
    pub fn biometric_container_for(&mut self, label: &str) -> Result<BiometricContainer> {
        let data = self.read_attribute(&data_template(label), AttributeKind::Value)?;
        BiometricContainer::from_tlv(label, &data)
    }

    /// The "Cardholder Facial Image" container.
    pub fn facial_image(&mut self) -> Result<BiometricContainer> {
        self.biometric_container_for(FACIAL_IMAGE_LABEL)
    }

    /// The "Cardholder Fingerprints" container.
    pub fn fingerprints(&mut self) -> Result<BiometricContainer> {
        self.biometric_container_for(FINGERPRINTS_LABEL)
    }
}

impl<M: Module> PivCredentials for Token<M> {
    fn certificate(&mut self, slot: PivSlot) -> Result<PivCertificate> {
        self.certificate_for(slot.certificate_label())
    }
}

impl<M: Module> Drop for Token<M> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Token dropped with teardown failures: {}", e);
        }
    }
}

impl<M: Module> std::fmt::Debug for Token<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .field("session", &self.session)
            .field("logged_in", &self.logged_in)
            .finish()
    }
}

fn describe(template: &[Constraint]) -> String {
    let label = template.iter().find_map(|c| match c {
        Constraint::Label(l) => Some(l.as_str()),
        _ => None,
    });
    let class = template.iter().find_map(|c| match c {
        Constraint::Class(class) => Some(*class),
        _ => None,
    });
    match (class, label) {
        (Some(class), Some(label)) => format!("{:?} object {:?}", class, label),
        (None, Some(label)) => format!("object {:?}", label),
        (Some(class), None) => format!("{:?} object", class),
        (None, None) => "object".to_string(),
    }
}
