// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! YubiKey PIV applet backend.
//!
//! Reads slot certificates directly from the PIV applet over PC/SC, with no
//! PKCS#11 middleware in between. Requires the `yubikey` feature.

use std::sync::Arc;
use tracing::debug;
use yubikey::certificate::Certificate;
use yubikey::piv::SlotId;
use yubikey::{Context, YubiKey};

use crate::certificate::PivCertificate;
use crate::error::{PivError, Result};
use crate::policy::PolicyRegistry;
use crate::token::{PivCredentials, PivSlot};

/// Certificate source backed by a connected YubiKey.
pub struct YubiKeyCredentials {
    device: YubiKey,
    registry: Arc<PolicyRegistry>,
}

impl YubiKeyCredentials {
    /// Connect to the first YubiKey found.
    pub fn open() -> Result<Self> {
        let device = YubiKey::open()
            .map_err(|e| PivError::yubikey(format!("Failed to open YubiKey: {}", e)))?;
        Ok(Self::from_device(device))
    }

    /// Connect to the first reader that holds a YubiKey.
    ///
    /// Unlike [`open`](Self::open) this tolerates other smart card readers
    /// being attached.
    pub fn find_first() -> Result<Self> {
        let mut readers = Context::open()
            .map_err(|e| PivError::yubikey(format!("Failed to open PC/SC context: {}", e)))?;

        for reader in readers
            .iter()
            .map_err(|e| PivError::yubikey(format!("Failed to iterate readers: {}", e)))?
        {
            if let Ok(device) = reader.open() {
                debug!("Connected to YubiKey in reader {:?}", reader.name());
                return Ok(Self::from_device(device));
            }
        }

        Err(PivError::not_found("YubiKey"))
    }

    /// Wrap an already open device.
    pub fn from_device(device: YubiKey) -> Self {
        Self {
            device,
            registry: PolicyRegistry::builtin(),
        }
    }

    /// Use `registry` when decorating certificates.
    pub fn with_registry(mut self, registry: Arc<PolicyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Device serial number.
    pub fn serial(&self) -> u32 {
        self.device.serial().into()
    }

    /// Verify the PIV PIN.
    pub fn verify_pin(&mut self, pin: &str) -> Result<()> {
        self.device
            .verify_pin(pin.as_bytes())
            .map_err(|e| PivError::authentication(format!("PIN verification failed: {}", e)))?;
        debug!("PIN verified");
        Ok(())
    }
}

impl std::fmt::Debug for YubiKeyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YubiKeyCredentials")
            .field("policies", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn to_slot_id(slot: PivSlot) -> SlotId {
    match slot {
        PivSlot::Authentication => SlotId::Authentication,
        PivSlot::DigitalSignature => SlotId::Signature,
        PivSlot::KeyManagement => SlotId::KeyManagement,
        PivSlot::CardAuthentication => SlotId::CardAuthentication,
    }
}

impl PivCredentials for YubiKeyCredentials {
    fn certificate(&mut self, slot: PivSlot) -> Result<PivCertificate> {
        let read = Certificate::read(&mut self.device, to_slot_id(slot)).map_err(|e| match e {
            yubikey::Error::NotFound | yubikey::Error::InvalidObject => {
                PivError::not_found(format!("Certificate in slot {}", slot))
            }
            e => PivError::yubikey(format!("Failed to read slot {}: {}", slot, e)),
        })?;
        debug!("Read certificate from slot {}", slot);
        PivCertificate::decorate(read.cert, &self.registry)
    }
}
