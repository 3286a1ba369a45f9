// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Compiled-in federal certificate policy catalog.
//!
//! # DoD policies
//!
//! All DoD certificate policies are under the arc **2.16.840.1.101.2.1.11**.
//!
//! | Policy | OID suffix | Token | Subscriber | LOA |
//! |--------|------------|-------|------------|-----|
//! | Medium NPE / -112 / -128 | .17 / .36 / .37 | software | NPE | Medium |
//! | Medium / -2048 / -112 / -128 | .5 / .18 / .39 / .40 | software | person | Medium |
//! | Medium Hardware / -2048 / -112 / -128 | .9 / .19 / .42 / .43 | hardware | person | Medium |
//! | PIV Auth / -2048 | .10 / .20 | hardware | person | Medium |
//! | FORTEZZA | .4 | hardware | person | High |
//! | Type 1 | .6 | hardware | NPE | High |
//!
//! # Federal PKI policies
//!
//! FBCA and the Federal Common Policy share the arc **2.16.840.1.101.3.2.1.3**.
//! The SHA-1 era policies (.21 - .25) are deliberately absent; assertions of
//! them carry no useful assurance.
//!
//! # References
//!
//! - [DoD X.509 Certificate Policy](https://dl.dod.cyber.mil/wp-content/uploads/pki-pke/pdf/Unclass-DoD_X.509_Certificate_Policy_v10.7_Jun_3_21.pdf)
//! - [X.509 Certificate Policy for the Federal Bridge Certification Authority](https://www.idmanagement.gov/docs/fpki-x509-cert-policy-fbca.pdf)
//! - [X.509 Certificate Policy for the U.S. Federal PKI Common Policy Framework](https://www.idmanagement.gov/docs/fpki-x509-cert-policy-common.pdf)

use super::{AssuranceLevel, Issued, Policy};
use const_oid::ObjectIdentifier;

const fn policy(
    name: &'static str,
    oid: &'static str,
    hardware: bool,
    person: bool,
    loa: AssuranceLevel,
) -> Policy {
    Policy::new(
        name,
        ObjectIdentifier::new_unwrap(oid),
        Issued::new(hardware, person, loa),
    )
}

use AssuranceLevel::{Basic, High, Medium, Rudimentary};

/// DoD medium assurance; device or other non-person entity.
pub const DOD_MEDIUM_NPE: Policy =
    policy("DoD Medium NPE", "2.16.840.1.101.2.1.11.17", false, false, Medium);
/// DoD medium assurance non-person entity, 112-bit keys.
pub const DOD_MEDIUM_NPE_112: Policy =
    policy("DoD Medium NPE-112", "2.16.840.1.101.2.1.11.36", false, false, Medium);
/// DoD medium assurance non-person entity, 128-bit keys.
pub const DOD_MEDIUM_NPE_128: Policy =
    policy("DoD Medium NPE-128", "2.16.840.1.101.2.1.11.37", false, false, Medium);

/// DoD medium assurance; individual person, software key.
pub const DOD_MEDIUM: Policy = policy("DoD Medium", "2.16.840.1.101.2.1.11.5", false, true, Medium);
/// DoD medium assurance person, 2048-bit keys.
pub const DOD_MEDIUM_2048: Policy =
    policy("DoD Medium-2048", "2.16.840.1.101.2.1.11.18", false, true, Medium);
/// DoD medium assurance person, 112-bit keys.
pub const DOD_MEDIUM_112: Policy =
    policy("DoD Medium-112", "2.16.840.1.101.2.1.11.39", false, true, Medium);
/// DoD medium assurance person, 128-bit keys.
pub const DOD_MEDIUM_128: Policy =
    policy("DoD Medium-128", "2.16.840.1.101.2.1.11.40", false, true, Medium);

/// DoD medium assurance; key on a hardware token (CAC).
pub const DOD_MEDIUM_HARDWARE: Policy =
    policy("DoD Medium Hardware", "2.16.840.1.101.2.1.11.9", true, true, Medium);
/// DoD medium hardware, 2048-bit keys.
pub const DOD_MEDIUM_HARDWARE_2048: Policy =
    policy("DoD Medium Hardware-2048", "2.16.840.1.101.2.1.11.19", true, true, Medium);
/// DoD medium hardware, 112-bit keys.
pub const DOD_MEDIUM_HARDWARE_112: Policy =
    policy("DoD Medium Hardware-112", "2.16.840.1.101.2.1.11.42", true, true, Medium);
/// DoD medium hardware, 128-bit keys.
pub const DOD_MEDIUM_HARDWARE_128: Policy =
    policy("DoD Medium Hardware-128", "2.16.840.1.101.2.1.11.43", true, true, Medium);

/// DoD PIV authentication; card-resident key for physical and logical access.
pub const DOD_PIV_AUTH: Policy =
    policy("DoD PIV Auth", "2.16.840.1.101.2.1.11.10", true, true, Medium);
/// DoD PIV authentication, 2048-bit keys.
pub const DOD_PIV_AUTH_2048: Policy =
    policy("DoD PIV Auth-2048", "2.16.840.1.101.2.1.11.20", true, true, Medium);

/// DoD high assurance; FORTEZZA card.
pub const DOD_FORTEZZA: Policy = policy("DoD FORTEZZA", "2.16.840.1.101.2.1.11.4", true, true, High);
/// DoD Type 1; high assurance hardware, non-person.
pub const DOD_TYPE_1: Policy = policy("DoD Type 1", "2.16.840.1.101.2.1.11.6", true, false, High);

/// Low risk; individual person.
pub const FBCA_RUDIMENTARY: Policy =
    policy("FBCA Rudimentary", "2.16.840.1.101.3.2.1.3.1", false, true, Rudimentary);
/// Low risk; individual person.
pub const FBCA_BASIC: Policy = policy("FBCA Basic", "2.16.840.1.101.3.2.1.3.2", false, true, Basic);
/// Medium risk; person, group, device or role.
pub const FBCA_MEDIUM: Policy =
    policy("FBCA Medium", "2.16.840.1.101.3.2.1.3.3", false, true, Medium);
/// Medium risk; key protected on a hardware token.
pub const FBCA_MEDIUM_HW: Policy =
    policy("FBCA Medium Hardware", "2.16.840.1.101.3.2.1.3.12", true, true, Medium);
/// Medium risk, commercial best practice.
pub const FBCA_MEDIUM_CBP: Policy =
    policy("FBCA Medium CBP", "2.16.840.1.101.3.2.1.3.14", false, false, Medium);
/// Medium risk, commercial best practice, hardware token.
pub const FBCA_MEDIUM_HW_CBP: Policy =
    policy("FBCA Medium Hardware CBP", "2.16.840.1.101.3.2.1.3.15", true, false, Medium);
/// Medium risk; device.
pub const FBCA_MEDIUM_DEVICE: Policy =
    policy("FBCA Medium Device", "2.16.840.1.101.3.2.1.3.37", false, false, Medium);
/// Medium risk; device with hardware-protected key.
pub const FBCA_MEDIUM_DEVICE_HW: Policy =
    policy("FBCA Medium Device Hardware", "2.16.840.1.101.3.2.1.3.38", true, false, Medium);
/// High risk; hardware token.
pub const FBCA_HIGH: Policy = policy("FBCA High", "2.16.840.1.101.3.2.1.3.4", true, true, High);
/// PIV-I hardware; APL smartcard with on-card biometric.
pub const FBCA_PIVI_HW: Policy =
    policy("FBCA PIV-I Hardware", "2.16.840.1.101.3.2.1.3.18", true, true, Medium);
/// Possession of a PIV-I card without PIN use.
pub const FBCA_PIVI_CARD_AUTH: Policy =
    policy("FBCA PIV-I Card Auth", "2.16.840.1.101.3.2.1.3.19", true, true, Medium);
/// Signs security objects on a PIV-I card.
pub const FBCA_PIVI_CONTENT_SIGNING: Policy = policy(
    "FBCA PIV-I Content Signing",
    "2.16.840.1.101.3.2.1.3.20",
    true,
    false,
    Medium,
);

/// Medium risk; USG person, group, device or role.
pub const COMMON_POLICY: Policy =
    policy("Common Policy", "2.16.840.1.101.3.2.1.3.6", false, true, Medium);
/// USG key protected on a hardware token.
pub const COMMON_HW: Policy =
    policy("Common Hardware", "2.16.840.1.101.3.2.1.3.7", true, true, Medium);
/// USG device.
pub const COMMON_DEVICES: Policy =
    policy("Common Devices", "2.16.840.1.101.3.2.1.3.8", false, false, Medium);
/// USG device with hardware-protected key.
pub const COMMON_DEVICES_HW: Policy =
    policy("Common Devices Hardware", "2.16.840.1.101.3.2.1.3.36", true, false, Medium);
/// Possession of a PIV card with PIN use.
pub const COMMON_AUTH: Policy =
    policy("Common Auth", "2.16.840.1.101.3.2.1.3.13", true, true, Medium);
/// High risk; USG hardware token.
pub const COMMON_HIGH: Policy =
    policy("Common High", "2.16.840.1.101.3.2.1.3.16", true, true, High);
/// Possession of a PIV card without PIN use.
pub const COMMON_CARD_AUTH: Policy =
    policy("Common Card Auth", "2.16.840.1.101.3.2.1.3.17", true, true, Medium);
/// Signs security objects on PIV or Derived PIV.
pub const COMMON_PIV_CONTENT_SIGNING: Policy = policy(
    "Common PIV Content Signing",
    "2.16.840.1.101.3.2.1.3.39",
    true,
    false,
    Medium,
);

/// Every policy in the compiled-in catalog.
pub static ALL_POLICIES: &[Policy] = &[
    DOD_MEDIUM_NPE,
    DOD_MEDIUM_NPE_112,
    DOD_MEDIUM_NPE_128,
    DOD_MEDIUM,
    DOD_MEDIUM_2048,
    DOD_MEDIUM_112,
    DOD_MEDIUM_128,
    DOD_MEDIUM_HARDWARE,
    DOD_MEDIUM_HARDWARE_2048,
    DOD_MEDIUM_HARDWARE_112,
    DOD_MEDIUM_HARDWARE_128,
    DOD_PIV_AUTH,
    DOD_PIV_AUTH_2048,
    DOD_FORTEZZA,
    DOD_TYPE_1,
    FBCA_RUDIMENTARY,
    FBCA_BASIC,
    FBCA_MEDIUM,
    FBCA_MEDIUM_HW,
    FBCA_MEDIUM_CBP,
    FBCA_MEDIUM_HW_CBP,
    FBCA_MEDIUM_DEVICE,
    FBCA_MEDIUM_DEVICE_HW,
    FBCA_HIGH,
    FBCA_PIVI_HW,
    FBCA_PIVI_CARD_AUTH,
    FBCA_PIVI_CONTENT_SIGNING,
    COMMON_POLICY,
    COMMON_HW,
    COMMON_DEVICES,
    COMMON_DEVICES_HW,
    COMMON_AUTH,
    COMMON_HIGH,
    COMMON_CARD_AUTH,
    COMMON_PIV_CONTENT_SIGNING,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oids::{DOD_POLICY_ARC, FPKI_POLICY_ARC};
    use crate::policy::PolicyRegistry;
    use std::collections::HashSet;

    fn under_arc(id: &ObjectIdentifier, arc: &ObjectIdentifier) -> bool {
        let id: Vec<u32> = id.arcs().collect();
        let arc: Vec<u32> = arc.arcs().collect();
        id.len() == arc.len() + 1 && id.starts_with(&arc)
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<String> = ALL_POLICIES.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids.len(), ALL_POLICIES.len());
        assert_eq!(PolicyRegistry::builtin().len(), ALL_POLICIES.len());
    }

    #[test]
    fn test_catalog_arcs() {
        for policy in ALL_POLICIES {
            assert!(
                under_arc(&policy.id, &DOD_POLICY_ARC) || under_arc(&policy.id, &FPKI_POLICY_ARC),
                "{policy}"
            );
        }
    }

    #[test]
    fn test_catalog_descriptors() {
        assert_eq!(DOD_MEDIUM_HARDWARE.id.to_string(), "2.16.840.1.101.2.1.11.9");
        assert!(DOD_MEDIUM_HARDWARE.issued.hardware);
        assert!(!DOD_MEDIUM_NPE.issued.person);
        assert_eq!(DOD_TYPE_1.issued.assurance_level, AssuranceLevel::High);
        assert_eq!(FBCA_RUDIMENTARY.issued.assurance_level, AssuranceLevel::Rudimentary);
        assert_eq!(FBCA_BASIC.issued.assurance_level, AssuranceLevel::Basic);
        assert_eq!(COMMON_HIGH.issued.assurance_level, AssuranceLevel::High);
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = PolicyRegistry::builtin();
        let oid = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.3.13");
        assert_eq!(registry.lookup(&oid), Some(&COMMON_AUTH));

        // SHA-1 medium is intentionally not recognised
        let sha1 = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.3.23");
        assert!(registry.lookup(&sha1).is_none());
    }

    #[test]
    fn test_dod_type_1_is_recognised() {
        let registry = PolicyRegistry::builtin();
        let policy = registry.lookup(&DOD_TYPE_1.id).unwrap();
        assert_eq!(policy.issued.assurance_level, crate::policy::AssuranceLevel::High);
        assert!(policy.issued.hardware);
        assert!(!policy.issued.person);
    }
}
