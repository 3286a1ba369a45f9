// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! PIV certificate decorator.
//!
//! [`PivCertificate`] wraps a parsed X.509 certificate and adds the PIV
//! specific annotations a relying party usually wants:
//!
//! - `completed_naci`: the PIV NACI indicator extension, if present
//! - `principal_names`: Microsoft UPN otherNames from the SAN
//! - `fascs`: FASC-N otherNames from the SAN
//! - `policies`: recognised certificate policies
//! - `user_ids`: `uid` attributes of the subject
//!
//! # Example
//!
//! ```no_run
//! use usg_piv::PivCertificate;
//!
//! # fn example(der: &[u8]) -> usg_piv::Result<()> {
//! let cert = PivCertificate::from_der(der)?;
//! println!("Subject: {}", cert.subject());
//! for upn in cert.principal_names() {
//!     println!("  UPN: {}", upn);
//! }
//! println!("  Assurance: {}", cert.policies().highest_assurance());
//! # Ok(())
//! # }
//! ```

use der::asn1::OctetString;
use der::pem::LineEnding;
use der::{Decode, Encode, EncodePem, Tag, Tagged};
use tracing::debug;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{CertificatePolicies, SubjectAltName};
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::error::{PivError, Result};
use crate::fasc::Fasc;
use crate::oids;
use crate::policy::{Policies, PolicyRegistry};

/// A certificate with its PIV annotations.
#[derive(Debug, Clone)]
pub struct PivCertificate {
    certificate: Certificate,
    der: Vec<u8>,
    completed_naci: Option<bool>,
    principal_names: Vec<String>,
    email_addresses: Vec<String>,
    fascs: Vec<Fasc>,
    policies: Policies,
    user_ids: Vec<String>,
}

impl PivCertificate {
    /// Parse DER bytes and decorate using the built-in policy registry.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::decorate_der(der, &PolicyRegistry::builtin())
    }

    /// Parse a PEM certificate and decorate it using the built-in registry.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        use der::DecodePem;

        let certificate = Certificate::from_pem(pem.as_ref())
            .map_err(|e| PivError::certificate_parsing(format!("PEM decode failed: {}", e)))?;
        Self::decorate(certificate, &PolicyRegistry::builtin())
    }

    /// Decorate an already parsed certificate using the built-in registry.
    pub fn from_certificate(certificate: Certificate) -> Result<Self> {
        Self::decorate(certificate, &PolicyRegistry::builtin())
    }

    /// Parse DER bytes and decorate them against `registry`.
    pub fn decorate_der(der: &[u8], registry: &PolicyRegistry) -> Result<Self> {
        let certificate = Certificate::from_der(der)
            .map_err(|e| PivError::certificate_parsing(e.to_string()))?;
        Self::build(certificate, der.to_vec(), registry)
    }

    /// Decorate a parsed certificate against `registry`.
    pub fn decorate(certificate: Certificate, registry: &PolicyRegistry) -> Result<Self> {
        let der = certificate.to_der()?;
        Self::build(certificate, der, registry)
    }

    fn build(certificate: Certificate, der: Vec<u8>, registry: &PolicyRegistry) -> Result<Self> {
        let completed_naci = completed_naci(&certificate)?;
        let user_ids = user_ids(&certificate.tbs_certificate.subject);

        let mut principal_names = Vec::new();
        let mut email_addresses = Vec::new();
        let mut fascs = Vec::new();
        if let Some(san) = find_extension(&certificate, &oids::SUBJECT_ALT_NAME) {
            let san = SubjectAltName::from_der(san)
                .map_err(|e| PivError::malformed_extension("subject alternative name", e))?;
            for name in san.0 {
                match name {
                    GeneralName::OtherName(other) if other.type_id == oids::MS_UPN => {
                        let upn = other.value.decode_as::<String>().map_err(|e| {
                            PivError::malformed_extension("subject alternative name", e)
                        })?;
                        principal_names.push(upn);
                    }
                    GeneralName::OtherName(other) if other.type_id == oids::PIV_FASC_N => {
                        let raw = other.value.decode_as::<OctetString>().map_err(|e| {
                            PivError::malformed_extension("subject alternative name", e)
                        })?;
                        fascs.push(Fasc::decode(raw.as_bytes())?);
                    }
                    GeneralName::Rfc822Name(email) => email_addresses.push(email.to_string()),
                    _ => {}
                }
            }
        }

        let policies = match find_extension(&certificate, &oids::CERTIFICATE_POLICIES) {
            Some(value) => {
                let policies = CertificatePolicies::from_der(value)
                    .map_err(|e| PivError::malformed_extension("certificate policies", e))?;
                registry.resolve_all(policies.0.iter().map(|p| &p.policy_identifier))
            }
            None => Policies::default(),
        };

        debug!(
            "Decorated certificate: naci={:?} upns={} fascs={} policies={} uids={}",
            completed_naci,
            principal_names.len(),
            fascs.len(),
            policies.len(),
            user_ids.len()
        );

        Ok(Self {
            certificate,
            der,
            completed_naci,
            principal_names,
            email_addresses,
            fascs,
            policies,
            user_ids,
        })
    }

    /// The underlying certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Consume the decorator, returning the underlying certificate.
    pub fn into_certificate(self) -> Certificate {
        self.certificate
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding of the certificate.
    pub fn to_pem(&self) -> Result<String> {
        Ok(self.certificate.to_pem(LineEnding::LF)?)
    }

    /// Subject distinguished name (RFC 4514).
    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name (RFC 4514).
    pub fn issuer(&self) -> String {
        self.certificate.tbs_certificate.issuer.to_string()
    }

    /// First common name of the subject, if any.
    pub fn common_name(&self) -> Option<String> {
        string_attributes(&self.certificate.tbs_certificate.subject, &oids::COMMON_NAME)
            .into_iter()
            .next()
    }

    /// Serial number as lowercase hex without leading zeros.
    pub fn serial_hex(&self) -> String {
        let hex = hex::encode(self.certificate.tbs_certificate.serial_number.as_bytes());
        let trimmed = hex.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Whether the cardholder had a completed NACI at card issue.
    ///
    /// `None` when the certificate carries no NACI indicator. Few issuers set
    /// this extension, so its absence says nothing about the cardholder.
    pub fn completed_naci(&self) -> Option<bool> {
        self.completed_naci
    }

    /// User Principal Names, in SAN order.
    ///
    /// These are directory login names, not email addresses.
    pub fn principal_names(&self) -> &[String] {
        &self.principal_names
    }

    /// rfc822Name entries of the SAN.
    pub fn email_addresses(&self) -> &[String] {
        &self.email_addresses
    }

    /// FASC-N values, in SAN order.
    pub fn fascs(&self) -> &[Fasc] {
        &self.fascs
    }

    /// Recognised certificate policies, in extension order.
    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    /// `uid` attributes of the subject, in encounter order.
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }
}

fn find_extension<'a>(
    certificate: &'a Certificate,
    oid: &const_oid::ObjectIdentifier,
) -> Option<&'a [u8]> {
    certificate
        .tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == *oid)
        .map(|ext| ext.extn_value.as_bytes())
}

fn completed_naci(certificate: &Certificate) -> Result<Option<bool>> {
    match find_extension(certificate, &oids::PIV_NACI_INDICATOR) {
        Some(value) => bool::from_der(value)
            .map(Some)
            .map_err(|e| PivError::malformed_extension("PIV NACI indicator", e)),
        None => Ok(None),
    }
}

fn user_ids(subject: &Name) -> Vec<String> {
    string_attributes(subject, &oids::USER_ID)
}

/// Collect string-valued attributes of type `oid`, skipping other encodings.
fn string_attributes(name: &Name, oid: &const_oid::ObjectIdentifier) -> Vec<String> {
    let mut values = Vec::new();
    for rdn in name.0.iter() {
        for atv in rdn.0.iter() {
            if atv.oid != *oid {
                continue;
            }
            match atv.value.tag() {
                Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
                    match std::str::from_utf8(atv.value.value()) {
                        Ok(s) => values.push(s.to_string()),
                        Err(_) => debug!("Skipping {} attribute with invalid text", oid),
                    }
                }
                tag => debug!("Skipping {} attribute with non-string tag {}", oid, tag),
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{catalog, AssuranceLevel, Issued, Policy};
    use const_oid::ObjectIdentifier;
    use der::asn1::SetOfVec;
    use der::Any;
    use x509_cert::attr::AttributeTypeAndValue;
    use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

    fn self_signed(mutate: impl FnOnce(&mut rcgen::CertificateParams)) -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "Test Cardholder");
        mutate(&mut params);
        let key = rcgen::KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }

    fn naci_extension(value: &[u8]) -> rcgen::CustomExtension {
        rcgen::CustomExtension::from_oid_content(&[2, 16, 840, 1, 101, 3, 6, 9, 1], value.to_vec())
    }

    #[test]
    fn test_no_extensions() {
        let der = self_signed(|_| {});
        let cert = PivCertificate::from_der(&der).unwrap();
        assert_eq!(cert.completed_naci(), None);
        assert!(cert.principal_names().is_empty());
        assert!(cert.fascs().is_empty());
        assert!(cert.policies().is_empty());
        assert!(cert.user_ids().is_empty());
        assert_eq!(cert.common_name().as_deref(), Some("Test Cardholder"));
        assert_eq!(cert.der(), der.as_slice());
    }

    #[test]
    fn test_naci_true_and_false() {
        let der = self_signed(|p| p.custom_extensions.push(naci_extension(&[0x01, 0x01, 0xFF])));
        assert_eq!(PivCertificate::from_der(&der).unwrap().completed_naci(), Some(true));

        let der = self_signed(|p| p.custom_extensions.push(naci_extension(&[0x01, 0x01, 0x00])));
        assert_eq!(PivCertificate::from_der(&der).unwrap().completed_naci(), Some(false));
    }

    #[test]
    fn test_malformed_naci_is_error() {
        // INTEGER 1 instead of BOOLEAN
        let der = self_signed(|p| p.custom_extensions.push(naci_extension(&[0x02, 0x01, 0x01])));
        let err = PivCertificate::from_der(&der).unwrap_err();
        assert!(matches!(
            err,
            PivError::MalformedExtension {
                extension: "PIV NACI indicator",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_der() {
        let err = PivCertificate::from_der(&[0x30, 0x03, 0x01]).unwrap_err();
        assert!(matches!(err, PivError::CertificateParsing(_)));
    }

    #[test]
    fn test_user_ids_skip_non_strings() {
        let der = self_signed(|_| {});
        let mut certificate = Certificate::from_der(&der).unwrap();

        let uid = |value: Any| {
            RelativeDistinguishedName(
                SetOfVec::try_from(vec![AttributeTypeAndValue {
                    oid: oids::USER_ID,
                    value,
                }])
                .unwrap(),
            )
        };
        let subject = RdnSequence(vec![
            uid(Any::new(Tag::Utf8String, b"alice".to_vec()).unwrap()),
            uid(Any::new(Tag::Integer, vec![0x05]).unwrap()),
            uid(Any::new(Tag::PrintableString, b"alice2".to_vec()).unwrap()),
        ]);
        certificate.tbs_certificate.subject = subject;

        let cert = PivCertificate::from_certificate(certificate).unwrap();
        assert_eq!(cert.user_ids(), ["alice".to_string(), "alice2".to_string()]);
    }

    #[test]
    fn test_policies_with_injected_registry() {
        let oid = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.3.13");
        let policies = x509_cert::ext::pkix::CertificatePolicies(vec![
            x509_cert::ext::pkix::certpolicy::PolicyInformation {
                policy_identifier: ObjectIdentifier::new_unwrap("1.2.3.4"),
                policy_qualifiers: None,
            },
            x509_cert::ext::pkix::certpolicy::PolicyInformation {
                policy_identifier: oid,
                policy_qualifiers: None,
            },
        ])
        .to_der()
        .unwrap();
        let der = self_signed(|p| {
            p.custom_extensions.push(rcgen::CustomExtension::from_oid_content(
                &[2, 5, 29, 32],
                policies,
            ))
        });

        let builtin = PivCertificate::from_der(&der).unwrap();
        assert_eq!(builtin.policies().as_slice(), [catalog::COMMON_AUTH.clone()]);

        let registry = PolicyRegistry::new([Policy::new(
            "Synthetic",
            ObjectIdentifier::new_unwrap("1.2.3.4"),
            Issued::new(false, false, AssuranceLevel::Basic),
        )]);
        let synthetic = PivCertificate::decorate_der(&der, &registry).unwrap();
        assert_eq!(synthetic.policies().len(), 1);
        assert_eq!(synthetic.policies().as_slice()[0].name, "Synthetic");
    }

    #[test]
    fn test_serial_hex_and_pem() {
        let der = self_signed(|p| {
            p.serial_number = Some(rcgen::SerialNumber::from_slice(&[0x0a, 0xbc]));
        });
        let cert = PivCertificate::from_der(&der).unwrap();
        assert_eq!(cert.serial_hex(), "abc");

        let pem = cert.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
        let again = PivCertificate::from_pem(&pem).unwrap();
        assert_eq!(again.der(), cert.der());
    }
}
