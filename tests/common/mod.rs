//! Shared certificate fixtures for integration tests.
//!
//! Certificates are minted with `rcgen`; the PIV extensions are DER encoded
//! with `x509-cert` types and attached as custom extensions.

#![allow(dead_code)]

use const_oid::ObjectIdentifier;
use der::asn1::Ia5String;
use der::{Any, Encode, Tag};
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::name::{GeneralName, OtherName};
use x509_cert::ext::pkix::{CertificatePolicies, SubjectAltName};

/// FASC-N for agency 9999, system 9999, credential 999999, person 1112223333,
/// organization 1223, association 2.
pub const SAMPLE_FASC_HEX: &str = "d4e739da739ced39ce739d83685a1082108ce73984108ca3eb";

pub fn sample_fasc() -> Vec<u8> {
    hex::decode(SAMPLE_FASC_HEX).unwrap()
}

/// Builder for a self-signed PIV-style certificate.
#[derive(Default)]
pub struct PivCertBuilder {
    common_name: Option<String>,
    upns: Vec<String>,
    fascs: Vec<Vec<u8>>,
    emails: Vec<String>,
    policies: Vec<&'static str>,
    naci: Option<bool>,
}

impl PivCertBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn common_name(mut self, cn: &str) -> Self {
        self.common_name = Some(cn.to_string());
        self
    }

    pub fn upn(mut self, upn: &str) -> Self {
        self.upns.push(upn.to_string());
        self
    }

    pub fn fasc(mut self, fasc: Vec<u8>) -> Self {
        self.fascs.push(fasc);
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.emails.push(email.to_string());
        self
    }

    pub fn policy(mut self, oid: &'static str) -> Self {
        self.policies.push(oid);
        self
    }

    pub fn naci(mut self, completed: bool) -> Self {
        self.naci = Some(completed);
        self
    }

    fn san(&self) -> Option<Vec<u8>> {
        let mut names = Vec::new();
        for upn in &self.upns {
            names.push(GeneralName::OtherName(OtherName {
                type_id: ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.20.2.3"),
                value: Any::new(Tag::Utf8String, upn.as_bytes()).unwrap(),
            }));
        }
        for fasc in &self.fascs {
            names.push(GeneralName::OtherName(OtherName {
                type_id: ObjectIdentifier::new_unwrap("2.16.840.1.101.3.6.6"),
                value: Any::new(Tag::OctetString, fasc.as_slice()).unwrap(),
            }));
        }
        for email in &self.emails {
            names.push(GeneralName::Rfc822Name(Ia5String::new(email).unwrap()));
        }
        if names.is_empty() {
            return None;
        }
        Some(SubjectAltName(names).to_der().unwrap())
    }

    fn certificate_policies(&self) -> Option<Vec<u8>> {
        if self.policies.is_empty() {
            return None;
        }
        let policies = self
            .policies
            .iter()
            .map(|oid| PolicyInformation {
                policy_identifier: ObjectIdentifier::new_unwrap(oid),
                policy_qualifiers: None,
            })
            .collect();
        Some(CertificatePolicies(policies).to_der().unwrap())
    }

    /// Build and self-sign, returning the DER encoding.
    pub fn build_der(self) -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(
            rcgen::DnType::CommonName,
            self.common_name.as_deref().unwrap_or("Test Cardholder"),
        );

        if let Some(san) = self.san() {
            params
                .custom_extensions
                .push(rcgen::CustomExtension::from_oid_content(&[2, 5, 29, 17], san));
        }
        if let Some(policies) = self.certificate_policies() {
            params
                .custom_extensions
                .push(rcgen::CustomExtension::from_oid_content(&[2, 5, 29, 32], policies));
        }
        if let Some(naci) = self.naci {
            params.custom_extensions.push(rcgen::CustomExtension::from_oid_content(
                &[2, 16, 840, 1, 101, 3, 6, 9, 1],
                naci.to_der().unwrap(),
            ));
        }

        let key = rcgen::KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }
}

/// Wrap `inner` the way a PIV data object stores a biometric container.
pub fn tlv_wrap(inner: &[u8]) -> Vec<u8> {
    // BC <len> inner
    let mut bc = vec![0xBC];
    push_length(&mut bc, inner.len());
    bc.extend_from_slice(inner);

    let mut out = vec![0x53];
    push_length(&mut out, bc.len() + 2);
    out.extend_from_slice(&bc);
    out.extend_from_slice(&[0xFE, 0x00]);
    out
}

fn push_length(out: &mut Vec<u8>, len: usize) {
    match len {
        0..=0x7F => out.push(len as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        _ => out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]),
    }
}
