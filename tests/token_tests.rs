//! Integration tests for token sessions over the in-memory module.

mod common;

use common::{sample_fasc, tlv_wrap, PivCertBuilder};
use std::sync::Arc;
use usg_piv::token::memory::{Call, MemoryModule, MemoryObject, MemoryToken};
use usg_piv::token::{
    AUTHENTICATION_CERTIFICATE_LABEL, CARD_AUTHENTICATION_CERTIFICATE_LABEL, FACIAL_IMAGE_LABEL,
};
use usg_piv::{
    AssuranceLevel, Issued, PivCredentials, PivError, PivSlot, Policy, PolicyRegistry, Token,
    TokenConfig,
};

fn provisioned_card() -> MemoryToken {
    let auth = PivCertBuilder::new()
        .common_name("DOE.JANE.Q.1112223333")
        .upn("1112223333@mil")
        .fasc(sample_fasc())
        .policy("2.16.840.1.101.3.2.1.3.13")
        .naci(true)
        .build_der();
    let card_auth = PivCertBuilder::new()
        .fasc(sample_fasc())
        .policy("2.16.840.1.101.3.2.1.3.17")
        .build_der();

    MemoryToken::new("PIV_II")
        .with_pin("123456")
        .with_object(MemoryObject::certificate(AUTHENTICATION_CERTIFICATE_LABEL, auth))
        .with_object(MemoryObject::certificate(
            CARD_AUTHENTICATION_CERTIFICATE_LABEL,
            card_auth,
        ))
        .with_object(MemoryObject::data(
            FACIAL_IMAGE_LABEL,
            tlv_wrap(b"facial cbeff record"),
        ))
}

#[test]
fn test_read_provisioned_card() {
    let module = MemoryModule::new().with_token(provisioned_card());
    let config = TokenConfig::new("memory").with_pin("123456");
    let mut token = Token::open(module, config).unwrap();
    assert!(token.is_logged_in());

    let auth = token.authentication_certificate().unwrap();
    assert_eq!(auth.principal_names(), ["1112223333@mil".to_string()]);
    assert_eq!(auth.completed_naci(), Some(true));
    assert_eq!(auth.policies().highest_assurance(), AssuranceLevel::Medium);

    let card_auth = token.card_authentication_certificate().unwrap();
    assert_eq!(card_auth.fascs()[0].person_key(), "122311122233332");

    let facial = token.facial_image().unwrap();
    assert_eq!(facial.label(), FACIAL_IMAGE_LABEL);
    assert_eq!(facial.cbeff(), b"facial cbeff record");

    token.close().unwrap();
    assert!(!token.is_open());
}

#[test]
fn test_missing_slots_are_not_found() {
    let module = MemoryModule::new().with_token(provisioned_card());
    let mut token = Token::open(module, TokenConfig::new("memory")).unwrap();

    let err = token.digital_signature_certificate().unwrap_err();
    assert!(err.is_not_found());
    assert!(token.key_management_certificate().unwrap_err().is_not_found());
    assert!(token.fingerprints().unwrap_err().is_not_found());

    // An absent slot does not abort the walk over the others.
    let present: Vec<PivSlot> = PivSlot::ALL
        .into_iter()
        .filter(|slot| token.certificate(*slot).is_ok())
        .collect();
    assert_eq!(
        present,
        [PivSlot::Authentication, PivSlot::CardAuthentication]
    );
}

#[test]
fn test_duplicate_labels_are_ambiguous() {
    let der = PivCertBuilder::new().build_der();
    let module = MemoryModule::new().with_token(
        MemoryToken::new("PIV_II")
            .with_object(MemoryObject::certificate(
                AUTHENTICATION_CERTIFICATE_LABEL,
                der.clone(),
            ))
            .with_object(MemoryObject::certificate(AUTHENTICATION_CERTIFICATE_LABEL, der)),
    );
    let mut token = Token::open(module, TokenConfig::new("memory")).unwrap();

    let err = token.authentication_certificate().unwrap_err();
    assert!(matches!(err, PivError::Ambiguous { count: 2 }));
}

#[test]
fn test_label_selects_among_cards() {
    let module = MemoryModule::new()
        .with_token(MemoryToken::new("Other Card"))
        .with_token(provisioned_card());
    let log = module.call_log();
    let config = TokenConfig::new("memory").with_token_label("PIV_II");

    let mut token = Token::open(module, config).unwrap();
    assert_eq!(log.opened_slot(), Some(1));
    assert!(token.authentication_certificate().is_ok());
}

#[test]
fn test_wrong_pin_releases_everything() {
    let module = MemoryModule::new().with_token(provisioned_card());
    let log = module.call_log();
    let config = TokenConfig::new("memory").with_pin("000000");

    let err = Token::open(module, config).unwrap_err();
    assert!(matches!(err, PivError::Authentication(_)));
    assert_eq!(
        log.calls(),
        [
            Call::Initialize,
            Call::SlotsWithToken,
            Call::OpenSession,
            Call::Login,
            Call::CloseSession,
            Call::Finalize,
        ]
    );
}

#[test]
fn test_injected_registry_reclassifies() {
    let module = MemoryModule::new().with_token(provisioned_card());
    let registry = Arc::new(PolicyRegistry::new([Policy::new(
        "Lab Auth",
        const_oid::ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.3.13"),
        Issued::new(true, true, AssuranceLevel::High),
    )]));

    let mut token = Token::open(module, TokenConfig::new("memory"))
        .unwrap()
        .with_registry(registry);

    let auth = token.authentication_certificate().unwrap();
    assert_eq!(auth.policies().as_slice()[0].name, "Lab Auth");
    assert_eq!(auth.policies().highest_assurance(), AssuranceLevel::High);

    // Not in the lab registry.
    let card_auth = token.card_authentication_certificate().unwrap();
    assert!(card_auth.policies().is_empty());
}

#[test]
fn test_drop_tears_down_after_reads() {
    let module = MemoryModule::new().with_token(provisioned_card());
    let log = module.call_log();
    {
        let mut token =
            Token::open(module, TokenConfig::new("memory").with_pin("123456")).unwrap();
        token.authentication_certificate().unwrap();
    }

    let calls = log.calls();
    assert_eq!(
        &calls[calls.len() - 3..],
        [Call::Logout, Call::CloseSession, Call::Finalize]
    );
    let inits = calls.iter().filter(|c| **c == Call::FindObjectsInit).count();
    let finals = calls.iter().filter(|c| **c == Call::FindObjectsFinal).count();
    assert_eq!(inits, finals);
}
