//! Integration tests for the PIV certificate decorator.

mod common;

use common::{sample_fasc, PivCertBuilder};
use usg_piv::policy::catalog;
use usg_piv::{AssuranceLevel, Fasc, PivCertificate, PivError};

#[test]
fn test_full_piv_authentication_certificate() {
    let der = PivCertBuilder::new()
        .common_name("DOE.JANE.Q.1112223333")
        .upn("1112223333@mil")
        .fasc(sample_fasc())
        .email("jane.doe@example.mil")
        .policy("1.2.3.4.5")
        .policy("2.16.840.1.101.3.2.1.3.13")
        .naci(true)
        .build_der();

    let cert = PivCertificate::from_der(&der).unwrap();

    assert_eq!(cert.common_name().as_deref(), Some("DOE.JANE.Q.1112223333"));
    assert_eq!(cert.completed_naci(), Some(true));
    assert_eq!(cert.principal_names(), ["1112223333@mil".to_string()]);
    assert_eq!(cert.email_addresses(), ["jane.doe@example.mil".to_string()]);

    assert_eq!(cert.fascs().len(), 1);
    let fasc = &cert.fascs()[0];
    assert_eq!(fasc.agency_code, "9999");
    assert_eq!(fasc.person_identifier, "1112223333");
    assert_eq!(fasc.person_key(), "122311122233332");

    // Unknown OIDs are dropped, known ones keep certificate order.
    assert_eq!(cert.policies().as_slice(), [catalog::COMMON_AUTH.clone()]);
    assert_eq!(cert.policies().highest_assurance(), AssuranceLevel::Medium);
    assert!(cert.policies().is_hardware());
    assert!(cert.policies().is_person());
}

#[test]
fn test_multiple_names_keep_order() {
    let der = PivCertBuilder::new()
        .upn("first@example.gov")
        .upn("second@example.gov")
        .build_der();

    let cert = PivCertificate::from_der(&der).unwrap();
    assert_eq!(
        cert.principal_names(),
        ["first@example.gov".to_string(), "second@example.gov".to_string()]
    );
    assert!(cert.fascs().is_empty());
    assert_eq!(cert.completed_naci(), None);
}

#[test]
fn test_policy_order_and_highest_assurance() {
    let der = PivCertBuilder::new()
        .policy("2.16.840.1.101.3.2.1.3.1") // FBCA Rudimentary
        .policy("2.16.840.1.101.3.2.1.3.16") // Common High
        .policy("2.16.840.1.101.3.2.1.3.2") // FBCA Basic
        .build_der();

    let cert = PivCertificate::from_der(&der).unwrap();
    let names: Vec<&str> = cert.policies().iter().map(|p| p.name.as_ref()).collect();
    assert_eq!(names, ["FBCA Rudimentary", "Common High", "FBCA Basic"]);
    assert_eq!(cert.policies().as_slice()[1], catalog::COMMON_HIGH);
    assert_eq!(cert.policies().highest_assurance(), AssuranceLevel::High);
}

#[test]
fn test_no_policies_is_unknown_assurance() {
    let cert = PivCertificate::from_der(&PivCertBuilder::new().build_der()).unwrap();
    assert!(cert.policies().is_empty());
    assert_eq!(cert.policies().highest_assurance(), AssuranceLevel::Unknown);
    assert!(!cert.policies().is_hardware());
}

#[test]
fn test_corrupt_fasc_is_error() {
    let mut fasc = sample_fasc();
    fasc[24] ^= 0b0110;
    let der = PivCertBuilder::new().fasc(fasc).build_der();

    let err = PivCertificate::from_der(&der).unwrap_err();
    assert!(matches!(err, PivError::Fasc(_)));
}

#[test]
fn test_pem_input() {
    let der = PivCertBuilder::new().naci(false).build_der();
    let cert = PivCertificate::from_der(&der).unwrap();

    let reloaded = PivCertificate::from_pem(cert.to_pem().unwrap()).unwrap();
    assert_eq!(reloaded.completed_naci(), Some(false));
    assert_eq!(reloaded.der(), der.as_slice());
}

#[test]
fn test_fasc_matches_certificate_value() {
    let decoded = Fasc::decode(&sample_fasc()).unwrap();
    let der = PivCertBuilder::new().fasc(sample_fasc()).build_der();
    let cert = PivCertificate::from_der(&der).unwrap();
    assert_eq!(cert.fascs(), [decoded]);
}
