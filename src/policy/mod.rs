// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Certificate policy registry and assurance model.
//!
//! Federal PIV, PIV-I and CAC certificates assert one or more certificate
//! policy OIDs. Each recognised OID maps to a [`Policy`] that describes how the
//! credential was issued: whether the key lives on non-exportable hardware,
//! whether the subscriber is a person or a non-person entity (NPE), and the
//! [`AssuranceLevel`] of the identity proofing.
//!
//! The set of recognised policies is closed: OIDs that are not in the
//! [`PolicyRegistry`] are dropped when resolving a certificate's policies,
//! because certificates routinely carry policies from issuers outside the
//! catalog.
//!
//! # Example
//!
//! ```
//! use usg_piv::policy::{AssuranceLevel, PolicyRegistry};
//! use const_oid::ObjectIdentifier;
//!
//! let registry = PolicyRegistry::builtin();
//! let ids = [
//!     ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.3.13"), // Common Auth
//!     ObjectIdentifier::new_unwrap("1.2.3.4"),                    // not recognised
//! ];
//!
//! let policies = registry.resolve_all(&ids);
//! assert_eq!(policies.len(), 1);
//! assert_eq!(policies.highest_assurance(), AssuranceLevel::Medium);
//! ```

pub mod catalog;

use const_oid::ObjectIdentifier;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Level of assurance in the identity of the subscriber.
///
/// This is *not* an LOA number as defined by OMB M-04-04. The variants are
/// declared loosest first, so the derived [`Ord`] ranks `High` above
/// `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AssuranceLevel {
    /// No recognised assurance.
    #[default]
    Unknown = 0,
    /// Rudimentary assurance.
    Rudimentary = 1,
    /// Basic assurance.
    Basic = 2,
    /// Medium assurance.
    Medium = 3,
    /// High assurance.
    High = 4,
}

impl AssuranceLevel {
    /// Compare two levels using the policy-reduction sign convention.
    ///
    /// Returns `0` when the levels are equal, `1` when `self` is looser than
    /// `other` (that is, `other` is the stricter one) and `-1` otherwise:
    ///
    /// ```
    /// use usg_piv::policy::AssuranceLevel;
    ///
    /// assert_eq!(AssuranceLevel::Medium.compare(AssuranceLevel::Rudimentary), -1);
    /// assert_eq!(AssuranceLevel::Medium.compare(AssuranceLevel::High), 1);
    /// assert_eq!(AssuranceLevel::Medium.compare(AssuranceLevel::Medium), 0);
    /// ```
    ///
    /// [`Policies::highest_assurance`] is written against this convention: it
    /// replaces its accumulator whenever `accumulator.compare(candidate) > 0`.
    /// Use the derived [`Ord`] for ordinary ordering.
    pub fn compare(self, other: AssuranceLevel) -> i8 {
        if self == other {
            0
        } else if self < other {
            1
        } else {
            -1
        }
    }

    /// Get the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Rudimentary => "Rudimentary",
            Self::Basic => "Basic",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for AssuranceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the key bound to a certificate was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Issued {
    /// The private key lives on a hardware device that does not allow export.
    pub hardware: bool,

    /// The key is held by a natural person rather than a non-person entity.
    pub person: bool,

    /// Assurance that the subscriber is the identity named in the certificate.
    pub assurance_level: AssuranceLevel,
}

impl Issued {
    /// Create a new issuance descriptor.
    pub const fn new(hardware: bool, person: bool, assurance_level: AssuranceLevel) -> Self {
        Self {
            hardware,
            person,
            assurance_level,
        }
    }
}

/// A named federal PIV, PIV-I or CAC certificate policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Policy {
    /// Human-readable policy name.
    pub name: Cow<'static, str>,

    /// Policy OID; the registry lookup key.
    pub id: ObjectIdentifier,

    /// Key and subscriber information.
    pub issued: Issued,
}

impl Policy {
    /// Create a policy with a static name.
    pub const fn new(name: &'static str, id: ObjectIdentifier, issued: Issued) -> Self {
        Self {
            name: Cow::Borrowed(name),
            id,
            issued,
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) person={} hardware={} loa={}",
            self.name,
            self.id,
            self.issued.person,
            self.issued.hardware,
            self.issued.assurance_level
        )
    }
}

/// An ordered set of resolved policies, as asserted by one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Policies(Vec<Policy>);

impl Policies {
    /// Create a policy set from resolved policies.
    pub fn new(policies: Vec<Policy>) -> Self {
        Self(policies)
    }

    /// Highest assurance level present, or `Unknown` for an empty set.
    pub fn highest_assurance(&self) -> AssuranceLevel {
        let mut loa = AssuranceLevel::Unknown;
        for policy in &self.0 {
            if loa.compare(policy.issued.assurance_level) > 0 {
                loa = policy.issued.assurance_level;
            }
        }
        loa
    }

    /// True if any policy asserts a hardware-protected key.
    pub fn is_hardware(&self) -> bool {
        self.0.iter().any(|p| p.issued.hardware)
    }

    /// True if any policy asserts the subscriber is a person.
    pub fn is_person(&self) -> bool {
        self.0.iter().any(|p| p.issued.person)
    }

    /// Iterate over the policies in certificate order.
    pub fn iter(&self) -> std::slice::Iter<'_, Policy> {
        self.0.iter()
    }

    /// Number of resolved policies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no policy was recognised.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the policies as a slice.
    pub fn as_slice(&self) -> &[Policy] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Policies {
    type Item = &'a Policy;
    type IntoIter = std::slice::Iter<'a, Policy>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Read-only lookup table from policy OID to [`Policy`].
///
/// The registry is keyed by the canonical dotted string of the OID, so two
/// identifiers match exactly when their arcs match. Build one from any
/// policy list with [`PolicyRegistry::new`], or share the compiled-in catalog
/// through [`PolicyRegistry::builtin`].
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    by_id: HashMap<String, Policy>,
}

impl PolicyRegistry {
    /// Build a registry from a list of policies. Later duplicates win.
    pub fn new<I>(policies: I) -> Self
    where
        I: IntoIterator<Item = Policy>,
    {
        let by_id = policies
            .into_iter()
            .map(|policy| (policy.id.to_string(), policy))
            .collect();
        Self { by_id }
    }

    /// The compiled-in federal policy catalog, built on first use.
    pub fn builtin() -> Arc<PolicyRegistry> {
        static BUILTIN: OnceLock<Arc<PolicyRegistry>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| Arc::new(PolicyRegistry::new(catalog::ALL_POLICIES.iter().cloned())))
            .clone()
    }

    /// Look up a single policy OID.
    pub fn lookup(&self, id: &ObjectIdentifier) -> Option<&Policy> {
        self.by_id.get(&id.to_string())
    }

    /// Resolve a list of OIDs, keeping input order and dropping unknown ones.
    pub fn resolve_all<'a, I>(&self, ids: I) -> Policies
    where
        I: IntoIterator<Item = &'a ObjectIdentifier>,
    {
        Policies(
            ids.into_iter()
                .filter_map(|id| {
                    let policy = self.lookup(id);
                    if policy.is_none() {
                        tracing::debug!("Ignoring unrecognised certificate policy {}", id);
                    }
                    policy.cloned()
                })
                .collect(),
        )
    }

    /// Number of policies in the registry.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if the registry has no policies.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over the registered policies in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_LEVELS: [AssuranceLevel; 5] = [
        AssuranceLevel::Unknown,
        AssuranceLevel::Rudimentary,
        AssuranceLevel::Basic,
        AssuranceLevel::Medium,
        AssuranceLevel::High,
    ];

    fn synthetic(name: &'static str, oid: &str, loa: AssuranceLevel) -> Policy {
        Policy::new(name, ObjectIdentifier::new_unwrap(oid), Issued::new(false, true, loa))
    }

    #[test]
    fn test_compare_sign_convention() {
        assert_eq!(AssuranceLevel::Medium.compare(AssuranceLevel::Rudimentary), -1);
        assert_eq!(AssuranceLevel::Medium.compare(AssuranceLevel::High), 1);
        assert_eq!(AssuranceLevel::Medium.compare(AssuranceLevel::Medium), 0);
        assert_eq!(AssuranceLevel::Unknown.compare(AssuranceLevel::High), 1);
    }

    #[test]
    fn test_compare_is_total_order() {
        for a in ALL_LEVELS {
            for b in ALL_LEVELS {
                // Antisymmetric
                assert_eq!(a.compare(b), -b.compare(a), "{a} vs {b}");
                assert_eq!(a.compare(b) == 0, a == b);
                for c in ALL_LEVELS {
                    // Transitive
                    if a.compare(b) > 0 && b.compare(c) > 0 {
                        assert!(a.compare(c) > 0, "{a} {b} {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_highest_assurance_empty() {
        assert_eq!(Policies::default().highest_assurance(), AssuranceLevel::Unknown);
    }

    #[test]
    fn test_highest_assurance_mixed() {
        let policies = Policies::new(vec![
            synthetic("medium", "1.2.3.1", AssuranceLevel::Medium),
            synthetic("high", "1.2.3.2", AssuranceLevel::High),
            synthetic("rudimentary", "1.2.3.3", AssuranceLevel::Rudimentary),
        ]);
        assert_eq!(policies.highest_assurance(), AssuranceLevel::High);
    }

    #[test]
    fn test_assurance_display() {
        assert_eq!(AssuranceLevel::Unknown.to_string(), "Unknown");
        assert_eq!(AssuranceLevel::Rudimentary.to_string(), "Rudimentary");
        assert_eq!(AssuranceLevel::High.to_string(), "High");
    }

    #[test]
    fn test_resolve_all_drops_unknown_and_keeps_order() {
        let registry = PolicyRegistry::new(vec![
            synthetic("a", "1.2.3.1", AssuranceLevel::Basic),
            synthetic("b", "1.2.3.2", AssuranceLevel::Medium),
        ]);

        let ids = [
            ObjectIdentifier::new_unwrap("1.2.3.2"),
            ObjectIdentifier::new_unwrap("2.999.9"),
            ObjectIdentifier::new_unwrap("1.2.3.1"),
            ObjectIdentifier::new_unwrap("1.2.3.1.0"),
        ];

        let resolved = registry.resolve_all(&ids);
        let names: Vec<_> = resolved.iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_lookup_is_by_value() {
        let registry = PolicyRegistry::new(vec![synthetic("a", "1.2.3.1", AssuranceLevel::Basic)]);
        let parsed = ObjectIdentifier::new("1.2.3.1").unwrap();
        assert_eq!(registry.lookup(&parsed).map(|p| p.name.as_ref()), Some("a"));
        assert!(registry.lookup(&ObjectIdentifier::new_unwrap("1.2.3")).is_none());
    }

    #[test]
    fn test_policy_display_round_trip() {
        for policy in PolicyRegistry::builtin().iter() {
            let text = policy.to_string();
            let start = text.find('(').unwrap() + 1;
            let end = text.find(')').unwrap();
            let reparsed = ObjectIdentifier::new(&text[start..end]).unwrap();
            assert_eq!(
                reparsed.arcs().collect::<Vec<_>>(),
                policy.id.arcs().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_policy_display_format() {
        let policy = synthetic("example", "1.2.3.1", AssuranceLevel::Basic);
        assert_eq!(
            policy.to_string(),
            "example (1.2.3.1) person=true hardware=false loa=Basic"
        );
    }

    #[test]
    fn test_hardware_and_person_flags() {
        let policies = Policies::new(vec![Policy::new(
            "npe-hw",
            ObjectIdentifier::new_unwrap("1.2.3.9"),
            Issued::new(true, false, AssuranceLevel::Medium),
        )]);
        assert!(policies.is_hardware());
        assert!(!policies.is_person());
        assert!(!Policies::default().is_hardware());
    }
}
