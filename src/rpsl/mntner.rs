//! The maintainer object and its authentication capabilities.
//!
//! `mntner` objects carry the `auth:` lines other objects delegate
//! authorisation to via `mnt-by`. This module owns the textual
//! representation of those auth lines and the verifiers for each
//! supported method — everything spec.md §3 calls out as
//! "maintainer variants additionally expose".

use std::collections::HashMap;

use ipnet::IpNet;

use super::object::{InboundReference, ObjectClass, RpslObject, StrongReference};

/// Placeholder published in RPSL exports in place of a real auth hash.
/// On resubmission with exactly one password, [`MntnerObject::force_single_new_password`]
/// replaces every `auth:` line with a fresh hash of that password.
pub const RPSL_MNTNER_AUTH_DUMMY_VALUE: &str = "DUMMY-VALUE";

/// Sentinel recorded in `auth:` when a maintainer is linked to the
/// internal user/auth tables (a "migrated" maintainer, spec.md
/// Glossary). `RulesValidator` requires this sentinel be present iff
/// the maintainer is migrated.
pub const RPSL_MNTNER_AUTH_INTERNAL: &str = "INTERNAL-AUTH-SENTINEL";

/// A maintainer (`mntner`) object.
#[derive(Debug, Clone)]
pub struct MntnerObject {
    pub pk: String,
    pub source: String,
    pub parsed_data: HashMap<String, Vec<String>>,
    pub referred_strong: Vec<StrongReference>,
    pub references_strong_inbound: Vec<InboundReference>,
}

impl MntnerObject {
    pub fn new(pk: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            source: source.into(),
            parsed_data: HashMap::new(),
            referred_strong: Vec::new(),
            references_strong_inbound: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.parsed_data.insert(name.into(), values);
        self
    }

    /// Convenience constructor for tests and embedders building a
    /// maintainer straight from its `auth:` lines.
    pub fn with_auth_lines(mut self, lines: Vec<String>) -> Self {
        self.parsed_data.insert("auth".to_string(), lines);
        self
    }

    fn auth_lines(&self) -> &[String] {
        static EMPTY: &[String] = &[];
        self.parsed_data.get("auth").map(Vec::as_slice).unwrap_or(EMPTY)
    }

    /// Whether any `auth:` line is the dummy export placeholder.
    pub fn has_dummy_auth_value(&self) -> bool {
        self.auth_lines()
            .iter()
            .any(|line| line.trim() == RPSL_MNTNER_AUTH_DUMMY_VALUE)
    }

    /// Whether the internal-auth sentinel is present among `auth:` lines.
    pub fn has_internal_auth(&self) -> bool {
        self.auth_lines()
            .iter()
            .any(|line| line.trim() == RPSL_MNTNER_AUTH_INTERNAL)
    }

    /// Replace every `auth:` line with a single fresh BCRYPT-PW hash of
    /// `password`. Used when a maintainer submitted with dummy auth
    /// values and exactly one password, per spec.md §4.3 step 5.
    pub fn force_single_new_password(&mut self, password: &str) {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .unwrap_or_else(|_| String::new());
        self.parsed_data
            .insert("auth".to_string(), vec![format!("BCRYPT-PW {hash}")]);
    }

    /// Verify the maintainer's own credentials against a set of
    /// candidate passwords and, for PGP auth lines, a key-cert PK.
    /// API keys are never accepted here — they only ever authenticate
    /// *other* object classes via `mnt-by`, never the mntner itself.
    pub fn verify_auth(&self, passwords: &[String], keycert_pk: Option<&str>) -> bool {
        for line in self.auth_lines() {
            let line = line.trim();
            if let Some(hash) = line.strip_prefix("BCRYPT-PW ") {
                if passwords
                    .iter()
                    .any(|pw| bcrypt::verify(pw, hash.trim()).unwrap_or(false))
                {
                    return true;
                }
            } else if let Some(hash) = line.strip_prefix("MD5-PW ") {
                if passwords
                    .iter()
                    .any(|pw| pwhash::md5_crypt::verify(pw, hash.trim()))
                {
                    return true;
                }
            } else if let Some(rest) = line.strip_prefix("PGPKEY-") {
                if let Some(pk) = keycert_pk {
                    let candidate = pk.strip_prefix("PGPKEY-").unwrap_or(pk);
                    if rest.trim() == candidate.trim() {
                        return true;
                    }
                }
            }
            // RPSL_MNTNER_AUTH_INTERNAL and unrecognised auth schemes
            // never match a submitted password directly.
        }
        false
    }
}

impl RpslObject for MntnerObject {
    fn object_class(&self) -> &ObjectClass {
        &ObjectClass::Mntner
    }

    fn pk(&self) -> &str {
        &self.pk
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn parsed_data(&self) -> &HashMap<String, Vec<String>> {
        &self.parsed_data
    }

    fn referred_strong_objects(&self) -> &[StrongReference] {
        &self.referred_strong
    }

    fn references_strong_inbound(&self) -> &[InboundReference] {
        &self.references_strong_inbound
    }

    fn pk_asn_segment(&self) -> Option<&str> {
        None
    }

    fn prefix(&self) -> Option<IpNet> {
        None
    }
}
