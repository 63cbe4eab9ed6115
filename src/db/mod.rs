//! External interfaces the validators read from (spec.md §6).
//!
//! The storage backend internals are out of scope; this module defines
//! only the query and session capability traits an embedder supplies a
//! real backend for. A SQLite-backed test double lives in
//! [`sqlite`] behind `#[cfg(test)]` / the `test-support` feature.

mod query;
#[cfg(any(test, feature = "test-support"))]
pub mod sqlite;

pub use query::{RpslObjectQuery, RpslRow};

use async_trait::async_trait;

use crate::credentials::Origin;
use crate::error::Result;

/// Query capability against the live RPSL object table.
#[async_trait]
pub trait RpslDatabase: Send + Sync {
    async fn find_objects(&self, query: RpslObjectQuery) -> Result<Vec<RpslRow>>;
}

/// Query capability against the suspended-objects view
/// (spec.md §4.4 rule 1). Same row shape, different backing table.
#[async_trait]
pub trait SuspendedDatabase: Send + Sync {
    async fn find_objects(&self, query: RpslObjectQuery) -> Result<Vec<RpslRow>>;
}

/// Whether a maintainer PK/source is linked into the internal
/// auth/user tables ("migrated", spec.md Glossary).
#[derive(Debug, Clone)]
pub struct AuthMntnerRecord {
    pub rpsl_mntner_pk: String,
    pub rpsl_mntner_source: String,
}

/// A matched API token, plus the scope check `AuthValidator` must run
/// before accepting it.
#[derive(Debug, Clone)]
pub struct AuthApiTokenRecord {
    pub token: String,
    pub mntner_pk: String,
    pub mntner_source: String,
    allowed_origins: Vec<Origin>,
    allowed_ip_prefix: Option<ipnet::IpNet>,
}

impl AuthApiTokenRecord {
    pub fn new(
        token: impl Into<String>,
        mntner_pk: impl Into<String>,
        mntner_source: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            mntner_pk: mntner_pk.into(),
            mntner_source: mntner_source.into(),
            allowed_origins: Vec::new(),
            allowed_ip_prefix: None,
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<Origin>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_allowed_ip_prefix(mut self, prefix: ipnet::IpNet) -> Self {
        self.allowed_ip_prefix = Some(prefix);
        self
    }

    /// Whether this token is usable from the given origin/remote IP.
    /// An empty origin allow-list matches any origin; an unset IP
    /// prefix matches any (or absent) remote IP.
    pub fn valid_for(&self, origin: Option<Origin>, remote_ip: Option<std::net::IpAddr>) -> bool {
        let origin_ok = self.allowed_origins.is_empty()
            || origin.is_some_and(|o| self.allowed_origins.contains(&o));
        let ip_ok = match self.allowed_ip_prefix {
            None => true,
            Some(prefix) => remote_ip.is_some_and(|ip| prefix.contains(&ip)),
        };
        origin_ok && ip_ok
    }
}

/// Session capability for the auth-model tables (spec.md §6).
#[async_trait]
pub trait AuthSession: Send + Sync {
    async fn find_mntner_auth(&self, pk: &str, source: &str) -> Result<Option<AuthMntnerRecord>>;

    /// All stored tokens for `mntner_pk`/`mntner_source` whose token
    /// string matches one of `candidates`. A mntner can hold several
    /// tokens; the caller must try every match against `valid_for`
    /// rather than stopping at the first one returned, since an
    /// out-of-scope token can otherwise mask a legitimate in-scope one.
    async fn find_api_tokens(
        &self,
        candidates: &[String],
        mntner_pk: &str,
        mntner_source: &str,
    ) -> Result<Vec<AuthApiTokenRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_token_valid_for_empty_allow_list_matches_anything() {
        let token = AuthApiTokenRecord::new("tok", "TEST-MNT", "TEST");
        assert!(token.valid_for(None, None));
        assert!(token.valid_for(Some(Origin::Api), None));
    }

    #[test]
    fn api_token_valid_for_rejects_wrong_origin() {
        let token = AuthApiTokenRecord::new("tok", "TEST-MNT", "TEST")
            .with_allowed_origins(vec![Origin::Api]);
        assert!(token.valid_for(Some(Origin::Api), None));
        assert!(!token.valid_for(Some(Origin::Email), None));
    }

    #[test]
    fn api_token_valid_for_checks_ip_prefix() {
        let prefix: ipnet::IpNet = "192.0.2.0/24".parse().unwrap();
        let token = AuthApiTokenRecord::new("tok", "TEST-MNT", "TEST")
            .with_allowed_ip_prefix(prefix);

        let inside: std::net::IpAddr = "192.0.2.5".parse().unwrap();
        let outside: std::net::IpAddr = "198.51.100.5".parse().unwrap();

        assert!(token.valid_for(None, Some(inside)));
        assert!(!token.valid_for(None, Some(outside)));
        assert!(!token.valid_for(None, None));
    }
}
