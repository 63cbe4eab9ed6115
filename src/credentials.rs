//! The credentials bundle supplied alongside a batch (spec.md §3) and
//! the submission-origin enum it carries.

use std::net::IpAddr;

/// Where a change submission originated. Gates API-token scope checks
/// via `AuthApiTokenRecord::valid_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Email,
    WebSubmit,
    Api,
    Other,
}

/// A maintainer PK/source pair, as recorded in an
/// [`InternalAuthenticatedUser`]'s maintainer sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MntnerRef {
    pub pk: String,
    pub source: String,
}

impl MntnerRef {
    pub fn new(pk: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            source: source.into(),
        }
    }
}

/// A snapshot of the authenticated internal user, if the submitter is
/// logged in through IRRd's own user/auth tables rather than
/// presenting per-object passwords.
///
/// Treated as immutable for the lifetime of a batch (spec.md §9):
/// mutations to the user record during a batch must not retroactively
/// affect in-flight results.
#[derive(Debug, Clone, Default)]
pub struct InternalAuthenticatedUser {
    /// Whether this user carries administrative override privilege.
    pub has_override: bool,
    /// Maintainers this user may act on behalf of.
    pub mntners: Vec<MntnerRef>,
    /// The subset of `mntners` usable to alter the maintainer object
    /// itself (higher privilege, per spec.md §4.3's internal-auth
    /// linkage rule).
    pub mntners_user_management: Vec<MntnerRef>,
}

impl InternalAuthenticatedUser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manages(&self, pk: &str, source: &str) -> bool {
        self.mntners.iter().any(|m| m.pk == pk && m.source == source)
    }

    pub fn manages_user_management(&self, pk: &str, source: &str) -> bool {
        self.mntners_user_management
            .iter()
            .any(|m| m.pk == pk && m.source == source)
    }
}

/// Per-batch credentials presented by the submitter.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub passwords: Vec<String>,
    pub overrides: Vec<String>,
    pub api_keys: Vec<String>,
    pub keycert_obj_pk: Option<String>,
    pub internal_authenticated_user: Option<InternalAuthenticatedUser>,
    pub origin: Option<Origin>,
    pub remote_ip: Option<IpAddr>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passwords(mut self, passwords: Vec<String>) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn with_overrides(mut self, overrides: Vec<String>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_api_keys(mut self, api_keys: Vec<String>) -> Self {
        self.api_keys = api_keys;
        self
    }

    pub fn with_keycert_obj_pk(mut self, pk: impl Into<String>) -> Self {
        self.keycert_obj_pk = Some(pk.into());
        self
    }

    pub fn with_internal_authenticated_user(mut self, user: InternalAuthenticatedUser) -> Self {
        self.internal_authenticated_user = Some(user);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_remote_ip(mut self, ip: IpAddr) -> Self {
        self.remote_ip = Some(ip);
        self
    }
}
