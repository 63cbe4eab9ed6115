//! Configuration surface the validators consume (spec.md §6).
//!
//! Loading configuration from a file is the daemon's job and out of
//! scope here; this is a plain struct an embedder populates.

use std::collections::HashMap;

use crate::rpsl::ObjectClass;

/// Per-set-class mode for related aut-num authentication
/// (spec.md §4.3 "Related-object lookup for sets"), matching
/// `RPSLSetAutnumAuthenticationMode` in the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpslSetAutnumAuthMode {
    /// No related aut-num lookup is performed.
    Disabled,
    /// A related aut-num's maintainers authenticate if the aut-num
    /// exists; its absence is not an error.
    Opportunistic,
    /// A related aut-num must exist and its maintainers authenticate;
    /// absence is an error.
    Required,
}

impl RpslSetAutnumAuthMode {
    /// Resolve the *default* mode for a given set object class, absent
    /// any configured override. All set classes default to
    /// `Opportunistic`, matching the original's default configuration.
    /// Embedders that need per-class overrides should go through
    /// [`ValidatorConfig::set_auth_mode_for`] rather than this resolver.
    pub fn for_set_name(class: &ObjectClass) -> Self {
        if class.is_set_class() {
            Self::Opportunistic
        } else {
            Self::Disabled
        }
    }
}

/// Configuration consumed by [`crate::auth::AuthValidator`].
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Legacy MD5-crypt hash of the administrative override secret, if
    /// one is configured. `None` means overrides are never accepted.
    pub override_password: Option<String>,
    /// Whether CREATE of a route/route6 also requires authentication
    /// against the covering inetnum/inet6num (or less-specific
    /// route/route6), per spec.md §4.3.
    pub authenticate_parents_route_creation: bool,
    /// Per-set-class override of [`RpslSetAutnumAuthMode`], keyed by
    /// the class's RPSL keyword (e.g. `"as-set"`). A class absent from
    /// this map falls back to [`RpslSetAutnumAuthMode::for_set_name`]'s
    /// default. This is what makes `Required` reachable at all: without
    /// an override every set class defaults to `Opportunistic`.
    pub set_auth_modes: HashMap<String, RpslSetAutnumAuthMode>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            override_password: None,
            authenticate_parents_route_creation: true,
            set_auth_modes: HashMap::new(),
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override_password(mut self, hash: impl Into<String>) -> Self {
        self.override_password = Some(hash.into());
        self
    }

    pub fn with_authenticate_parents_route_creation(mut self, enabled: bool) -> Self {
        self.authenticate_parents_route_creation = enabled;
        self
    }

    /// Override the related-aut-num authentication mode for one set
    /// class, e.g. `with_set_auth_mode(ObjectClass::AsSet, RpslSetAutnumAuthMode::Required)`.
    pub fn with_set_auth_mode(mut self, class: ObjectClass, mode: RpslSetAutnumAuthMode) -> Self {
        self.set_auth_modes.insert(class.as_str().to_string(), mode);
        self
    }

    /// Resolve the mode for a set class, applying any configured
    /// override before falling back to [`RpslSetAutnumAuthMode::for_set_name`].
    pub fn set_auth_mode_for(&self, class: &ObjectClass) -> RpslSetAutnumAuthMode {
        self.set_auth_modes
            .get(class.as_str())
            .copied()
            .unwrap_or_else(|| RpslSetAutnumAuthMode::for_set_name(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_defaults() {
        let config = ValidatorConfig::default();
        assert!(config.override_password.is_none());
        assert!(config.authenticate_parents_route_creation);
    }

    #[test]
    fn set_auth_mode_disabled_for_non_set_classes() {
        assert_eq!(
            RpslSetAutnumAuthMode::for_set_name(&ObjectClass::Route),
            RpslSetAutnumAuthMode::Disabled
        );
        assert_eq!(
            RpslSetAutnumAuthMode::for_set_name(&ObjectClass::AsSet),
            RpslSetAutnumAuthMode::Opportunistic
        );
    }

    #[test]
    fn set_auth_mode_for_falls_back_to_default_without_override() {
        let config = ValidatorConfig::new();
        assert_eq!(
            config.set_auth_mode_for(&ObjectClass::AsSet),
            RpslSetAutnumAuthMode::Opportunistic
        );
    }

    #[test]
    fn set_auth_mode_for_honours_configured_override() {
        let config = ValidatorConfig::new()
            .with_set_auth_mode(ObjectClass::AsSet, RpslSetAutnumAuthMode::Required);
        assert_eq!(
            config.set_auth_mode_for(&ObjectClass::AsSet),
            RpslSetAutnumAuthMode::Required
        );
        // Other set classes are unaffected by an override scoped to as-set.
        assert_eq!(
            config.set_auth_mode_for(&ObjectClass::RouteSet),
            RpslSetAutnumAuthMode::Opportunistic
        );
    }
}
