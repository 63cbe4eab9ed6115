//! Per-object authentication (spec.md §4.3) — resolving maintainers,
//! verifying auth methods, and identifying notifiable maintainers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::config::{RpslSetAutnumAuthMode, ValidatorConfig};
use crate::credentials::Credentials;
use crate::db::{AuthSession, RpslDatabase, RpslObjectQuery, RpslRow};
use crate::error::Result;
use crate::result::ValidatorResult;
use crate::rpsl::{MntnerObject, ObjectClass, RpslObject, RpslObjectHandle};

/// Decides, per object, whether the submitter is authorised, and which
/// maintainers should be notified.
///
/// When adding a mntner in an update, a check for that mntner in the
/// database will fail, as it does not exist yet — call [`pre_approve`]
/// with the batch's new maintainers first.
///
/// [`pre_approve`]: AuthValidator::pre_approve
pub struct AuthValidator {
    database: Arc<dyn RpslDatabase>,
    auth_session: Arc<dyn AuthSession>,
    config: ValidatorConfig,
    credentials: Credentials,
    pre_approved: Mutex<HashSet<String>>,
    mntner_db_cache: Mutex<HashMap<(String, String), MntnerObject>>,
    related_route_cache: Mutex<HashMap<String, Option<RpslRow>>>,
    related_set_cache: Mutex<HashMap<(String, String), Option<RpslRow>>>,
}

impl AuthValidator {
    pub fn new(
        database: Arc<dyn RpslDatabase>,
        auth_session: Arc<dyn AuthSession>,
        config: ValidatorConfig,
        credentials: Credentials,
    ) -> Self {
        Self {
            database,
            auth_session,
            config,
            credentials,
            pre_approved: Mutex::new(HashSet::new()),
            mntner_db_cache: Mutex::new(HashMap::new()),
            related_route_cache: Mutex::new(HashMap::new()),
            related_set_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Record PKs of maintainers being created in this batch. Their
    /// presence as `mnt-by` on sibling objects is treated as passing
    /// authentication, since a database lookup would fail. The new
    /// maintainer object's own `mnt-by` still runs the normal check.
    pub fn pre_approve(&self, presumed_valid_new_mntners: &[MntnerObject]) {
        let mut pre_approved = self.pre_approved.lock().unwrap();
        *pre_approved = presumed_valid_new_mntners.iter().map(|m| m.pk.clone()).collect();
    }

    /// Step 1 of [`process_auth`](Self::process_auth), split out for
    /// reuse: an internally-authenticated override user, or a
    /// configured `auth.override_password` verified against a
    /// supplied override secret.
    pub fn check_override(&self) -> bool {
        if let Some(user) = &self.credentials.internal_authenticated_user {
            if user.has_override {
                tracing::info!("authenticated by valid override from internally authenticated user");
                return true;
            }
        }

        match &self.config.override_password {
            Some(hash) if !hash.starts_with("$1$") => {
                tracing::error!("auth.override_password is not a valid md5-crypt hash, ignoring");
                false
            }
            Some(hash) => {
                for candidate in &self.credentials.overrides {
                    if pwhash::md5_crypt::verify(candidate, hash) {
                        return true;
                    }
                    tracing::info!("found invalid override password, ignoring");
                }
                false
            }
            None => {
                if !self.credentials.overrides.is_empty() {
                    tracing::info!("ignoring override password, auth.override_password not set");
                }
                false
            }
        }
    }

    /// The main entry point: decide whether `obj_new` (and, on
    /// modify, `obj_current`) is authorised. `obj_new` is taken
    /// mutably because dummy-auth substitution rewrites its `auth:`
    /// lines in place.
    pub async fn process_auth(
        &self,
        obj_new: &mut RpslObjectHandle,
        obj_current: Option<&RpslObjectHandle>,
    ) -> Result<ValidatorResult> {
        let mut result = ValidatorResult::new();

        if self.check_override() {
            result.used_override = true;
            return Ok(result);
        }

        let source = obj_new.source().to_string();
        let mntners_new: Vec<String> = obj_new.mnt_by().to_vec();
        tracing::debug!(object = obj_new.pk(), mntners = ?mntners_new, "checking auth for new object");
        let (valid, mntner_objs_new) = self.check_mntners(obj_new, &mntners_new, &source).await?;
        if !valid {
            generate_failure_message(&mut result, &mntners_new, obj_new, None);
        }

        if let Some(current) = obj_current {
            let mntners_current: Vec<String> = current.mnt_by().to_vec();
            tracing::debug!(object = current.pk(), mntners = ?mntners_current, "checking auth for current object");
            let (valid, mntner_objs_current) =
                self.check_mntners(obj_new, &mntners_current, &source).await?;
            if !valid {
                generate_failure_message(&mut result, &mntners_current, obj_new, None);
            }
            result.mntners_notify = mntner_objs_current;
        } else {
            result.mntners_notify = mntner_objs_new;
            if let Some((related_class, related_pk, related_mntners)) =
                self.find_related_mntners(obj_new, &mut result).await?
            {
                tracing::debug!(
                    %related_class,
                    %related_pk,
                    mntners = ?related_mntners,
                    "checking auth for related object"
                );
                let (valid, mntner_objs_related) =
                    self.check_mntners(obj_new, &related_mntners, &source).await?;
                if !valid {
                    generate_failure_message(
                        &mut result,
                        &related_mntners,
                        obj_new,
                        Some((related_class.as_str(), related_pk.as_str())),
                    );
                    result.mntners_notify = mntner_objs_related;
                }
            }
        }

        if obj_new.is_mntner() {
            if obj_current.is_none() {
                result
                    .error_messages
                    .add("New mntner objects must be added by an administrator.".to_string());
                return Ok(result);
            }

            let has_dummy = obj_new.as_mntner().is_some_and(MntnerObject::has_dummy_auth_value);
            if has_dummy {
                if self.credentials.passwords.len() == 1 {
                    let password = self.credentials.passwords[0].clone();
                    tracing::debug!(
                        object = obj_new.pk(),
                        "submitted with dummy hash values and single password, replacing hashes"
                    );
                    if let Some(mntner) = obj_new.as_mntner_mut() {
                        mntner.force_single_new_password(&password);
                    }
                    result.info_messages.add(
                        "As you submitted dummy hash values, all password hashes on this object were \
                         replaced with a new BCRYPT-PW hash of the password you provided for \
                         authentication."
                            .to_string(),
                    );
                } else {
                    result.error_messages.add(
                        "Object submitted with dummy hash values, but multiple or no passwords \
                         submitted. Either submit only full hashes, or a single password."
                            .to_string(),
                    );
                }
            } else {
                let pk = obj_new.pk().to_string();
                let verifies_directly = obj_new
                    .as_mntner()
                    .is_some_and(|m| m.verify_auth(&self.credentials.passwords, self.credentials.keycert_obj_pk.as_deref()));
                let matches_internal = self.mntner_matches_internal_auth(obj_new, &pk, &source);
                if !(verifies_directly || matches_internal) {
                    result
                        .error_messages
                        .add("Authorisation failed for the auth methods on this mntner object.".to_string());
                }
            }
        }

        Ok(result)
    }

    /// Whether at least one of `mntner_pk_list` authenticates, given
    /// the credentials bundle. Returns the list of maintainer objects
    /// that were loadable, regardless of which one actually
    /// authenticated — used to populate `mntners_notify`.
    async fn check_mntners(
        &self,
        obj_new: &RpslObjectHandle,
        mntner_pk_list: &[String],
        source: &str,
    ) -> Result<(bool, Vec<MntnerObject>)> {
        let pk_set: HashSet<&str> = mntner_pk_list.iter().map(String::as_str).collect();

        let mut mntner_objs: Vec<MntnerObject> = Vec::new();
        let mut to_resolve: Vec<String> = Vec::new();
        {
            let cache = self.mntner_db_cache.lock().unwrap();
            for pk in &pk_set {
                if let Some(mntner) = cache.get(&(pk.to_string(), source.to_string())) {
                    mntner_objs.push(mntner.clone());
                } else {
                    to_resolve.push(pk.to_string());
                }
            }
        }

        if !to_resolve.is_empty() {
            let query = RpslObjectQuery::new()
                .sources([source])
                .object_classes(["mntner"])
                .rpsl_pks(to_resolve.iter().cloned());
            let rows = self.database.find_objects(query).await?;

            let mut cache = self.mntner_db_cache.lock().unwrap();
            for row in rows {
                let mntner = MntnerObject {
                    pk: row.rpsl_pk.clone(),
                    source: row.source.clone(),
                    parsed_data: row.parsed_data.clone(),
                    referred_strong: Vec::new(),
                    references_strong_inbound: Vec::new(),
                };
                cache.insert((mntner.pk.clone(), mntner.source.clone()), mntner.clone());
                mntner_objs.push(mntner);
            }
        }

        for mntner_name in mntner_pk_list {
            let pre_approved = self.pre_approved.lock().unwrap().contains(mntner_name.as_str());
            if pre_approved
                || self.mntner_matches_internal_auth(obj_new, mntner_name, source)
                || self.mntner_matches_api_key(obj_new, mntner_name, source).await?
            {
                return Ok((true, mntner_objs));
            }
        }

        for mntner in &mntner_objs {
            if mntner.verify_auth(&self.credentials.passwords, self.credentials.keycert_obj_pk.as_deref()) {
                return Ok((true, mntner_objs));
            }
        }

        Ok((false, mntner_objs))
    }

    fn mntner_matches_internal_auth(&self, obj_new: &RpslObjectHandle, pk: &str, source: &str) -> bool {
        let Some(user) = &self.credentials.internal_authenticated_user else {
            return false;
        };
        let matches = if obj_new.pk() == pk && obj_new.source() == source {
            user.manages_user_management(pk, source)
        } else {
            user.manages(pk, source)
        };
        if matches {
            tracing::info!(mntner = pk, "authenticated through internally authenticated user");
        }
        matches
    }

    async fn mntner_matches_api_key(
        &self,
        obj_new: &RpslObjectHandle,
        pk: &str,
        source: &str,
    ) -> Result<bool> {
        if self.credentials.api_keys.is_empty() || obj_new.is_mntner() {
            return Ok(false);
        }
        let tokens = self
            .auth_session
            .find_api_tokens(&self.credentials.api_keys, pk, source)
            .await?;
        // A mntner can hold several matching tokens; an out-of-scope
        // one must not mask an in-scope one, so try every match.
        for token in &tokens {
            if token.valid_for(self.credentials.origin, self.credentials.remote_ip) {
                tracing::info!(mntner = pk, token = %token.token, "authenticated through API token");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Find the related object to `obj_new`, if any: the covering
    /// inetnum/inet6num for routes, or the matching aut-num for set
    /// classes.
    async fn find_related_mntners(
        &self,
        obj_new: &RpslObjectHandle,
        result: &mut ValidatorResult,
    ) -> Result<Option<(String, String, Vec<String>)>> {
        let related_row = if obj_new.object_class().is_route_class() {
            self.find_related_object_route(obj_new).await?
        } else if obj_new.object_class().is_set_class() {
            self.find_related_object_set(obj_new, result).await?
        } else {
            None
        };

        Ok(related_row.map(|row| {
            let mntners = row.parsed_data.get("mnt-by").cloned().unwrap_or_default();
            (row.object_class, row.rpsl_pk, mntners)
        }))
    }

    async fn find_related_object_route(&self, obj_new: &RpslObjectHandle) -> Result<Option<RpslRow>> {
        if !self.config.authenticate_parents_route_creation {
            return Ok(None);
        }
        let Some(prefix) = obj_new.prefix() else {
            return Ok(None);
        };
        let cache_key = prefix.to_string();
        if let Some(cached) = self.related_route_cache.lock().unwrap().get(&cache_key) {
            return Ok(cached.clone());
        }

        let inetnum_class = match obj_new.object_class() {
            ObjectClass::Route => "inetnum",
            ObjectClass::Route6 => "inet6num",
            _ => return Ok(None),
        };

        let query = RpslObjectQuery::new()
            .sources([obj_new.source()])
            .object_classes([inetnum_class])
            .ip_exact(prefix)
            .first_only();
        let mut rows = self.database.find_objects(query).await?;

        if rows.is_empty() {
            let query = RpslObjectQuery::new()
                .sources([obj_new.source()])
                .object_classes([inetnum_class])
                .ip_less_specific_one_level(prefix)
                .first_only();
            rows = self.database.find_objects(query).await?;
        }

        let found = if !rows.is_empty() {
            rows.into_iter().next()
        } else {
            let query = RpslObjectQuery::new()
                .sources([obj_new.source()])
                .object_classes([obj_new.object_class().as_str()])
                .ip_less_specific_one_level(prefix)
                .first_only();
            self.database.find_objects(query).await?.into_iter().next()
        };

        self.related_route_cache
            .lock()
            .unwrap()
            .insert(cache_key, found.clone());
        Ok(found)
    }

    async fn find_related_object_set(
        &self,
        obj_new: &RpslObjectHandle,
        result: &mut ValidatorResult,
    ) -> Result<Option<RpslRow>> {
        let Some(asn_segment) = obj_new.pk_asn_segment() else {
            return Ok(None);
        };
        let mode = self.config.set_auth_mode_for(obj_new.object_class());
        if mode == RpslSetAutnumAuthMode::Disabled {
            return Ok(None);
        }

        let cache_key = (asn_segment.to_string(), obj_new.source().to_string());
        if let Some(cached) = self.related_set_cache.lock().unwrap().get(&cache_key) {
            return Ok(cached.clone());
        }

        let query = RpslObjectQuery::new()
            .sources([obj_new.source()])
            .object_classes(["aut-num"])
            .rpsl_pk(asn_segment)
            .first_only();
        let rows = self.database.find_objects(query).await?;
        let found = rows.into_iter().next();

        if found.is_none() && mode == RpslSetAutnumAuthMode::Required {
            result.error_messages.add(format!(
                "Creating this object requires an aut-num for {asn_segment} to exist."
            ));
        }

        self.related_set_cache
            .lock()
            .unwrap()
            .insert(cache_key, found.clone());
        Ok(found)
    }
}

fn generate_failure_message(
    result: &mut ValidatorResult,
    failed_mntner_list: &[String],
    obj_new: &RpslObjectHandle,
    related: Option<(&str, &str)>,
) {
    let mntner_str = failed_mntner_list.join(", ");
    let mut msg = format!(
        "Authorisation for {} {} failed: must be authenticated by one of: {mntner_str}",
        obj_new.object_class(),
        obj_new.pk(),
    );
    if let Some((class, pk)) = related {
        msg.push_str(&format!(" - from parent {class} {pk}"));
    }
    result.error_messages.add(msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{InternalAuthenticatedUser, MntnerRef};
    use crate::db::sqlite::SqliteTestDatabase;
    use crate::rpsl::GenericRpslObject;

    fn validator(db: SqliteTestDatabase, credentials: Credentials, config: ValidatorConfig) -> AuthValidator {
        let db = Arc::new(db);
        AuthValidator::new(db.clone(), db, config, credentials)
    }

    #[tokio::test]
    async fn override_via_internal_user_skips_all_other_checks() {
        let db = SqliteTestDatabase::new();
        let credentials = Credentials::new().with_internal_authenticated_user(InternalAuthenticatedUser {
            has_override: true,
            ..Default::default()
        });
        let auth = validator(db, credentials, ValidatorConfig::new());

        let mut obj = RpslObjectHandle::from(
            GenericRpslObject::new(ObjectClass::Route, "192.0.2.0/24", "TEST")
                .with_attribute("mnt-by", vec!["NOBODY-MNT".to_string()]),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(result.is_valid());
        assert!(result.used_override);
        assert!(result.mntners_notify.is_empty());
    }

    #[tokio::test]
    async fn pre_approved_mntner_passes_without_database_lookup() {
        let db = SqliteTestDatabase::new();
        let auth = validator(db, Credentials::new(), ValidatorConfig::new());
        auth.pre_approve(&[MntnerObject::new("NEW-MNT", "TEST")]);

        let mut obj = RpslObjectHandle::from(
            GenericRpslObject::new(ObjectClass::Route, "192.0.2.0/24", "TEST")
                .with_attribute("mnt-by", vec!["NEW-MNT".to_string()]),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn new_mntner_without_override_requires_administrator() {
        let db = SqliteTestDatabase::new();
        let credentials = Credentials::new().with_passwords(vec!["hunter2".to_string()]);
        let auth = validator(db, credentials, ValidatorConfig::new());
        auth.pre_approve(&[MntnerObject::new("NEW-MNT", "TEST")]);

        let mut obj = RpslObjectHandle::from(
            MntnerObject::new("NEW-MNT", "TEST")
                .with_auth_lines(vec![format!(
                    "BCRYPT-PW {}",
                    bcrypt::hash("hunter2", bcrypt::DEFAULT_COST).unwrap()
                )])
                .with_attribute("mnt-by", vec!["NEW-MNT".to_string()]),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(!result.is_valid());
        assert!(result
            .error_messages
            .iter()
            .any(|m| m.contains("must be added by an administrator")));
    }

    #[tokio::test]
    async fn dummy_hash_with_single_password_is_replaced() {
        let db = SqliteTestDatabase::new();
        let credentials = Credentials::new().with_passwords(vec!["hunter2".to_string()]);
        let auth = validator(db, credentials, ValidatorConfig::new());
        auth.pre_approve(&[MntnerObject::new("TEST-MNT", "TEST")]);

        let current = RpslObjectHandle::from(
            MntnerObject::new("TEST-MNT", "TEST")
                .with_auth_lines(vec!["DUMMY-VALUE".to_string()])
                .with_attribute("mnt-by", vec!["TEST-MNT".to_string()]),
        );
        let mut new_obj = RpslObjectHandle::from(
            MntnerObject::new("TEST-MNT", "TEST")
                .with_auth_lines(vec!["DUMMY-VALUE".to_string()])
                .with_attribute("mnt-by", vec!["TEST-MNT".to_string()]),
        );

        let result = auth.process_auth(&mut new_obj, Some(&current)).await.unwrap();
        assert!(result.is_valid());
        assert!(result.info_messages.iter().any(|m| m.contains("dummy hash values")));
        let mntner = new_obj.as_mntner().unwrap();
        assert!(!mntner.has_dummy_auth_value());
        assert!(mntner.verify_auth(&["hunter2".to_string()], None));
    }

    #[tokio::test]
    async fn api_key_scope_miss_is_not_authorised() {
        let db = SqliteTestDatabase::new();
        let record = crate::db::AuthApiTokenRecord::new("tok-123", "TEST-MNT", "TEST")
            .with_allowed_origins(vec![crate::credentials::Origin::Api]);
        db.insert_api_token(&record, &[crate::credentials::Origin::Api], None).unwrap();
        db.insert_object(&crate::db::RpslRow {
            object_class: "mntner".to_string(),
            rpsl_pk: "TEST-MNT".to_string(),
            source: "TEST".to_string(),
            object_text: String::new(),
            parsed_data: HashMap::new(),
        })
        .unwrap();

        let credentials = Credentials::new()
            .with_api_keys(vec!["tok-123".to_string()])
            .with_origin(crate::credentials::Origin::Email);
        let auth = validator(db, credentials, ValidatorConfig::new());

        let mut obj = RpslObjectHandle::from(
            GenericRpslObject::new(ObjectClass::Route, "192.0.2.0/24", "TEST")
                .with_attribute("mnt-by", vec!["TEST-MNT".to_string()]),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(!result.is_valid());
    }

    #[tokio::test]
    async fn second_in_scope_token_still_authenticates_after_an_out_of_scope_one() {
        let db = SqliteTestDatabase::new();
        db.insert_api_token(
            &crate::db::AuthApiTokenRecord::new("tok-out-of-scope", "TEST-MNT", "TEST"),
            &[crate::credentials::Origin::Email],
            None,
        )
        .unwrap();
        db.insert_api_token(
            &crate::db::AuthApiTokenRecord::new("tok-in-scope", "TEST-MNT", "TEST"),
            &[crate::credentials::Origin::Api],
            None,
        )
        .unwrap();
        db.insert_object(&crate::db::RpslRow {
            object_class: "mntner".to_string(),
            rpsl_pk: "TEST-MNT".to_string(),
            source: "TEST".to_string(),
            object_text: String::new(),
            parsed_data: HashMap::new(),
        })
        .unwrap();

        let credentials = Credentials::new()
            .with_api_keys(vec!["tok-out-of-scope".to_string(), "tok-in-scope".to_string()])
            .with_origin(crate::credentials::Origin::Api);
        let auth = validator(db, credentials, ValidatorConfig::new());

        let mut obj = RpslObjectHandle::from(
            GenericRpslObject::new(ObjectClass::Route, "192.0.2.0/24", "TEST")
                .with_attribute("mnt-by", vec!["TEST-MNT".to_string()]),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(result.is_valid(), "{:?}", result.error_messages);
    }

    #[tokio::test]
    async fn internal_user_management_subset_required_for_self_edit() {
        let db = SqliteTestDatabase::new();
        let credentials = Credentials::new().with_internal_authenticated_user(InternalAuthenticatedUser {
            has_override: false,
            mntners: vec![MntnerRef::new("TEST-MNT", "TEST")],
            mntners_user_management: Vec::new(),
        });
        let auth = validator(db, credentials, ValidatorConfig::new());

        let current = RpslObjectHandle::from(
            MntnerObject::new("TEST-MNT", "TEST").with_attribute("mnt-by", vec!["TEST-MNT".to_string()]),
        );
        let mut new_obj = RpslObjectHandle::from(
            MntnerObject::new("TEST-MNT", "TEST").with_attribute("mnt-by", vec!["TEST-MNT".to_string()]),
        );
        let result = auth.process_auth(&mut new_obj, Some(&current)).await.unwrap();
        assert!(!result.is_valid());
    }

    #[tokio::test]
    async fn required_set_auth_mode_errors_when_aut_num_missing() {
        let db = SqliteTestDatabase::new();
        let config = ValidatorConfig::new()
            .with_set_auth_mode(ObjectClass::AsSet, RpslSetAutnumAuthMode::Required);
        let auth = validator(db, Credentials::new(), config);

        let mut obj = RpslObjectHandle::from(
            GenericRpslObject::new(ObjectClass::AsSet, "AS65000:AS-CUSTOMERS", "TEST")
                .with_attribute("mnt-by", vec!["TEST-MNT".to_string()])
                .with_pk_asn_segment("AS65000"),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(!result.is_valid());
        assert!(result
            .error_messages
            .iter()
            .any(|m| m.contains("requires an aut-num for AS65000 to exist")));
    }

    #[tokio::test]
    async fn opportunistic_set_auth_mode_does_not_error_when_aut_num_missing() {
        let db = SqliteTestDatabase::new();
        let auth = validator(db, Credentials::new(), ValidatorConfig::new());

        let mut obj = RpslObjectHandle::from(
            GenericRpslObject::new(ObjectClass::AsSet, "AS65000:AS-CUSTOMERS", "TEST")
                .with_attribute("mnt-by", vec!["TEST-MNT".to_string()])
                .with_pk_asn_segment("AS65000"),
        );
        let result = auth.process_auth(&mut obj, None).await.unwrap();
        assert!(!result
            .error_messages
            .iter()
            .any(|m| m.contains("requires an aut-num")));
    }
}
