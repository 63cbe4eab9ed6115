//! Batch orchestration (SPEC_FULL.md §2 addition).
//!
//! The three validators are a library surface meant to be composed by
//! an external update handler; this module is a thin convenience that
//! fixes the one piece of control flow the bare validators leave
//! load-order-sensitive — see spec.md §9's Open Question.

use crate::auth::AuthValidator;
use crate::error::Result;
use crate::reference::ReferenceValidator;
use crate::result::ValidatorResult;
use crate::rpsl::{ChangeRequest, ChangeRequestId, MntnerObject, PreloadEntry, RequestType};
use crate::rules::RulesValidator;

/// Owns one instance of each validator for a single batch and
/// resolves requests in deterministic order.
pub struct BatchValidator {
    reference: ReferenceValidator,
    auth: AuthValidator,
    rules: RulesValidator,
}

impl BatchValidator {
    pub fn new(reference: ReferenceValidator, auth: AuthValidator, rules: RulesValidator) -> Self {
        Self { reference, auth, rules }
    }

    /// Validate every request in the batch, returning results keyed by
    /// the caller-supplied [`ChangeRequestId`].
    ///
    /// Preloads the reference overlay and pre-approves all new
    /// maintainers up front, then processes requests whose new object
    /// is a maintainer first: each mntner's own verification outcome
    /// is folded back into pre-approval before the remaining requests
    /// run, making the pre-approval/self-verification interaction
    /// deterministic rather than load-order-sensitive.
    pub async fn validate_batch(
        &self,
        mut requests: Vec<ChangeRequest>,
    ) -> Result<Vec<(ChangeRequestId, ValidatorResult)>> {
        let preload_entries: Vec<PreloadEntry> =
            requests.iter().cloned().map(PreloadEntry::from).collect();
        self.reference.preload(&preload_entries);

        let new_mntners: Vec<MntnerObject> = requests
            .iter()
            .filter(|r| r.rpsl_obj_current.is_none())
            .filter_map(|r| r.rpsl_obj_new.as_mntner().cloned())
            .collect();
        self.auth.pre_approve(&new_mntners);

        requests.sort_by_key(|r| !r.rpsl_obj_new.is_mntner());
        let mntner_prefix_len = requests.iter().take_while(|r| r.rpsl_obj_new.is_mntner()).count();

        let mut results = Vec::with_capacity(requests.len());
        let mut verified_mntners: Vec<MntnerObject> = Vec::new();

        for (index, mut request) in requests.into_iter().enumerate() {
            if index == mntner_prefix_len {
                // Every mntner-creating request has now run its own
                // verification; only those that actually passed stay
                // pre-approved for the rest of the batch.
                self.auth.pre_approve(&verified_mntners);
            }

            let mut result = ValidatorResult::new();
            result.merge(
                self.reference
                    .check_references_to_others(&request.rpsl_obj_new)
                    .await?,
            );
            if request.request_type == RequestType::Delete {
                result.merge(
                    self.reference
                        .check_references_from_others(&request.rpsl_obj_new)
                        .await?,
                );
            }

            let auth_result = self
                .auth
                .process_auth(&mut request.rpsl_obj_new, request.rpsl_obj_current.as_ref())
                .await?;
            let mntner_verified = auth_result.is_valid();
            result.merge(auth_result);

            result.merge(
                self.rules
                    .validate(&request.rpsl_obj_new, request.request_type)
                    .await?,
            );

            if request.rpsl_obj_current.is_none() && mntner_verified {
                if let Some(mntner) = request.rpsl_obj_new.as_mntner() {
                    verified_mntners.push(mntner.clone());
                }
            }

            results.push((request.id, result));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::credentials::Credentials;
    use crate::db::sqlite::SqliteTestDatabase;
    use crate::rpsl::{GenericRpslObject, MntnerObject, ObjectClass};
    use std::sync::Arc;

    fn batch_validator(db: SqliteTestDatabase, credentials: Credentials) -> BatchValidator {
        let db = Arc::new(db);
        let reference = ReferenceValidator::new(db.clone());
        let auth = AuthValidator::new(db.clone(), db.clone(), ValidatorConfig::new(), credentials);
        let rules = RulesValidator::new(db.clone(), db);
        BatchValidator::new(reference, auth, rules)
    }

    #[tokio::test]
    async fn batch_pre_approval_of_new_maintainer_and_its_route() {
        let db = SqliteTestDatabase::new();
        let credentials = Credentials::new().with_overrides(vec!["anything".to_string()]);
        let mut config = ValidatorConfig::new();
        config.override_password = Some("$1$placeholder$ignoredbecausenotset".to_string());
        // Use override via internal user instead, which doesn't need a configured hash.
        let credentials = Credentials::new()
            .with_internal_authenticated_user(crate::credentials::InternalAuthenticatedUser {
                has_override: true,
                ..Default::default()
            });
        let batch = batch_validator(db, credentials);

        let new_mntner = MntnerObject::new("NEW-MNT", "TEST")
            .with_auth_lines(vec!["DUMMY-VALUE".to_string()]);
        let route = GenericRpslObject::new(ObjectClass::Route, "192.0.2.0/24", "TEST")
            .with_attribute("mnt-by", vec!["NEW-MNT".to_string()])
            .with_strong_reference("mnt-by", vec![ObjectClass::Mntner], vec!["NEW-MNT".to_string()]);

        let requests = vec![
            ChangeRequest::new(ChangeRequestId(1), RequestType::Create, new_mntner.into(), None),
            ChangeRequest::new(ChangeRequestId(2), RequestType::Create, route.into(), None),
        ];

        let results = batch.validate_batch(requests).await.unwrap();
        assert_eq!(results.len(), 2);
        for (_, result) in &results {
            assert!(result.is_valid(), "{:?}", result.error_messages);
            assert!(result.used_override);
        }
    }

    #[tokio::test]
    async fn delete_with_inbound_reference_outside_batch_fails() {
        let db = SqliteTestDatabase::new();
        db.insert_object(&crate::db::RpslRow {
            object_class: "mntner".to_string(),
            rpsl_pk: "X".to_string(),
            source: "TEST".to_string(),
            object_text: String::new(),
            parsed_data: [("admin-c".to_string(), vec!["JOE".to_string()])].into(),
        })
        .unwrap();
        let credentials = Credentials::new()
            .with_internal_authenticated_user(crate::credentials::InternalAuthenticatedUser {
                has_override: true,
                ..Default::default()
            });
        let batch = batch_validator(db, credentials);

        let joe = GenericRpslObject::new(ObjectClass::Person, "JOE", "TEST")
            .with_inbound_reference(ObjectClass::Mntner, "admin-c");
        let requests = vec![ChangeRequest::new(
            ChangeRequestId(1),
            RequestType::Delete,
            joe.into(),
            None,
        )];

        let results = batch.validate_batch(requests).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].1.is_valid());
    }
}
