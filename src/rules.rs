//! Object-class-specific business rules (spec.md §4.4): suspended-PK
//! collisions and migrated-maintainer consistency.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::{AuthSession, RpslObjectQuery, SuspendedDatabase};
use crate::error::Result;
use crate::result::ValidatorResult;
use crate::rpsl::{ObjectClass, RequestType, RpslObjectHandle, RPSL_MNTNER_AUTH_INTERNAL};
use crate::rpsl::RpslObject;

/// Validates anything that is not authentication, references, RPKI, or
/// scope filter (those last two compose at a higher level and are out
/// of scope for this core).
pub struct RulesValidator {
    suspended_database: Arc<dyn SuspendedDatabase>,
    auth_session: Arc<dyn AuthSession>,
    suspended_cache: Mutex<HashMap<(String, String), bool>>,
    migrated_cache: Mutex<HashMap<(String, String), bool>>,
}

impl RulesValidator {
    pub fn new(suspended_database: Arc<dyn SuspendedDatabase>, auth_session: Arc<dyn AuthSession>) -> Self {
        Self {
            suspended_database,
            auth_session,
            suspended_cache: Mutex::new(HashMap::new()),
            migrated_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn validate(
        &self,
        obj: &RpslObjectHandle,
        request_type: RequestType,
    ) -> Result<ValidatorResult> {
        let mut result = ValidatorResult::new();

        if request_type == RequestType::Create
            && *obj.object_class() == ObjectClass::Mntner
            && self
                .check_suspended_mntner_with_same_pk(obj.pk(), obj.source())
                .await?
        {
            result.error_messages.add(format!(
                "A suspended mntner with primary key {} already exists for {}",
                obj.pk(),
                obj.source()
            ));
        }

        if let RpslObjectHandle::Mntner(mntner) = obj {
            let is_migrated = self.check_mntner_migrated(&mntner.pk, &mntner.source).await?;
            let has_internal_auth = mntner.has_internal_auth();
            if is_migrated && !has_internal_auth {
                result.error_messages.add(format!(
                    "This maintainer is migrated and must include the {RPSL_MNTNER_AUTH_INTERNAL} method."
                ));
            } else if !is_migrated && has_internal_auth {
                result.error_messages.add(format!(
                    "This maintainer is not migrated, and therefore can not use the \
                     {RPSL_MNTNER_AUTH_INTERNAL} method."
                ));
            }
        }

        Ok(result)
    }

    async fn check_suspended_mntner_with_same_pk(&self, pk: &str, source: &str) -> Result<bool> {
        let key = (pk.to_string(), source.to_string());
        if let Some(cached) = self.suspended_cache.lock().unwrap().get(&key) {
            return Ok(*cached);
        }

        let query = RpslObjectQuery::new()
            .object_classes(["mntner"])
            .rpsl_pk(pk)
            .sources([source])
            .first_only();
        let rows = self.suspended_database.find_objects(query).await?;
        let found = !rows.is_empty();

        self.suspended_cache.lock().unwrap().insert(key, found);
        Ok(found)
    }

    async fn check_mntner_migrated(&self, pk: &str, source: &str) -> Result<bool> {
        let key = (pk.to_string(), source.to_string());
        if let Some(cached) = self.migrated_cache.lock().unwrap().get(&key) {
            return Ok(*cached);
        }

        let found = self.auth_session.find_mntner_auth(pk, source).await?.is_some();

        self.migrated_cache.lock().unwrap().insert(key, found);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::SqliteTestDatabase;
    use crate::db::RpslRow;
    use crate::rpsl::MntnerObject;
    use std::collections::HashMap as StdHashMap;

    fn rules(db: SqliteTestDatabase) -> RulesValidator {
        let db = Arc::new(db);
        RulesValidator::new(db.clone(), db)
    }

    #[tokio::test]
    async fn suspended_collision_blocks_mntner_create() {
        let db = SqliteTestDatabase::new();
        db.insert_suspended_object(&RpslRow {
            object_class: "mntner".to_string(),
            rpsl_pk: "TEST-MNT".to_string(),
            source: "TEST".to_string(),
            object_text: String::new(),
            parsed_data: StdHashMap::new(),
        })
        .unwrap();
        let rules = rules(db);

        let obj = RpslObjectHandle::from(MntnerObject::new("TEST-MNT", "TEST"));
        let result = rules.validate(&obj, RequestType::Create).await.unwrap();
        assert!(!result.is_valid());
        assert!(result.error_messages.iter().any(|m| m.contains("suspended mntner")));
    }

    #[tokio::test]
    async fn migrated_mntner_without_sentinel_errors() {
        let db = SqliteTestDatabase::new();
        db.insert_auth_mntner("MIG-MNT", "TEST").unwrap();
        let rules = rules(db);

        let obj = RpslObjectHandle::from(MntnerObject::new("MIG-MNT", "TEST"));
        let result = rules.validate(&obj, RequestType::Modify).await.unwrap();
        assert!(!result.is_valid());
        assert!(result
            .error_messages
            .iter()
            .any(|m| m.contains(RPSL_MNTNER_AUTH_INTERNAL)));
    }

    #[tokio::test]
    async fn non_migrated_mntner_with_sentinel_errors() {
        let db = SqliteTestDatabase::new();
        let rules = rules(db);

        let obj = RpslObjectHandle::from(
            MntnerObject::new("TEST-MNT", "TEST").with_auth_lines(vec![RPSL_MNTNER_AUTH_INTERNAL.to_string()]),
        );
        let result = rules.validate(&obj, RequestType::Modify).await.unwrap();
        assert!(!result.is_valid());
    }

    #[tokio::test]
    async fn migrated_mntner_with_sentinel_is_consistent() {
        let db = SqliteTestDatabase::new();
        db.insert_auth_mntner("MIG-MNT", "TEST").unwrap();
        let rules = rules(db);

        let obj = RpslObjectHandle::from(
            MntnerObject::new("MIG-MNT", "TEST").with_auth_lines(vec![RPSL_MNTNER_AUTH_INTERNAL.to_string()]),
        );
        let result = rules.validate(&obj, RequestType::Modify).await.unwrap();
        assert!(result.is_valid());
    }
}
