//! Reference integrity checking (spec.md §4.2).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::db::{RpslDatabase, RpslObjectQuery};
use crate::error::Result;
use crate::result::ValidatorResult;
use crate::rpsl::{ObjectClass, PreloadEntry, RequestType, RpslObject};

/// `(object_class, pk, source)` — the unit every overlay and cache in
/// this validator tracks.
type ObjectKey = (ObjectClass, String, String);

/// Validates outgoing strong references ("this route references
/// maintainer X") and, on delete, incoming references ("nothing still
/// points at me"), with a batch-local overlay over the database.
pub struct ReferenceValidator {
    database: Arc<dyn RpslDatabase>,
    cache: Mutex<HashSet<ObjectKey>>,
    preloaded_new: Mutex<HashSet<ObjectKey>>,
    preloaded_deleted: Mutex<HashSet<ObjectKey>>,
}

impl ReferenceValidator {
    pub fn new(database: Arc<dyn RpslDatabase>) -> Self {
        Self {
            database,
            cache: Mutex::new(HashSet::new()),
            preloaded_new: Mutex::new(HashSet::new()),
            preloaded_deleted: Mutex::new(HashSet::new()),
        }
    }

    /// Reset both batch overlays, then register every entry's
    /// new/current state. Must be called once per batch before any
    /// `check_*` call. Suspension requests carry no references of
    /// their own and contribute nothing to either overlay.
    pub fn preload(&self, entries: &[PreloadEntry]) {
        let mut preloaded_new = self.preloaded_new.lock().unwrap();
        let mut preloaded_deleted = self.preloaded_deleted.lock().unwrap();
        preloaded_new.clear();
        preloaded_deleted.clear();

        for entry in entries {
            let PreloadEntry::Change(request) = entry else {
                continue;
            };
            let key = (
                request.rpsl_obj_new.object_class().clone(),
                request.rpsl_obj_new.pk().to_string(),
                request.rpsl_obj_new.source().to_string(),
            );
            match request.request_type {
                RequestType::Delete => {
                    preloaded_deleted.insert(key);
                }
                RequestType::Create | RequestType::Modify => {
                    preloaded_new.insert(key);
                }
            }
        }
    }

    /// Check every strong reference `obj` carries resolves in the
    /// database, the batch's new/modified set, or the in-memory cache.
    pub async fn check_references_to_others(
        &self,
        obj: &dyn RpslObject,
    ) -> Result<ValidatorResult> {
        let mut result = ValidatorResult::new();
        let source = obj.source();

        for reference in obj.referred_strong_objects() {
            for pk in &reference.referenced_pks {
                if !self
                    .check_reference_to_others(&reference.allowed_classes, pk, source)
                    .await?
                {
                    let objects_referred_str = if reference.allowed_classes.len() > 1 {
                        format!(
                            "one of {}",
                            reference
                                .allowed_classes
                                .iter()
                                .map(|c| c.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        )
                    } else {
                        reference.allowed_classes[0].as_str().to_string()
                    };
                    result.error_messages.add(format!(
                        "Object {pk} referenced in field {} not found in database {source} - \
                         must reference {objects_referred_str}.",
                        reference.field_name
                    ));
                }
            }
        }
        Ok(result)
    }

    async fn check_reference_to_others(
        &self,
        object_classes: &[ObjectClass],
        object_pk: &str,
        source: &str,
    ) -> Result<bool> {
        {
            let cache = self.cache.lock().unwrap();
            let preloaded_new = self.preloaded_new.lock().unwrap();
            let preloaded_deleted = self.preloaded_deleted.lock().unwrap();
            for class in object_classes {
                let key = (class.clone(), object_pk.to_string(), source.to_string());
                if cache.contains(&key) {
                    return Ok(true);
                }
                if preloaded_new.contains(&key) {
                    return Ok(true);
                }
                if preloaded_deleted.contains(&key) {
                    return Ok(false);
                }
            }
        }

        let query = RpslObjectQuery::new()
            .sources([source])
            .object_classes(object_classes.iter().map(ObjectClass::as_str))
            .rpsl_pk(object_pk);
        let rows = self.database.find_objects(query).await?;

        let mut cache = self.cache.lock().unwrap();
        for row in &rows {
            cache.insert((
                ObjectClass::parse(&row.object_class),
                object_pk.to_string(),
                source.to_string(),
            ));
        }
        Ok(!rows.is_empty())
    }

    /// Check that nothing still references `obj`, for a delete. Only
    /// meaningful when `obj.references_strong_inbound()` is non-empty.
    pub async fn check_references_from_others(
        &self,
        obj: &dyn RpslObject,
    ) -> Result<ValidatorResult> {
        let mut result = ValidatorResult::new();
        if obj.references_strong_inbound().is_empty() {
            return Ok(result);
        }

        let mut query = RpslObjectQuery::new().sources([obj.source()]);
        for inbound in obj.references_strong_inbound() {
            query = query.lookup_attrs_in(inbound.object_class.as_str(), inbound.attribute.clone(), obj.pk());
        }
        let rows = self.database.find_objects(query).await?;

        let preloaded_deleted = self.preloaded_deleted.lock().unwrap();
        for row in rows {
            let referring_key = (
                ObjectClass::parse(&row.object_class),
                row.rpsl_pk.clone(),
                row.source.clone(),
            );
            if !preloaded_deleted.contains(&referring_key) {
                result.error_messages.add(format!(
                    "Object {} to be deleted, but still referenced by {} {}",
                    obj.pk(),
                    row.object_class,
                    row.rpsl_pk
                ));
            }
        }
        Ok(result)
    }
}
