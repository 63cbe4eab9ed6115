//! Change requests and the reduced suspension-request variant that can
//! share a `preload` call with them.

use super::object::RpslObjectHandle;

/// The kind of mutation a [`ChangeRequest`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Modify,
    Delete,
}

/// Stable identifier for a request within a batch, so a caller can
/// correlate results without relying on positional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeRequestId(pub u64);

/// One submitted change, as handed to the core by the (out of scope)
/// parser: a request type plus the submitted object and, for
/// MODIFY/DELETE, the object as currently stored.
#[derive(Debug, Clone)]
pub struct ChangeRequest {
    pub id: ChangeRequestId,
    pub request_type: RequestType,
    pub rpsl_obj_new: RpslObjectHandle,
    pub rpsl_obj_current: Option<RpslObjectHandle>,
}

impl ChangeRequest {
    pub fn new(
        id: ChangeRequestId,
        request_type: RequestType,
        rpsl_obj_new: RpslObjectHandle,
        rpsl_obj_current: Option<RpslObjectHandle>,
    ) -> Self {
        Self {
            id,
            request_type,
            rpsl_obj_new,
            rpsl_obj_current,
        }
    }
}

/// The kind of mutation a [`SuspensionRequest`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionRequestType {
    Suspend,
    Reactivate,
}

/// A maintainer suspension or reactivation. Carries no references of
/// its own; it exists so `ReferenceValidator::preload` can accept a
/// mixed batch of ordinary changes and suspensions with one call.
#[derive(Debug, Clone)]
pub struct SuspensionRequest {
    pub id: ChangeRequestId,
    pub request_type: SuspensionRequestType,
    pub mntner_pk: String,
    pub mntner_source: String,
}

impl SuspensionRequest {
    pub fn new(
        id: ChangeRequestId,
        request_type: SuspensionRequestType,
        mntner_pk: impl Into<String>,
        mntner_source: impl Into<String>,
    ) -> Self {
        Self {
            id,
            request_type,
            mntner_pk: mntner_pk.into(),
            mntner_source: mntner_source.into(),
        }
    }
}

/// Either shape `ReferenceValidator::preload` can be handed, mirroring
/// `Union[ChangeRequest, SuspensionRequest]` in the source this crate
/// was modeled on.
#[derive(Debug, Clone)]
pub enum PreloadEntry {
    Change(ChangeRequest),
    Suspension(SuspensionRequest),
}

impl From<ChangeRequest> for PreloadEntry {
    fn from(value: ChangeRequest) -> Self {
        Self::Change(value)
    }
}

impl From<SuspensionRequest> for PreloadEntry {
    fn from(value: SuspensionRequest) -> Self {
        Self::Suspension(value)
    }
}
