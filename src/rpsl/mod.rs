//! The RPSL object and change-request data model (spec §3).
//!
//! Parsing RPSL text is out of scope; this module only defines the
//! capability surface and value types the validators in
//! [`crate::reference`], [`crate::auth`] and [`crate::rules`] consume.

mod change_request;
mod mntner;
mod object;

pub use change_request::{
    ChangeRequest, ChangeRequestId, PreloadEntry, RequestType, SuspensionRequest,
    SuspensionRequestType,
};
pub use mntner::{MntnerObject, RPSL_MNTNER_AUTH_DUMMY_VALUE, RPSL_MNTNER_AUTH_INTERNAL};
pub use object::{
    GenericRpslObject, InboundReference, ObjectClass, RpslObject, RpslObjectHandle,
    StrongReference,
};
