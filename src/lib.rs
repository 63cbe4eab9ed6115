//! # irrd-change-validator
//!
//! The authoritative change validation core for an RPSL routing
//! registry daemon: given a batch of submitted RPSL objects plus
//! credentials, decide per object whether it may be created, modified,
//! or deleted, and produce structured per-object results.
//!
//! Three validators cooperate, all threading a single
//! [`ValidatorResult`] value:
//!
//! - [`reference::ReferenceValidator`] — outgoing/incoming strong
//!   reference integrity, with a batch-local overlay over the database.
//! - [`auth::AuthValidator`] — per-object authentication: resolving
//!   maintainers, verifying auth methods, identifying notifiable
//!   maintainers.
//! - [`rules::RulesValidator`] — suspended-PK collisions and
//!   migrated-maintainer consistency.
//!
//! [`batch::BatchValidator`] composes all three for an entire submitted
//! batch. Embedders that need finer control over ordering can drive the
//! three validators directly instead.
//!
//! RPSL lexical parsing, the storage backend, and daemon lifecycle are
//! out of scope (see `spec.md` §1) — this crate depends only on the
//! capability traits in [`rpsl`] and [`db`], which an embedder
//! implements against its own parser and database.

pub mod auth;
pub mod batch;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod reference;
pub mod result;
pub mod rpsl;
pub mod rules;

pub use auth::AuthValidator;
pub use batch::BatchValidator;
pub use config::{RpslSetAutnumAuthMode, ValidatorConfig};
pub use credentials::{Credentials, InternalAuthenticatedUser, MntnerRef, Origin};
pub use db::{
    AuthApiTokenRecord, AuthMntnerRecord, AuthSession, RpslDatabase, RpslObjectQuery, RpslRow,
    SuspendedDatabase,
};
pub use error::{Result, ValidatorError};
pub use reference::ReferenceValidator;
pub use result::{OrderedMessageSet, ValidatorResult};
pub use rpsl::{
    ChangeRequest, ChangeRequestId, GenericRpslObject, InboundReference, MntnerObject,
    ObjectClass, PreloadEntry, RequestType, RpslObject, RpslObjectHandle, StrongReference,
    SuspensionRequest, SuspensionRequestType, RPSL_MNTNER_AUTH_DUMMY_VALUE,
    RPSL_MNTNER_AUTH_INTERNAL,
};
pub use rules::RulesValidator;
