//! The typed entity model.
//!
//! Every synchronized record is a concrete struct implementing [`Entity`]:
//! identified by a string id, tagged with the remote collection it lives
//! in, and paired with a kind-restricted [`EntityPatch`] type so partial
//! updates can only touch fields the kind actually has.

use crate::error::{Error, Result};
use crate::gateway::Document;
use crate::EntityId;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Current wall-clock time as an ISO-8601 string with millisecond
/// precision, the timestamp format used throughout the data model.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A synchronized record.
///
/// Identity is defined solely by `id`; no other uniqueness constraint is
/// enforced on the client.
pub trait Entity:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The remote collection this kind lives in.
    const COLLECTION: &'static str;

    /// Singular noun used in audit action tags ("deal_created").
    const NOUN: &'static str;

    /// Partial update restricted to this kind's fields.
    type Patch: EntityPatch<Self>;

    /// The record id.
    fn id(&self) -> &str;

    /// Replace the record id (used when the server assigns one).
    fn set_id(&mut self, id: EntityId);

    /// Stamp both `created_at` and `updated_at`.
    fn stamp_created(&mut self, now: &str);

    /// Stamp `updated_at` only.
    fn stamp_updated(&mut self, now: &str);

    /// The minimized field subset recorded in the audit trail on create
    /// and delete. Deliberately not the full record.
    fn audit_summary(&self) -> Map<String, Value>;
}

/// A partial update for one entity kind.
///
/// Unset fields leave the target untouched; set fields overwrite. The
/// patch also decides what an `update` audit entry should say, given the
/// value it is about to replace.
pub trait EntityPatch<T>: std::fmt::Debug + Serialize + Send + Sync {
    /// Merge the set fields into `target`.
    fn apply(&self, target: &mut T);

    /// Stamp the patch's `updated_at`.
    fn stamp_updated(&mut self, now: &str);

    /// Audit details for this change: new values plus the previous values
    /// worth keeping for diffability.
    fn audit_delta(&self, previous: &T) -> Map<String, Value>;
}

/// Encode an entity as gateway payload. The id is carried by the document
/// envelope, never inside the payload.
pub fn to_payload<T: Entity>(entity: &T) -> Result<Value> {
    let mut value = serde_json::to_value(entity).map_err(|e| Error::InvalidDocument {
        id: entity.id().to_string(),
        reason: e.to_string(),
    })?;
    if let Some(object) = value.as_object_mut() {
        object.remove("id");
    }
    Ok(value)
}

/// Encode a patch as gateway payload.
pub fn patch_to_payload<T: Entity>(id: &str, patch: &T::Patch) -> Result<Value> {
    serde_json::to_value(patch).map_err(|e| Error::InvalidDocument {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a gateway document into an entity, injecting the envelope id.
pub fn from_document<T: Entity>(document: Document) -> Result<T> {
    let Document { id, mut data } = document;
    if let Some(object) = data.as_object_mut() {
        object.insert("id".to_string(), Value::String(id.clone()));
    }
    serde_json::from_value(data).map_err(|e| Error::InvalidDocument {
        id,
        reason: e.to_string(),
    })
}
