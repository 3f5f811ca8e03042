//! Reference fields.
//!
//! A reference field holds either the raw id of another resource or the
//! resolved resource itself. [`Ref::resolve`] converts between the two; turning
//! an id into an object costs one lookup and is never cached.

use crate::lenient::value_to_u64;
use crate::resource::Resource;
use crate::Result;
use ipam_api::Connection;
use ipam_core::{Collection, Error, ResourceRef};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A reference declared by a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    /// Canonical key the id is sent under
    pub key: &'static str,
    /// Alternative keys callers may use
    pub aliases: &'static [&'static str],
    /// Collection of the referenced resource
    pub target: Collection,
}

impl ReferenceField {
    /// Declares a reference field.
    #[must_use]
    pub const fn new(
        key: &'static str,
        aliases: &'static [&'static str],
        target: Collection,
    ) -> Self {
        Self {
            key,
            aliases,
            target,
        }
    }

    /// The canonical key followed by the aliases, in lookup order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.key).chain(self.aliases.iter().copied())
    }
}

/// A raw id or a resolved resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Ref<T> {
    /// Only the id is known
    Unresolved(u64),
    /// The full record
    Resolved(Box<T>),
}

impl<T: Resource> Ref<T> {
    /// Id of the referenced resource.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Unresolved(id) => Some(*id),
            Self::Resolved(object) => object.id(),
        }
    }

    /// The resolved object, if held.
    #[must_use]
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Self::Resolved(object) => Some(object),
            Self::Unresolved(_) => None,
        }
    }

    /// Typed reference usable in request parameters.
    #[must_use]
    pub fn to_resource_ref(&self) -> Option<ResourceRef> {
        self.id().map(|id| ResourceRef::new(T::COLLECTION, id))
    }

    /// Resolves to an object or to an id.
    ///
    /// Without an explicit choice the connection's default for the target
    /// collection applies. An object is returned as-is in object mode; an id is
    /// looked up with one `get_by_id` call.
    ///
    /// # Errors
    ///
    /// Returns the lookup error, or an invalid request error when a resolved
    /// object without an id is asked for in id mode.
    pub async fn resolve(&self, conn: &Connection, as_object: Option<bool>) -> Result<Self> {
        let as_object = as_object.unwrap_or_else(|| conn.default_as_object(T::COLLECTION));
        match (self, as_object) {
            (Self::Resolved(_), true) => Ok(self.clone()),
            (Self::Unresolved(id), true) => Ok(Self::from(T::get_by_id(conn, *id).await?)),
            (Self::Unresolved(id), false) => Ok(Self::Unresolved(*id)),
            (Self::Resolved(object), false) => object.id().map(Self::Unresolved).ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "referenced {} has not been created",
                    T::COLLECTION
                ))
            }),
        }
    }
}

impl<T> From<T> for Ref<T> {
    fn from(object: T) -> Self {
        Self::Resolved(Box::new(object))
    }
}

/// Resolves an optional reference; an unset reference stays unset in either mode.
///
/// # Errors
///
/// See [`Ref::resolve`].
pub async fn resolve_reference<T: Resource>(
    value: Option<&Ref<T>>,
    conn: &Connection,
    as_object: Option<bool>,
) -> Result<Option<Ref<T>>> {
    match value {
        Some(reference) => Ok(Some(reference.resolve(conn, as_object).await?)),
        None => Ok(None),
    }
}

/// Resolves every reference in a list.
///
/// # Errors
///
/// See [`Ref::resolve`].
pub async fn resolve_references<T: Resource>(
    values: Option<&[Ref<T>]>,
    conn: &Connection,
    as_object: Option<bool>,
) -> Result<Vec<Ref<T>>> {
    let mut resolved = Vec::new();
    for reference in values.unwrap_or_default() {
        resolved.push(reference.resolve(conn, as_object).await?);
    }
    Ok(resolved)
}

impl<T: Resource> Serialize for Ref<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.id() {
            Some(id) => serializer.serialize_u64(id),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Resource> Deserialize<'de> for Ref<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ref_from_value(value)
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("reference is empty"))
    }
}

fn ref_from_value<T: Resource>(value: Value) -> std::result::Result<Option<Ref<T>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => T::from_value(Value::Object(map))
            .map(|object| Some(Ref::from(object)))
            .map_err(|e| e.to_string()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => match value_to_u64(&other) {
            Some(0) => Ok(None),
            Some(id) => Ok(Some(Ref::Unresolved(id))),
            None => Err(format!("invalid reference `{other}`")),
        },
    }
}

/// Deserialize an optional reference; `null`, `0` and `""` mean unset.
pub fn deserialize_ref<'de, D, T>(deserializer: D) -> std::result::Result<Option<Ref<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Resource,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        Some(value) => ref_from_value(value).map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// Deserialize a reference list sent as an array or a `;`-separated string.
pub fn deserialize_ref_list<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Option<Vec<Ref<T>>>, D::Error>
where
    D: Deserializer<'de>,
    T: Resource,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        None => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(Value::String(raw)) => raw
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        Some(other) => vec![other],
    };

    let mut references = Vec::with_capacity(items.len());
    for item in items {
        if let Some(reference) = ref_from_value(item).map_err(D::Error::custom)? {
            references.push(reference);
        }
    }
    Ok(Some(references))
}
