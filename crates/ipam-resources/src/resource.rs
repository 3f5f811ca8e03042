//! The contract shared by every resource type.
//!
//! A resource is a typed record of one server collection. Records decode from
//! server data or caller parameters with unknown keys ignored, and encode back
//! to parameters with every reference reduced to its id under one canonical key.

use crate::reference::ReferenceField;
use crate::Result;
use async_trait::async_trait;
use ipam_api::Connection;
use ipam_core::{Collection, Error, ParamValue, Params, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// CRUD and parameter mapping for one collection.
#[async_trait]
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the records live in.
    const COLLECTION: Collection;

    /// Reference fields of the record.
    const REFERENCES: &'static [ReferenceField] = &[];

    /// Identifier path that lists every record.
    const LIST_PATH: &'static [&'static str] = &[];

    /// Server-assigned id, absent before creation.
    fn id(&self) -> Option<u64>;

    /// The id, or an error for a record that was never created.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error when the record has no id.
    fn require_id(&self) -> Result<u64> {
        self.id().ok_or_else(|| {
            Error::InvalidRequest(format!("{} record has not been created", Self::COLLECTION))
        })
    }

    /// Decodes a record from a JSON object. Alias keys are folded into their
    /// canonical key first.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the value is not an object or a field cannot be decoded.
    fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::ParseError(format!(
                "{} record is not a JSON object",
                Self::COLLECTION
            )));
        };
        canonicalize_aliases(&mut map, Self::REFERENCES);
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Decodes a record from request parameters.
    ///
    /// # Errors
    ///
    /// Returns a parse error if a field cannot be decoded.
    fn from_params(params: Params) -> Result<Self> {
        let params = Self::transform_references(params);
        Self::from_value(Value::Object(params.to_json_map()))
    }

    /// Encodes every set field as parameters.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the record does not encode to an object.
    fn to_params(&self) -> Result<Params> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(Params::from(map)),
            _ => Err(Error::ParseError(format!(
                "{} record did not encode to an object",
                Self::COLLECTION
            ))),
        }
    }

    /// Replaces typed references in `params` by their ids under the canonical key.
    #[must_use]
    fn transform_references(params: Params) -> Params {
        transform_references(params, Self::REFERENCES)
    }

    /// Identifier path and parameters of the delete call.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error when the record has no id.
    fn delete_request(&self) -> Result<(Vec<String>, Params)> {
        let id = self.require_id()?;
        Ok((Vec::new(), Params::new().with(Self::COLLECTION.id_key(), id)))
    }

    /// Every record of the collection; empty when the server returns no data.
    ///
    /// # Errors
    ///
    /// Returns the call error or a parse error.
    async fn get_all(conn: &Connection) -> Result<Vec<Self>> {
        fetch_list(conn, Self::COLLECTION, Self::LIST_PATH).await
    }

    /// One record by id.
    ///
    /// # Errors
    ///
    /// Returns a request error if the record does not exist.
    async fn get_by_id(conn: &Connection, id: u64) -> Result<Self> {
        let id = id.to_string();
        let response = conn
            .call("get", Self::COLLECTION.name(), &[id.as_str()], &Params::new())
            .await?;
        decode_one(response)
    }

    /// Creates a record, then fetches it by the id the server returns.
    ///
    /// # Errors
    ///
    /// Returns a request error if the server rejects the record or omits its id.
    async fn create(conn: &Connection, params: Params) -> Result<Self> {
        let params = Self::transform_references(params);
        let response = conn
            .call("post", Self::COLLECTION.name(), &[], &params)
            .await?;
        let id = created_id(response)?;
        Self::get_by_id(conn, id).await
    }

    /// Merges `params` into the record and pushes every field.
    ///
    /// # Errors
    ///
    /// Returns the call error, or a parse error if the merged fields do not decode.
    async fn update(&mut self, conn: &Connection, params: Params) -> Result<bool> {
        let mut changes = Self::transform_references(params);
        fold_param_aliases(&mut changes, Self::REFERENCES);
        let mut merged = self.to_params()?;
        merged.merge(changes);
        *self = Self::from_params(merged)?;

        let response = conn
            .call("patch", Self::COLLECTION.name(), &[], &self.to_params()?)
            .await?;
        Ok(response.is_success())
    }

    /// Deletes the record.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for a record without id.
    async fn delete(&self, conn: &Connection) -> Result<bool> {
        let (identifiers, params) = self.delete_request()?;
        let identifiers: Vec<&str> = identifiers.iter().map(String::as_str).collect();
        let response = conn
            .call("delete", Self::COLLECTION.name(), &identifiers, &params)
            .await?;
        Ok(response.is_success())
    }
}

/// Calls `GET` on a path and decodes a list of records.
///
/// # Errors
///
/// Returns the call error or a parse error.
pub async fn fetch_list<T: Resource>(
    conn: &Connection,
    collection: Collection,
    identifiers: &[&str],
) -> Result<Vec<T>> {
    let response = conn
        .call("get", collection.name(), identifiers, &Params::new())
        .await?;
    decode_list(response.into_data())
}

/// Calls `GET` on a path and returns the raw payload.
///
/// # Errors
///
/// Returns the call error.
pub async fn fetch_data(
    conn: &Connection,
    collection: Collection,
    identifiers: &[&str],
) -> Result<Option<Value>> {
    let response = conn
        .call("get", collection.name(), identifiers, &Params::new())
        .await?;
    Ok(response.into_data())
}

/// Decodes list data. `null`, `[]` and other empty payloads yield an empty list.
///
/// # Errors
///
/// Returns a parse error if an entry cannot be decoded.
pub fn decode_list<T: Resource>(data: Option<Value>) -> Result<Vec<T>> {
    let items = match data {
        None | Some(Value::Null | Value::Bool(false)) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) if !map.is_empty() && map.values().all(Value::is_object) => {
            map.into_iter().map(|(_, item)| item).collect()
        }
        Some(Value::Object(map)) if map.is_empty() => Vec::new(),
        Some(other) => vec![other],
    };

    let records = items
        .into_iter()
        .map(T::from_value)
        .collect::<Result<Vec<_>>>()?;
    debug!(collection = %T::COLLECTION, count = records.len(), "decoded records");
    Ok(records)
}

/// Decodes a single record; a response without data is a request error.
///
/// # Errors
///
/// Returns a request error when the data is empty and a parse error when it
/// cannot be decoded.
pub fn decode_one<T: Resource>(response: Response) -> Result<T> {
    let data = match response.data() {
        Some(Value::Array(items)) => items.first().cloned(),
        Some(value) => Some(value.clone()),
        None => None,
    };
    match data {
        Some(value) => T::from_value(value),
        None => Err(Error::request_with_message(
            response,
            format!("{} record not found", T::COLLECTION),
        )),
    }
}

/// Id of a freshly created record, read from the envelope.
///
/// # Errors
///
/// Returns a request error when the server did not send an id.
pub fn created_id(response: Response) -> Result<u64> {
    match response.id() {
        Some(id) => Ok(id),
        None => Err(Error::request_with_message(
            response,
            "create response carries no id",
        )),
    }
}

/// Folds alias keys into their canonical key. An existing canonical key wins.
pub fn canonicalize_aliases(map: &mut Map<String, Value>, references: &[ReferenceField]) {
    for field in references {
        let mut canonical = map.remove(field.key);
        for alias in field.aliases {
            if let Some(value) = map.remove(*alias) {
                if canonical.is_none() {
                    canonical = Some(value);
                }
            }
        }
        if let Some(value) = canonical {
            map.insert(field.key.to_string(), value);
        }
    }
}

/// Moves parameters given under an alias to the canonical key, so they replace
/// the stored value on merge. An existing canonical key wins.
pub fn fold_param_aliases(params: &mut Params, references: &[ReferenceField]) {
    for field in references {
        for alias in field.aliases {
            if let Some(value) = params.remove(alias) {
                if !params.contains_key(field.key) {
                    params.insert_param(field.key, value);
                }
            }
        }
    }
}

/// Replaces typed references by their ids under the canonical key.
///
/// For each declared field the canonical key, then each alias, is checked. The
/// first key holding a reference of the declared collection is replaced by the
/// id under the canonical key and the alias is dropped. Anything else is left as-is.
#[must_use]
pub fn transform_references(mut params: Params, references: &[ReferenceField]) -> Params {
    for field in references {
        for key in field.keys() {
            let replacement = match params.get(key) {
                Some(ParamValue::Ref(reference)) if reference.collection == field.target => {
                    Some(Value::from(reference.id))
                }
                Some(ParamValue::RefList(list))
                    if list.iter().all(|r| r.collection == field.target) =>
                {
                    Some(Value::Array(list.iter().map(|r| Value::from(r.id)).collect()))
                }
                _ => None,
            };
            if let Some(value) = replacement {
                params.remove(key);
                params.insert(field.key, value);
                break;
            }
        }
    }
    params
}
