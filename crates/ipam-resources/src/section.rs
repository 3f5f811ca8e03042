//! Sections group subnets and carry their permissions.

use crate::lenient;
use crate::reference::{deserialize_ref, resolve_reference, Ref, ReferenceField};
use crate::resource::{decode_one, fetch_data, fetch_list, Resource};
use crate::subnet::Subnet;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::{Collection, Error, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A section record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub id: Option<u64>,
    /// Section name, unique on the server.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub name: Option<String>,
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    /// Parent section.
    #[serde(
        rename = "masterSection",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub master_section: Option<Ref<Section>>,
    /// Group permissions, as the JSON text the server stores.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub permissions: Option<String>,
    /// Whether overlapping subnets are rejected.
    #[serde(
        rename = "strictMode",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub strict_mode: Option<bool>,
    /// Subnet ordering rule.
    #[serde(
        rename = "subnetOrdering",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub subnet_ordering: Option<String>,
    /// Display order.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub order: Option<u64>,
    /// Last modification time.
    #[serde(
        rename = "editDate",
        default,
        skip_serializing_if = "Option::is_none",
        with = "lenient::timestamp"
    )]
    pub edit_date: Option<NaiveDateTime>,
    /// Show VLANs in the subnet list.
    #[serde(
        rename = "showVLAN",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub show_vlan: Option<bool>,
    /// Show VRFs in the subnet list.
    #[serde(
        rename = "showVRF",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub show_vrf: Option<bool>,
    /// Show only supernets.
    #[serde(
        rename = "showSupernetOnly",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub show_supernet_only: Option<bool>,
    /// Nameserver set.
    #[serde(
        rename = "DNS",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub dns: Option<String>,
}

#[async_trait]
impl Resource for Section {
    const COLLECTION: Collection = Collection::Sections;
    const REFERENCES: &'static [ReferenceField] = &[ReferenceField::new(
        "masterSection",
        &["masterSectionId", "masterSectionID"],
        Collection::Sections,
    )];

    fn id(&self) -> Option<u64> {
        self.id
    }

    /// Creates a section. A `name` is required; when the server returns no id the
    /// new section is looked up by name.
    async fn create(conn: &Connection, params: Params) -> Result<Self> {
        let Some(name) = params.get("name").map(|v| v.to_value()) else {
            return Err(Error::InvalidRequest(
                "Name is not given. Provide at least a name for the section.".to_string(),
            ));
        };

        let params = Self::transform_references(params);
        let response = conn.call("post", Self::COLLECTION.name(), &[], &params).await?;

        match response.id() {
            Some(id) => Self::get_by_id(conn, id).await,
            None => {
                let name = name
                    .as_str()
                    .map_or_else(|| name.to_string(), str::to_string);
                debug!(%name, "section created without id, looking it up by name");
                Self::get_by_name(conn, &name).await
            }
        }
    }
}

impl Section {
    /// Looks a section up by its name.
    ///
    /// # Errors
    ///
    /// Returns a request error if no section has that name.
    pub async fn get_by_name(conn: &Connection, name: &str) -> Result<Self> {
        let response = conn
            .call("get", Self::COLLECTION.name(), &[name], &Params::new())
            .await?;
        decode_one(response)
    }

    /// Custom field definitions of the collection.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn custom_fields(conn: &Connection) -> Result<Option<Value>> {
        fetch_data(conn, Self::COLLECTION, &["custom_fields"]).await
    }

    /// Subnets in this section.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved section.
    pub async fn subnets(&self, conn: &Connection) -> Result<Vec<Subnet>> {
        let id = self.require_id()?.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "subnets"]).await
    }

    /// Parent section as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn master_section(
        &self,
        conn: &Connection,
        as_object: Option<bool>,
    ) -> Result<Option<Ref<Section>>> {
        resolve_reference(self.master_section.as_ref(), conn, as_object).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{connect, sent};
    use ipam_api::testing::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn decodes_server_record() {
        let section = Section::from_value(json!({
            "id": "1",
            "name": "Customers",
            "description": "Section for customers",
            "masterSection": "0",
            "permissions": "{\"3\":\"1\",\"2\":\"2\"}",
            "strictMode": "1",
            "subnetOrdering": null,
            "order": null,
            "editDate": null,
            "showVLAN": "0",
            "showVRF": "0",
            "showSupernetOnly": "0",
            "DNS": null
        }))
        .unwrap();

        assert_eq!(section.id, Some(1));
        assert!(section.master_section.is_none());
        assert_eq!(section.strict_mode, Some(true));
        assert_eq!(section.show_vlan, Some(false));
    }

    #[test]
    fn master_section_aliases_fold_into_canonical_key() {
        let section = Section::from_params(Params::new().with("masterSectionId", 4)).unwrap();
        assert_eq!(section.master_section, Some(Ref::Unresolved(4)));

        let params = section.to_params().unwrap();
        assert_eq!(params.to_json_map().get("masterSection"), Some(&json!(4)));
        assert!(!params.contains_key("masterSectionId"));
    }

    #[tokio::test]
    async fn create_requires_name() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;

        let err = Section::create(&conn, Params::new().with("description", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(sent(&transport).is_empty());
    }

    #[tokio::test]
    async fn create_without_id_looks_up_by_name() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!(null))
            .push_data(json!({"id": "8", "name": "Lab"}));

        let section = Section::create(&conn, Params::new().with("name", "Lab"))
            .await
            .unwrap();
        assert_eq!(section.id, Some(8));
        assert_eq!(
            sent(&transport),
            vec!["POST /api/test/sections/", "GET /api/test/sections/Lab/"]
        );
    }

    #[tokio::test]
    async fn subnets_and_custom_fields() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!([{"id": "7", "subnet": "10.0.0.0", "mask": "8", "sectionId": "2"}]))
            .push_data(json!({"custom_field": {"type": "varchar(255)"}}));

        let section = Section {
            id: Some(2),
            ..Section::default()
        };
        let subnets = section.subnets(&conn).await.unwrap();
        assert_eq!(subnets.len(), 1);
        assert_eq!(subnets[0].section_id.as_ref().and_then(Ref::id), Some(2));

        let fields = Section::custom_fields(&conn).await.unwrap();
        assert!(fields.unwrap().get("custom_field").is_some());

        assert_eq!(
            sent(&transport),
            vec![
                "GET /api/test/sections/2/subnets/",
                "GET /api/test/sections/custom_fields/"
            ]
        );
    }

    #[tokio::test]
    async fn master_section_resolution_modes() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport.push_data(json!({"id": "1", "name": "Root"}));

        let child = Section {
            id: Some(2),
            master_section: Some(Ref::Unresolved(1)),
            ..Section::default()
        };

        let as_id = child.master_section(&conn, Some(false)).await.unwrap();
        assert_eq!(as_id, Some(Ref::Unresolved(1)));
        assert!(sent(&transport).is_empty());

        let as_object = child.master_section(&conn, None).await.unwrap().unwrap();
        assert_eq!(as_object.as_object().unwrap().name.as_deref(), Some("Root"));
        assert_eq!(sent(&transport), vec!["GET /api/test/sections/1/"]);

        let orphan = Section::default();
        assert!(orphan.master_section(&conn, Some(true)).await.unwrap().is_none());
    }
}
