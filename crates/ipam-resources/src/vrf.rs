//! VRFs.

use crate::lenient;
use crate::reference::{deserialize_ref_list, resolve_references, Ref, ReferenceField};
use crate::resource::{fetch_data, fetch_list, Resource};
use crate::section::Section;
use crate::subnet::Subnet;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::Collection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A VRF record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vrf {
    /// VRF id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub id: Option<u64>,
    /// Name.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub name: Option<String>,
    /// Route distinguisher.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub rd: Option<String>,
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    /// Sections the VRF is visible in.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref_list"
    )]
    pub sections: Option<Vec<Ref<Section>>>,
    /// Last modification time.
    #[serde(
        rename = "editDate",
        default,
        skip_serializing_if = "Option::is_none",
        with = "lenient::timestamp"
    )]
    pub edit_date: Option<NaiveDateTime>,
}

#[async_trait]
impl Resource for Vrf {
    const COLLECTION: Collection = Collection::Vrf;
    const REFERENCES: &'static [ReferenceField] =
        &[ReferenceField::new("sections", &[], Collection::Sections)];

    fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Vrf {
    /// Custom field definitions of the collection.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn custom_fields(conn: &Connection) -> Result<Option<Value>> {
        fetch_data(conn, Self::COLLECTION, &["custom_fields"]).await
    }

    /// Subnets routed in the VRF.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved VRF.
    pub async fn subnets(&self, conn: &Connection) -> Result<Vec<Subnet>> {
        let id = self.require_id()?.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "subnets"]).await
    }

    /// Sections as objects or ids.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error.
    pub async fn sections(&self, conn: &Connection, as_object: Option<bool>) -> Result<Vec<Ref<Section>>> {
        resolve_references(self.sections.as_deref(), conn, as_object).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{connect, sent};
    use ipam_api::testing::ScriptedTransport;
    use ipam_core::Params;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn decodes_server_record() {
        let vrf = Vrf::from_value(json!({
            "id": "3",
            "name": "customer-a",
            "rd": "65000:100",
            "description": "",
            "sections": ["1", "2"],
            "editDate": null
        }))
        .unwrap();
        assert_eq!(vrf.rd.as_deref(), Some("65000:100"));
        assert_eq!(vrf.sections.map(|s| s.len()), Some(2));
    }

    #[tokio::test]
    async fn list_and_subnets() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!([{"id": "3", "name": "customer-a"}]))
            .push_data(json!([{"id": "7", "vrfId": "3"}]))
            .push_data(json!(null));

        let vrfs = Vrf::get_all(&conn).await.unwrap();
        assert_eq!(vrfs.len(), 1);
        let subnets = vrfs[0].subnets(&conn).await.unwrap();
        assert_eq!(subnets[0].vrf_id.as_ref().and_then(Ref::id), Some(3));
        assert!(Vrf::custom_fields(&conn).await.unwrap().is_none());

        assert_eq!(
            sent(&transport),
            vec![
                "GET /api/test/vrf/",
                "GET /api/test/vrf/3/subnets/",
                "GET /api/test/vrf/custom_fields/"
            ]
        );
    }

    #[tokio::test]
    async fn update_keeps_sections_as_ids() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport.push_data(json!(null));

        let mut vrf = Vrf {
            id: Some(3),
            name: Some("customer-a".to_string()),
            sections: Some(vec![Ref::Unresolved(1)]),
            ..Vrf::default()
        };
        vrf.update(&conn, Params::new().with("rd", "65000:200"))
            .await
            .unwrap();

        let patch = &transport.requests()[1];
        assert_eq!(
            patch.body.as_deref(),
            Some("id=3&name=customer-a&rd=65000%3A200&sections%5B0%5D=1")
        );
    }
}
