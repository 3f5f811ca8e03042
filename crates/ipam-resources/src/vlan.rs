//! VLANs.

use crate::l2domain::L2Domain;
use crate::lenient;
use crate::reference::{deserialize_ref, resolve_reference, Ref, ReferenceField};
use crate::resource::{fetch_data, fetch_list, Resource};
use crate::subnet::Subnet;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::Collection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A VLAN record. The server keys VLANs by `vlanId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vlan {
    /// VLAN id.
    #[serde(
        rename = "vlanId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub id: Option<u64>,
    /// L2 domain the VLAN belongs to.
    #[serde(
        rename = "domainId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub domain_id: Option<Ref<L2Domain>>,
    /// Name.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub name: Option<String>,
    /// 802.1Q tag.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub number: Option<u64>,
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
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
impl Resource for Vlan {
    const COLLECTION: Collection = Collection::Vlan;
    const REFERENCES: &'static [ReferenceField] = &[ReferenceField::new(
        "domainId",
        &["domainID", "domain"],
        Collection::L2Domains,
    )];

    fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Vlan {
    /// Subnets attached to the VLAN.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved VLAN.
    pub async fn subnets(&self, conn: &Connection) -> Result<Vec<Subnet>> {
        let id = self.require_id()?.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "subnets"]).await
    }

    /// Subnets attached to the VLAN within one section.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved VLAN.
    pub async fn subnets_in_section(&self, conn: &Connection, section_id: u64) -> Result<Vec<Subnet>> {
        let id = self.require_id()?.to_string();
        let section_id = section_id.to_string();
        fetch_list(
            conn,
            Self::COLLECTION,
            &[id.as_str(), "subnets", section_id.as_str()],
        )
        .await
    }

    /// Custom field values of the VLAN.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn custom_fields(&self, conn: &Connection) -> Result<Option<Value>> {
        let id = self.require_id()?.to_string();
        fetch_data(conn, Self::COLLECTION, &[id.as_str(), "custom_fields"]).await
    }

    /// VLANs carrying the given number.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn search(&self, conn: &Connection, number: u64) -> Result<Vec<Self>> {
        let id = self.require_id()?.to_string();
        let number = number.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "search", number.as_str()]).await
    }

    /// L2 domain as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn domain(&self, conn: &Connection, as_object: Option<bool>) -> Result<Option<Ref<L2Domain>>> {
        resolve_reference(self.domain_id.as_ref(), conn, as_object).await
    }
}
