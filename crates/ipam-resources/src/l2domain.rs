//! Layer 2 domains group VLANs.

use crate::lenient;
use crate::reference::{deserialize_ref_list, resolve_references, Ref, ReferenceField};
use crate::resource::{fetch_list, Resource};
use crate::section::Section;
use crate::vlan::Vlan;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::{Collection, Params};
use serde::{Deserialize, Serialize};

/// An L2 domain record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct L2Domain {
    /// Domain id.
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
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    /// Sections the domain is visible in.
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
impl Resource for L2Domain {
    const COLLECTION: Collection = Collection::L2Domains;
    const REFERENCES: &'static [ReferenceField] =
        &[ReferenceField::new("sections", &[], Collection::Sections)];

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn delete_request(&self) -> Result<(Vec<String>, Params)> {
        Ok((vec![self.require_id()?.to_string()], Params::new()))
    }
}

impl L2Domain {
    /// VLANs in the domain.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved domain.
    pub async fn vlans(&self, conn: &Connection) -> Result<Vec<Vlan>> {
        let id = self.require_id()?.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "vlans"]).await
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
