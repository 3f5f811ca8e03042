//! Devices such as switches and routers.

use crate::address::Address;
use crate::lenient;
use crate::reference::{deserialize_ref_list, resolve_references, Ref, ReferenceField};
use crate::resource::{fetch_list, Resource};
use crate::section::Section;
use crate::subnet::Subnet;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::Collection;
use serde::{Deserialize, Serialize};

/// A device record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub id: Option<u64>,
    /// Hostname.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub hostname: Option<String>,
    /// Management address.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub ip: Option<String>,
    /// Device type. Servers send either the type id or its name.
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub device_type: Option<String>,
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    /// Sections the device is visible in.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref_list"
    )]
    pub sections: Option<Vec<Ref<Section>>>,
    /// Rack id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub rack: Option<String>,
    /// First rack unit.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub rack_start: Option<String>,
    /// Height in rack units.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub rack_size: Option<String>,
    /// Location id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub location: Option<String>,
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
impl Resource for Device {
    const COLLECTION: Collection = Collection::Devices;
    const REFERENCES: &'static [ReferenceField] =
        &[ReferenceField::new("sections", &[], Collection::Sections)];

    fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Device {
    /// Subnets linked to the device.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved device.
    pub async fn subnets(&self, conn: &Connection) -> Result<Vec<Subnet>> {
        let id = self.require_id()?.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "subnets"]).await
    }

    /// Addresses assigned to the device.
    ///
    /// # Errors
    ///
    /// Returns the call error, or an invalid request error for an unsaved device.
    pub async fn addresses(&self, conn: &Connection) -> Result<Vec<Address>> {
        let id = self.require_id()?.to_string();
        fetch_list(conn, Self::COLLECTION, &[id.as_str(), "addresses"]).await
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
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn type_accepts_numbers_and_names() {
        let device = Device::from_value(json!({"id": "5", "hostname": "sw01", "type": 1})).unwrap();
        assert_eq!(device.device_type.as_deref(), Some("1"));

        let device = Device::from_value(json!({"id": "5", "type": "Switch"})).unwrap();
        assert_eq!(device.device_type.as_deref(), Some("Switch"));

        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value, json!({"id": 5, "type": "Switch"}));
    }

    #[tokio::test]
    async fn subnets_and_addresses() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!([]))
            .push_data(json!([{"id": "40", "ip": "10.0.0.5", "deviceId": "5"}]));

        let device = Device {
            id: Some(5),
            ..Device::default()
        };
        assert!(device.subnets(&conn).await.unwrap().is_empty());
        let addresses = device.addresses(&conn).await.unwrap();
        assert_eq!(addresses[0].device_id.as_ref().and_then(Ref::id), Some(5));

        assert_eq!(
            sent(&transport),
            vec!["GET /api/test/devices/5/subnets/", "GET /api/test/devices/5/addresses/"]
        );
    }

    #[tokio::test]
    async fn sections_follow_connection_default() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        conn.set_default_as_object(Collection::Sections, false);

        let device = Device {
            id: Some(5),
            sections: Some(vec![Ref::Unresolved(1), Ref::Unresolved(2)]),
            ..Device::default()
        };
        let sections = device.sections(&conn, None).await.unwrap();
        assert_eq!(sections, vec![Ref::Unresolved(1), Ref::Unresolved(2)]);
        assert!(sent(&transport).is_empty());
    }
}
