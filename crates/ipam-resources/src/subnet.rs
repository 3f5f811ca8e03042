//! Subnets and their address-space operations.

use crate::address::Address;
use crate::lenient;
use crate::reference::{deserialize_ref, resolve_reference, Ref, ReferenceField};
use crate::resource::{created_id, decode_one, fetch_data, fetch_list, Resource};
use crate::section::Section;
use crate::vlan::Vlan;
use crate::vrf::Vrf;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::{Collection, Error, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Server message returned when a resize does not change the network.
pub const RESIZE_UNCHANGED: &str = "New network is same as old network";

/// A subnet record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    /// Subnet id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub id: Option<u64>,
    /// Network address.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub subnet: Option<String>,
    /// Prefix length.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub mask: Option<u64>,
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    /// Section the subnet belongs to.
    #[serde(
        rename = "sectionId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub section_id: Option<Ref<Section>>,
    /// Linked subnet.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub linked_subnet: Option<Ref<Subnet>>,
    /// VLAN the subnet is attached to.
    #[serde(
        rename = "vlanId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub vlan_id: Option<Ref<Vlan>>,
    /// VRF the subnet is attached to.
    #[serde(
        rename = "vrfId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub vrf_id: Option<Ref<Vrf>>,
    /// Parent subnet.
    #[serde(
        rename = "masterSubnetId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub master_subnet_id: Option<Ref<Subnet>>,
    /// Nameserver set id.
    #[serde(
        rename = "nameserverId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub nameserver_id: Option<u64>,
    /// Show the name instead of the network.
    #[serde(
        rename = "showName",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub show_name: Option<bool>,
    /// Group permissions, as JSON text.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub permissions: Option<String>,
    /// Create PTR records recursively.
    #[serde(
        rename = "DNSrecursive",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub dns_recursive: Option<bool>,
    /// Show DNS records.
    #[serde(
        rename = "DNSrecords",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub dns_records: Option<bool>,
    /// Allow IP requests.
    #[serde(
        rename = "allowRequests",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub allow_requests: Option<bool>,
    /// Scan agent id.
    #[serde(
        rename = "scanAgent",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub scan_agent: Option<u64>,
    /// Ping hosts in the subnet.
    #[serde(
        rename = "pingSubnet",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub ping_subnet: Option<bool>,
    /// Discover new hosts.
    #[serde(
        rename = "discoverSubnet",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub discover_subnet: Option<bool>,
    /// Folder rather than a real subnet.
    #[serde(
        rename = "isFolder",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub is_folder: Option<bool>,
    /// Marked as full.
    #[serde(
        rename = "isFull",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub is_full: Option<bool>,
    /// Subnet state.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub state: Option<u64>,
    /// Usage alert threshold in percent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub threshold: Option<u64>,
    /// Location id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub location: Option<u64>,
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
impl Resource for Subnet {
    const COLLECTION: Collection = Collection::Subnets;
    const REFERENCES: &'static [ReferenceField] = &[
        ReferenceField::new("sectionId", &["sectionID", "section"], Collection::Sections),
        ReferenceField::new("linked_subnet", &["linked_subnetId"], Collection::Subnets),
        ReferenceField::new("vlanId", &["vlanID", "vlan"], Collection::Vlan),
        ReferenceField::new("vrfId", &["vrfID", "vrf"], Collection::Vrf),
        ReferenceField::new("masterSubnetId", &[], Collection::Subnets),
    ];
    const LIST_PATH: &'static [&'static str] = &["all"];

    fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Subnet {
    /// `CIDR` notation of the subnet, when both parts are known.
    #[must_use]
    pub fn cidr(&self) -> Option<String> {
        match (&self.subnet, self.mask) {
            (Some(network), Some(mask)) => Some(format!("{network}/{mask}")),
            _ => None,
        }
    }

    /// Custom field definitions of the collection.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn custom_fields(conn: &Connection) -> Result<Option<Value>> {
        fetch_data(conn, Self::COLLECTION, &["custom_fields"]).await
    }

    /// Subnets matching a CIDR exactly.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn cidr_search(conn: &Connection, cidr: &str) -> Result<Vec<Self>> {
        fetch_list(conn, Self::COLLECTION, &["cidr", cidr]).await
    }

    /// Subnets matching a search term.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn search(conn: &Connection, cidr: &str) -> Result<Vec<Self>> {
        fetch_list(conn, Self::COLLECTION, &["search", cidr]).await
    }

    /// Usage statistics.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn usage(&self, conn: &Connection) -> Result<Option<Value>> {
        self.fetch(conn, &["usage"]).await
    }

    /// First free address in the subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error; a full subnet is reported by the server as a failure.
    pub async fn first_free(&self, conn: &Connection) -> Result<Option<String>> {
        Ok(self
            .fetch(conn, &["first_free"])
            .await?
            .and_then(lenient::value_to_string))
    }

    /// Direct child subnets.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn slaves(&self, conn: &Connection) -> Result<Vec<Self>> {
        self.fetch_records(conn, &["slaves"]).await
    }

    /// All descendant subnets.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn slaves_recursive(&self, conn: &Connection) -> Result<Vec<Self>> {
        self.fetch_records(conn, &["slaves_recursive"]).await
    }

    /// Addresses in the subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn addresses(&self, conn: &Connection) -> Result<Vec<Address>> {
        self.fetch_records(conn, &["addresses"]).await
    }

    /// One address of the subnet.
    ///
    /// # Errors
    ///
    /// Returns a request error when the address is not in the subnet.
    pub async fn address(&self, conn: &Connection, ip: &str) -> Result<Address> {
        let id = self.require_id()?.to_string();
        let response = conn
            .call("get", Self::COLLECTION.name(), &[id.as_str(), "addresses", ip], &Params::new())
            .await?;
        decode_one(response)
    }

    /// First free child subnet with the given mask.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn first_subnet(&self, conn: &Connection, mask: u8) -> Result<Option<String>> {
        let mask = mask.to_string();
        Ok(self
            .fetch(conn, &["first_subnet", mask.as_str()])
            .await?
            .and_then(lenient::value_to_string))
    }

    /// Every free child subnet with the given mask.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn all_subnets(&self, conn: &Connection, mask: u8) -> Result<Vec<String>> {
        let mask = mask.to_string();
        let data = self.fetch(conn, &["all_subnets", mask.as_str()]).await?;
        Ok(match data {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(lenient::value_to_string)
                .collect(),
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(_, item)| lenient::value_to_string(item))
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Creates the first free child subnet with the given mask.
    ///
    /// # Errors
    ///
    /// Returns a request error if there is no room or the server omits the new id.
    pub async fn create_first_subnet(&self, conn: &Connection, mask: u8) -> Result<Self> {
        let id = self.require_id()?.to_string();
        let mask = mask.to_string();
        let response = conn
            .call(
                "post",
                Self::COLLECTION.name(),
                &[id.as_str(), "first_subnet", mask.as_str()],
                &Params::new(),
            )
            .await?;
        Self::get_by_id(conn, created_id(response)?).await
    }

    /// Resizes the subnet and refreshes it from the server.
    ///
    /// Resizing to the current size succeeds without a refresh.
    ///
    /// # Errors
    ///
    /// Returns any other request error.
    pub async fn resize(&mut self, conn: &Connection, mask: u8) -> Result<bool> {
        let id = self.require_id()?;
        let path_id = id.to_string();
        let result = conn
            .call(
                "patch",
                Self::COLLECTION.name(),
                &[path_id.as_str(), "resize"],
                &Params::new().with("mask", mask),
            )
            .await;

        match result {
            Ok(_) => {
                *self = Self::get_by_id(conn, id).await?;
                Ok(true)
            }
            Err(Error::RequestError { message, .. }) if message == RESIZE_UNCHANGED => {
                debug!(id, mask, "subnet already has the requested size");
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Splits the subnet into `number` smaller subnets.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn split(&self, conn: &Connection, number: u32) -> Result<bool> {
        let id = self.require_id()?.to_string();
        let response = conn
            .call(
                "patch",
                Self::COLLECTION.name(),
                &[id.as_str(), "split"],
                &Params::new().with("number", number),
            )
            .await?;
        Ok(response.is_success())
    }

    /// Removes every address from the subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn truncate(&self, conn: &Connection) -> Result<bool> {
        self.delete_sub(conn, "truncate").await
    }

    /// Removes every permission from the subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn reset_permissions(&self, conn: &Connection) -> Result<bool> {
        self.delete_sub(conn, "permissions").await
    }

    /// Section as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn section(
        &self,
        conn: &Connection,
        as_object: Option<bool>,
    ) -> Result<Option<Ref<Section>>> {
        resolve_reference(self.section_id.as_ref(), conn, as_object).await
    }

    /// Linked subnet as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn linked(&self, conn: &Connection, as_object: Option<bool>) -> Result<Option<Ref<Self>>> {
        resolve_reference(self.linked_subnet.as_ref(), conn, as_object).await
    }

    /// VLAN as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn vlan(&self, conn: &Connection, as_object: Option<bool>) -> Result<Option<Ref<Vlan>>> {
        resolve_reference(self.vlan_id.as_ref(), conn, as_object).await
    }

    /// VRF as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn vrf(&self, conn: &Connection, as_object: Option<bool>) -> Result<Option<Ref<Vrf>>> {
        resolve_reference(self.vrf_id.as_ref(), conn, as_object).await
    }

    /// Parent subnet as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn master_subnet(
        &self,
        conn: &Connection,
        as_object: Option<bool>,
    ) -> Result<Option<Ref<Self>>> {
        resolve_reference(self.master_subnet_id.as_ref(), conn, as_object).await
    }

    async fn fetch(&self, conn: &Connection, path: &[&str]) -> Result<Option<Value>> {
        let id = self.require_id()?.to_string();
        let identifiers: Vec<&str> = std::iter::once(id.as_str()).chain(path.iter().copied()).collect();
        fetch_data(conn, Self::COLLECTION, &identifiers).await
    }

    async fn fetch_records<T: Resource>(&self, conn: &Connection, path: &[&str]) -> Result<Vec<T>> {
        let id = self.require_id()?.to_string();
        let identifiers: Vec<&str> = std::iter::once(id.as_str()).chain(path.iter().copied()).collect();
        fetch_list(conn, Self::COLLECTION, &identifiers).await
    }

    async fn delete_sub(&self, conn: &Connection, action: &str) -> Result<bool> {
        let id = self.require_id()?.to_string();
        let response = conn
            .call("delete", Self::COLLECTION.name(), &[id.as_str(), action], &Params::new())
            .await?;
        Ok(response.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{connect, sent};
    use ipam_api::testing::{error_envelope, ScriptedTransport};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn saved(id: u64) -> Subnet {
        Subnet {
            id: Some(id),
            subnet: Some("10.0.0.0".to_string()),
            mask: Some(24),
            ..Subnet::default()
        }
    }

    #[test]
    fn decodes_references_and_flags() {
        let subnet = Subnet::from_value(json!({
            "id": "7",
            "subnet": "10.10.0.0",
            "mask": "24",
            "sectionId": "1",
            "linked_subnet": null,
            "vlanId": "3",
            "vrfId": "0",
            "masterSubnetId": "0",
            "isFolder": "0",
            "editDate": "2024-03-01 10:12:44"
        }))
        .unwrap();

        assert_eq!(subnet.cidr().as_deref(), Some("10.10.0.0/24"));
        assert_eq!(subnet.section_id, Some(Ref::Unresolved(1)));
        assert_eq!(subnet.vlan_id, Some(Ref::Unresolved(3)));
        assert!(subnet.vrf_id.is_none());
        assert!(subnet.master_subnet_id.is_none());
        assert_eq!(subnet.is_folder, Some(false));
        assert!(subnet.edit_date.is_some());
    }

    #[tokio::test]
    async fn get_all_lists_all_path() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport.push_data(json!([{"id": "1"}, {"id": "2"}]));

        let subnets = Subnet::get_all(&conn).await.unwrap();
        assert_eq!(subnets.len(), 2);
        assert_eq!(sent(&transport), vec!["GET /api/test/subnets/all/"]);
    }

    #[tokio::test]
    async fn address_lookup_requires_data() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!([{"id": "40", "ip": "10.0.0.5", "subnetId": "7"}]))
            .push_data(json!(null));

        let subnet = saved(7);
        let address = subnet.address(&conn, "10.0.0.5").await.unwrap();
        assert_eq!(address.id, Some(40));

        let err = subnet.address(&conn, "10.0.0.6").await.unwrap_err();
        assert!(matches!(err, Error::RequestError { .. }));

        assert_eq!(
            sent(&transport),
            vec![
                "GET /api/test/subnets/7/addresses/10.0.0.5/",
                "GET /api/test/subnets/7/addresses/10.0.0.6/"
            ]
        );
    }

    #[tokio::test]
    async fn scalar_queries() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!("10.0.0.1"))
            .push_data(json!("10.0.0.0/26"))
            .push_data(json!(["10.0.0.0/26", "10.0.0.64/26"]))
            .push_data(json!({"used": "3", "maxhosts": "254"}));

        let subnet = saved(7);
        assert_eq!(subnet.first_free(&conn).await.unwrap().as_deref(), Some("10.0.0.1"));
        assert_eq!(
            subnet.first_subnet(&conn, 26).await.unwrap().as_deref(),
            Some("10.0.0.0/26")
        );
        assert_eq!(subnet.all_subnets(&conn, 26).await.unwrap().len(), 2);
        assert!(subnet.usage(&conn).await.unwrap().is_some());

        assert_eq!(
            sent(&transport),
            vec![
                "GET /api/test/subnets/7/first_free/",
                "GET /api/test/subnets/7/first_subnet/26/",
                "GET /api/test/subnets/7/all_subnets/26/",
                "GET /api/test/subnets/7/usage/"
            ]
        );
    }

    #[tokio::test]
    async fn cidr_search_keeps_prefix_in_path() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport.push_data(json!([{"id": "7", "subnet": "10.0.0.0", "mask": "24"}]));

        let found = Subnet::cidr_search(&conn, "10.0.0.0/24").await.unwrap();
        assert_eq!(found[0].id, Some(7));
        assert_eq!(sent(&transport), vec!["GET /api/test/subnets/cidr/10.0.0.0/24/"]);
    }

    #[tokio::test]
    async fn resize_refreshes_from_server() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!(null))
            .push_data(json!({"id": "7", "subnet": "10.0.0.0", "mask": "23"}));

        let mut subnet = saved(7);
        assert!(subnet.resize(&conn, 23).await.unwrap());
        assert_eq!(subnet.mask, Some(23));

        let requests = transport.requests();
        assert_eq!(requests[1].body.as_deref(), Some("mask=23"));
        assert_eq!(
            sent(&transport),
            vec!["PATCH /api/test/subnets/7/resize/", "GET /api/test/subnets/7/"]
        );
    }

    #[tokio::test]
    async fn resize_to_same_size_is_success() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport.push(error_envelope(StatusCode::CONFLICT, RESIZE_UNCHANGED));

        let mut subnet = saved(7);
        assert!(subnet.resize(&conn, 24).await.unwrap());
        assert_eq!(subnet.mask, Some(24));
        assert_eq!(sent(&transport).len(), 1);
    }

    #[tokio::test]
    async fn resize_propagates_other_failures() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport.push(error_envelope(StatusCode::CONFLICT, "Subnet overlaps"));

        let mut subnet = saved(7);
        let err = subnet.resize(&conn, 20).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed: Subnet overlaps");
    }

    #[tokio::test]
    async fn split_truncate_and_permissions() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_data(json!(null))
            .push_data(json!(null))
            .push_data(json!(null));

        let subnet = saved(7);
        assert!(subnet.split(&conn, 4).await.unwrap());
        assert!(subnet.truncate(&conn).await.unwrap());
        assert!(subnet.reset_permissions(&conn).await.unwrap());

        assert_eq!(transport.requests()[1].body.as_deref(), Some("number=4"));
        assert_eq!(
            sent(&transport),
            vec![
                "PATCH /api/test/subnets/7/split/",
                "DELETE /api/test/subnets/7/truncate/",
                "DELETE /api/test/subnets/7/permissions/"
            ]
        );
    }

    #[tokio::test]
    async fn create_first_subnet_fetches_new_record() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        transport
            .push_json(
                StatusCode::CREATED,
                &json!({"code": 201, "success": true, "id": 30, "time": 0.01}),
            )
            .push_data(json!({"id": "30", "subnet": "10.0.0.0", "mask": "26", "masterSubnetId": "7"}));

        let child = saved(7).create_first_subnet(&conn, 26).await.unwrap();
        assert_eq!(child.id, Some(30));
        assert_eq!(child.master_subnet_id.and_then(|r| r.id()), Some(7));
        assert_eq!(
            sent(&transport),
            vec!["POST /api/test/subnets/7/first_subnet/26/", "GET /api/test/subnets/30/"]
        );
    }

    #[tokio::test]
    async fn resolution_default_can_be_switched_to_ids() {
        let transport = Arc::new(ScriptedTransport::new());
        let conn = connect(&transport).await;
        conn.set_default_as_object(Collection::Sections, false);

        let subnet = Subnet {
            section_id: Some(Ref::Unresolved(2)),
            ..saved(7)
        };
        assert_eq!(
            subnet.section(&conn, None).await.unwrap(),
            Some(Ref::Unresolved(2))
        );
        assert!(sent(&transport).is_empty());
    }
}
