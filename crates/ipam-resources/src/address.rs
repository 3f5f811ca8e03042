//! IP addresses.

use crate::device::Device;
use crate::lenient;
use crate::reference::{deserialize_ref, resolve_reference, Ref, ReferenceField};
use crate::resource::{created_id, decode_one, fetch_data, fetch_list, Resource};
use crate::subnet::Subnet;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use ipam_api::Connection;
use ipam_core::{Collection, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An address record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Address id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub id: Option<u64>,
    /// Subnet holding the address.
    #[serde(
        rename = "subnetId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub subnet_id: Option<Ref<Subnet>>,
    /// The address itself.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub ip: Option<String>,
    /// Whether the address is the subnet gateway.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub is_gateway: Option<bool>,
    /// Description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    /// Hostname.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub hostname: Option<String>,
    /// MAC address.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub mac: Option<String>,
    /// Owner.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub owner: Option<String>,
    /// Address tag id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub tag: Option<u64>,
    /// Skip PTR record management.
    #[serde(
        rename = "PTRignore",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub ptr_ignore: Option<bool>,
    /// PTR record id.
    #[serde(
        rename = "PTR",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub ptr: Option<u64>,
    /// Device the address is assigned to.
    #[serde(
        rename = "deviceId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref"
    )]
    pub device_id: Option<Ref<Device>>,
    /// Switch port.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub port: Option<String>,
    /// Free-form note.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub note: Option<String>,
    /// Last time the address answered a scan.
    #[serde(
        rename = "lastSeen",
        default,
        skip_serializing_if = "Option::is_none",
        with = "lenient::timestamp"
    )]
    pub last_seen: Option<NaiveDateTime>,
    /// Exclude from ping scans.
    #[serde(
        rename = "excludePing",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub exclude_ping: Option<bool>,
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
impl Resource for Address {
    const COLLECTION: Collection = Collection::Addresses;
    const REFERENCES: &'static [ReferenceField] = &[
        ReferenceField::new("subnetId", &["subnet", "subnetID"], Collection::Subnets),
        ReferenceField::new("deviceId", &["device", "deviceID"], Collection::Devices),
    ];

    fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Address {
    /// Looks an address up by IP within a subnet.
    ///
    /// # Errors
    ///
    /// Returns a request error when the address does not exist.
    pub async fn get_by_ip_and_subnet(conn: &Connection, ip: &str, subnet_id: u64) -> Result<Self> {
        let subnet_id = subnet_id.to_string();
        let response = conn
            .call("get", Self::COLLECTION.name(), &[ip, subnet_id.as_str()], &Params::new())
            .await?;
        decode_one(response)
    }

    /// Addresses equal to `ip` in any subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn search_by_ip(conn: &Connection, ip: &str) -> Result<Vec<Self>> {
        fetch_list(conn, Self::COLLECTION, &["search", ip]).await
    }

    /// Addresses with the given hostname.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn search_by_hostname(conn: &Connection, hostname: &str) -> Result<Vec<Self>> {
        fetch_list(conn, Self::COLLECTION, &["search_hostname", hostname]).await
    }

    /// First free address of a subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn first_free(conn: &Connection, subnet_id: u64) -> Result<Option<String>> {
        let subnet_id = subnet_id.to_string();
        Ok(fetch_data(conn, Self::COLLECTION, &["first_free", subnet_id.as_str()])
            .await?
            .and_then(lenient::value_to_string))
    }

    /// Reserves the first free address of a subnet and returns it.
    ///
    /// # Errors
    ///
    /// Returns a request error when the subnet is full or no id is returned.
    pub async fn create_first_free(conn: &Connection, subnet_id: u64, params: Params) -> Result<Self> {
        let subnet_id = subnet_id.to_string();
        let params = Self::transform_references(params);
        let response = conn
            .call(
                "post",
                Self::COLLECTION.name(),
                &["first_free", subnet_id.as_str()],
                &params,
            )
            .await?;
        Self::get_by_id(conn, created_id(response)?).await
    }

    /// Deletes an address by IP within a subnet.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn delete_by_ip_and_subnet(conn: &Connection, ip: &str, subnet_id: u64) -> Result<bool> {
        let subnet_id = subnet_id.to_string();
        let response = conn
            .call("delete", Self::COLLECTION.name(), &[ip, subnet_id.as_str()], &Params::new())
            .await?;
        Ok(response.is_success())
    }

    /// Custom field definitions of the collection.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn custom_fields(conn: &Connection) -> Result<Option<Value>> {
        fetch_data(conn, Self::COLLECTION, &["custom_fields"]).await
    }

    /// Every address tag.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn tags(conn: &Connection) -> Result<Option<Value>> {
        fetch_data(conn, Self::COLLECTION, &["tags"]).await
    }

    /// One address tag.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn tag_by_id(conn: &Connection, tag_id: u64) -> Result<Option<Value>> {
        let tag_id = tag_id.to_string();
        fetch_data(conn, Self::COLLECTION, &["tags", tag_id.as_str()]).await
    }

    /// Addresses carrying a tag.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn addresses_by_tag(conn: &Connection, tag_id: u64) -> Result<Vec<Self>> {
        let tag_id = tag_id.to_string();
        fetch_list(conn, Self::COLLECTION, &["tags", tag_id.as_str(), "addresses"]).await
    }

    /// Pings the address from the server.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn ping(&self, conn: &Connection) -> Result<Option<Value>> {
        let id = self.require_id()?.to_string();
        fetch_data(conn, Self::COLLECTION, &[id.as_str(), "ping"]).await
    }

    /// Subnet as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn subnet(&self, conn: &Connection, as_object: Option<bool>) -> Result<Option<Ref<Subnet>>> {
        resolve_reference(self.subnet_id.as_ref(), conn, as_object).await
    }

    /// Device as an object or an id.
    ///
    /// # Errors
    ///
    /// Returns the lookup error.
    pub async fn device(&self, conn: &Connection, as_object: Option<bool>) -> Result<Option<Ref<Device>>> {
        resolve_reference(self.device_id.as_ref(), conn, as_object).await
    }
}
