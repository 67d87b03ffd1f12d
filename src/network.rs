//! Network placement lookup for VIPs and pools
//!
//! The Control Center needs to know which network a VIP or pool lives on.
//! The lookup goes subnet → network, then picks up the provider attributes
//! if the network has them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkLookupError {
    #[error("subnet {0} not found")]
    SubnetNotFound(String),

    #[error("network {0} not found")]
    NetworkNotFound(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subnet {
    pub id: String,
    pub network_id: String,
}

/// Network with its optional `provider:*` attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub network_type: Option<String>,
    pub segmentation_id: Option<u32>,
}

#[async_trait]
pub trait NetworkInfo: Send + Sync {
    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, NetworkLookupError>;

    async fn get_network(&self, network_id: &str) -> Result<Network, NetworkLookupError>;
}

/// Placement fields merged into VIP and pool creation payloads
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkPlacement {
    pub network_id: String,
    pub subnet_id: String,
    pub network_type: Option<String>,
    pub segmentation_id: Option<u32>,
}

impl NetworkPlacement {
    pub fn into_payload(self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("network_id".into(), Value::String(self.network_id));
        payload.insert("subnet_id".into(), Value::String(self.subnet_id));
        if let Some(network_type) = self.network_type {
            payload.insert("network_type".into(), Value::String(network_type));
        }
        if let Some(segmentation_id) = self.segmentation_id {
            payload.insert("segmentation_id".into(), Value::from(segmentation_id));
        }
        payload
    }
}

pub async fn resolve_placement(
    lookup: &dyn NetworkInfo,
    subnet_id: &str,
) -> Result<NetworkPlacement, NetworkLookupError> {
    let subnet = lookup.get_subnet(subnet_id).await?;
    let network = lookup.get_network(&subnet.network_id).await?;

    Ok(NetworkPlacement {
        network_id: network.id,
        subnet_id: subnet.id,
        network_type: network.network_type,
        segmentation_id: network.segmentation_id,
    })
}

/// One subnet entry of the static network table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub subnet_id: String,
    pub network_id: String,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub segmentation_id: Option<u32>,
}

/// [`NetworkInfo`] backed by the `[[networks]]` table of the config file
#[derive(Clone, Debug, Default)]
pub struct StaticNetworkInfo {
    subnets: HashMap<String, Subnet>,
    networks: HashMap<String, Network>,
}

impl StaticNetworkInfo {
    pub fn new(entries: &[NetworkEntry]) -> Self {
        let mut info = Self::default();
        for entry in entries {
            info.subnets.insert(
                entry.subnet_id.clone(),
                Subnet {
                    id: entry.subnet_id.clone(),
                    network_id: entry.network_id.clone(),
                },
            );
            info.networks.insert(
                entry.network_id.clone(),
                Network {
                    id: entry.network_id.clone(),
                    network_type: entry.network_type.clone(),
                    segmentation_id: entry.segmentation_id,
                },
            );
        }
        info
    }
}

#[async_trait]
impl NetworkInfo for StaticNetworkInfo {
    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, NetworkLookupError> {
        self.subnets
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| NetworkLookupError::SubnetNotFound(subnet_id.to_string()))
    }

    async fn get_network(&self, network_id: &str) -> Result<Network, NetworkLookupError> {
        self.networks
            .get(network_id)
            .cloned()
            .ok_or_else(|| NetworkLookupError::NetworkNotFound(network_id.to_string()))
    }
}
