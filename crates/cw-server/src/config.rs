use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cw_ledger::{SlotInventory, PLAYER_INVENTORY_SIZE};
use cw_sync::AuthorityConfig;
use cw_types::{ItemStack, ResourceType, StaticCatalog};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, usually read from `warehouse.toml`.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address of the framed TCP protocol listener.
    pub protocol_addr: SocketAddr,
    /// Address of the HTTP read endpoints.
    pub http_addr: SocketAddr,
    /// Directory holding one snapshot file per world.
    pub data_dir: PathBuf,
    pub world: String,
    /// TOML resource catalog. The built-in catalog is used when unset.
    pub catalog: Option<PathBuf>,
    /// Seconds between save cycles.
    pub save_interval_secs: u64,
    /// Stacks placed in each new connection's inventory, one slot apiece.
    pub starter_kit: Vec<StarterStack>,
    pub authority: AuthorityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 25_570)),
            http_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 25_571)),
            data_dir: PathBuf::from("warehouse-data"),
            world: "overworld".into(),
            catalog: None,
            save_interval_secs: 300,
            starter_kit: Vec::new(),
            authority: AuthorityConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterStack {
    pub resource: ResourceType,
    pub quantity: u32,
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.world.is_empty() {
            return Err(ServerError::Config("world name is empty".into()));
        }
        if self.starter_kit.len() > PLAYER_INVENTORY_SIZE {
            return Err(ServerError::Config(format!(
                "starter kit has {} stacks, inventory holds {PLAYER_INVENTORY_SIZE}",
                self.starter_kit.len()
            )));
        }
        Ok(())
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs.max(1))
    }

    /// The configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> ServerResult<StaticCatalog> {
        let Some(path) = &self.catalog else {
            return Ok(StaticCatalog::builtin());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        StaticCatalog::from_toml_str(&text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// A fresh player inventory holding the starter kit.
    pub fn starting_inventory(&self) -> SlotInventory {
        self.starter_kit
            .iter()
            .filter(|s| s.quantity > 0)
            .enumerate()
            .fold(SlotInventory::player(), |inv, (slot, s)| {
                inv.with(slot, ItemStack::simple(s.resource.clone(), s.quantity))
            })
    }
}
