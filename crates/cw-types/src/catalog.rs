use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::resource::{ItemStack, ResourceAttributes, ResourceType};

/// Host-supplied resource metadata.
///
/// The warehouse consumes this interface; it never defines resources itself.
pub trait ResourceCatalog: Send + Sync {
    /// Definition of `resource`, or `None` if the host does not know it.
    fn lookup(&self, resource: &ResourceType) -> Option<&ResourceDef>;

    fn contains(&self, resource: &ResourceType) -> bool {
        self.lookup(resource).is_some()
    }

    /// Per-slot maximum; unknown resources are treated as unstackable.
    fn max_stack_size(&self, resource: &ResourceType) -> u32 {
        self.lookup(resource).map_or(1, |def| def.max_stack_size)
    }

    /// Human-readable name; falls back to the identifier path.
    fn display_name(&self, resource: &ResourceType) -> String {
        self.lookup(resource)
            .map(|def| def.display_name.clone())
            .unwrap_or_else(|| resource.path().to_string())
    }

    fn is_simple(&self, stack: &ItemStack) -> bool {
        stack.simple
    }

    /// Attributes of a concrete stack.
    fn attributes_of(&self, stack: &ItemStack) -> ResourceAttributes {
        ResourceAttributes::new(self.max_stack_size(&stack.resource), self.is_simple(stack))
    }

    /// Attributes of a freshly created, plain unit of `resource`.
    fn default_attributes(&self, resource: &ResourceType) -> ResourceAttributes {
        ResourceAttributes::new(self.max_stack_size(resource), true)
    }
}

/// One catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub id: ResourceType,
    pub display_name: String,
    #[serde(default = "default_stack_size")]
    pub max_stack_size: u32,
}

fn default_stack_size() -> u32 {
    64
}

impl ResourceDef {
    pub fn new(id: ResourceType, display_name: impl Into<String>, max_stack_size: u32) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            max_stack_size,
        }
    }
}

/// TOML catalog file:
///
/// ```toml
/// [[resources]]
/// id = "minecraft:wheat"
/// display_name = "Wheat"
/// max_stack_size = 64
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
}

/// Catalog backed by a fixed table of definitions.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    defs: BTreeMap<ResourceType, ResourceDef>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from definitions, rejecting duplicates and zero stack sizes.
    pub fn from_defs(defs: impl IntoIterator<Item = ResourceDef>) -> Result<Self, TypeError> {
        let mut catalog = Self::new();
        for def in defs {
            catalog.insert(def)?;
        }
        Ok(catalog)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TypeError> {
        let config: CatalogConfig =
            toml::from_str(text).map_err(|e| TypeError::CatalogParse(e.to_string()))?;
        Self::from_defs(config.resources)
    }

    pub fn insert(&mut self, def: ResourceDef) -> Result<(), TypeError> {
        if def.max_stack_size == 0 {
            return Err(TypeError::InvalidStackSize {
                resource: def.id.to_string(),
                size: def.max_stack_size,
            });
        }
        if self.defs.contains_key(&def.id) {
            return Err(TypeError::DuplicateResource(def.id.to_string()));
        }
        self.defs.insert(def.id.clone(), def);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDef> {
        self.defs.values()
    }

    /// A small vanilla-style catalog used when no catalog file is configured.
    pub fn builtin() -> Self {
        const TABLE: &[(&str, &str, u32)] = &[
            ("minecraft:wheat", "Wheat", 64),
            ("minecraft:stone", "Stone", 64),
            ("minecraft:cobblestone", "Cobblestone", 64),
            ("minecraft:dirt", "Dirt", 64),
            ("minecraft:oak_log", "Oak Log", 64),
            ("minecraft:iron_ingot", "Iron Ingot", 64),
            ("minecraft:gold_ingot", "Gold Ingot", 64),
            ("minecraft:diamond", "Diamond", 64),
            ("minecraft:coal", "Coal", 64),
            ("minecraft:redstone", "Redstone Dust", 64),
            ("minecraft:egg", "Egg", 16),
            ("minecraft:ender_pearl", "Ender Pearl", 16),
            ("minecraft:snowball", "Snowball", 16),
            ("minecraft:diamond_sword", "Diamond Sword", 1),
            ("minecraft:iron_pickaxe", "Iron Pickaxe", 1),
            ("minecraft:water_bucket", "Water Bucket", 1),
        ];
        let mut catalog = Self::new();
        for (id, name, max) in TABLE {
            if let Ok(id) = ResourceType::new(*id) {
                catalog
                    .defs
                    .insert(id.clone(), ResourceDef::new(id, *name, *max));
            }
        }
        catalog
    }
}

impl ResourceCatalog for StaticCatalog {
    fn lookup(&self, resource: &ResourceType) -> Option<&ResourceDef> {
        self.defs.get(resource)
    }
}
