use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier for a kind of fungible resource, e.g. `minecraft:wheat`.
///
/// Resource types are supplied by the [`ResourceCatalog`](crate::ResourceCatalog);
/// the warehouse never creates or destroys them, it only uses them as map
/// keys. Identifiers are lowercase `[a-z0-9_.-/]` with at most one
/// `namespace:` prefix. Malformed identifiers are rejected on construction
/// and on deserialization.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceType(String);

impl ResourceType {
    /// Parse and validate a resource identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if is_valid_identifier(&id) {
            Ok(Self(id))
        } else {
            Err(TypeError::InvalidResourceType(id))
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace part, if the identifier has one.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }

    /// The path part (the whole identifier when there is no namespace).
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, path)| path)
    }
}

fn is_valid_identifier(id: &str) -> bool {
    let (namespace, path) = match id.split_once(':') {
        Some((ns, path)) => (Some(ns), path),
        None => (None, id),
    };
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'/'))
    };
    namespace.map_or(true, valid_part) && valid_part(path)
}

impl TryFrom<String> for ResourceType {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.0
    }
}

impl std::str::FromStr for ResourceType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceType({})", self.0)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation-time properties of a concrete resource instance.
///
/// Derived from the catalog for a type plus the instance's own data. Never
/// persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    /// Per-slot maximum quantity; always at least 1.
    pub max_stack_size: u32,
    /// `true` iff the instance carries no per-instance data (damage,
    /// enchantments, custom name).
    pub is_simple: bool,
}

impl ResourceAttributes {
    pub fn new(max_stack_size: u32, is_simple: bool) -> Self {
        Self {
            max_stack_size: max_stack_size.max(1),
            is_simple,
        }
    }

    /// Stackable means more than one unit fits in a slot.
    pub fn is_stackable(&self) -> bool {
        self.max_stack_size > 1
    }
}

/// Contents of one non-empty inventory slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub resource: ResourceType,
    pub quantity: u32,
    /// `false` when the stack carries per-instance data.
    pub simple: bool,
}

impl ItemStack {
    /// A plain stack with no per-instance data.
    pub fn simple(resource: ResourceType, quantity: u32) -> Self {
        Self {
            resource,
            quantity,
            simple: true,
        }
    }

    /// A stack carrying per-instance data (enchanted, damaged, renamed).
    pub fn with_extra_data(resource: ResourceType, quantity: u32) -> Self {
        Self {
            resource,
            quantity,
            simple: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Whether this stack may merge with plain units of `resource`.
    pub fn is_plain(&self, resource: &ResourceType) -> bool {
        self.simple && &self.resource == resource
    }
}
