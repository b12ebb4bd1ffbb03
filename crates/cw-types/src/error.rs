use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid resource identifier: {0:?}")]
    InvalidResourceType(String),

    #[error("invalid max stack size for {resource}: {size}")]
    InvalidStackSize { resource: String, size: u32 },

    #[error("duplicate resource definition: {0}")]
    DuplicateResource(String),

    #[error("catalog parse error: {0}")]
    CatalogParse(String),
}
