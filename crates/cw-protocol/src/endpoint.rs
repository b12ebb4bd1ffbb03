/// HTTP endpoint paths for the warehouse read surface.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    pub const SNAPSHOT: &str = "/v1/snapshot";
}

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
    pub world: String,
    pub viewers: usize,
}

impl HealthResponse {
    pub fn ok(world: impl Into<String>, viewers: usize) -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
            world: world.into(),
            viewers,
        }
    }
}
