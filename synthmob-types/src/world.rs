//! Shared world contributions and the aggregate snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AgentId, Millis};

/// Environment keys merged last-write-wins across all contributions.
pub const ENVIRONMENT_KEYS: [&str; 4] = ["sky", "fog", "ground", "lighting"];

/// Per-output limits enforced by the validator.
pub const MAX_ELEMENTS: usize = 50;
pub const MAX_VOXELS: usize = 500;
pub const MAX_CATALOG_ITEMS: usize = 30;
pub const MAX_GENERATED_ITEMS: usize = 10;

/// Serialized size caps per output kind, in bytes.
pub const MAX_WORLD_OUTPUT_BYTES: usize = 32 * 1024;
pub const MAX_VISUAL_OUTPUT_BYTES: usize = 8 * 1024;
pub const MAX_GAME_OUTPUT_BYTES: usize = 4 * 1024;

/// Voxel coordinate bounds (integer grid).
pub const VOXEL_Y_MAX: i64 = 100;
pub const VOXEL_XZ_EXTENT: i64 = 100;

/// One agent's stored world output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldContribution {
    pub output: serde_json::Value,
    pub updated_at: Millis,
}

/// An agent's contribution as exposed in the aggregate snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionView {
    pub agent_id: AgentId,
    pub bot_name: String,
    pub elements: Vec<serde_json::Value>,
    pub updated_at: Millis,
}

/// The aggregate world, computed on read. Environment is a flat map;
/// per-agent collections are flattened and tagged with the contributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub environment: BTreeMap<String, serde_json::Value>,
    pub contributions: Vec<ContributionView>,
    pub voxels: Vec<serde_json::Value>,
    pub catalog_items: Vec<serde_json::Value>,
    pub generated_items: Vec<serde_json::Value>,
    pub updated_at: Millis,
}

impl WorldSnapshot {
    pub fn empty() -> Self {
        Self {
            environment: BTreeMap::new(),
            contributions: Vec::new(),
            voxels: Vec::new(),
            catalog_items: Vec::new(),
            generated_items: Vec::new(),
            updated_at: 0,
        }
    }
}
