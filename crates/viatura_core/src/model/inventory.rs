//! Vehicle inventory entries: consumable materials and condition-tracked tools.

use super::catalog::CatalogItemId;
use serde::{Deserialize, Serialize};

/// Consumable stock carried by one vehicle.
///
/// `name` and `unit` are copied from the catalog when stocked, so the entry
/// stays readable after the catalog item is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub item_id: CatalogItemId,
    pub name: String,
    pub unit: String,
    pub quantity: u32,
    /// Stock at or below this value raises a low-stock alert.
    pub threshold: u32,
}

impl Material {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.threshold
    }
}

/// Tool state as reported by crews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCondition {
    Good,
    NeedsRepair,
    Broken,
}

impl ToolCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::NeedsRepair => "needs_repair",
            Self::Broken => "broken",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "good" => Some(Self::Good),
            "needs_repair" => Some(Self::NeedsRepair),
            "broken" => Some(Self::Broken),
            _ => None,
        }
    }

    /// Anything but `Good` counts against the vehicle on dashboards.
    pub fn needs_attention(self) -> bool {
        self != Self::Good
    }
}

/// Equipment carried by one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub item_id: CatalogItemId,
    pub name: String,
    pub condition: ToolCondition,
}
