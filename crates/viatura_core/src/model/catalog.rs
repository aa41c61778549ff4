//! Master catalog definitions managed by administrators.

use super::{required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CatalogItemId = Uuid;

/// Unit used when a material definition omits one.
pub const DEFAULT_MATERIAL_UNIT: &str = "unidades";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterMaterial {
    pub id: CatalogItemId,
    pub name: String,
    pub unit: String,
}

impl MasterMaterial {
    /// Builds a validated definition with a generated id.
    pub fn new(name: &str, unit: Option<&str>) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), name, unit)
    }

    pub fn with_id(
        id: CatalogItemId,
        name: &str,
        unit: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let unit = match unit {
            Some(value) => required_text("unit", value)?,
            None => DEFAULT_MATERIAL_UNIT.to_string(),
        };
        Ok(Self {
            id,
            name: required_text("name", name)?,
            unit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterTool {
    pub id: CatalogItemId,
    pub name: String,
}

impl MasterTool {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: CatalogItemId, name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            name: required_text("name", name)?,
        })
    }
}
