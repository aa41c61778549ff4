//! Vehicle (viatura) aggregate.
//!
//! # Invariants
//! - `name` and `plate` are non-blank.
//! - `operator_ids` is ordered by assignment and never exceeds the configured capacity.
//! - `materials` and `tools` hold at most one entry per catalog item.

use super::inventory::{Material, Tool};
use super::user::UserId;
use super::{required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VehicleId = Uuid;

/// Operational category of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    /// Tree-trimming crew.
    Poda,
    /// Standby/readiness crew.
    Prontidao,
    Comercial,
}

impl VehicleType {
    pub const ALL: [VehicleType; 3] = [Self::Poda, Self::Prontidao, Self::Comercial];

    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poda => "poda",
            Self::Prontidao => "prontidao",
            Self::Comercial => "comercial",
        }
    }

    /// Parses the storage value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "poda" => Some(Self::Poda),
            "prontidao" => Some(Self::Prontidao),
            "comercial" => Some(Self::Comercial),
            _ => None,
        }
    }

    /// User-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Poda => "Poda",
            Self::Prontidao => "Prontidão",
            Self::Comercial => "Comercial",
        }
    }
}

/// One open defect report on a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    /// Zero-based position in report order. Used to resolve the defect.
    pub position: usize,
    pub description: String,
    /// Epoch milliseconds.
    pub reported_at: i64,
}

/// Full vehicle aggregate as loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub plate: String,
    #[serde(rename = "type")]
    pub kind: VehicleType,
    pub operator_ids: Vec<UserId>,
    pub materials: Vec<Material>,
    pub tools: Vec<Tool>,
    pub defects: Vec<Defect>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Vehicle {
    pub fn low_stock_count(&self) -> usize {
        self.materials.iter().filter(|m| m.is_low_stock()).count()
    }

    pub fn tools_needing_repair(&self) -> usize {
        self.tools
            .iter()
            .filter(|t| t.condition.needs_attention())
            .count()
    }

    pub fn material(&self, item_id: Uuid) -> Option<&Material> {
        self.materials.iter().find(|m| m.item_id == item_id)
    }

    pub fn tool(&self, item_id: Uuid) -> Option<&Tool> {
        self.tools.iter().find(|t| t.item_id == item_id)
    }
}

/// Editable vehicle header fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDraft {
    pub name: String,
    pub plate: String,
    #[serde(rename = "type")]
    pub kind: VehicleType,
}

impl VehicleDraft {
    pub fn new(name: impl Into<String>, plate: impl Into<String>, kind: VehicleType) -> Self {
        Self {
            name: name.into(),
            plate: plate.into(),
            kind,
        }
    }

    /// Returns a trimmed copy, or the first blank field.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name)?,
            plate: required_text("plate", &self.plate)?.to_uppercase(),
            kind: self.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{VehicleDraft, VehicleType};
    use crate::model::ValidationError;

    #[test]
    fn vehicle_type_storage_values_are_stable() {
        for kind in VehicleType::ALL {
            assert_eq!(VehicleType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(VehicleType::parse("Poda"), None);
        assert_eq!(VehicleType::Prontidao.label(), "Prontidão");
    }

    #[test]
    fn draft_normalization_trims_and_uppercases_plate() {
        let draft = VehicleDraft::new(" Viatura 01 ", " abc-1234 ", VehicleType::Poda);
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.name, "Viatura 01");
        assert_eq!(normalized.plate, "ABC-1234");
    }

    #[test]
    fn draft_rejects_blank_plate() {
        let draft = VehicleDraft::new("Viatura", "  ", VehicleType::Comercial);
        assert_eq!(
            draft.normalized(),
            Err(ValidationError::BlankField("plate"))
        );
    }
}
