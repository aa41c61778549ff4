//! Vehicle inventory use-cases: materials, tools and defects.
//!
//! # Responsibility
//! - Apply stock, tool and defect changes for users with edit rights.
//! - Write one feed entry per change, plus low-stock alerts.
//!
//! # Invariants
//! - Edit rights: admins, or operators assigned to the vehicle whose edit
//!   permission is not explicitly revoked.
//! - Read-only queries follow vehicle visibility: admins, or the assigned
//!   operators.
//! - Stock never goes negative; using more than is stocked is rejected.
//! - Stock at or below threshold after a change raises an `alert` entry.
//! - Only catalog items can be stocked, and each at most once per vehicle.

use crate::config::FleetConfig;
use crate::model::catalog::{CatalogItemId, MasterMaterial, MasterTool};
use crate::model::inventory::{Material, Tool, ToolCondition};
use crate::model::notification::{ItemType, NewNotification, NotificationKind};
use crate::model::user::User;
use crate::model::vehicle::{Vehicle, VehicleId};
use crate::model::ValidationError;
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::vehicle_repo::VehicleRepository;
use crate::repo::{EntityRef, RepoError};
use crate::service::{messages, record_activity, resolve_can_edit, Actor};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for inventory use-cases.
#[derive(Debug)]
pub enum InventoryServiceError {
    /// Actor lacks edit rights on this vehicle.
    AccessDenied(VehicleId),
    /// Actor may not view this vehicle.
    NotVisible(VehicleId),
    VehicleNotFound(VehicleId),
    CatalogItemNotFound(CatalogItemId),
    /// Material or tool is not stocked on the vehicle.
    ItemNotStocked {
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
    },
    /// Material or tool is already stocked on the vehicle.
    AlreadyStocked {
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
    },
    DefectNotFound {
        vehicle_id: VehicleId,
        index: usize,
    },
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for InventoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessDenied(id) => write!(f, "no edit rights on vehicle {id}"),
            Self::NotVisible(id) => write!(f, "vehicle {id} is not visible to this user"),
            Self::VehicleNotFound(id) => write!(f, "vehicle not found: {id}"),
            Self::CatalogItemNotFound(id) => write!(f, "catalog item not found: {id}"),
            Self::ItemNotStocked {
                vehicle_id,
                item_id,
            } => write!(f, "item {item_id} is not stocked on vehicle {vehicle_id}"),
            Self::AlreadyStocked {
                vehicle_id,
                item_id,
            } => write!(f, "item {item_id} is already stocked on vehicle {vehicle_id}"),
            Self::DefectNotFound { vehicle_id, index } => {
                write!(f, "vehicle {vehicle_id} has no defect #{index}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for InventoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for InventoryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(EntityRef::Vehicle(id)) => Self::VehicleNotFound(id),
            RepoError::NotFound(EntityRef::MasterMaterial(id) | EntityRef::MasterTool(id)) => {
                Self::CatalogItemNotFound(id)
            }
            RepoError::NotFound(
                EntityRef::VehicleMaterial {
                    vehicle_id,
                    item_id,
                }
                | EntityRef::VehicleTool {
                    vehicle_id,
                    item_id,
                },
            ) => Self::ItemNotStocked {
                vehicle_id,
                item_id,
            },
            RepoError::Conflict(
                EntityRef::VehicleMaterial {
                    vehicle_id,
                    item_id,
                }
                | EntityRef::VehicleTool {
                    vehicle_id,
                    item_id,
                },
            ) => Self::AlreadyStocked {
                vehicle_id,
                item_id,
            },
            RepoError::NotFound(EntityRef::Defect { vehicle_id, index }) => {
                Self::DefectNotFound { vehicle_id, index }
            }
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for InventoryServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Vehicle checked for edit rights, plus the refreshed actor.
struct EditContext {
    editor: User,
    vehicle: Vehicle,
}

pub struct InventoryService<V, U, C, N>
where
    V: VehicleRepository,
    U: UserRepository,
    C: CatalogRepository,
    N: NotificationRepository,
{
    vehicles: V,
    users: U,
    catalog: C,
    notifications: N,
    config: FleetConfig,
}

impl<V, U, C, N> InventoryService<V, U, C, N>
where
    V: VehicleRepository,
    U: UserRepository,
    C: CatalogRepository,
    N: NotificationRepository,
{
    pub fn new(vehicles: V, users: U, catalog: C, notifications: N, config: FleetConfig) -> Self {
        Self {
            vehicles,
            users,
            catalog,
            notifications,
            config,
        }
    }

    /// True when `actor` may change inventory on `vehicle_id`.
    pub fn can_edit_vehicle(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
    ) -> Result<bool, InventoryServiceError> {
        Ok(self.editor_for(actor, vehicle_id)?.is_some())
    }

    /// Reloads the actor and returns it only if it holds edit rights.
    fn editor_for(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
    ) -> Result<Option<User>, InventoryServiceError> {
        let Some(user) = self.users.get_user(actor.id)? else {
            return Ok(None);
        };
        let allowed = user.is_admin()
            || (user.is_assigned_to(vehicle_id) && resolve_can_edit(&self.users, &user)?);
        Ok(allowed.then_some(user))
    }

    fn edit_context(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
    ) -> Result<EditContext, InventoryServiceError> {
        let vehicle = self.load_vehicle(vehicle_id)?;
        match self.editor_for(actor, vehicle_id)? {
            Some(editor) => Ok(EditContext { editor, vehicle }),
            None => {
                warn!(
                    "event=inventory_edit module=service status=error reason=access_denied vehicle_id={vehicle_id} user_id={}",
                    actor.id
                );
                Err(InventoryServiceError::AccessDenied(vehicle_id))
            }
        }
    }

    /// Takes `amount` out of stock.
    pub fn use_material(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        amount: u32,
    ) -> Result<Material, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        stocked_material(&ctx.vehicle, item_id)?;
        if amount == 0 {
            return Err(ValidationError::NonPositiveQuantity.into());
        }

        // Stock is re-checked by the write; the loaded snapshot may be stale.
        let updated = self
            .vehicles
            .consume_material(vehicle_id, item_id, amount)?;
        self.log_material(
            &ctx,
            &updated,
            messages::material_used(&ctx.editor.name, amount, &updated.unit, &updated.name),
        )?;
        Ok(updated)
    }

    /// Adds `amount` to stock.
    pub fn restock_material(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        amount: u32,
    ) -> Result<Material, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        stocked_material(&ctx.vehicle, item_id)?;
        if amount == 0 {
            return Err(ValidationError::NonPositiveQuantity.into());
        }

        let updated =
            self.vehicles
                .adjust_material_quantity(vehicle_id, item_id, i64::from(amount))?;
        self.log_material(
            &ctx,
            &updated,
            messages::material_restocked(&ctx.editor.name, amount, &updated.unit, &updated.name),
        )?;
        Ok(updated)
    }

    /// Stocks a catalog material on the vehicle.
    ///
    /// `threshold` falls back to `default_material_threshold`.
    pub fn add_material(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        catalog_id: CatalogItemId,
        quantity: u32,
        threshold: Option<u32>,
    ) -> Result<Material, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        let master = self
            .catalog
            .get_material(catalog_id)?
            .ok_or(InventoryServiceError::CatalogItemNotFound(catalog_id))?;
        if ctx.vehicle.material(catalog_id).is_some() {
            return Err(InventoryServiceError::AlreadyStocked {
                vehicle_id,
                item_id: catalog_id,
            });
        }

        let material = Material {
            item_id: master.id,
            name: master.name,
            unit: master.unit,
            quantity,
            threshold: threshold.unwrap_or(self.config.default_material_threshold),
        };
        self.vehicles.add_material(vehicle_id, &material)?;
        self.log_material(
            &ctx,
            &material,
            messages::material_stocked(&ctx.editor.name, &material.name),
        )?;
        Ok(material)
    }

    pub fn add_tool(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        catalog_id: CatalogItemId,
        condition: ToolCondition,
    ) -> Result<Tool, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        let master = self
            .catalog
            .get_tool(catalog_id)?
            .ok_or(InventoryServiceError::CatalogItemNotFound(catalog_id))?;
        if ctx.vehicle.tool(catalog_id).is_some() {
            return Err(InventoryServiceError::AlreadyStocked {
                vehicle_id,
                item_id: catalog_id,
            });
        }

        let tool = Tool {
            item_id: master.id,
            name: master.name,
            condition,
        };
        self.vehicles.add_tool(vehicle_id, &tool)?;
        self.log(
            &ctx,
            NotificationKind::Update,
            ItemType::Tool,
            messages::tool_added(&ctx.editor.name, &tool.name),
        )?;
        Ok(tool)
    }

    pub fn remove_tool(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
    ) -> Result<Tool, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        let removed = self.vehicles.remove_tool(vehicle_id, item_id)?;
        self.log(
            &ctx,
            NotificationKind::Update,
            ItemType::Tool,
            messages::tool_removed(&ctx.editor.name, &removed.name),
        )?;
        Ok(removed)
    }

    /// Changes a tool's condition. Breaking a tool raises an alert.
    pub fn set_tool_condition(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        condition: ToolCondition,
    ) -> Result<Tool, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        let current = ctx
            .vehicle
            .tool(item_id)
            .cloned()
            .ok_or(InventoryServiceError::ItemNotStocked {
                vehicle_id,
                item_id,
            })?;
        if current.condition == condition {
            return Ok(current);
        }

        self.vehicles
            .set_tool_condition(vehicle_id, item_id, condition)?;
        let kind = if condition == ToolCondition::Broken {
            NotificationKind::Alert
        } else {
            NotificationKind::Update
        };
        self.log(
            &ctx,
            kind,
            ItemType::Tool,
            messages::tool_condition_changed(&ctx.editor.name, &current.name, condition),
        )?;
        Ok(Tool {
            condition,
            ..current
        })
    }

    /// Catalog materials not yet stocked on the vehicle.
    pub fn addable_materials(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
    ) -> Result<Vec<MasterMaterial>, InventoryServiceError> {
        let vehicle = self.visible_vehicle(actor, vehicle_id)?;
        Ok(self
            .catalog
            .list_materials()?
            .into_iter()
            .filter(|master| vehicle.material(master.id).is_none())
            .collect())
    }

    /// Catalog tools not yet on the vehicle.
    pub fn addable_tools(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
    ) -> Result<Vec<MasterTool>, InventoryServiceError> {
        let vehicle = self.visible_vehicle(actor, vehicle_id)?;
        Ok(self
            .catalog
            .list_tools()?
            .into_iter()
            .filter(|master| vehicle.tool(master.id).is_none())
            .collect())
    }

    /// Stocked materials whose name contains `query`, ignoring case.
    pub fn search_materials(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        query: &str,
    ) -> Result<Vec<Material>, InventoryServiceError> {
        let vehicle = self.visible_vehicle(actor, vehicle_id)?;
        let needle = query.trim().to_lowercase();
        Ok(vehicle
            .materials
            .into_iter()
            .filter(|material| needle.is_empty() || material.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub fn report_defect(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        description: &str,
    ) -> Result<Vehicle, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        let description = normalize_defect(description, self.config.defect_min_chars)?;
        self.vehicles.add_defect(vehicle_id, &description)?;
        self.log(
            &ctx,
            NotificationKind::Alert,
            ItemType::Vehicle,
            messages::defect_reported(&ctx.editor.name, &description),
        )?;
        self.load_vehicle(vehicle_id)
    }

    /// Clears the defect at `index` in report order.
    pub fn resolve_defect(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
        index: usize,
    ) -> Result<Vehicle, InventoryServiceError> {
        let ctx = self.edit_context(actor, vehicle_id)?;
        let description = self.vehicles.remove_defect_at(vehicle_id, index)?;
        self.log(
            &ctx,
            NotificationKind::Update,
            ItemType::Vehicle,
            messages::defect_resolved(&ctx.editor.name, &description),
        )?;
        self.load_vehicle(vehicle_id)
    }

    fn load_vehicle(&self, id: VehicleId) -> Result<Vehicle, InventoryServiceError> {
        self.vehicles
            .get_vehicle(id)?
            .ok_or(InventoryServiceError::VehicleNotFound(id))
    }

    fn visible_vehicle(
        &self,
        actor: &Actor,
        id: VehicleId,
    ) -> Result<Vehicle, InventoryServiceError> {
        let visible = match self.users.get_user(actor.id)? {
            Some(user) => user.is_admin() || user.is_assigned_to(id),
            None => false,
        };
        if !visible {
            warn!(
                "event=inventory_view module=service status=error reason=not_visible vehicle_id={id} user_id={}",
                actor.id
            );
            return Err(InventoryServiceError::NotVisible(id));
        }
        self.load_vehicle(id)
    }

    /// Writes the update entry and, when stock is low, the alert entry.
    fn log_material(
        &self,
        ctx: &EditContext,
        material: &Material,
        message: String,
    ) -> Result<(), InventoryServiceError> {
        self.log(ctx, NotificationKind::Update, ItemType::Material, message)?;
        if material.is_low_stock() {
            info!(
                "event=low_stock module=service status=ok vehicle_id={} item_id={} quantity={} threshold={}",
                ctx.vehicle.id, material.item_id, material.quantity, material.threshold
            );
            self.log(
                ctx,
                NotificationKind::Alert,
                ItemType::Material,
                messages::low_stock(&material.name, material.quantity, &material.unit),
            )?;
        }
        Ok(())
    }

    fn log(
        &self,
        ctx: &EditContext,
        kind: NotificationKind,
        item_type: ItemType,
        message: String,
    ) -> Result<(), InventoryServiceError> {
        let entry = NewNotification::new(kind, ctx.vehicle.id, ctx.vehicle.name.clone(), message)
            .about(item_type)
            .from_user(ctx.editor.id);
        record_activity(&self.notifications, entry)?;
        Ok(())
    }
}

fn stocked_material(
    vehicle: &Vehicle,
    item_id: CatalogItemId,
) -> Result<&Material, InventoryServiceError> {
    vehicle
        .material(item_id)
        .ok_or(InventoryServiceError::ItemNotStocked {
            vehicle_id: vehicle.id,
            item_id,
        })
}

/// Trims a defect description and enforces the minimum length.
fn normalize_defect(value: &str, min_chars: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min_chars {
        return Err(ValidationError::TooShort {
            field: "defect",
            min_chars,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_defect;
    use crate::model::ValidationError;

    #[test]
    fn defect_text_is_trimmed_before_length_check() {
        assert_eq!(
            normalize_defect("  Pneu furado  ", 10).unwrap(),
            "Pneu furado"
        );
        assert!(matches!(
            normalize_defect("   curto    ", 10),
            Err(ValidationError::TooShort {
                field: "defect",
                min_chars: 10
            })
        ));
    }

    #[test]
    fn defect_length_counts_characters_not_bytes() {
        assert!(normalize_defect("ãããããããããã", 10).is_ok());
        assert!(normalize_defect("ããããããããã", 10).is_err());
    }
}
