//! Vehicle aggregate repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist vehicle headers, stocked materials, tools and defect reports.
//! - Assemble the full `Vehicle` aggregate on reads.
//!
//! # Invariants
//! - One material/tool row per `(vehicle, catalog item)`.
//! - Material quantity never goes below zero; adjustments clamp in SQL.
//! - `consume_material` checks and decrements stock in one statement.
//! - Defects are ordered by insertion and addressed by zero-based index.
//! - `operator_ids` is read from `users`, ordered by `assignment_seq`.

use crate::model::catalog::CatalogItemId;
use crate::model::inventory::{Material, Tool, ToolCondition};
use crate::model::user::UserId;
use crate::model::vehicle::{Defect, Vehicle, VehicleDraft, VehicleId, VehicleType};
use crate::model::ValidationError;
use crate::repo::{
    ensure_connection_ready, map_unique_violation, parse_count, parse_uuid, EntityRef,
    RepoError, RepoResult, TableRequirement,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const REQUIRED_SCHEMA: &[TableRequirement] = &[
    (
        "vehicles",
        &["uuid", "name", "plate", "type", "created_at", "updated_at"],
    ),
    (
        "vehicle_materials",
        &["vehicle_uuid", "item_uuid", "name", "unit", "quantity", "threshold"],
    ),
    (
        "vehicle_tools",
        &["vehicle_uuid", "item_uuid", "name", "condition"],
    ),
    (
        "vehicle_defects",
        &["id", "vehicle_uuid", "description", "reported_at"],
    ),
    ("users", &["uuid", "assigned_vehicle_uuid", "assignment_seq"]),
];

const VEHICLE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    plate,
    type,
    created_at
FROM vehicles";

/// Repository interface for vehicle aggregates.
pub trait VehicleRepository {
    /// Inserts a vehicle with no inventory and returns its generated id.
    fn create_vehicle(&self, draft: &VehicleDraft) -> RepoResult<VehicleId>;
    /// Replaces name, plate and type.
    fn update_vehicle_info(&self, id: VehicleId, draft: &VehicleDraft) -> RepoResult<()>;
    fn get_vehicle(&self, id: VehicleId) -> RepoResult<Option<Vehicle>>;
    /// Lists vehicles in creation order, optionally filtered by type.
    fn list_vehicles(&self, kind: Option<VehicleType>) -> RepoResult<Vec<Vehicle>>;
    /// Stocks a new material. `Conflict` when the item is already on the vehicle.
    fn add_material(&self, vehicle_id: VehicleId, material: &Material) -> RepoResult<()>;
    /// Applies `delta` to stock, clamping at zero, and returns the updated row.
    fn adjust_material_quantity(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        delta: i64,
    ) -> RepoResult<Material>;
    /// Takes `amount` out of stock only if that much is on hand.
    ///
    /// `InsufficientStock` carries the quantity seen when the write was refused.
    fn consume_material(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        amount: u32,
    ) -> RepoResult<Material>;
    /// Adds a tool. `Conflict` when the item is already on the vehicle.
    fn add_tool(&self, vehicle_id: VehicleId, tool: &Tool) -> RepoResult<()>;
    /// Removes a tool and returns the removed row.
    fn remove_tool(&self, vehicle_id: VehicleId, item_id: CatalogItemId) -> RepoResult<Tool>;
    fn set_tool_condition(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        condition: ToolCondition,
    ) -> RepoResult<()>;
    fn add_defect(&self, vehicle_id: VehicleId, description: &str) -> RepoResult<()>;
    /// Removes the defect at `index` (report order) and returns its description.
    fn remove_defect_at(&self, vehicle_id: VehicleId, index: usize) -> RepoResult<String>;
}

/// SQLite-backed vehicle repository.
pub struct SqliteVehicleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVehicleRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }

    fn vehicle_exists(&self, id: VehicleId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn ensure_vehicle(&self, id: VehicleId) -> RepoResult<()> {
        if !self.vehicle_exists(id)? {
            return Err(RepoError::NotFound(EntityRef::Vehicle(id)));
        }
        Ok(())
    }

    fn touch(&self, id: VehicleId) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE vehicles
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        Ok(())
    }

    fn load_aggregate(&self, header: VehicleHeader) -> RepoResult<Vehicle> {
        let key = header.id.to_string();
        Ok(Vehicle {
            operator_ids: self.load_operator_ids(&key)?,
            materials: self.load_materials(&key)?,
            tools: self.load_tools(&key)?,
            defects: self.load_defects(&key)?,
            id: header.id,
            name: header.name,
            plate: header.plate,
            kind: header.kind,
            created_at: header.created_at,
        })
    }

    fn load_operator_ids(&self, vehicle_key: &str) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid
             FROM users
             WHERE assigned_vehicle_uuid = ?1
             ORDER BY assignment_seq ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([vehicle_key])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_uuid(&text, "users.uuid")?);
        }
        Ok(ids)
    }

    fn load_materials(&self, vehicle_key: &str) -> RepoResult<Vec<Material>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_uuid, name, unit, quantity, threshold
             FROM vehicle_materials
             WHERE vehicle_uuid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([vehicle_key])?;
        let mut materials = Vec::new();
        while let Some(row) = rows.next()? {
            materials.push(parse_material_row(row)?);
        }
        Ok(materials)
    }

    fn load_tools(&self, vehicle_key: &str) -> RepoResult<Vec<Tool>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_uuid, name, condition
             FROM vehicle_tools
             WHERE vehicle_uuid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([vehicle_key])?;
        let mut tools = Vec::new();
        while let Some(row) = rows.next()? {
            tools.push(parse_tool_row(row)?);
        }
        Ok(tools)
    }

    fn load_defects(&self, vehicle_key: &str) -> RepoResult<Vec<Defect>> {
        let mut stmt = self.conn.prepare(
            "SELECT description, reported_at
             FROM vehicle_defects
             WHERE vehicle_uuid = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([vehicle_key])?;
        let mut defects = Vec::new();
        while let Some(row) = rows.next()? {
            defects.push(Defect {
                position: defects.len(),
                description: row.get("description")?,
                reported_at: row.get("reported_at")?,
            });
        }
        Ok(defects)
    }
}

impl VehicleRepository for SqliteVehicleRepository<'_> {
    fn create_vehicle(&self, draft: &VehicleDraft) -> RepoResult<VehicleId> {
        let draft = draft.normalized()?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO vehicles (uuid, name, plate, type) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.name.as_str(),
                draft.plate.as_str(),
                draft.kind.as_str(),
            ],
        )?;
        Ok(id)
    }

    fn update_vehicle_info(&self, id: VehicleId, draft: &VehicleDraft) -> RepoResult<()> {
        let draft = draft.normalized()?;
        let changed = self.conn.execute(
            "UPDATE vehicles
             SET
                name = ?1,
                plate = ?2,
                type = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                draft.name.as_str(),
                draft.plate.as_str(),
                draft.kind.as_str(),
                id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Vehicle(id)));
        }
        Ok(())
    }

    fn get_vehicle(&self, id: VehicleId) -> RepoResult<Option<Vehicle>> {
        let header = self
            .conn
            .query_row(
                &format!("{VEHICLE_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_header_row(row)),
            )
            .optional()?
            .transpose()?;

        match header {
            Some(header) => Ok(Some(self.load_aggregate(header)?)),
            None => Ok(None),
        }
    }

    fn list_vehicles(&self, kind: Option<VehicleType>) -> RepoResult<Vec<Vehicle>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VEHICLE_SELECT_SQL}
             WHERE (?1 IS NULL OR type = ?1)
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([kind.map(VehicleType::as_str)])?;
        let mut headers = Vec::new();
        while let Some(row) = rows.next()? {
            headers.push(parse_header_row(row)?);
        }

        headers
            .into_iter()
            .map(|header| self.load_aggregate(header))
            .collect()
    }

    fn add_material(&self, vehicle_id: VehicleId, material: &Material) -> RepoResult<()> {
        self.ensure_vehicle(vehicle_id)?;
        self.conn
            .execute(
                "INSERT INTO vehicle_materials (
                    vehicle_uuid,
                    item_uuid,
                    name,
                    unit,
                    quantity,
                    threshold
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    vehicle_id.to_string(),
                    material.item_id.to_string(),
                    material.name.as_str(),
                    material.unit.as_str(),
                    i64::from(material.quantity),
                    i64::from(material.threshold),
                ],
            )
            .map_err(|err| {
                map_unique_violation(
                    err,
                    EntityRef::VehicleMaterial {
                        vehicle_id,
                        item_id: material.item_id,
                    },
                )
            })?;
        self.touch(vehicle_id)
    }

    fn adjust_material_quantity(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        delta: i64,
    ) -> RepoResult<Material> {
        let updated = self
            .conn
            .query_row(
                "UPDATE vehicle_materials
                 SET quantity = MIN(MAX(quantity + ?3, 0), 4294967295)
                 WHERE vehicle_uuid = ?1
                   AND item_uuid = ?2
                 RETURNING item_uuid, name, unit, quantity, threshold;",
                params![vehicle_id.to_string(), item_id.to_string(), delta],
                |row| Ok(parse_material_row(row)),
            )
            .optional()?
            .transpose()?;

        let material = updated.ok_or(RepoError::NotFound(EntityRef::VehicleMaterial {
            vehicle_id,
            item_id,
        }))?;
        self.touch(vehicle_id)?;
        Ok(material)
    }

    fn consume_material(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        amount: u32,
    ) -> RepoResult<Material> {
        let vehicle_key = vehicle_id.to_string();
        let item_key = item_id.to_string();
        let updated = self
            .conn
            .query_row(
                "UPDATE vehicle_materials
                 SET quantity = quantity - ?3
                 WHERE vehicle_uuid = ?1
                   AND item_uuid = ?2
                   AND quantity >= ?3
                 RETURNING item_uuid, name, unit, quantity, threshold;",
                params![vehicle_key, item_key, amount],
                |row| Ok(parse_material_row(row)),
            )
            .optional()?
            .transpose()?;

        if let Some(material) = updated {
            self.touch(vehicle_id)?;
            return Ok(material);
        }

        let available: Option<i64> = self
            .conn
            .query_row(
                "SELECT quantity FROM vehicle_materials
                 WHERE vehicle_uuid = ?1 AND item_uuid = ?2;",
                params![vehicle_key, item_key],
                |row| row.get(0),
            )
            .optional()?;
        match available {
            Some(value) => Err(ValidationError::InsufficientStock {
                requested: amount,
                available: parse_count(value, "vehicle_materials.quantity")?,
            }
            .into()),
            None => Err(RepoError::NotFound(EntityRef::VehicleMaterial {
                vehicle_id,
                item_id,
            })),
        }
    }

    fn add_tool(&self, vehicle_id: VehicleId, tool: &Tool) -> RepoResult<()> {
        self.ensure_vehicle(vehicle_id)?;
        self.conn
            .execute(
                "INSERT INTO vehicle_tools (vehicle_uuid, item_uuid, name, condition)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    vehicle_id.to_string(),
                    tool.item_id.to_string(),
                    tool.name.as_str(),
                    tool.condition.as_str(),
                ],
            )
            .map_err(|err| {
                map_unique_violation(
                    err,
                    EntityRef::VehicleTool {
                        vehicle_id,
                        item_id: tool.item_id,
                    },
                )
            })?;
        self.touch(vehicle_id)
    }

    fn remove_tool(&self, vehicle_id: VehicleId, item_id: CatalogItemId) -> RepoResult<Tool> {
        let removed = self
            .conn
            .query_row(
                "DELETE FROM vehicle_tools
                 WHERE vehicle_uuid = ?1
                   AND item_uuid = ?2
                 RETURNING item_uuid, name, condition;",
                params![vehicle_id.to_string(), item_id.to_string()],
                |row| Ok(parse_tool_row(row)),
            )
            .optional()?
            .transpose()?;

        let tool = removed.ok_or(RepoError::NotFound(EntityRef::VehicleTool {
            vehicle_id,
            item_id,
        }))?;
        self.touch(vehicle_id)?;
        Ok(tool)
    }

    fn set_tool_condition(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        condition: ToolCondition,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE vehicle_tools
             SET condition = ?3
             WHERE vehicle_uuid = ?1
               AND item_uuid = ?2;",
            params![
                vehicle_id.to_string(),
                item_id.to_string(),
                condition.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::VehicleTool {
                vehicle_id,
                item_id,
            }));
        }
        self.touch(vehicle_id)
    }

    fn add_defect(&self, vehicle_id: VehicleId, description: &str) -> RepoResult<()> {
        self.ensure_vehicle(vehicle_id)?;
        self.conn.execute(
            "INSERT INTO vehicle_defects (vehicle_uuid, description) VALUES (?1, ?2);",
            params![vehicle_id.to_string(), description],
        )?;
        self.touch(vehicle_id)
    }

    fn remove_defect_at(&self, vehicle_id: VehicleId, index: usize) -> RepoResult<String> {
        self.ensure_vehicle(vehicle_id)?;
        let offset = i64::try_from(index)
            .map_err(|_| RepoError::NotFound(EntityRef::Defect { vehicle_id, index }))?;

        let tx = self.conn.unchecked_transaction()?;
        let target: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, description
                 FROM vehicle_defects
                 WHERE vehicle_uuid = ?1
                 ORDER BY id ASC
                 LIMIT 1 OFFSET ?2;",
                params![vehicle_id.to_string(), offset],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (defect_id, description) =
            target.ok_or(RepoError::NotFound(EntityRef::Defect { vehicle_id, index }))?;
        tx.execute("DELETE FROM vehicle_defects WHERE id = ?1;", [defect_id])?;
        tx.commit()?;

        self.touch(vehicle_id)?;
        Ok(description)
    }
}

struct VehicleHeader {
    id: VehicleId,
    name: String,
    plate: String,
    kind: VehicleType,
    created_at: i64,
}

fn parse_header_row(row: &Row<'_>) -> RepoResult<VehicleHeader> {
    let uuid_text: String = row.get("uuid")?;
    let type_text: String = row.get("type")?;
    let kind = VehicleType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid vehicle type `{type_text}` in vehicles.type"))
    })?;

    Ok(VehicleHeader {
        id: parse_uuid(&uuid_text, "vehicles.uuid")?,
        name: row.get("name")?,
        plate: row.get("plate")?,
        kind,
        created_at: row.get("created_at")?,
    })
}

fn parse_material_row(row: &Row<'_>) -> RepoResult<Material> {
    let item_text: String = row.get("item_uuid")?;
    Ok(Material {
        item_id: parse_uuid(&item_text, "vehicle_materials.item_uuid")?,
        name: row.get("name")?,
        unit: row.get("unit")?,
        quantity: parse_count(row.get("quantity")?, "vehicle_materials.quantity")?,
        threshold: parse_count(row.get("threshold")?, "vehicle_materials.threshold")?,
    })
}

fn parse_tool_row(row: &Row<'_>) -> RepoResult<Tool> {
    let item_text: String = row.get("item_uuid")?;
    let condition_text: String = row.get("condition")?;
    let condition = ToolCondition::parse(&condition_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid tool condition `{condition_text}` in vehicle_tools.condition"
        ))
    })?;

    Ok(Tool {
        item_id: parse_uuid(&item_text, "vehicle_tools.item_uuid")?,
        name: row.get("name")?,
        condition,
    })
}
