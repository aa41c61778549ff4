//! Master catalog repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Lists are sorted by `name COLLATE NOCASE, uuid`.
//! - Deleting a catalog entry leaves stocked vehicle copies untouched.

use crate::model::catalog::{CatalogItemId, MasterMaterial, MasterTool};
use crate::repo::{
    ensure_connection_ready, map_unique_violation, parse_uuid, EntityRef, RepoError,
    RepoResult, TableRequirement,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const REQUIRED_SCHEMA: &[TableRequirement] = &[
    ("master_materials", &["uuid", "name", "unit"]),
    ("master_tools", &["uuid", "name"]),
];

/// Repository interface for master catalog definitions.
pub trait CatalogRepository {
    fn create_material(&self, material: &MasterMaterial) -> RepoResult<()>;
    fn update_material(&self, material: &MasterMaterial) -> RepoResult<()>;
    fn delete_material(&self, id: CatalogItemId) -> RepoResult<()>;
    fn get_material(&self, id: CatalogItemId) -> RepoResult<Option<MasterMaterial>>;
    fn list_materials(&self) -> RepoResult<Vec<MasterMaterial>>;

    fn create_tool(&self, tool: &MasterTool) -> RepoResult<()>;
    fn update_tool(&self, tool: &MasterTool) -> RepoResult<()>;
    fn delete_tool(&self, id: CatalogItemId) -> RepoResult<()>;
    fn get_tool(&self, id: CatalogItemId) -> RepoResult<Option<MasterTool>>;
    fn list_tools(&self) -> RepoResult<Vec<MasterTool>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_material(&self, material: &MasterMaterial) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO master_materials (uuid, name, unit) VALUES (?1, ?2, ?3);",
                params![
                    material.id.to_string(),
                    material.name.as_str(),
                    material.unit.as_str()
                ],
            )
            .map_err(|err| map_unique_violation(err, EntityRef::MasterMaterial(material.id)))?;
        Ok(())
    }

    fn update_material(&self, material: &MasterMaterial) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE master_materials SET name = ?2, unit = ?3 WHERE uuid = ?1;",
            params![
                material.id.to_string(),
                material.name.as_str(),
                material.unit.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::MasterMaterial(material.id)));
        }
        Ok(())
    }

    fn delete_material(&self, id: CatalogItemId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM master_materials WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::MasterMaterial(id)));
        }
        Ok(())
    }

    fn get_material(&self, id: CatalogItemId) -> RepoResult<Option<MasterMaterial>> {
        self.conn
            .query_row(
                "SELECT uuid, name, unit FROM master_materials WHERE uuid = ?1;",
                [id.to_string()],
                |row| Ok(parse_material_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_materials(&self) -> RepoResult<Vec<MasterMaterial>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, unit
             FROM master_materials
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_material_row(row)?);
        }
        Ok(items)
    }

    fn create_tool(&self, tool: &MasterTool) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO master_tools (uuid, name) VALUES (?1, ?2);",
                params![tool.id.to_string(), tool.name.as_str()],
            )
            .map_err(|err| map_unique_violation(err, EntityRef::MasterTool(tool.id)))?;
        Ok(())
    }

    fn update_tool(&self, tool: &MasterTool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE master_tools SET name = ?2 WHERE uuid = ?1;",
            params![tool.id.to_string(), tool.name.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::MasterTool(tool.id)));
        }
        Ok(())
    }

    fn delete_tool(&self, id: CatalogItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM master_tools WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::MasterTool(id)));
        }
        Ok(())
    }

    fn get_tool(&self, id: CatalogItemId) -> RepoResult<Option<MasterTool>> {
        self.conn
            .query_row(
                "SELECT uuid, name FROM master_tools WHERE uuid = ?1;",
                [id.to_string()],
                |row| Ok(parse_tool_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_tools(&self) -> RepoResult<Vec<MasterTool>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name
             FROM master_tools
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_tool_row(row)?);
        }
        Ok(items)
    }
}

fn parse_material_row(row: &Row<'_>) -> RepoResult<MasterMaterial> {
    let uuid_text: String = row.get("uuid")?;
    Ok(MasterMaterial {
        id: parse_uuid(&uuid_text, "master_materials.uuid")?,
        name: row.get("name")?,
        unit: row.get("unit")?,
    })
}

fn parse_tool_row(row: &Row<'_>) -> RepoResult<MasterTool> {
    let uuid_text: String = row.get("uuid")?;
    Ok(MasterTool {
        id: parse_uuid(&uuid_text, "master_tools.uuid")?,
        name: row.get("name")?,
    })
}
