//! Master catalog administration.
//!
//! # Invariants
//! - Only admins create, edit or delete catalog entries; the role is read
//!   from storage, not from the caller's snapshot.
//! - Catalog edits never rewrite materials or tools already on vehicles.

use crate::model::catalog::{CatalogItemId, MasterMaterial, MasterTool};
use crate::model::ValidationError;
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::{EntityRef, RepoError};
use crate::service::Actor;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum CatalogServiceError {
    AdminOnly,
    Validation(ValidationError),
    MaterialNotFound(CatalogItemId),
    ToolNotFound(CatalogItemId),
    Repo(RepoError),
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdminOnly => write!(f, "only admins can change the master catalog"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::MaterialNotFound(id) => write!(f, "catalog material not found: {id}"),
            Self::ToolNotFound(id) => write!(f, "catalog tool not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(EntityRef::MasterMaterial(id)) => Self::MaterialNotFound(id),
            RepoError::NotFound(EntityRef::MasterTool(id)) => Self::ToolNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for CatalogServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct CatalogService<C: CatalogRepository, U: UserRepository> {
    catalog: C,
    users: U,
}

impl<C: CatalogRepository, U: UserRepository> CatalogService<C, U> {
    pub fn new(catalog: C, users: U) -> Self {
        Self { catalog, users }
    }

    pub fn list_materials(&self) -> Result<Vec<MasterMaterial>, CatalogServiceError> {
        Ok(self.catalog.list_materials()?)
    }

    pub fn list_tools(&self) -> Result<Vec<MasterTool>, CatalogServiceError> {
        Ok(self.catalog.list_tools()?)
    }

    /// Adds a material definition. `unit` defaults to `unidades`.
    pub fn add_material(
        &self,
        actor: &Actor,
        name: &str,
        unit: Option<&str>,
    ) -> Result<MasterMaterial, CatalogServiceError> {
        self.ensure_admin(actor)?;
        let material = MasterMaterial::new(name, unit)?;
        self.catalog.create_material(&material)?;
        log_catalog_write("material", "create", material.id);
        Ok(material)
    }

    /// Renames a material definition, optionally changing its unit.
    pub fn edit_material(
        &self,
        actor: &Actor,
        id: CatalogItemId,
        name: &str,
        unit: Option<&str>,
    ) -> Result<MasterMaterial, CatalogServiceError> {
        self.ensure_admin(actor)?;
        let current = self
            .catalog
            .get_material(id)?
            .ok_or(CatalogServiceError::MaterialNotFound(id))?;
        // Omitting the unit keeps the stored one.
        let material = MasterMaterial::with_id(id, name, Some(unit.unwrap_or(&current.unit)))?;
        self.catalog.update_material(&material)?;
        log_catalog_write("material", "update", id);
        Ok(material)
    }

    pub fn delete_material(
        &self,
        actor: &Actor,
        id: CatalogItemId,
    ) -> Result<(), CatalogServiceError> {
        self.ensure_admin(actor)?;
        self.catalog.delete_material(id)?;
        log_catalog_write("material", "delete", id);
        Ok(())
    }

    pub fn add_tool(&self, actor: &Actor, name: &str) -> Result<MasterTool, CatalogServiceError> {
        self.ensure_admin(actor)?;
        let tool = MasterTool::new(name)?;
        self.catalog.create_tool(&tool)?;
        log_catalog_write("tool", "create", tool.id);
        Ok(tool)
    }

    pub fn edit_tool(
        &self,
        actor: &Actor,
        id: CatalogItemId,
        name: &str,
    ) -> Result<MasterTool, CatalogServiceError> {
        self.ensure_admin(actor)?;
        let tool = MasterTool::with_id(id, name)?;
        self.catalog.update_tool(&tool)?;
        log_catalog_write("tool", "update", id);
        Ok(tool)
    }

    pub fn delete_tool(&self, actor: &Actor, id: CatalogItemId) -> Result<(), CatalogServiceError> {
        self.ensure_admin(actor)?;
        self.catalog.delete_tool(id)?;
        log_catalog_write("tool", "delete", id);
        Ok(())
    }

    fn ensure_admin(&self, actor: &Actor) -> Result<(), CatalogServiceError> {
        match self.users.get_user(actor.id)? {
            Some(user) if user.is_admin() => Ok(()),
            _ => Err(CatalogServiceError::AdminOnly),
        }
    }
}

fn log_catalog_write(entity: &str, action: &str, id: CatalogItemId) {
    info!(
        "event=catalog_{action} module=service status=ok entity={entity} item_id={id}"
    );
}
