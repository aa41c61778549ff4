//! Core domain logic for the viatura fleet inventory.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::{ConfigError, FleetConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::catalog::{CatalogItemId, MasterMaterial, MasterTool};
pub use model::inventory::{Material, Tool, ToolCondition};
pub use model::notification::{ItemType, Notification, NotificationId, NotificationKind};
pub use model::user::{RegisterRequest, User, UserId, UserRole};
pub use model::vehicle::{Defect, Vehicle, VehicleDraft, VehicleId, VehicleType};
pub use model::ValidationError;
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::notification_repo::{
    NotificationQuery, NotificationRepository, SqliteNotificationRepository,
};
pub use repo::user_repo::{AssignmentChange, SqliteUserRepository, UserRepository};
pub use repo::vehicle_repo::{SqliteVehicleRepository, VehicleRepository};
pub use repo::{EntityRef, RepoError, RepoResult};
pub use seed::{seed_demo_fleet, SeedReport};
pub use service::account_service::{AccountService, AccountServiceError};
pub use service::catalog_service::{CatalogService, CatalogServiceError};
pub use service::feed_service::{FeedPage, FeedService, FeedServiceError};
pub use service::fleet_service::{BoardEntry, FleetService, FleetServiceError, VehicleSummary};
pub use service::inventory_service::{InventoryService, InventoryServiceError};
pub use service::Actor;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
