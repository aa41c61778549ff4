#![allow(dead_code)]

use rusqlite::Connection;
use viatura_core::{
    AccountService, CatalogService, FeedService, FleetConfig, FleetService, InventoryService,
    MasterMaterial, MasterTool, RegisterRequest, SqliteCatalogRepository,
    SqliteNotificationRepository, SqliteUserRepository, SqliteVehicleRepository, User, Vehicle,
    VehicleDraft, VehicleType,
};

pub const PASSWORD: &str = "segredo1";

pub type Fleet<'c> = FleetService<
    SqliteVehicleRepository<'c>,
    SqliteUserRepository<'c>,
    SqliteNotificationRepository<'c>,
>;
pub type Inventory<'c> = InventoryService<
    SqliteVehicleRepository<'c>,
    SqliteUserRepository<'c>,
    SqliteCatalogRepository<'c>,
    SqliteNotificationRepository<'c>,
>;

pub fn accounts(conn: &Connection) -> AccountService<SqliteUserRepository<'_>> {
    AccountService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        FleetConfig::default(),
    )
}

pub fn fleet(conn: &Connection) -> Fleet<'_> {
    FleetService::new(
        SqliteVehicleRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteNotificationRepository::try_new(conn).unwrap(),
        FleetConfig::default(),
    )
}

pub fn inventory(conn: &Connection) -> Inventory<'_> {
    InventoryService::new(
        SqliteVehicleRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteCatalogRepository::try_new(conn).unwrap(),
        SqliteNotificationRepository::try_new(conn).unwrap(),
        FleetConfig::default(),
    )
}

pub fn catalog(
    conn: &Connection,
) -> CatalogService<SqliteCatalogRepository<'_>, SqliteUserRepository<'_>> {
    CatalogService::new(
        SqliteCatalogRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

pub fn feed(
    conn: &Connection,
) -> FeedService<SqliteNotificationRepository<'_>, SqliteUserRepository<'_>> {
    FeedService::new(
        SqliteNotificationRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
        FleetConfig::default(),
    )
}

pub fn request(username: &str, name: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_string(),
        username: username.to_string(),
        email: format!("{username}@viatura.test"),
        password: PASSWORD.to_string(),
        password_confirmation: PASSWORD.to_string(),
    }
}

pub fn admin(conn: &Connection) -> User {
    accounts(conn)
        .create_admin(&request("900000", "Admin"))
        .unwrap()
}

pub fn operator(conn: &Connection, username: &str, name: &str) -> User {
    accounts(conn).register(&request(username, name)).unwrap()
}

pub fn vehicle(conn: &Connection, admin: &User, name: &str) -> Vehicle {
    fleet(conn)
        .add_vehicle(admin, &VehicleDraft::new(name, "ABC-1234", VehicleType::Poda))
        .unwrap()
}

/// Operator assigned to `vehicle`, with the refreshed assignment.
pub fn assigned_operator(
    conn: &Connection,
    admin: &User,
    vehicle: &Vehicle,
    username: &str,
    name: &str,
) -> User {
    let user = operator(conn, username, name);
    fleet(conn)
        .assign_operator(admin, user.id, Some(vehicle.id))
        .unwrap();
    accounts(conn).get_user(user.id).unwrap()
}

pub fn catalog_material(conn: &Connection, admin: &User, name: &str, unit: &str) -> MasterMaterial {
    catalog(conn).add_material(admin, name, Some(unit)).unwrap()
}

pub fn catalog_tool(conn: &Connection, admin: &User, name: &str) -> MasterTool {
    catalog(conn).add_tool(admin, name).unwrap()
}
