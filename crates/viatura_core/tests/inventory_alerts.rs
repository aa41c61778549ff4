mod common;

use rusqlite::Connection;
use std::cell::Cell;
use viatura_core::db::open_db_in_memory;
use viatura_core::{
    AccountService, CatalogItemId, FleetConfig, InventoryService, InventoryServiceError,
    ItemType, Material, Notification, NotificationKind, NotificationQuery,
    NotificationRepository, RepoResult, SqliteCatalogRepository, SqliteNotificationRepository,
    SqliteUserRepository, SqliteVehicleRepository, Tool, ToolCondition, User, ValidationError,
    Vehicle, VehicleDraft, VehicleId, VehicleRepository, VehicleType,
};

struct Fixture {
    conn: Connection,
    admin: User,
    operator: User,
    vehicle: Vehicle,
}

fn fixture() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let vehicle = common::vehicle(&conn, &admin, "Viatura 01 - Alpha");
    let operator = common::assigned_operator(&conn, &admin, &vehicle, "1", "João Silva");
    Fixture {
        conn,
        admin,
        operator,
        vehicle,
    }
}

fn feed_entries(conn: &Connection) -> Vec<Notification> {
    SqliteNotificationRepository::try_new(conn)
        .unwrap()
        .list(&NotificationQuery::default())
        .unwrap()
}

#[test]
fn using_material_logs_update_and_low_stock_alert() {
    let fx = fixture();
    let tape = common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_material(&fx.admin, fx.vehicle.id, tape.id, 8, Some(5))
        .unwrap();

    let updated = inventory
        .use_material(&fx.operator, fx.vehicle.id, tape.id, 3)
        .unwrap();
    assert_eq!(updated.quantity, 5);
    assert!(updated.is_low_stock());

    let entries = feed_entries(&fx.conn);
    // Newest first: alert, use update, stocking update.
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, NotificationKind::Alert);
    assert_eq!(entries[0].message, "Low stock: \"Fita Isolante\" is at 5 rolos.");
    assert_eq!(entries[1].kind, NotificationKind::Update);
    assert_eq!(
        entries[1].message,
        "João Silva used 3 rolos of \"Fita Isolante\"."
    );
    assert_eq!(entries[1].item_type, Some(ItemType::Material));
    assert_eq!(entries[1].user_id, Some(fx.operator.id));
    assert_eq!(entries[1].vehicle_name, "Viatura 01 - Alpha");
}

#[test]
fn using_more_than_stock_or_zero_is_rejected() {
    let fx = fixture();
    let cable = common::catalog_material(&fx.conn, &fx.admin, "Cabos de Fibra Óptica", "metros");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_material(&fx.admin, fx.vehicle.id, cable.id, 10, Some(2))
        .unwrap();

    assert!(matches!(
        inventory.use_material(&fx.operator, fx.vehicle.id, cable.id, 11),
        Err(InventoryServiceError::Validation(
            ValidationError::InsufficientStock {
                requested: 11,
                available: 10
            }
        ))
    ));
    assert!(matches!(
        inventory.use_material(&fx.operator, fx.vehicle.id, cable.id, 0),
        Err(InventoryServiceError::Validation(
            ValidationError::NonPositiveQuantity
        ))
    ));
    assert!(matches!(
        inventory.restock_material(&fx.operator, fx.vehicle.id, cable.id, 0),
        Err(InventoryServiceError::Validation(
            ValidationError::NonPositiveQuantity
        ))
    ));
    // Only the stocking entry was written.
    assert_eq!(feed_entries(&fx.conn).len(), 1);
}

#[test]
fn restock_above_threshold_logs_only_an_update() {
    let fx = fixture();
    let tape = common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_material(&fx.admin, fx.vehicle.id, tape.id, 20, Some(5))
        .unwrap();

    let updated = inventory
        .restock_material(&fx.operator, fx.vehicle.id, tape.id, 4)
        .unwrap();
    assert_eq!(updated.quantity, 24);

    let entries = feed_entries(&fx.conn);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, NotificationKind::Update);
    assert_eq!(entries[0].message, "João Silva added 4 rolos of \"Fita Isolante\".");
}

#[test]
fn add_material_uses_default_threshold_and_rejects_duplicates() {
    let fx = fixture();
    let connectors = common::catalog_material(&fx.conn, &fx.admin, "Conectores SC/APC", "unidades");
    let inventory = common::inventory(&fx.conn);

    let stocked = inventory
        .add_material(&fx.operator, fx.vehicle.id, connectors.id, 3, None)
        .unwrap();
    assert_eq!(stocked.threshold, FleetConfig::default().default_material_threshold);
    assert_eq!(stocked.unit, "unidades");

    let entries = feed_entries(&fx.conn);
    assert_eq!(entries.len(), 2, "low initial stock raises an alert");
    assert_eq!(entries[0].kind, NotificationKind::Alert);

    assert!(matches!(
        inventory.add_material(&fx.operator, fx.vehicle.id, connectors.id, 3, None),
        Err(InventoryServiceError::AlreadyStocked { .. })
    ));
    assert!(matches!(
        inventory.add_material(&fx.operator, fx.vehicle.id, uuid::Uuid::new_v4(), 3, None),
        Err(InventoryServiceError::CatalogItemNotFound(_))
    ));
}

#[test]
fn addable_lists_exclude_stocked_items() {
    let fx = fixture();
    let tape = common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    let alcohol = common::catalog_material(&fx.conn, &fx.admin, "Álcool Isopropílico", "litros");
    let splicer = common::catalog_tool(&fx.conn, &fx.admin, "Máquina de Fusão");
    let meter = common::catalog_tool(&fx.conn, &fx.admin, "Power Meter");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_material(&fx.admin, fx.vehicle.id, tape.id, 10, None)
        .unwrap();
    inventory
        .add_tool(&fx.admin, fx.vehicle.id, splicer.id, ToolCondition::Good)
        .unwrap();

    let materials = inventory.addable_materials(&fx.admin, fx.vehicle.id).unwrap();
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0].id, alcohol.id);

    let tools = inventory.addable_tools(&fx.operator, fx.vehicle.id).unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].id, meter.id);
}

#[test]
fn breaking_a_tool_raises_an_alert_and_repairs_log_updates() {
    let fx = fixture();
    let meter = common::catalog_tool(&fx.conn, &fx.admin, "Power Meter");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_tool(&fx.operator, fx.vehicle.id, meter.id, ToolCondition::Good)
        .unwrap();

    let broken = inventory
        .set_tool_condition(&fx.operator, fx.vehicle.id, meter.id, ToolCondition::Broken)
        .unwrap();
    assert_eq!(broken.condition, ToolCondition::Broken);
    inventory
        .set_tool_condition(&fx.operator, fx.vehicle.id, meter.id, ToolCondition::NeedsRepair)
        .unwrap();

    let entries = feed_entries(&fx.conn);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, NotificationKind::Update);
    assert_eq!(
        entries[0].message,
        "João Silva marked tool \"Power Meter\" as needs repair."
    );
    assert_eq!(entries[1].kind, NotificationKind::Alert);
    assert_eq!(entries[1].item_type, Some(ItemType::Tool));

    let vehicle = common::fleet(&fx.conn)
        .vehicle_detail(&fx.admin, fx.vehicle.id)
        .unwrap();
    assert_eq!(vehicle.tools_needing_repair(), 1);
}

#[test]
fn removing_a_tool_logs_an_update() {
    let fx = fixture();
    let meter = common::catalog_tool(&fx.conn, &fx.admin, "Power Meter");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_tool(&fx.operator, fx.vehicle.id, meter.id, ToolCondition::Good)
        .unwrap();

    let removed = inventory
        .remove_tool(&fx.operator, fx.vehicle.id, meter.id)
        .unwrap();
    assert_eq!(removed.name, "Power Meter");
    assert_eq!(
        feed_entries(&fx.conn)[0].message,
        "João Silva removed tool \"Power Meter\"."
    );
    assert!(matches!(
        inventory.remove_tool(&fx.operator, fx.vehicle.id, meter.id),
        Err(InventoryServiceError::ItemNotStocked { .. })
    ));
}

#[test]
fn defects_need_minimum_length_and_resolve_by_index() {
    let fx = fixture();
    let inventory = common::inventory(&fx.conn);

    assert!(matches!(
        inventory.report_defect(&fx.operator, fx.vehicle.id, "  curto  "),
        Err(InventoryServiceError::Validation(
            ValidationError::TooShort { .. }
        ))
    ));

    inventory
        .report_defect(&fx.operator, fx.vehicle.id, "  Pneu dianteiro furado ")
        .unwrap();
    let vehicle = inventory
        .report_defect(&fx.operator, fx.vehicle.id, "Luz de freio queimada")
        .unwrap();
    assert_eq!(vehicle.defects.len(), 2);
    assert_eq!(vehicle.defects[0].description, "Pneu dianteiro furado");

    let alert = &feed_entries(&fx.conn)[0];
    assert_eq!(alert.kind, NotificationKind::Alert);
    assert_eq!(alert.item_type, Some(ItemType::Vehicle));

    let vehicle = inventory
        .resolve_defect(&fx.operator, fx.vehicle.id, 0)
        .unwrap();
    assert_eq!(vehicle.defects.len(), 1);
    assert_eq!(vehicle.defects[0].description, "Luz de freio queimada");
    assert_eq!(
        feed_entries(&fx.conn)[0].message,
        "João Silva resolved the defect: \"Pneu dianteiro furado\""
    );

    assert!(matches!(
        inventory.resolve_defect(&fx.operator, fx.vehicle.id, 5),
        Err(InventoryServiceError::DefectNotFound { index: 5, .. })
    ));
}

#[test]
fn revoked_or_unassigned_operators_cannot_edit() {
    let fx = fixture();
    let outsider = common::operator(&fx.conn, "2", "Maria");
    let tape = common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_material(&fx.admin, fx.vehicle.id, tape.id, 10, None)
        .unwrap();

    assert!(matches!(
        inventory.use_material(&outsider, fx.vehicle.id, tape.id, 1),
        Err(InventoryServiceError::AccessDenied(_))
    ));

    let accounts = AccountService::new(
        SqliteUserRepository::try_new(&fx.conn).unwrap(),
        FleetConfig::default(),
    );
    accounts
        .set_edit_permission(&fx.admin, fx.operator.id, false)
        .unwrap();
    assert!(!inventory.can_edit_vehicle(&fx.operator, fx.vehicle.id).unwrap());
    assert!(matches!(
        inventory.report_defect(&fx.operator, fx.vehicle.id, "Retrovisor quebrado"),
        Err(InventoryServiceError::AccessDenied(_))
    ));
    assert!(inventory.can_edit_vehicle(&fx.admin, fx.vehicle.id).unwrap());
}

#[test]
fn search_is_case_insensitive_and_blank_returns_all() {
    let fx = fixture();
    let inventory = common::inventory(&fx.conn);
    for (name, unit) in [
        ("Cabos de Fibra Óptica", "metros"),
        ("Conectores SC/APC", "unidades"),
        ("Fita Isolante", "rolos"),
    ] {
        let master = common::catalog_material(&fx.conn, &fx.admin, name, unit);
        inventory
            .add_material(&fx.admin, fx.vehicle.id, master.id, 50, None)
            .unwrap();
    }

    let hits = inventory.search_materials(&fx.operator, fx.vehicle.id, "FIBRA").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Cabos de Fibra Óptica");

    assert_eq!(inventory.search_materials(&fx.admin, fx.vehicle.id, "  ").unwrap().len(), 3);
    assert!(inventory.search_materials(&fx.admin, fx.vehicle.id, "xyz").unwrap().is_empty());
}

#[test]
fn read_queries_need_vehicle_visibility() {
    let fx = fixture();
    let bravo = common::vehicle(&fx.conn, &fx.admin, "Viatura 02 - Bravo");
    let stranger = common::operator(&fx.conn, "2", "Maria");
    common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    let inventory = common::inventory(&fx.conn);

    assert!(matches!(
        inventory.addable_materials(&fx.operator, bravo.id),
        Err(InventoryServiceError::NotVisible(id)) if id == bravo.id
    ));
    assert!(matches!(
        inventory.addable_tools(&stranger, fx.vehicle.id),
        Err(InventoryServiceError::NotVisible(_))
    ));
    assert!(matches!(
        inventory.search_materials(&stranger, fx.vehicle.id, "fita"),
        Err(InventoryServiceError::NotVisible(_))
    ));
    assert_eq!(
        inventory
            .addable_materials(&fx.operator, fx.vehicle.id)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        inventory.addable_materials(&fx.admin, bravo.id).unwrap().len(),
        1
    );
}

#[test]
fn stocked_names_survive_catalog_deletion() {
    let fx = fixture();
    let tape = common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    let inventory = common::inventory(&fx.conn);
    inventory
        .add_material(&fx.admin, fx.vehicle.id, tape.id, 10, None)
        .unwrap();

    common::catalog(&fx.conn)
        .delete_material(&fx.admin, tape.id)
        .unwrap();

    let vehicle = common::fleet(&fx.conn)
        .vehicle_detail(&fx.admin, fx.vehicle.id)
        .unwrap();
    assert_eq!(vehicle.materials[0].name, "Fita Isolante");
    assert_eq!(vehicle.materials[0].unit, "rolos");
    assert!(inventory.addable_materials(&fx.admin, fx.vehicle.id).unwrap().is_empty());
}

/// Vehicle store where another crew takes stock right after each read.
struct RacingStore<'c> {
    inner: SqliteVehicleRepository<'c>,
    drain: Cell<Option<(CatalogItemId, i64)>>,
}

impl VehicleRepository for RacingStore<'_> {
    fn create_vehicle(&self, draft: &VehicleDraft) -> RepoResult<VehicleId> {
        self.inner.create_vehicle(draft)
    }

    fn update_vehicle_info(&self, id: VehicleId, draft: &VehicleDraft) -> RepoResult<()> {
        self.inner.update_vehicle_info(id, draft)
    }

    fn get_vehicle(&self, id: VehicleId) -> RepoResult<Option<Vehicle>> {
        let snapshot = self.inner.get_vehicle(id)?;
        if let Some((item_id, taken)) = self.drain.take() {
            self.inner.adjust_material_quantity(id, item_id, -taken)?;
        }
        Ok(snapshot)
    }

    fn list_vehicles(&self, kind: Option<VehicleType>) -> RepoResult<Vec<Vehicle>> {
        self.inner.list_vehicles(kind)
    }

    fn add_material(&self, vehicle_id: VehicleId, material: &Material) -> RepoResult<()> {
        self.inner.add_material(vehicle_id, material)
    }

    fn adjust_material_quantity(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        delta: i64,
    ) -> RepoResult<Material> {
        self.inner.adjust_material_quantity(vehicle_id, item_id, delta)
    }

    fn consume_material(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        amount: u32,
    ) -> RepoResult<Material> {
        self.inner.consume_material(vehicle_id, item_id, amount)
    }

    fn add_tool(&self, vehicle_id: VehicleId, tool: &Tool) -> RepoResult<()> {
        self.inner.add_tool(vehicle_id, tool)
    }

    fn remove_tool(&self, vehicle_id: VehicleId, item_id: CatalogItemId) -> RepoResult<Tool> {
        self.inner.remove_tool(vehicle_id, item_id)
    }

    fn set_tool_condition(
        &self,
        vehicle_id: VehicleId,
        item_id: CatalogItemId,
        condition: ToolCondition,
    ) -> RepoResult<()> {
        self.inner.set_tool_condition(vehicle_id, item_id, condition)
    }

    fn add_defect(&self, vehicle_id: VehicleId, description: &str) -> RepoResult<()> {
        self.inner.add_defect(vehicle_id, description)
    }

    fn remove_defect_at(&self, vehicle_id: VehicleId, index: usize) -> RepoResult<String> {
        self.inner.remove_defect_at(vehicle_id, index)
    }
}

#[test]
fn stock_taken_after_the_read_is_not_overdrawn() {
    let fx = fixture();
    let tape = common::catalog_material(&fx.conn, &fx.admin, "Fita Isolante", "rolos");
    common::inventory(&fx.conn)
        .add_material(&fx.admin, fx.vehicle.id, tape.id, 10, Some(1))
        .unwrap();

    let racing = InventoryService::new(
        RacingStore {
            inner: SqliteVehicleRepository::try_new(&fx.conn).unwrap(),
            drain: Cell::new(Some((tape.id, 8))),
        },
        SqliteUserRepository::try_new(&fx.conn).unwrap(),
        SqliteCatalogRepository::try_new(&fx.conn).unwrap(),
        SqliteNotificationRepository::try_new(&fx.conn).unwrap(),
        FleetConfig::default(),
    );

    assert!(matches!(
        racing.use_material(&fx.admin, fx.vehicle.id, tape.id, 10),
        Err(InventoryServiceError::Validation(
            ValidationError::InsufficientStock {
                requested: 10,
                available: 2
            }
        ))
    ));

    let vehicle = common::fleet(&fx.conn)
        .vehicle_detail(&fx.admin, fx.vehicle.id)
        .unwrap();
    assert_eq!(vehicle.materials[0].quantity, 2);
    // Only the stocking entry; the refused use wrote nothing.
    assert_eq!(feed_entries(&fx.conn).len(), 1);
}
