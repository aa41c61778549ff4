mod common;

use uuid::Uuid;
use viatura_core::db::open_db_in_memory;
use viatura_core::{
    FleetServiceError, Material, SqliteVehicleRepository, Tool, ToolCondition, ValidationError,
    VehicleDraft, VehicleRepository, VehicleType,
};

#[test]
fn add_vehicle_normalizes_and_reads_back_empty_inventory() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);

    let created = common::fleet(&conn)
        .add_vehicle(
            &admin,
            &VehicleDraft::new("  Viatura 04 - Delta ", " abc-9999 ", VehicleType::Comercial),
        )
        .unwrap();

    assert_eq!(created.name, "Viatura 04 - Delta");
    assert_eq!(created.plate, "ABC-9999");
    assert_eq!(created.kind, VehicleType::Comercial);
    assert!(created.operator_ids.is_empty());
    assert!(created.materials.is_empty());
    assert!(created.tools.is_empty());
    assert!(created.defects.is_empty());
}

#[test]
fn add_vehicle_rejects_blank_fields_and_non_admins() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let operator = common::operator(&conn, "1", "João Silva");
    let fleet = common::fleet(&conn);

    let err = fleet
        .add_vehicle(&admin, &VehicleDraft::new("Alpha", "   ", VehicleType::Poda))
        .unwrap_err();
    assert!(matches!(
        err,
        FleetServiceError::Validation(ValidationError::BlankField("plate"))
    ));

    let err = fleet
        .add_vehicle(&operator, &VehicleDraft::new("Alpha", "AAA-0001", VehicleType::Poda))
        .unwrap_err();
    assert!(matches!(err, FleetServiceError::AdminOnly));
}

#[test]
fn edit_vehicle_keeps_inventory() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let vehicle = common::vehicle(&conn, &admin, "Alpha");
    let repo = SqliteVehicleRepository::try_new(&conn).unwrap();
    repo.add_defect(vehicle.id, "Retrovisor quebrado").unwrap();

    let edited = common::fleet(&conn)
        .edit_vehicle(
            &admin,
            vehicle.id,
            &VehicleDraft::new("Alpha II", "ZZZ-0000", VehicleType::Prontidao),
        )
        .unwrap();

    assert_eq!(edited.name, "Alpha II");
    assert_eq!(edited.kind, VehicleType::Prontidao);
    assert_eq!(edited.defects.len(), 1);
}

#[test]
fn edit_missing_vehicle_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let missing = Uuid::new_v4();

    let err = common::fleet(&conn)
        .edit_vehicle(&admin, missing, &VehicleDraft::new("X", "Y", VehicleType::Poda))
        .unwrap_err();
    assert!(matches!(err, FleetServiceError::VehicleNotFound(id) if id == missing));
}

#[test]
fn list_vehicles_filters_by_type_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVehicleRepository::try_new(&conn).unwrap();
    let first = repo
        .create_vehicle(&VehicleDraft::new("A", "A-1", VehicleType::Poda))
        .unwrap();
    repo.create_vehicle(&VehicleDraft::new("B", "B-1", VehicleType::Comercial))
        .unwrap();
    let third = repo
        .create_vehicle(&VehicleDraft::new("C", "C-1", VehicleType::Poda))
        .unwrap();

    let all = repo.list_vehicles(None).unwrap();
    assert_eq!(all.len(), 3);

    let poda: Vec<_> = repo
        .list_vehicles(Some(VehicleType::Poda))
        .unwrap()
        .into_iter()
        .map(|vehicle| vehicle.id)
        .collect();
    assert_eq!(poda, vec![first, third]);
}

#[test]
fn stock_adjustment_clamps_at_zero() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVehicleRepository::try_new(&conn).unwrap();
    let vehicle_id = repo
        .create_vehicle(&VehicleDraft::new("A", "A-1", VehicleType::Poda))
        .unwrap();
    let item_id = Uuid::new_v4();
    repo.add_material(
        vehicle_id,
        &Material {
            item_id,
            name: "Fita Isolante".to_string(),
            unit: "rolos".to_string(),
            quantity: 3,
            threshold: 1,
        },
    )
    .unwrap();

    let updated = repo.adjust_material_quantity(vehicle_id, item_id, -10).unwrap();
    assert_eq!(updated.quantity, 0);
    assert!(updated.is_low_stock());
}

#[test]
fn duplicate_tool_is_a_conflict_and_removal_returns_the_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVehicleRepository::try_new(&conn).unwrap();
    let vehicle_id = repo
        .create_vehicle(&VehicleDraft::new("A", "A-1", VehicleType::Poda))
        .unwrap();
    let tool = Tool {
        item_id: Uuid::new_v4(),
        name: "Power Meter".to_string(),
        condition: ToolCondition::Good,
    };
    repo.add_tool(vehicle_id, &tool).unwrap();

    assert!(matches!(
        repo.add_tool(vehicle_id, &tool),
        Err(viatura_core::RepoError::Conflict(_))
    ));

    let removed = repo.remove_tool(vehicle_id, tool.item_id).unwrap();
    assert_eq!(removed, tool);
    assert!(repo.get_vehicle(vehicle_id).unwrap().unwrap().tools.is_empty());
}

#[test]
fn defects_are_addressed_by_report_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVehicleRepository::try_new(&conn).unwrap();
    let vehicle_id = repo
        .create_vehicle(&VehicleDraft::new("A", "A-1", VehicleType::Poda))
        .unwrap();
    repo.add_defect(vehicle_id, "first defect").unwrap();
    repo.add_defect(vehicle_id, "second defect").unwrap();
    repo.add_defect(vehicle_id, "third defect").unwrap();

    assert_eq!(repo.remove_defect_at(vehicle_id, 1).unwrap(), "second defect");

    let defects = repo.get_vehicle(vehicle_id).unwrap().unwrap().defects;
    let descriptions: Vec<_> = defects.iter().map(|d| d.description.as_str()).collect();
    assert_eq!(descriptions, vec!["first defect", "third defect"]);
    assert_eq!(defects[1].position, 1);

    assert!(matches!(
        repo.remove_defect_at(vehicle_id, 2),
        Err(viatura_core::RepoError::NotFound(_))
    ));
}

#[test]
fn dashboard_counts_what_needs_attention() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let alpha = common::vehicle(&conn, &admin, "Alpha");
    let bravo = common::vehicle(&conn, &admin, "Bravo");
    common::assigned_operator(&conn, &admin, &alpha, "1", "João Silva");

    let tape = common::catalog_material(&conn, &admin, "Fita Isolante", "rolos");
    let meter = common::catalog_tool(&conn, &admin, "Power Meter");
    let inventory = common::inventory(&conn);
    inventory
        .add_material(&admin, alpha.id, tape.id, 2, Some(5))
        .unwrap();
    inventory
        .add_tool(&admin, alpha.id, meter.id, ToolCondition::Broken)
        .unwrap();
    inventory
        .report_defect(&admin, alpha.id, "Retrovisor quebrado")
        .unwrap();
    inventory
        .add_tool(&admin, bravo.id, meter.id, ToolCondition::Good)
        .unwrap();

    let rows = common::fleet(&conn).dashboard(None).unwrap();
    assert_eq!(rows.len(), 2);
    let alpha_row = &rows[0];
    assert_eq!(alpha_row.operator_names, ["João Silva"]);
    assert_eq!(alpha_row.material_count, 1);
    assert_eq!(alpha_row.low_stock_count, 1);
    assert_eq!(alpha_row.tools_needing_repair, 1);
    assert_eq!(alpha_row.defect_count, 1);
    assert!(alpha_row.needs_attention);

    let bravo_row = &rows[1];
    assert!(bravo_row.operator_names.is_empty());
    assert_eq!(bravo_row.tool_count, 1);
    assert!(!bravo_row.needs_attention);
}
