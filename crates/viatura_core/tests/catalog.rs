mod common;

use viatura_core::db::open_db_in_memory;
use viatura_core::{CatalogServiceError, UserRole, ValidationError};

#[test]
fn catalog_writes_are_admin_only() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let operator = common::operator(&conn, "1", "João");
    let catalog = common::catalog(&conn);
    let tape = common::catalog_material(&conn, &admin, "Fita Isolante", "rolos");

    assert!(matches!(
        catalog.add_material(&operator, "Cabo", None),
        Err(CatalogServiceError::AdminOnly)
    ));
    assert!(matches!(
        catalog.edit_material(&operator, tape.id, "Fita", None),
        Err(CatalogServiceError::AdminOnly)
    ));
    assert!(matches!(
        catalog.delete_material(&operator, tape.id),
        Err(CatalogServiceError::AdminOnly)
    ));
    assert!(matches!(
        catalog.add_tool(&operator, "Power Meter"),
        Err(CatalogServiceError::AdminOnly)
    ));
    assert_eq!(catalog.list_materials().unwrap().len(), 1);
}

#[test]
fn an_elevated_snapshot_is_still_an_operator() {
    let conn = open_db_in_memory().unwrap();
    let mut operator = common::operator(&conn, "1", "João");
    operator.role = UserRole::Admin;
    let catalog = common::catalog(&conn);

    assert!(matches!(
        catalog.add_material(&operator, "Cabo", None),
        Err(CatalogServiceError::AdminOnly)
    ));
    assert!(matches!(
        catalog.add_tool(&operator, "Power Meter"),
        Err(CatalogServiceError::AdminOnly)
    ));
    assert!(catalog.list_materials().unwrap().is_empty());
}

#[test]
fn material_unit_defaults_and_survives_rename() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let catalog = common::catalog(&conn);

    let connectors = catalog
        .add_material(&admin, "  Conectores SC/APC ", None)
        .unwrap();
    assert_eq!(connectors.name, "Conectores SC/APC");
    assert_eq!(connectors.unit, "unidades");

    let cable = catalog
        .add_material(&admin, "Cabo", Some("metros"))
        .unwrap();
    let renamed = catalog
        .edit_material(&admin, cable.id, "Cabos de Fibra Óptica", None)
        .unwrap();
    assert_eq!(renamed.unit, "metros");

    let relabeled = catalog
        .edit_material(&admin, cable.id, "Cabos de Fibra Óptica", Some("rolos"))
        .unwrap();
    assert_eq!(relabeled.unit, "rolos");

    let stored = catalog
        .list_materials()
        .unwrap()
        .into_iter()
        .find(|material| material.id == cable.id)
        .unwrap();
    assert_eq!(stored.name, "Cabos de Fibra Óptica");
    assert_eq!(stored.unit, "rolos");
}

#[test]
fn blank_names_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let catalog = common::catalog(&conn);

    assert!(matches!(
        catalog.add_material(&admin, "   ", None),
        Err(CatalogServiceError::Validation(ValidationError::BlankField("name")))
    ));
    assert!(matches!(
        catalog.add_material(&admin, "Cabo", Some(" ")),
        Err(CatalogServiceError::Validation(ValidationError::BlankField("unit")))
    ));
    assert!(matches!(
        catalog.add_tool(&admin, ""),
        Err(CatalogServiceError::Validation(ValidationError::BlankField("name")))
    ));
}

#[test]
fn listings_sort_by_name_ignoring_case() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let catalog = common::catalog(&conn);
    for name in ["Power Meter", "alicate de Corte", "Clivador de Precisão"] {
        catalog.add_tool(&admin, name).unwrap();
    }

    let names: Vec<String> = catalog
        .list_tools()
        .unwrap()
        .into_iter()
        .map(|tool| tool.name)
        .collect();
    assert_eq!(names, ["alicate de Corte", "Clivador de Precisão", "Power Meter"]);
}

#[test]
fn editing_or_deleting_missing_entries_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let admin = common::admin(&conn);
    let catalog = common::catalog(&conn);
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        catalog.edit_material(&admin, missing, "Cabo", None),
        Err(CatalogServiceError::MaterialNotFound(id)) if id == missing
    ));
    assert!(matches!(
        catalog.delete_tool(&admin, missing),
        Err(CatalogServiceError::ToolNotFound(id)) if id == missing
    ));

    let meter = common::catalog_tool(&conn, &admin, "Power Meter");
    let renamed = catalog.edit_tool(&admin, meter.id, "Power Meter Óptico").unwrap();
    assert_eq!(renamed.name, "Power Meter Óptico");
    catalog.delete_tool(&admin, meter.id).unwrap();
    assert!(catalog.list_tools().unwrap().is_empty());
}
