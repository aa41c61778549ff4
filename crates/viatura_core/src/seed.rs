//! Demo fleet fixture for fresh databases.
//!
//! # Invariants
//! - Seeding is a no-op when any vehicle already exists.
//! - Accounts already present (matched by username) are reused, not duplicated.

use crate::config::DEFAULT_MAX_OPERATORS_PER_VEHICLE;
use crate::model::catalog::{CatalogItemId, MasterMaterial, MasterTool};
use crate::model::inventory::{Material, Tool, ToolCondition};
use crate::model::user::{PasswordDigest, User, UserRole};
use crate::model::vehicle::{VehicleDraft, VehicleType};
use crate::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserInsert, UserRepository};
use crate::repo::vehicle_repo::{SqliteVehicleRepository, VehicleRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;
use rusqlite::Connection;
use std::collections::HashMap;

/// Password given to every demo account.
pub const DEMO_PASSWORD: &str = "viatura123";
/// Username of the demo admin account.
pub const DEMO_ADMIN_USERNAME: &str = "100000";

const MATERIALS: &[(&str, &str)] = &[
    ("Cabos de Fibra Óptica", "metros"),
    ("Conectores SC/APC", "unidades"),
    ("Fita Isolante", "rolos"),
    ("Caixa de Emenda Óptica", "unidades"),
    ("Protetores de Emenda", "unidades"),
    ("Álcool Isopropílico", "litros"),
];

const TOOLS: &[&str] = &[
    "Máquina de Fusão",
    "Clivador de Precisão",
    "Alicate de Corte",
    "Power Meter",
    "Fonte de Luz Óptica",
    "Identificador de Fibra Ativa",
];

struct DemoVehicle {
    name: &'static str,
    plate: &'static str,
    kind: VehicleType,
    /// (material name, quantity, threshold)
    materials: &'static [(&'static str, u32, u32)],
    tools: &'static [(&'static str, ToolCondition)],
    defects: &'static [&'static str],
    operator: DemoUser,
}

#[derive(Clone, Copy)]
struct DemoUser {
    username: &'static str,
    name: &'static str,
    email: &'static str,
}

const ADMIN: DemoUser = DemoUser {
    username: DEMO_ADMIN_USERNAME,
    name: "Admin User",
    email: "admin@viatura.local",
};

const VEHICLES: &[DemoVehicle] = &[
    DemoVehicle {
        name: "Viatura 01 - Alpha",
        plate: "ABC-1234",
        kind: VehicleType::Prontidao,
        materials: &[
            ("Cabos de Fibra Óptica", 500, 100),
            ("Conectores SC/APC", 85, 20),
            ("Fita Isolante", 8, 5),
        ],
        tools: &[
            ("Máquina de Fusão", ToolCondition::Good),
            ("Clivador de Precisão", ToolCondition::Good),
            ("Alicate de Corte", ToolCondition::NeedsRepair),
        ],
        defects: &[],
        operator: DemoUser {
            username: "100001",
            name: "João Silva",
            email: "joao.silva@viatura.local",
        },
    },
    DemoVehicle {
        name: "Viatura 02 - Bravo",
        plate: "XYZ-5678",
        kind: VehicleType::Comercial,
        materials: &[
            ("Cabos de Fibra Óptica", 80, 100),
            ("Conectores SC/APC", 150, 20),
        ],
        tools: &[
            ("Máquina de Fusão", ToolCondition::Good),
            ("Power Meter", ToolCondition::Good),
        ],
        defects: &["Luz de freio queimada"],
        operator: DemoUser {
            username: "100002",
            name: "Maria Oliveira",
            email: "maria.oliveira@viatura.local",
        },
    },
    DemoVehicle {
        name: "Viatura 03 - Charlie",
        plate: "QWE-9101",
        kind: VehicleType::Poda,
        materials: &[
            ("Caixa de Emenda Óptica", 12, 5),
            ("Protetores de Emenda", 250, 50),
            ("Álcool Isopropílico", 2, 1),
        ],
        tools: &[
            ("Máquina de Fusão", ToolCondition::Good),
            ("Fonte de Luz Óptica", ToolCondition::Broken),
            ("Identificador de Fibra Ativa", ToolCondition::Good),
        ],
        defects: &[],
        operator: DemoUser {
            username: "100003",
            name: "Carlos Pereira",
            email: "carlos.pereira@viatura.local",
        },
    },
];

/// What a seeding run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub vehicles: usize,
    pub materials: usize,
    pub tools: usize,
    pub users: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Loads the demo catalog, vehicles and accounts into an empty fleet.
pub fn seed_demo_fleet(conn: &Connection) -> RepoResult<SeedReport> {
    let vehicles = SqliteVehicleRepository::try_new(conn)?;
    if !vehicles.list_vehicles(None)?.is_empty() {
        info!("event=seed module=seed status=ok skipped=true");
        return Ok(SeedReport::default());
    }
    let catalog = SqliteCatalogRepository::try_new(conn)?;
    let users = SqliteUserRepository::try_new(conn)?;
    let mut report = SeedReport::default();

    let mut material_ids: HashMap<&str, MasterMaterial> = HashMap::new();
    for &(name, unit) in MATERIALS {
        let material = MasterMaterial::new(name, Some(unit))?;
        catalog.create_material(&material)?;
        material_ids.insert(name, material);
        report.materials += 1;
    }
    let mut tool_ids: HashMap<&str, CatalogItemId> = HashMap::new();
    for &name in TOOLS {
        let tool = MasterTool::new(name)?;
        catalog.create_tool(&tool)?;
        tool_ids.insert(name, tool.id);
        report.tools += 1;
    }

    if ensure_user(&users, ADMIN, UserRole::Admin)?.1 {
        report.users += 1;
    }

    for demo in VEHICLES {
        let vehicle_id =
            vehicles.create_vehicle(&VehicleDraft::new(demo.name, demo.plate, demo.kind))?;
        for &(name, quantity, threshold) in demo.materials {
            let master = material_ids.get(name).ok_or_else(|| missing(name))?;
            vehicles.add_material(
                vehicle_id,
                &Material {
                    item_id: master.id,
                    name: master.name.clone(),
                    unit: master.unit.clone(),
                    quantity,
                    threshold,
                },
            )?;
        }
        for &(name, condition) in demo.tools {
            let item_id = *tool_ids.get(name).ok_or_else(|| missing(name))?;
            vehicles.add_tool(
                vehicle_id,
                &Tool {
                    item_id,
                    name: name.to_string(),
                    condition,
                },
            )?;
        }
        for defect in demo.defects {
            vehicles.add_defect(vehicle_id, defect)?;
        }

        let (operator, created) = ensure_user(&users, demo.operator, UserRole::Operator)?;
        if created {
            report.users += 1;
        }
        if operator.role == UserRole::Operator {
            users.reassign_operator(
                operator.id,
                Some(vehicle_id),
                DEFAULT_MAX_OPERATORS_PER_VEHICLE,
            )?;
        }
        report.vehicles += 1;
    }

    info!(
        "event=seed module=seed status=ok vehicles={} materials={} tools={} users={}",
        report.vehicles, report.materials, report.tools, report.users
    );
    Ok(report)
}

/// Returns the account for `demo`, creating it when missing.
fn ensure_user<U: UserRepository>(
    users: &U,
    demo: DemoUser,
    role: UserRole,
) -> RepoResult<(User, bool)> {
    if let Some(existing) = users.get_user_by_username(demo.username)? {
        return Ok((existing, false));
    }
    let user = users.create_user(&UserInsert {
        username: demo.username.to_string(),
        name: demo.name.to_string(),
        email: demo.email.to_string(),
        role,
        password: PasswordDigest::generate(DEMO_PASSWORD),
    })?;
    Ok((user, true))
}

fn missing(name: &str) -> RepoError {
    RepoError::InvalidData(format!("demo fixture references unknown item `{name}`"))
}
