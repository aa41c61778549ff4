use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;
use viatura_core::{ToolCondition, VehicleType};

#[derive(Parser)]
#[command(name = "viatura")]
#[command(version, about = "Inventory of operational vehicles, their materials and tools.")]
pub struct CommandLine {
    /// SQLite database file
    #[arg(long, env = "VIATURA_DB", global = true, default_value = "viatura.db")]
    pub db: PathBuf,
    /// JSON file with fleet settings
    #[arg(long, env = "VIATURA_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    /// Directory for rolling log files
    #[arg(long, env = "VIATURA_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
    #[arg(long, env = "VIATURA_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,
    /// Matrícula of the signed-in user
    #[arg(long, env = "VIATURA_USER", global = true)]
    pub user: Option<String>,
    #[arg(long, env = "VIATURA_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
    /// Overrides `max_operators_per_vehicle`
    #[arg(long, env = "VIATURA_MAX_OPERATORS", global = true)]
    pub max_operators: Option<u32>,
    /// Overrides `default_material_threshold`
    #[arg(long, env = "VIATURA_DEFAULT_THRESHOLD", global = true)]
    pub default_threshold: Option<u32>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or migrate the database
    Init {
        /// Load the demo fleet into an empty database
        #[arg(long)]
        seed: bool,
        #[command(flatten)]
        admin: AdminBootstrap,
    },
    /// Register a new operator account
    Register(RegisterArgs),
    /// List vehicles with their attention counters
    Vehicles {
        #[arg(long = "type", value_parser = parse_vehicle_type)]
        kind: Option<VehicleType>,
    },
    #[command(subcommand)]
    Vehicle(VehicleCommand),
    /// Vehicles available to pick, with occupancy
    Board,
    /// Assign an operator to a vehicle, or unassign without --vehicle
    Assign {
        username: String,
        #[arg(long)]
        vehicle: Option<Uuid>,
    },
    #[command(subcommand)]
    Material(MaterialCommand),
    #[command(subcommand)]
    Tool(ToolCommand),
    #[command(subcommand)]
    Defect(DefectCommand),
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// List operators
    Operators {
        #[arg(long)]
        search: Option<String>,
    },
    /// Grant or revoke an operator's edit permission
    Permission {
        username: String,
        #[arg(action = ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        allowed: bool,
    },
    /// Admin activity and alert feed
    Feed {
        #[arg(long)]
        vehicle: Option<Uuid>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Recent updates for one vehicle
    Activity { vehicle: Uuid },
    /// Pending access requests
    Requests,
    /// Mark the whole feed read
    MarkRead,
    /// Ask an admin for access to a vehicle
    RequestAccess { vehicle: Uuid },
    /// Approve an access request
    Approve { notification: Uuid },
}

/// First admin account, created by `init` when none exists.
#[derive(Args)]
pub struct AdminBootstrap {
    #[arg(long, requires_all = ["admin_name", "admin_email", "admin_password"])]
    pub admin_username: Option<String>,
    #[arg(long)]
    pub admin_name: Option<String>,
    #[arg(long)]
    pub admin_email: Option<String>,
    #[arg(long, env = "VIATURA_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    /// Matrícula, 1 to 6 digits
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub new_password: String,
    #[arg(long)]
    pub confirm_password: String,
}

#[derive(Subcommand)]
pub enum VehicleCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        plate: String,
        #[arg(long = "type", value_parser = parse_vehicle_type)]
        kind: VehicleType,
    },
    /// Change name, plate or type; omitted fields keep their value
    Edit {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        plate: Option<String>,
        #[arg(long = "type", value_parser = parse_vehicle_type)]
        kind: Option<VehicleType>,
    },
    Show { id: Uuid },
}

#[derive(Subcommand)]
pub enum MaterialCommand {
    Use {
        vehicle: Uuid,
        item: Uuid,
        amount: u32,
    },
    Restock {
        vehicle: Uuid,
        item: Uuid,
        amount: u32,
    },
    /// Stock a catalog material on a vehicle
    Add {
        vehicle: Uuid,
        item: Uuid,
        #[arg(long, default_value_t = 0)]
        quantity: u32,
        #[arg(long)]
        threshold: Option<u32>,
    },
    Search {
        vehicle: Uuid,
        #[arg(default_value = "")]
        query: String,
    },
    /// Catalog materials not yet on the vehicle
    Addable { vehicle: Uuid },
}

#[derive(Subcommand)]
pub enum ToolCommand {
    Add {
        vehicle: Uuid,
        item: Uuid,
        #[arg(long, value_parser = parse_tool_condition, default_value = "good")]
        condition: ToolCondition,
    },
    Remove {
        vehicle: Uuid,
        item: Uuid,
    },
    Condition {
        vehicle: Uuid,
        item: Uuid,
        #[arg(value_parser = parse_tool_condition)]
        condition: ToolCondition,
    },
    /// Catalog tools not yet on the vehicle
    Addable { vehicle: Uuid },
}

#[derive(Subcommand)]
pub enum DefectCommand {
    Report { vehicle: Uuid, description: String },
    /// Resolve by position as listed in `vehicle show`
    Resolve { vehicle: Uuid, index: usize },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    #[command(subcommand)]
    Materials(CatalogMaterialCommand),
    #[command(subcommand)]
    Tools(CatalogToolCommand),
}

#[derive(Subcommand)]
pub enum CatalogMaterialCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        unit: Option<String>,
    },
    Edit {
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        unit: Option<String>,
    },
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum CatalogToolCommand {
    List,
    Add { name: String },
    Edit {
        id: Uuid,
        #[arg(long)]
        name: String,
    },
    Delete { id: Uuid },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_vehicle_type(value: &str) -> Result<VehicleType, String> {
    let normalized = value.trim().to_lowercase().replace('ã', "a");
    VehicleType::parse(&normalized)
        .ok_or_else(|| format!("unknown vehicle type `{value}` (poda, prontidao, comercial)"))
}

fn parse_tool_condition(value: &str) -> Result<ToolCondition, String> {
    let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
    ToolCondition::parse(&normalized)
        .ok_or_else(|| format!("unknown tool condition `{value}` (good, needs_repair, broken)"))
}
