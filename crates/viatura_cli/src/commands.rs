//! Maps parsed subcommands onto core services and prints JSON results.

use crate::args::{
    AdminBootstrap, CatalogCommand, CatalogMaterialCommand, CatalogToolCommand, CommandLine,
    Commands, DefectCommand, MaterialCommand, RegisterArgs, ToolCommand, VehicleCommand,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use viatura_core::db::migrations::current_user_version;
use viatura_core::db::Connection;
use viatura_core::{
    seed_demo_fleet, AccountService, CatalogService, FeedService, FleetConfig, FleetService,
    InventoryService, RegisterRequest, SqliteCatalogRepository, SqliteNotificationRepository,
    SqliteUserRepository, SqliteVehicleRepository, User, VehicleDraft,
};

type Accounts<'c> = AccountService<SqliteUserRepository<'c>>;
type Catalog<'c> = CatalogService<SqliteCatalogRepository<'c>, SqliteUserRepository<'c>>;
type Feed<'c> = FeedService<SqliteNotificationRepository<'c>, SqliteUserRepository<'c>>;
type Fleet<'c> = FleetService<
    SqliteVehicleRepository<'c>,
    SqliteUserRepository<'c>,
    SqliteNotificationRepository<'c>,
>;
type Inventory<'c> = InventoryService<
    SqliteVehicleRepository<'c>,
    SqliteUserRepository<'c>,
    SqliteCatalogRepository<'c>,
    SqliteNotificationRepository<'c>,
>;

/// Services bound to one open connection.
struct Session<'c> {
    conn: &'c Connection,
    config: FleetConfig,
}

impl<'c> Session<'c> {
    fn accounts(&self) -> Result<Accounts<'c>> {
        Ok(AccountService::new(
            SqliteUserRepository::try_new(self.conn)?,
            self.config.clone(),
        ))
    }

    fn catalog(&self) -> Result<Catalog<'c>> {
        Ok(CatalogService::new(
            SqliteCatalogRepository::try_new(self.conn)?,
            SqliteUserRepository::try_new(self.conn)?,
        ))
    }

    fn feed(&self) -> Result<Feed<'c>> {
        Ok(FeedService::new(
            SqliteNotificationRepository::try_new(self.conn)?,
            SqliteUserRepository::try_new(self.conn)?,
            self.config.clone(),
        ))
    }

    fn fleet(&self) -> Result<Fleet<'c>> {
        Ok(FleetService::new(
            SqliteVehicleRepository::try_new(self.conn)?,
            SqliteUserRepository::try_new(self.conn)?,
            SqliteNotificationRepository::try_new(self.conn)?,
            self.config.clone(),
        ))
    }

    fn inventory(&self) -> Result<Inventory<'c>> {
        Ok(InventoryService::new(
            SqliteVehicleRepository::try_new(self.conn)?,
            SqliteUserRepository::try_new(self.conn)?,
            SqliteCatalogRepository::try_new(self.conn)?,
            SqliteNotificationRepository::try_new(self.conn)?,
            self.config.clone(),
        ))
    }

    /// Logs in with `--user`/`--password`.
    fn sign_in(&self, cli: &CommandLine) -> Result<User> {
        let (Some(username), Some(password)) = (cli.user.as_deref(), cli.password.as_deref())
        else {
            bail!("this command needs --user and --password (or VIATURA_USER/VIATURA_PASSWORD)");
        };
        Ok(self.accounts()?.login(username, password)?)
    }

    fn sign_in_admin(&self, cli: &CommandLine) -> Result<User> {
        let user = self.sign_in(cli)?;
        if !user.is_admin() {
            bail!("this command is restricted to admins");
        }
        Ok(user)
    }

    fn user_by_username(&self, username: &str) -> Result<User> {
        self.accounts()?
            .find_by_username(username)?
            .with_context(|| format!("no user with matrícula `{username}`"))
    }
}

pub fn run(cli: &CommandLine, conn: &Connection, config: FleetConfig) -> Result<()> {
    let ctx = Session { conn, config };
    match &cli.command {
        Commands::Init { seed, admin } => init(&ctx, *seed, admin),
        Commands::Register(args) => register(&ctx, args),
        Commands::Vehicles { kind } => {
            ctx.sign_in_admin(cli)?;
            print_json(&ctx.fleet()?.dashboard(*kind)?)
        }
        Commands::Vehicle(command) => vehicle(&ctx, cli, command),
        Commands::Board => {
            let actor = ctx.sign_in(cli)?;
            print_json(&ctx.fleet()?.selection_board(&actor)?)
        }
        Commands::Assign { username, vehicle } => {
            let actor = ctx.sign_in(cli)?;
            let target = ctx.user_by_username(username)?;
            let change = ctx
                .fleet()?
                .assign_operator(&actor, target.id, *vehicle)
                .context("assignment rejected")?;
            print_json(&change)
        }
        Commands::Material(command) => material(&ctx, cli, command),
        Commands::Tool(command) => tool(&ctx, cli, command),
        Commands::Defect(command) => defect(&ctx, cli, command),
        Commands::Catalog(command) => catalog(&ctx, cli, command),
        Commands::Operators { search } => {
            ctx.sign_in_admin(cli)?;
            let accounts = ctx.accounts()?;
            let mut rows = Vec::new();
            for operator in accounts.list_operators(search.as_deref())? {
                let can_edit = accounts.can_edit(&operator)?;
                rows.push(json!({ "user": operator, "can_edit": can_edit }));
            }
            print_json(&rows)
        }
        Commands::Permission { username, allowed } => {
            let actor = ctx.sign_in(cli)?;
            let target = ctx.user_by_username(username)?;
            ctx.accounts()?
                .set_edit_permission(&actor, target.id, *allowed)?;
            print_json(&json!({ "user_id": target.id, "can_edit": allowed }))
        }
        Commands::Feed { vehicle, limit } => {
            let actor = ctx.sign_in(cli)?;
            let page = ctx.feed()?.admin_feed(&actor, *vehicle, *limit)?;
            print_json(&json!({
                "applied_limit": page.applied_limit,
                "unread": page.unread,
                "items": page.items,
            }))
        }
        Commands::Activity { vehicle } => {
            let actor = ctx.sign_in(cli)?;
            // Same visibility rule as the vehicle screen.
            ctx.fleet()?.vehicle_detail(&actor, *vehicle)?;
            print_json(&ctx.feed()?.vehicle_activity(*vehicle)?)
        }
        Commands::Requests => {
            let actor = ctx.sign_in(cli)?;
            print_json(&ctx.feed()?.pending_requests(&actor)?)
        }
        Commands::MarkRead => {
            let actor = ctx.sign_in(cli)?;
            let changed = ctx.feed()?.mark_all_read(&actor)?;
            print_json(&json!({ "marked_read": changed }))
        }
        Commands::RequestAccess { vehicle } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&ctx.fleet()?.request_access(&actor, *vehicle)?)
        }
        Commands::Approve { notification } => {
            let actor = ctx.sign_in(cli)?;
            let resolved = ctx
                .fleet()?
                .approve_access(&actor, *notification)
                .context("approval rejected")?;
            print_json(&resolved)
        }
    }
}

fn init(ctx: &Session<'_>, seed: bool, admin: &AdminBootstrap) -> Result<()> {
    let mut created_admin = None;
    if let (Some(username), Some(name), Some(email), Some(password)) = (
        admin.admin_username.as_deref(),
        admin.admin_name.as_deref(),
        admin.admin_email.as_deref(),
        admin.admin_password.as_deref(),
    ) {
        let accounts = ctx.accounts()?;
        if accounts.has_admin()? {
            bail!("an admin account already exists");
        }
        created_admin = Some(accounts.create_admin(&RegisterRequest {
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password.to_string(),
        })?);
    }

    let seeded = if seed {
        let report = seed_demo_fleet(ctx.conn).context("failed to seed demo fleet")?;
        Some(json!({
            "vehicles": report.vehicles,
            "materials": report.materials,
            "tools": report.tools,
            "users": report.users,
        }))
    } else {
        None
    };

    print_json(&json!({
        "schema_version": current_user_version(ctx.conn)?,
        "admin": created_admin,
        "seeded": seeded,
    }))
}

fn register(ctx: &Session<'_>, args: &RegisterArgs) -> Result<()> {
    let user = ctx.accounts()?.register(&RegisterRequest {
        name: args.name.clone(),
        username: args.username.clone(),
        email: args.email.clone(),
        password: args.new_password.clone(),
        password_confirmation: args.confirm_password.clone(),
    })?;
    print_json(&user)
}

fn vehicle(ctx: &Session<'_>, cli: &CommandLine, command: &VehicleCommand) -> Result<()> {
    let actor = ctx.sign_in(cli)?;
    let fleet = ctx.fleet()?;
    match command {
        VehicleCommand::Add { name, plate, kind } => {
            print_json(&fleet.add_vehicle(&actor, &VehicleDraft::new(name, plate, *kind))?)
        }
        VehicleCommand::Edit {
            id,
            name,
            plate,
            kind,
        } => {
            let current = fleet.vehicle_detail(&actor, *id)?;
            let draft = VehicleDraft::new(
                name.clone().unwrap_or(current.name),
                plate.clone().unwrap_or(current.plate),
                kind.unwrap_or(current.kind),
            );
            print_json(&fleet.edit_vehicle(&actor, *id, &draft)?)
        }
        VehicleCommand::Show { id } => {
            let vehicle = fleet.vehicle_detail(&actor, *id)?;
            let operators = fleet.operators_of(&vehicle)?;
            let can_edit = ctx.inventory()?.can_edit_vehicle(&actor, *id)?;
            let activity = ctx.feed()?.vehicle_activity(*id)?;
            print_json(&json!({
                "vehicle": vehicle,
                "type_label": vehicle.kind.label(),
                "operators": operators,
                "can_edit": can_edit,
                "recent_activity": activity,
            }))
        }
    }
}

fn material(ctx: &Session<'_>, cli: &CommandLine, command: &MaterialCommand) -> Result<()> {
    let inventory = ctx.inventory()?;
    match command {
        MaterialCommand::Use {
            vehicle,
            item,
            amount,
        } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.use_material(&actor, *vehicle, *item, *amount)?)
        }
        MaterialCommand::Restock {
            vehicle,
            item,
            amount,
        } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.restock_material(&actor, *vehicle, *item, *amount)?)
        }
        MaterialCommand::Add {
            vehicle,
            item,
            quantity,
            threshold,
        } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.add_material(&actor, *vehicle, *item, *quantity, *threshold)?)
        }
        MaterialCommand::Search { vehicle, query } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.search_materials(&actor, *vehicle, query)?)
        }
        MaterialCommand::Addable { vehicle } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.addable_materials(&actor, *vehicle)?)
        }
    }
}

fn tool(ctx: &Session<'_>, cli: &CommandLine, command: &ToolCommand) -> Result<()> {
    let inventory = ctx.inventory()?;
    match command {
        ToolCommand::Add {
            vehicle,
            item,
            condition,
        } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.add_tool(&actor, *vehicle, *item, *condition)?)
        }
        ToolCommand::Remove { vehicle, item } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.remove_tool(&actor, *vehicle, *item)?)
        }
        ToolCommand::Condition {
            vehicle,
            item,
            condition,
        } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.set_tool_condition(&actor, *vehicle, *item, *condition)?)
        }
        ToolCommand::Addable { vehicle } => {
            let actor = ctx.sign_in(cli)?;
            print_json(&inventory.addable_tools(&actor, *vehicle)?)
        }
    }
}

fn defect(ctx: &Session<'_>, cli: &CommandLine, command: &DefectCommand) -> Result<()> {
    let actor = ctx.sign_in(cli)?;
    let inventory = ctx.inventory()?;
    match command {
        DefectCommand::Report {
            vehicle,
            description,
        } => print_json(&inventory.report_defect(&actor, *vehicle, description)?),
        DefectCommand::Resolve { vehicle, index } => {
            print_json(&inventory.resolve_defect(&actor, *vehicle, *index)?)
        }
    }
}

fn catalog(ctx: &Session<'_>, cli: &CommandLine, command: &CatalogCommand) -> Result<()> {
    let catalog = ctx.catalog()?;
    match command {
        CatalogCommand::Materials(CatalogMaterialCommand::List) => {
            print_json(&catalog.list_materials()?)
        }
        CatalogCommand::Materials(CatalogMaterialCommand::Add { name, unit }) => {
            let actor = ctx.sign_in(cli)?;
            print_json(&catalog.add_material(&actor, name, unit.as_deref())?)
        }
        CatalogCommand::Materials(CatalogMaterialCommand::Edit { id, name, unit }) => {
            let actor = ctx.sign_in(cli)?;
            print_json(&catalog.edit_material(&actor, *id, name, unit.as_deref())?)
        }
        CatalogCommand::Materials(CatalogMaterialCommand::Delete { id }) => {
            let actor = ctx.sign_in(cli)?;
            catalog.delete_material(&actor, *id)?;
            print_json(&json!({ "deleted": id }))
        }
        CatalogCommand::Tools(CatalogToolCommand::List) => print_json(&catalog.list_tools()?),
        CatalogCommand::Tools(CatalogToolCommand::Add { name }) => {
            let actor = ctx.sign_in(cli)?;
            print_json(&catalog.add_tool(&actor, name)?)
        }
        CatalogCommand::Tools(CatalogToolCommand::Edit { id, name }) => {
            let actor = ctx.sign_in(cli)?;
            print_json(&catalog.edit_tool(&actor, *id, name)?)
        }
        CatalogCommand::Tools(CatalogToolCommand::Delete { id }) => {
            let actor = ctx.sign_in(cli)?;
            catalog.delete_tool(&actor, *id)?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
