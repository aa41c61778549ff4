//! Vehicle administration, operator assignment and access requests.
//!
//! # Responsibility
//! - Create and edit vehicles (admin only).
//! - Project vehicles into dashboard and selection-board rows.
//! - Assign operators under the per-vehicle capacity rule.
//! - Route access requests from operators to admin approval.
//!
//! # Invariants
//! - An operator is assigned to at most one vehicle.
//! - A vehicle never holds more than `max_operators_per_vehicle` operators.
//! - Operators only view the vehicle they are assigned to.

use crate::config::FleetConfig;
use crate::model::notification::{NewNotification, Notification, NotificationId, NotificationKind};
use crate::model::user::{User, UserId, UserRole};
use crate::model::vehicle::{Vehicle, VehicleDraft, VehicleId, VehicleType};
use crate::model::ValidationError;
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::user_repo::{AssignmentChange, UserListQuery, UserRepository};
use crate::repo::vehicle_repo::VehicleRepository;
use crate::repo::{EntityRef, RepoError};
use crate::service::{messages, record_activity, Actor};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for fleet use-cases.
#[derive(Debug)]
pub enum FleetServiceError {
    AdminOnly,
    /// Actor may not view or act on this vehicle.
    AccessDenied(VehicleId),
    /// Operators may only change their own assignment.
    NotSelf(UserId),
    NotAnOperator(UserId),
    VehicleNotFound(VehicleId),
    UserNotFound(UserId),
    NotificationNotFound(NotificationId),
    /// Notification exists but is not a pending access request.
    NotARequest(NotificationId),
    /// Target vehicle is full.
    VehicleFull {
        vehicle_id: VehicleId,
        capacity: u32,
    },
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for FleetServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdminOnly => write!(f, "only admins can manage vehicles"),
            Self::AccessDenied(id) => write!(f, "access denied to vehicle {id}"),
            Self::NotSelf(id) => {
                write!(f, "operators can only change their own assignment, not {id}")
            }
            Self::NotAnOperator(id) => write!(f, "user {id} is not an operator"),
            Self::VehicleNotFound(id) => write!(f, "vehicle not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::NotificationNotFound(id) => write!(f, "notification not found: {id}"),
            Self::NotARequest(id) => {
                write!(f, "notification {id} is not a pending access request")
            }
            Self::VehicleFull {
                vehicle_id,
                capacity,
            } => write!(
                f,
                "vehicle {vehicle_id} already has the maximum of {capacity} operators"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FleetServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FleetServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(EntityRef::Vehicle(id)) => Self::VehicleNotFound(id),
            RepoError::NotFound(EntityRef::User(id)) => Self::UserNotFound(id),
            RepoError::NotFound(EntityRef::Notification(id)) => Self::NotificationNotFound(id),
            RepoError::CapacityExceeded {
                vehicle_id,
                capacity,
            } => Self::VehicleFull {
                vehicle_id,
                capacity,
            },
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for FleetServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Admin dashboard card for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub name: String,
    pub plate: String,
    #[serde(rename = "type")]
    pub kind: VehicleType,
    pub operator_names: Vec<String>,
    pub material_count: usize,
    pub tool_count: usize,
    pub low_stock_count: usize,
    pub tools_needing_repair: usize,
    pub defect_count: usize,
    /// Any low stock, tool needing repair or open defect.
    pub needs_attention: bool,
}

/// Operator home row: one selectable vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardEntry {
    pub id: VehicleId,
    pub name: String,
    pub plate: String,
    #[serde(rename = "type")]
    pub kind: VehicleType,
    pub operator_names: Vec<String>,
    pub operator_count: usize,
    pub capacity: u32,
    pub is_full: bool,
    /// The actor is assigned here.
    pub is_current: bool,
}

pub struct FleetService<V, U, N>
where
    V: VehicleRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    vehicles: V,
    users: U,
    notifications: N,
    config: FleetConfig,
}

impl<V, U, N> FleetService<V, U, N>
where
    V: VehicleRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    pub fn new(vehicles: V, users: U, notifications: N, config: FleetConfig) -> Self {
        Self {
            vehicles,
            users,
            notifications,
            config,
        }
    }

    pub fn add_vehicle(
        &self,
        actor: &Actor,
        draft: &VehicleDraft,
    ) -> Result<Vehicle, FleetServiceError> {
        self.fresh_admin(actor)?;
        let draft = draft.normalized()?;
        let id = self.vehicles.create_vehicle(&draft)?;
        info!(
            "event=vehicle_create module=service status=ok vehicle_id={id} type={}",
            draft.kind.as_str()
        );
        self.load_vehicle(id)
    }

    /// Replaces name, plate and type. Inventory and operators stay.
    pub fn edit_vehicle(
        &self,
        actor: &Actor,
        id: VehicleId,
        draft: &VehicleDraft,
    ) -> Result<Vehicle, FleetServiceError> {
        self.fresh_admin(actor)?;
        let draft = draft.normalized()?;
        self.vehicles.update_vehicle_info(id, &draft)?;
        info!("event=vehicle_update module=service status=ok vehicle_id={id}");
        self.load_vehicle(id)
    }

    /// Full vehicle view. Operators only see their assigned vehicle.
    pub fn vehicle_detail(
        &self,
        actor: &Actor,
        id: VehicleId,
    ) -> Result<Vehicle, FleetServiceError> {
        let actor = self.fresh_user(actor.id)?;
        if !actor.is_admin() && !actor.is_assigned_to(id) {
            warn!(
                "event=vehicle_view module=service status=error reason=access_denied vehicle_id={id} user_id={}",
                actor.id
            );
            return Err(FleetServiceError::AccessDenied(id));
        }
        self.load_vehicle(id)
    }

    /// Operators assigned to `vehicle`, in assignment order.
    pub fn operators_of(&self, vehicle: &Vehicle) -> Result<Vec<User>, FleetServiceError> {
        let mut operators = Vec::with_capacity(vehicle.operator_ids.len());
        for id in &vehicle.operator_ids {
            operators.push(self.fresh_user(*id)?);
        }
        Ok(operators)
    }

    /// Admin dashboard rows, optionally filtered by type.
    pub fn dashboard(
        &self,
        kind: Option<VehicleType>,
    ) -> Result<Vec<VehicleSummary>, FleetServiceError> {
        let names = self.operator_names()?;
        let summaries = self
            .vehicles
            .list_vehicles(kind)?
            .into_iter()
            .map(|vehicle| {
                let low_stock_count = vehicle.low_stock_count();
                let tools_needing_repair = vehicle.tools_needing_repair();
                let defect_count = vehicle.defects.len();
                VehicleSummary {
                    operator_names: names_for(&vehicle, &names),
                    id: vehicle.id,
                    name: vehicle.name,
                    plate: vehicle.plate,
                    kind: vehicle.kind,
                    material_count: vehicle.materials.len(),
                    tool_count: vehicle.tools.len(),
                    low_stock_count,
                    tools_needing_repair,
                    defect_count,
                    needs_attention: low_stock_count > 0
                        || tools_needing_repair > 0
                        || defect_count > 0,
                }
            })
            .collect();
        Ok(summaries)
    }

    /// Every vehicle with its occupancy, marking the actor's current one.
    pub fn selection_board(&self, actor: &Actor) -> Result<Vec<BoardEntry>, FleetServiceError> {
        let actor = self.fresh_user(actor.id)?;
        let names = self.operator_names()?;
        let capacity = self.config.max_operators_per_vehicle;
        let entries = self
            .vehicles
            .list_vehicles(None)?
            .into_iter()
            .map(|vehicle| {
                let operator_count = vehicle.operator_ids.len();
                BoardEntry {
                    operator_names: names_for(&vehicle, &names),
                    is_current: actor.is_assigned_to(vehicle.id),
                    is_full: operator_count >= capacity as usize,
                    id: vehicle.id,
                    name: vehicle.name,
                    plate: vehicle.plate,
                    kind: vehicle.kind,
                    operator_count,
                    capacity,
                }
            })
            .collect();
        Ok(entries)
    }

    /// Moves an operator to `vehicle_id`, or unassigns with `None`.
    ///
    /// Admins may assign anyone; operators only themselves.
    pub fn assign_operator(
        &self,
        actor: &Actor,
        user_id: UserId,
        vehicle_id: Option<VehicleId>,
    ) -> Result<AssignmentChange, FleetServiceError> {
        let actor = self.fresh_user(actor.id)?;
        if !actor.is_admin() && actor.id != user_id {
            return Err(FleetServiceError::NotSelf(user_id));
        }
        let target = self.fresh_user(user_id)?;
        if target.role != UserRole::Operator {
            return Err(FleetServiceError::NotAnOperator(user_id));
        }

        let change = self.users.reassign_operator(
            user_id,
            vehicle_id,
            self.config.max_operators_per_vehicle,
        )?;
        if !change.is_noop() {
            info!(
                "event=operator_assign module=service status=ok user_id={user_id} previous={} current={}",
                fmt_optional(change.previous),
                fmt_optional(change.current)
            );
        }
        Ok(change)
    }

    /// Files an access request for the admin feed.
    pub fn request_access(
        &self,
        actor: &Actor,
        vehicle_id: VehicleId,
    ) -> Result<Notification, FleetServiceError> {
        let actor = self.fresh_user(actor.id)?;
        if actor.role != UserRole::Operator {
            return Err(FleetServiceError::NotAnOperator(actor.id));
        }
        let vehicle = self.load_vehicle(vehicle_id)?;
        let entry = NewNotification::new(
            NotificationKind::Request,
            vehicle.id,
            vehicle.name.clone(),
            messages::access_requested(&actor.name, &vehicle.name),
        )
        .from_user(actor.id);
        Ok(record_activity(&self.notifications, entry)?)
    }

    /// Assigns the requesting operator and resolves the request.
    ///
    /// A request resolved by another admin in the meantime is `NotARequest`.
    pub fn approve_access(
        &self,
        actor: &Actor,
        notification_id: NotificationId,
    ) -> Result<Notification, FleetServiceError> {
        let admin = self.fresh_admin(actor)?;
        let request = self
            .notifications
            .get(notification_id)?
            .ok_or(FleetServiceError::NotificationNotFound(notification_id))?;
        let requester_id = match (request.kind, request.user_id) {
            (NotificationKind::Request, Some(user_id)) => user_id,
            _ => return Err(FleetServiceError::NotARequest(notification_id)),
        };

        let requester = self.fresh_user(requester_id)?;
        self.assign_operator(&admin, requester.id, Some(request.vehicle_id))?;
        let resolved = match self.notifications.resolve_request(
            notification_id,
            &messages::access_approved(&requester.name, &request.vehicle_name),
        ) {
            Ok(resolved) => resolved,
            Err(RepoError::NotFound(EntityRef::Notification(_))) => {
                warn!(
                    "event=access_approve module=service status=error reason=already_resolved notification_id={notification_id}"
                );
                return Err(FleetServiceError::NotARequest(notification_id));
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            "event=access_approve module=service status=ok notification_id={notification_id} user_id={requester_id} vehicle_id={}",
            request.vehicle_id
        );
        Ok(resolved)
    }

    fn load_vehicle(&self, id: VehicleId) -> Result<Vehicle, FleetServiceError> {
        self.vehicles
            .get_vehicle(id)?
            .ok_or(FleetServiceError::VehicleNotFound(id))
    }

    fn fresh_user(&self, id: UserId) -> Result<User, FleetServiceError> {
        self.users
            .get_user(id)?
            .ok_or(FleetServiceError::UserNotFound(id))
    }

    /// Reloads the actor and requires the stored role to be admin.
    fn fresh_admin(&self, actor: &Actor) -> Result<User, FleetServiceError> {
        let user = self.fresh_user(actor.id)?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(FleetServiceError::AdminOnly)
        }
    }

    fn operator_names(&self) -> Result<HashMap<UserId, String>, FleetServiceError> {
        let operators = self.users.list_users(&UserListQuery {
            role: Some(UserRole::Operator),
            name_contains: None,
        })?;
        Ok(operators
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect())
    }
}

fn names_for(vehicle: &Vehicle, names: &HashMap<UserId, String>) -> Vec<String> {
    vehicle
        .operator_ids
        .iter()
        .filter_map(|id| names.get(id).cloned())
        .collect()
}

fn fmt_optional(id: Option<VehicleId>) -> String {
    id.map_or_else(|| "none".to_string(), |value| value.to_string())
}

