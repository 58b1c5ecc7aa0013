//! Authorization primitives for the admin console.
//!
//! Policies are plain predicates over the current [`Actor`] and a target
//! record. A denial is just `false`; [`PolicyEngine`] lifts the predicates
//! into `Result` for callers that propagate with `?`.

mod configurations;
mod impersonation;
mod scope;
mod users;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use configurations::{ConfigurationAction, ConfigurationPolicy};
pub use impersonation::ImpersonationPolicy;
pub use scope::Scope;
pub use users::UserPolicy;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("action {action} denied for resource {resource}")]
    Denied { action: String, resource: String },
}

/// The authenticated user a request is evaluated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub system_admin: bool,
}

impl Actor {
    pub fn new(id: Uuid, system_admin: bool) -> Self {
        Self { id, system_admin }
    }

    pub fn is_admin(&self) -> bool {
        self.system_admin
    }

    /// Whether this actor is the owner of the given identity.
    pub fn is(&self, id: Uuid) -> bool {
        self.id == id
    }

    pub fn as_record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            system_admin: self.system_admin,
        }
    }
}

/// A user row as seen by the policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub system_admin: bool,
}

impl UserRecord {
    pub fn new(id: Uuid, system_admin: bool) -> Self {
        Self { id, system_admin }
    }
}

/// Anything a policy can be asked about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    User(UserRecord),
    Configuration(Uuid),
    AuditLog(Uuid),
}

impl Resource {
    pub fn as_user(&self) -> Option<&UserRecord> {
        match self {
            Resource::User(user) => Some(user),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Resource::User(user) => format!("user:{}", user.id),
            Resource::Configuration(id) => format!("configuration:{id}"),
            Resource::AuditLog(id) => format!("audit_log:{id}"),
        }
    }
}

impl From<UserRecord> for Resource {
    fn from(value: UserRecord) -> Self {
        Resource::User(value)
    }
}

/// Every action the console guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    StartImpersonation(Resource),
    StopImpersonation,
    ViewAuditLogs,
    IndexUsers,
    ShowUser(UserRecord),
    UpdateUser(UserRecord),
    DestroyUser(UserRecord),
    PromoteUser(UserRecord),
    DemoteUser(UserRecord),
    ManageRoles,
    Configuration(ConfigurationAction),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartImpersonation(_) => "impersonation:start",
            Action::StopImpersonation => "impersonation:stop",
            Action::ViewAuditLogs => "impersonation:audit_logs",
            Action::IndexUsers => "users:index",
            Action::ShowUser(_) => "users:show",
            Action::UpdateUser(_) => "users:update",
            Action::DestroyUser(_) => "users:destroy",
            Action::PromoteUser(_) => "users:promote",
            Action::DemoteUser(_) => "users:demote",
            Action::ManageRoles => "users:manage_roles",
            Action::Configuration(action) => action.name(),
        }
    }

    fn resource(&self) -> String {
        match self {
            Action::StartImpersonation(resource) => resource.describe(),
            Action::ShowUser(user)
            | Action::UpdateUser(user)
            | Action::DestroyUser(user)
            | Action::PromoteUser(user)
            | Action::DemoteUser(user) => Resource::User(*user).describe(),
            Action::StopImpersonation => "impersonation".into(),
            Action::ViewAuditLogs => "audit_logs".into(),
            Action::IndexUsers | Action::ManageRoles => "users".into(),
            Action::Configuration(action) => action.resource(),
        }
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn permits(&self, actor: &Actor, action: Action) -> bool {
        match action {
            Action::StartImpersonation(target) => ImpersonationPolicy::can_start(actor, &target),
            Action::StopImpersonation => ImpersonationPolicy::can_stop(actor),
            Action::ViewAuditLogs => ImpersonationPolicy::can_view_audit_logs(actor),
            Action::IndexUsers => UserPolicy::can_index(actor),
            Action::ShowUser(target) => UserPolicy::can_show(actor, &target),
            Action::UpdateUser(target) => UserPolicy::can_update(actor, &target),
            Action::DestroyUser(target) => UserPolicy::can_destroy(actor, &target),
            Action::PromoteUser(target) => UserPolicy::can_promote(actor, &target),
            Action::DemoteUser(target) => UserPolicy::can_demote(actor, &target),
            Action::ManageRoles => UserPolicy::can_manage_roles(actor),
            Action::Configuration(action) => ConfigurationPolicy::permits(actor, action),
        }
    }

    pub fn authorize(&self, actor: &Actor, action: Action) -> Result<(), AuthzError> {
        if self.permits(actor, action) {
            return Ok(());
        }
        let err = AuthzError::Denied {
            action: action.name().to_string(),
            resource: action.resource(),
        };
        tracing::debug!(actor = %actor.id, error = %err, "authorization denied");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), true)
    }

    fn member() -> Actor {
        Actor::new(Uuid::new_v4(), false)
    }

    #[test]
    fn authorize_reports_action_and_resource() {
        let actor = member();
        let target = UserRecord::new(Uuid::new_v4(), false);
        let err = PolicyEngine
            .authorize(&actor, Action::DestroyUser(target))
            .unwrap_err();
        assert_eq!(
            err,
            AuthzError::Denied {
                action: "users:destroy".into(),
                resource: format!("user:{}", target.id),
            }
        );
        assert!(err.to_string().contains("users:destroy"));
    }

    #[test]
    fn authorize_passes_permitted_actions() {
        let actor = admin();
        let target = UserRecord::new(Uuid::new_v4(), false);
        assert!(PolicyEngine
            .authorize(&actor, Action::StartImpersonation(target.into()))
            .is_ok());
        assert!(PolicyEngine.authorize(&actor, Action::ViewAuditLogs).is_ok());
    }

    #[test]
    fn non_admin_is_denied_everything_but_own_record() {
        let actor = member();
        let own = actor.as_record();
        let other = UserRecord::new(Uuid::new_v4(), false);
        let config = Uuid::new_v4();

        let denied = [
            Action::StartImpersonation(other.into()),
            Action::StartImpersonation(own.into()),
            Action::StopImpersonation,
            Action::ViewAuditLogs,
            Action::IndexUsers,
            Action::ShowUser(other),
            Action::UpdateUser(other),
            Action::DestroyUser(other),
            Action::DestroyUser(own),
            Action::PromoteUser(other),
            Action::DemoteUser(other),
            Action::ManageRoles,
            Action::Configuration(ConfigurationAction::Index),
            Action::Configuration(ConfigurationAction::Toggle(config)),
        ];
        for action in denied {
            assert!(!PolicyEngine.permits(&actor, action), "{}", action.name());
        }

        assert!(PolicyEngine.permits(&actor, Action::ShowUser(own)));
        assert!(PolicyEngine.permits(&actor, Action::UpdateUser(own)));
    }
}
