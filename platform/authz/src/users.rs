use crate::{Actor, UserRecord};

/// User management permissions.
pub struct UserPolicy;

impl UserPolicy {
    pub fn can_index(actor: &Actor) -> bool {
        actor.is_admin()
    }

    pub fn can_show(actor: &Actor, target: &UserRecord) -> bool {
        actor.is(target.id) || actor.is_admin()
    }

    pub fn can_update(actor: &Actor, target: &UserRecord) -> bool {
        actor.is(target.id) || actor.is_admin()
    }

    /// Administrators cannot delete their own account.
    pub fn can_destroy(actor: &Actor, target: &UserRecord) -> bool {
        actor.is_admin() && !actor.is(target.id)
    }

    pub fn can_promote(actor: &Actor, target: &UserRecord) -> bool {
        actor.is_admin() && !actor.is(target.id)
    }

    /// Only a current administrator can be demoted, and never by themselves.
    pub fn can_demote(actor: &Actor, target: &UserRecord) -> bool {
        actor.is_admin() && !actor.is(target.id) && target.system_admin
    }

    pub fn can_manage_roles(actor: &Actor) -> bool {
        actor.is_admin()
    }
}
