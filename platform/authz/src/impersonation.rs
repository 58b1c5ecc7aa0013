use crate::{Actor, Resource};

/// Who may act as whom.
pub struct ImpersonationPolicy;

impl ImpersonationPolicy {
    /// Administrators may impersonate any user except themselves and other
    /// administrators.
    pub fn can_start(actor: &Actor, target: &Resource) -> bool {
        let Some(user) = target.as_user() else {
            return false;
        };
        actor.is_admin() && !actor.is(user.id) && !user.system_admin
    }

    /// Checked against the true user, not the impersonated one.
    pub fn can_stop(actor: &Actor) -> bool {
        actor.is_admin()
    }

    pub fn can_view_audit_logs(actor: &Actor) -> bool {
        actor.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRecord;
    use uuid::Uuid;

    #[test]
    fn admin_can_impersonate_regular_user() {
        let admin = Actor::new(Uuid::new_v4(), true);
        let target = Resource::User(UserRecord::new(Uuid::new_v4(), false));
        assert!(ImpersonationPolicy::can_start(&admin, &target));
    }

    #[test]
    fn nobody_impersonates_themselves() {
        let admin = Actor::new(Uuid::new_v4(), true);
        let member = Actor::new(Uuid::new_v4(), false);
        assert!(!ImpersonationPolicy::can_start(
            &admin,
            &Resource::User(admin.as_record())
        ));
        assert!(!ImpersonationPolicy::can_start(
            &member,
            &Resource::User(member.as_record())
        ));
    }

    #[test]
    fn admins_cannot_impersonate_admins() {
        let admin = Actor::new(Uuid::new_v4(), true);
        let other_admin = Resource::User(UserRecord::new(Uuid::new_v4(), true));
        assert!(!ImpersonationPolicy::can_start(&admin, &other_admin));
    }

    #[test]
    fn only_user_records_can_be_impersonated() {
        let admin = Actor::new(Uuid::new_v4(), true);
        assert!(!ImpersonationPolicy::can_start(
            &admin,
            &Resource::Configuration(Uuid::new_v4())
        ));
        assert!(!ImpersonationPolicy::can_start(
            &admin,
            &Resource::AuditLog(Uuid::new_v4())
        ));
    }

    #[test]
    fn non_admin_cannot_start_stop_or_audit() {
        let member = Actor::new(Uuid::new_v4(), false);
        let target = Resource::User(UserRecord::new(Uuid::new_v4(), false));
        assert!(!ImpersonationPolicy::can_start(&member, &target));
        assert!(!ImpersonationPolicy::can_stop(&member));
        assert!(!ImpersonationPolicy::can_view_audit_logs(&member));
    }

    #[test]
    fn admin_can_stop_and_audit() {
        let admin = Actor::new(Uuid::new_v4(), true);
        assert!(ImpersonationPolicy::can_stop(&admin));
        assert!(ImpersonationPolicy::can_view_audit_logs(&admin));
    }
}
