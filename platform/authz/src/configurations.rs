use uuid::Uuid;

use crate::Actor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigurationAction {
    Index,
    Create,
    Show(Uuid),
    Update(Uuid),
    Destroy(Uuid),
    Toggle(Uuid),
}

impl ConfigurationAction {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigurationAction::Index => "configurations:index",
            ConfigurationAction::Create => "configurations:create",
            ConfigurationAction::Show(_) => "configurations:show",
            ConfigurationAction::Update(_) => "configurations:update",
            ConfigurationAction::Destroy(_) => "configurations:destroy",
            ConfigurationAction::Toggle(_) => "configurations:toggle",
        }
    }

    pub(crate) fn resource(&self) -> String {
        match self {
            ConfigurationAction::Index | ConfigurationAction::Create => "configurations".into(),
            ConfigurationAction::Show(id)
            | ConfigurationAction::Update(id)
            | ConfigurationAction::Destroy(id)
            | ConfigurationAction::Toggle(id) => format!("configuration:{id}"),
        }
    }
}

/// Configuration entries are an administrator-only surface.
pub struct ConfigurationPolicy;

impl ConfigurationPolicy {
    pub fn permits(actor: &Actor, _action: ConfigurationAction) -> bool {
        actor.is_admin()
    }
}
