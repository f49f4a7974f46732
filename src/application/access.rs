use crate::domain::entities::role_level::{Actor, RoleLevel};

/// Capability checks applied by the billing use cases.
pub trait AccessPolicy: Send + Sync {
    /// Create, cancel, change plan, edit billing details, pay
    fn can_manage_subscriptions(&self, actor: &Actor) -> bool;

    /// Plan catalog mutations
    fn is_system_administrator(&self, actor: &Actor) -> bool;
}

/// Role-level based policy: administrators manage subscriptions, only system
/// administrators touch the plan catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleBasedAccessPolicy;

impl AccessPolicy for RoleBasedAccessPolicy {
    fn can_manage_subscriptions(&self, actor: &Actor) -> bool {
        matches!(
            actor.role,
            RoleLevel::SystemAdministrator | RoleLevel::CampusAdministrator
        )
    }

    fn is_system_administrator(&self, actor: &Actor) -> bool {
        actor.role == RoleLevel::SystemAdministrator
    }
}
