//! Role hierarchy and tenant access rules.

use uuid::Uuid;

use crate::models::Role;

/// `true` when `user_role` ranks at or above `required_role`.
pub fn has_role(user_role: Role, required_role: Role) -> bool {
    user_role.level() >= required_role.level()
}

/// Super admins may act on any tenant; everyone else only on their own.
pub fn can_access_tenant(user_tenant: Option<Uuid>, target_tenant: Uuid, role: Role) -> bool {
    if role == Role::SuperAdmin {
        return true;
    }
    user_tenant == Some(target_tenant)
}

pub fn is_staff(role: Role) -> bool {
    has_role(role, Role::Staff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(has_role(Role::SuperAdmin, Role::TenantAdmin));
        assert!(has_role(Role::TenantAdmin, Role::Staff));
        assert!(has_role(Role::Staff, Role::Staff));
        assert!(has_role(Role::Staff, Role::Customer));
        assert!(!has_role(Role::Customer, Role::Staff));
        assert!(!has_role(Role::TenantAdmin, Role::SuperAdmin));
    }

    fn role_level(role: &str) -> u8 {
        Role::parse(role).map(Role::level).unwrap_or(0)
    }

    #[test]
    fn test_role_levels() {
        assert_eq!(role_level("SUPER_ADMIN"), 4);
        assert_eq!(role_level("TENANT_ADMIN"), 3);
        assert_eq!(role_level("STAFF"), 2);
        assert_eq!(role_level("CUSTOMER"), 1);
        assert_eq!(role_level("OWNER"), 0);
        assert_eq!(role_level("customer"), 0);
    }

    #[test]
    fn test_tenant_access() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(can_access_tenant(None, other, Role::SuperAdmin));
        assert!(can_access_tenant(Some(own), own, Role::Customer));
        assert!(!can_access_tenant(Some(own), other, Role::TenantAdmin));
        assert!(!can_access_tenant(None, own, Role::Staff));
    }
}
