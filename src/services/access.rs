//! Role-based screen access: a static table from role to permitted routes.
//!
//! `has_access` is pure. The authentication screen and the root are open to
//! everyone, including callers without a recognised role.

use crate::models::user::UserRole;

pub mod screens {
    pub const DASHBOARD: &str = "/dashboard";
    pub const ORDERS: &str = "/orders";
    pub const MENU: &str = "/menu";
    pub const ANALYTICS: &str = "/analytics";
    pub const INVENTORY: &str = "/inventory";
    pub const MESSAGES: &str = "/messages";
    pub const SETTINGS: &str = "/settings";
    pub const ADD_ITEMS: &str = "/add-items";
    pub const PAYMENT_METHOD: &str = "/payment-method";
    pub const ORDER_CONFIRMATION: &str = "/order-confirmation";
    pub const NOTIFICATIONS: &str = "/notifications";
    pub const RESTAURANTS: &str = "/restaurants";
    pub const AUTH: &str = "/auth";
    pub const ROOT: &str = "/";
}

use screens::*;

/// Every route identifier the client knows about.
pub const ALL_ROUTES: [&str; 14] = [
    DASHBOARD,
    ORDERS,
    MENU,
    ANALYTICS,
    INVENTORY,
    MESSAGES,
    SETTINGS,
    ADD_ITEMS,
    PAYMENT_METHOD,
    ORDER_CONFIRMATION,
    NOTIFICATIONS,
    RESTAURANTS,
    AUTH,
    ROOT,
];

/// Routes open regardless of role.
pub const PUBLIC_ROUTES: [&str; 2] = [AUTH, ROOT];

const CASHIER_ROUTES: &[&str] = &[
    ORDERS,
    MENU,
    ADD_ITEMS,
    PAYMENT_METHOD,
    ORDER_CONFIRMATION,
    NOTIFICATIONS,
    MESSAGES,
];

const MANAGER_ROUTES: &[&str] = &[
    DASHBOARD,
    ORDERS,
    MENU,
    ANALYTICS,
    INVENTORY,
    MESSAGES,
    SETTINGS,
    ADD_ITEMS,
    PAYMENT_METHOD,
    ORDER_CONFIRMATION,
    NOTIFICATIONS,
];

const OWNER_ROUTES: &[&str] = &[
    DASHBOARD,
    ORDERS,
    MENU,
    ANALYTICS,
    INVENTORY,
    MESSAGES,
    SETTINGS,
    ADD_ITEMS,
    PAYMENT_METHOD,
    ORDER_CONFIRMATION,
    NOTIFICATIONS,
    RESTAURANTS,
];

/// Routes a role may open.
pub fn role_access(role: UserRole) -> &'static [&'static str] {
    match role {
        UserRole::Cashier => CASHIER_ROUTES,
        UserRole::Manager => MANAGER_ROUTES,
        UserRole::Owner => OWNER_ROUTES,
    }
}

/// Whether a caller with `role` may open `path`. No role means no entries.
pub fn has_access(role: Option<UserRole>, path: &str) -> bool {
    if PUBLIC_ROUTES.contains(&path) {
        return true;
    }
    role.is_some_and(|r| role_access(r).contains(&path))
}

/// Same check for a raw role name, as stored by clients.
pub fn has_access_for_name(role: &str, path: &str) -> bool {
    has_access(UserRole::parse(role), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_non_empty_table() {
        for role in UserRole::ALL {
            assert!(!role_access(role).is_empty(), "{role:?} has no routes");
        }
    }

    #[test]
    fn permitted_routes_are_allowed_and_the_rest_denied() {
        for role in UserRole::ALL {
            let allowed = role_access(role);
            for path in ALL_ROUTES {
                let expected = allowed.contains(&path) || PUBLIC_ROUTES.contains(&path);
                assert_eq!(has_access(Some(role), path), expected, "{role:?} {path}");
            }
        }
    }

    #[test]
    fn auth_and_root_are_always_open() {
        for role in UserRole::ALL {
            assert!(has_access(Some(role), "/auth"));
            assert!(has_access(Some(role), "/"));
        }
        assert!(has_access(None, "/auth"));
        assert!(has_access(None, "/"));
        assert!(has_access_for_name("janitor", "/"));
    }

    #[test]
    fn unknown_role_is_denied_everything_else() {
        for path in ALL_ROUTES.iter().filter(|p| !PUBLIC_ROUTES.contains(p)) {
            assert!(!has_access(None, path));
            assert!(!has_access_for_name("janitor", path));
        }
    }

    #[test]
    fn unknown_paths_are_denied() {
        assert!(!has_access(Some(UserRole::Owner), "/admin"));
        assert!(!has_access(Some(UserRole::Owner), "/dashboard/"));
        assert!(!has_access(Some(UserRole::Owner), ""));
    }

    #[test]
    fn cashier_cannot_reach_back_office() {
        assert!(has_access(Some(UserRole::Cashier), "/orders"));
        assert!(!has_access(Some(UserRole::Cashier), "/dashboard"));
        assert!(!has_access(Some(UserRole::Cashier), "/inventory"));
        assert!(!has_access(Some(UserRole::Cashier), "/analytics"));
    }

    #[test]
    fn only_owner_manages_restaurants() {
        assert!(has_access(Some(UserRole::Owner), "/restaurants"));
        assert!(!has_access(Some(UserRole::Manager), "/restaurants"));
        assert!(has_access_for_name("manager", "/settings"));
    }
}
