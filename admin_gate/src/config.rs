//! Central configuration for the admin-gate crate

use std::sync::LazyLock;

/// Route prefix under which the integration layer mounts the gate endpoints.
///
/// Default: "/gate"
pub static ADMIN_GATE_ROUTE_PREFIX: LazyLock<String> =
    LazyLock::new(|| std::env::var("ADMIN_GATE_ROUTE_PREFIX").unwrap_or_else(|_| "/gate".to_string()));

/// The shared admin secret. Compared in constant time; never logged.
pub(crate) static ADMIN_PIN: LazyLock<String> =
    LazyLock::new(|| std::env::var("ADMIN_PIN").expect("ADMIN_PIN must be set"));

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_route_prefix_default() {
        // The LazyLock may already be initialized, so test the same logic it
        // uses rather than the static itself.
        let original_value = env::var("ADMIN_GATE_ROUTE_PREFIX").ok();

        unsafe {
            env::remove_var("ADMIN_GATE_ROUTE_PREFIX");
        }
        let prefix =
            env::var("ADMIN_GATE_ROUTE_PREFIX").unwrap_or_else(|_| "/gate".to_string());
        assert_eq!(prefix, "/gate");

        unsafe {
            env::set_var("ADMIN_GATE_ROUTE_PREFIX", "/custom");
        }
        let prefix =
            env::var("ADMIN_GATE_ROUTE_PREFIX").unwrap_or_else(|_| "/gate".to_string());
        assert_eq!(prefix, "/custom");

        unsafe {
            match original_value {
                Some(value) => env::set_var("ADMIN_GATE_ROUTE_PREFIX", value),
                None => env::remove_var("ADMIN_GATE_ROUTE_PREFIX"),
            }
        }
    }
}
