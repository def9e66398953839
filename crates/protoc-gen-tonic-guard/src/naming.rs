//! Identifier mapping between proto service names and the items
//! tonic-build emits for them.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Module holding the generated guard metadata, e.g. `user_service_guard`.
pub fn guard_module(service: &str) -> String {
    format!("{}_guard", service.to_snake_case())
}

/// Module tonic-build generates for the server, e.g. `user_service_server`.
pub fn server_module(service: &str) -> String {
    format!("{}_server", service.to_snake_case())
}

/// The generated server wrapper type, e.g. `UserServiceServer`.
pub fn server_type(service: &str) -> String {
    format!("{}Server", service.to_upper_camel_case())
}

/// The generated handler trait, e.g. `UserService`.
pub fn handler_trait(service: &str) -> String {
    service.to_upper_camel_case()
}
