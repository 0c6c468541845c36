pub mod actuator;
pub mod capture;
pub mod composer;
pub mod config;
pub mod engine;
pub mod probe;
pub mod reason;
pub mod resolver;
pub mod templates;
