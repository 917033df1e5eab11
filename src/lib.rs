// Library exports for restaurant-finder
// This allows the modules to be imported in tests and by the binary

pub mod cache;
pub mod clock;
pub mod config;
pub mod mcp;
pub mod providers;
pub mod tools;
pub mod usage;
