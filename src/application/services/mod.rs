pub mod auth_gate;
pub mod registry;
pub mod sender;
pub mod signing;
