pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod reasoning;
pub mod sanitize;
pub mod secrets;
