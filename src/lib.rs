pub mod api;
pub mod common;
pub mod inspections;
pub mod models;
pub mod processing;
pub mod store;
