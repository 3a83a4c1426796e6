pub mod config;
pub mod display;
pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod store;
pub mod types;
