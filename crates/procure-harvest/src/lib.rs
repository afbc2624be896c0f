pub mod config;
pub mod error;
pub mod portal;
pub mod run;
pub mod telemetry;
pub mod workflows;
