//! HTTP API handlers for the assembly UI

pub mod battery;
pub mod buildinfo;
pub mod experiments;
pub mod health;
pub mod ui;

pub use battery::{generate_battery, validate_battery};
pub use buildinfo::get_build_info;
pub use experiments::{complete_experiment, get_experiment, list_experiments, preview_experiment};
pub use health::health_routes;
pub use ui::{serve_app_js, serve_index};
