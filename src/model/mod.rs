pub mod backend_info;
pub mod config;
pub mod settings;
