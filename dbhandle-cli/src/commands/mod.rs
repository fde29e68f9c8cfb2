pub mod connect;
pub mod show_config;

pub use connect::{run_connect, ConnectArgs};
pub use show_config::{run_show_config, ShowConfigArgs};
