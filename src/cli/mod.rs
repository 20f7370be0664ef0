pub mod app;
pub mod commands;
pub mod dispatcher;

pub use app::Config;
pub use commands::{Cli, Commands, ConfigCommand};
pub use dispatcher::LoggingDispatcher;
