mod config_cmd;
mod status;
mod steps;
mod tracker;
mod water;

pub use config_cmd::ConfigCommand;
pub use status::show_status;
pub use steps::StepsCommand;
pub use tracker::CommandContext;
pub use water::WaterCommand;
