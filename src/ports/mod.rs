//! Port traits at the hexagon boundary.

pub mod config_port;
pub mod data_port;
pub mod report_port;
