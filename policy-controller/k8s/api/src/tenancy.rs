pub mod configuration;
pub mod tenant;
