pub mod api;
pub mod channel;
pub mod configuration;
pub mod error_handling;
pub mod local_state;
pub mod media_source;
pub mod overlay;
pub mod session_management;
pub mod uplink;
