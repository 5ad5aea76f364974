pub mod bootstrap;
pub mod config;
pub mod control;
pub mod pins;
pub mod query;
pub mod routes;
pub mod types;

pub use bootstrap::{wait_for_association, Association, BootstrapError};
pub use config::{BootstrapPolicy, NetworkConfig, RuntimeConfig};
pub use control::{ControlError, GpioController};
pub use pins::PinId;
pub use query::{coerce_int, query_param, query_value};
pub use routes::*;
pub use types::{ErrorResponse, GpioStatus, PinReport, SetPinResponse};
