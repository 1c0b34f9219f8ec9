pub mod config;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod ops;
pub mod session;
pub mod state;
pub mod topic;

pub use driver::{GatewayDriver, SessionDriver};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use session::Session;
