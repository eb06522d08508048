pub mod config;
pub mod error;
pub mod fingerprint;
pub mod tier;
pub mod time;

pub use config::GatewayConfig;
pub use error::{CoreError, Result};
pub use fingerprint::Fingerprint;
pub use tier::Tier;
