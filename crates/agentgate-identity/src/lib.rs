pub mod error;
pub mod quota;
pub mod store;
pub mod types;

pub use error::{IdentityError, Result};
pub use quota::{RateLimiter, RejectReason, Rejection};
pub use store::IdentityStore;
pub use types::{Identity, Traits};
