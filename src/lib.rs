pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod upstream;

pub use config::ValidatorConfig;
pub use dnssec::ValidatingResolver;
pub use error::{Result, VordrError};
pub use upstream::Upstream;
