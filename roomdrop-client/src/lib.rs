mod config;
mod engine;
mod error;
mod negotiator;
mod relay;
mod session;
mod transfer;
mod transport;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use negotiator::*;
pub use relay::*;
pub use session::*;
pub use transfer::*;
pub use transport::*;
