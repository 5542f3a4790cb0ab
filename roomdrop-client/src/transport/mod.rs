mod rtc_transport;
mod transport;
mod transport_config;
mod transport_event;

pub use rtc_transport::*;
pub use transport::*;
pub use transport_config::*;
pub use transport_event::*;
