mod negotiation_state;
mod peer_negotiator;

pub use negotiation_state::*;
pub use peer_negotiator::*;
