mod relay_link;
mod relay_output;

pub use relay_link::*;
pub use relay_output::*;
