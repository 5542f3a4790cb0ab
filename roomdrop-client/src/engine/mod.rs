mod client_event;
mod engine;
mod engine_command;
mod engine_handle;

pub use client_event::*;
pub use engine::*;
pub use engine_command::*;
pub use engine_handle::*;
