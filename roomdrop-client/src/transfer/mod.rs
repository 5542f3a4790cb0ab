mod file_sink;
mod local_file;
mod transfer_controller;
mod transfer_state;

pub use file_sink::*;
pub use local_file::*;
pub use transfer_controller::*;
pub use transfer_state::*;
