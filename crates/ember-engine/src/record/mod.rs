//! Frame recording: the command sequence state machine.

mod command;
mod sequence;

pub use command::{Command, RecordedPass};
pub use sequence::{CommandSequence, SequenceState};
