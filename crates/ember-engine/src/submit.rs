//! Hands ended command sequences to the device queue.

use crate::device::Device;
use crate::error::{RenderError, Result};
use crate::record::{CommandSequence, SequenceState};

/// Submits ended sequences to a device's queue.
///
/// Submission does not wait for the GPU. A sequence is submitted at most once;
/// a second attempt fails with `SequenceAlreadySubmitted`. If the device
/// rejects the encoded pass, the sequence stays `Ended`.
#[derive(Debug)]
pub struct Submitter<'d, D: Device> {
    device: &'d D,
    submitted: usize,
}

impl<'d, D: Device> Submitter<'d, D> {
    pub fn new(device: &'d D) -> Self {
        Self {
            device,
            submitted: 0,
        }
    }

    /// Sequences submitted through this submitter.
    #[inline]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn submit(&mut self, sequence: &mut CommandSequence<D>) -> Result<()> {
        match sequence.state() {
            SequenceState::Idle | SequenceState::Recording => {
                return Err(RenderError::SequenceNotEnded);
            }
            SequenceState::Submitted => return Err(RenderError::SequenceAlreadySubmitted),
            SequenceState::Ended => {}
        }

        let pass = sequence
            .recorded_pass()
            .ok_or(RenderError::SequenceNotEnded)?;
        let commands = self.device.encode(&pass)?;
        self.device.submit(commands)?;

        sequence.mark_submitted();
        self.submitted += 1;
        log::debug!("sequence '{}' submitted", sequence.label());
        Ok(())
    }
}
