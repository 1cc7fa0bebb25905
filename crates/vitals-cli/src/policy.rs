//! Consumer-side filtering of blood oxygen status updates.
//!
//! The bus delivers every status a tracker reports, repeats included. A
//! display only wants to react when the status changes, so measurements run
//! their updates through a [`SpO2StatusFilter`].

use vitals_types::SpO2Status;

/// Passes a blood oxygen status only when it differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpO2StatusFilter {
    previous: SpO2Status,
}

impl SpO2StatusFilter {
    /// A filter that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status`; returns `true` if it is a change.
    pub fn accept(&mut self, status: SpO2Status) -> bool {
        if status == self.previous {
            return false;
        }
        self.previous = status;
        true
    }

    /// The last status passed through.
    pub fn previous(&self) -> SpO2Status {
        self.previous
    }

    /// Forget history; call before each new measurement.
    pub fn reset(&mut self) {
        self.previous = SpO2Status::Initial;
    }
}
