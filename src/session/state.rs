// SPDX-License-Identifier: GPL-3.0-only

//! Session state and the outcomes of session inputs

use std::fmt;

/// Lifecycle of one scanning attempt
///
/// Transitions only move forward: `Idle → Armed → Detected → Terminated`,
/// with `Terminated` reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Not yet bound to a frame source
    #[default]
    Idle,
    /// Bound and analyzing frames, no result yet
    Armed,
    /// A payload has been latched; frames are ignored
    Detected,
    /// Closed, frame source released
    Terminated,
}

impl SessionState {
    pub fn is_armed(&self) -> bool {
        matches!(self, SessionState::Armed)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Armed => "armed",
            SessionState::Detected => "detected",
            SessionState::Terminated => "terminated",
        };
        write!(f, "{}", name)
    }
}

/// Identifies one detector invocation
///
/// `generation` names the frame source binding the frame came from. Each
/// bind, rebind and terminate bumps the session's generation, so a ticket
/// from an older binding is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionTicket {
    pub generation: u64,
    pub sequence: u64,
}

impl fmt::Display for DetectionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}#{}", self.generation, self.sequence)
    }
}

/// What happened to a frame handed to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Passed to the detector under this ticket
    Submitted(DetectionTicket),
    /// A detection was already in flight
    DroppedBusy,
    /// The session was not armed
    DiscardedInactive(SessionState),
    /// The frame came from a binding that has since been replaced
    DiscardedStale,
}

impl FrameDisposition {
    pub fn ticket(&self) -> Option<DetectionTicket> {
        match self {
            FrameDisposition::Submitted(ticket) => Some(*ticket),
            _ => None,
        }
    }
}

/// What happened to a detector completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDisposition {
    /// The payload won; the session is now `Detected`
    Latched,
    /// No payload (or a detector failure); still armed
    NoPayload,
    /// The session left `Armed` or the binding changed first
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn test_state_display_is_lowercase() {
        assert_eq!(SessionState::Armed.to_string(), "armed");
        assert_eq!(SessionState::Terminated.to_string(), "terminated");
    }

    #[test]
    fn test_only_submitted_frames_carry_ticket() {
        let ticket = DetectionTicket {
            generation: 2,
            sequence: 7,
        };
        assert_eq!(FrameDisposition::Submitted(ticket).ticket(), Some(ticket));
        assert_eq!(FrameDisposition::DroppedBusy.ticket(), None);
        assert_eq!(ticket.to_string(), "g2#7");
    }
}
