use thiserror::Error;

/// The full, exhaustive set of reservation states. `Deleted` is the only
/// final state — everything else can still (in principle) receive an
/// event, even if every event from it is illegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    New,
    ReserveChecking,
    ReserveHeld,
    ReserveFailed,
    ReserveTimeout,
    ReserveCommitting,
    ReserveCommitted,
    Provisioning,
    Provisioned,
    Active,
    Releasing,
    Released,
    Failed,
    Terminating,
    Terminated,
    Deleted,
}

impl ConnectionState {
    pub const ALL: &'static [ConnectionState] = &[
        Self::New,
        Self::ReserveChecking,
        Self::ReserveHeld,
        Self::ReserveFailed,
        Self::ReserveTimeout,
        Self::ReserveCommitting,
        Self::ReserveCommitted,
        Self::Provisioning,
        Self::Provisioned,
        Self::Active,
        Self::Releasing,
        Self::Released,
        Self::Failed,
        Self::Terminating,
        Self::Terminated,
        Self::Deleted,
    ];

    /// States in which the reservation holds resources it must be counted
    /// against in the free-VLAN computation (every state except `New`,
    /// `ReserveFailed`, `ReserveTimeout`, `Terminated`, `Deleted`).
    pub fn holds_resources(self) -> bool {
        !matches!(
            self,
            Self::New | Self::ReserveFailed | Self::ReserveTimeout | Self::Terminated | Self::Deleted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "ConnectionNew",
            Self::ReserveChecking => "ConnectionReserveChecking",
            Self::ReserveHeld => "ConnectionReserveHeld",
            Self::ReserveFailed => "ConnectionReserveFailed",
            Self::ReserveTimeout => "ConnectionReserveTimeout",
            Self::ReserveCommitting => "ConnectionReserveCommitting",
            Self::ReserveCommitted => "ConnectionReserveCommitted",
            Self::Provisioning => "ConnectionProvisioning",
            Self::Provisioned => "ConnectionProvisioned",
            Self::Active => "ConnectionActive",
            Self::Releasing => "ConnectionReleasing",
            Self::Released => "ConnectionReleased",
            Self::Failed => "ConnectionFailed",
            Self::Terminating => "ConnectionTerminating",
            Self::Terminated => "ConnectionTerminated",
            Self::Deleted => "ConnectionDeleted",
        }
    }
}

impl std::str::FromStr for ConnectionState {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or(TransitionError::UnknownState(s.to_string()))
    }
}

/// Every event the state machine can be driven by, whether user-initiated
/// or a parsed NSI callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    NsiSendReserve,
    NsiReceiveReserveConfirmed,
    NsiReceiveReserveFailed,
    ConnectionError,
    NsiReceiveReserveTimeout,
    NsiSendReserveCommit,
    NsiReceiveReserveCommitConfirmed,
    NsiSendProvision,
    NsiReceiveProvisionConfirmed,
    NsiReceiveDataPlaneUp,
    NsiSendRelease,
    NsiReceiveReleaseConfirmed,
    NsiReceiveDataPlaneDown,
    NsiReceiveErrorEvent,
    NsiSendTerminate,
    NsiReceiveTerminateConfirmed,
    GuiDeleteConnection,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("event {event:?} is not legal from state {from}")]
    IllegalTransition {
        event: Event,
        from: ConnectionState,
    },
    #[error("unknown state name: {0}")]
    UnknownState(String),
}

impl TransitionError {
    pub fn event(&self) -> Option<Event> {
        match self {
            Self::IllegalTransition { event, .. } => Some(*event),
            Self::UnknownState(_) => None,
        }
    }
}

/// Apply `event` to `from`, yielding the successor state or a typed
/// rejection. Pure: no I/O, no clock, no persistence — the caller commits
/// the result and only then schedules whatever side effect the event
/// implies.
pub fn apply(from: ConnectionState, event: Event) -> Result<ConnectionState, TransitionError> {
    use ConnectionState::*;
    use Event::*;

    let to = match (event, from) {
        (NsiSendReserve, New | ReserveFailed | Terminated) => ReserveChecking,
        (NsiReceiveReserveConfirmed, ReserveChecking) => ReserveHeld,
        (NsiReceiveReserveFailed, ReserveChecking) => ReserveFailed,
        (ConnectionError, ReserveChecking) => ReserveFailed,
        (NsiReceiveReserveTimeout, ReserveHeld) => ReserveTimeout,
        (NsiSendReserveCommit, ReserveHeld) => ReserveCommitting,
        (NsiReceiveReserveCommitConfirmed, ReserveCommitting) => ReserveCommitted,
        (NsiSendProvision, ReserveCommitted) => Provisioning,
        (NsiReceiveProvisionConfirmed, Provisioning) => Provisioned,
        (NsiReceiveDataPlaneUp, Provisioned) => Active,
        (NsiSendRelease, Active) => Releasing,
        (NsiReceiveReleaseConfirmed, Releasing) => Released,
        (NsiReceiveDataPlaneDown, Released) => ReserveCommitted,
        (NsiReceiveErrorEvent, Active | Provisioned) => Failed,
        (NsiSendTerminate, ReserveTimeout | ReserveCommitted | Failed | ReserveFailed) => {
            Terminating
        }
        (NsiReceiveTerminateConfirmed, Terminating) => Terminated,
        (GuiDeleteConnection, Terminated) => Deleted,
        _ => return Err(TransitionError::IllegalTransition { event, from }),
    };

    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;
    use Event::*;

    #[test]
    fn happy_path_end_to_end() {
        let mut state = New;
        for (event, expected) in [
            (NsiSendReserve, ReserveChecking),
            (NsiReceiveReserveConfirmed, ReserveHeld),
            (NsiSendReserveCommit, ReserveCommitting),
            (NsiReceiveReserveCommitConfirmed, ReserveCommitted),
            (NsiSendProvision, Provisioning),
            (NsiReceiveProvisionConfirmed, Provisioned),
            (NsiReceiveDataPlaneUp, Active),
        ] {
            state = apply(state, event).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn release_cycle() {
        let mut state = Active;
        state = apply(state, NsiSendRelease).unwrap();
        assert_eq!(state, Releasing);
        state = apply(state, NsiReceiveReleaseConfirmed).unwrap();
        assert_eq!(state, Released);
        state = apply(state, NsiReceiveDataPlaneDown).unwrap();
        assert_eq!(state, ReserveCommitted);
    }

    #[test]
    fn reserve_failed_allows_retry() {
        let state = apply(ReserveChecking, NsiReceiveReserveFailed).unwrap();
        assert_eq!(state, ReserveFailed);
        let retried = apply(state, NsiSendReserve).unwrap();
        assert_eq!(retried, ReserveChecking);
    }

    #[test]
    fn error_event_from_active_or_provisioned_fails() {
        assert_eq!(apply(Active, NsiReceiveErrorEvent).unwrap(), Failed);
        assert_eq!(apply(Provisioned, NsiReceiveErrorEvent).unwrap(), Failed);
    }

    #[test]
    fn illegal_transition_is_rejected_and_state_is_untouched() {
        let err = apply(New, NsiReceiveReserveConfirmed).unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalTransition {
                event: NsiReceiveReserveConfirmed,
                from: New,
            }
        );
    }

    #[test]
    fn every_declared_state_name_round_trips() {
        for &state in ConnectionState::ALL {
            let parsed: ConnectionState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn holds_resources_excludes_terminal_and_pre_reservation_states() {
        assert!(!New.holds_resources());
        assert!(!ReserveFailed.holds_resources());
        assert!(!ReserveTimeout.holds_resources());
        assert!(!Terminated.holds_resources());
        assert!(!Deleted.holds_resources());
        assert!(ReserveChecking.holds_resources());
        assert!(Active.holds_resources());
    }
}
