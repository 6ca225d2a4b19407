use crate::Error;

/// Outbound message kinds this agent ever sends to the provider.
///
/// One job kind in the dispatcher, one template in [`crate::templates`], per
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundKind {
    Reserve,
    ReserveCommit,
    Provision,
    Release,
    Terminate,
    QuerySummarySync,
}

impl OutboundKind {
    pub fn soap_action(self) -> &'static str {
        match self {
            Self::Reserve => "http://schemas.ogf.org/nsi/2013/12/connection/service/reserve",
            Self::ReserveCommit => {
                "http://schemas.ogf.org/nsi/2013/12/connection/service/reserveCommit"
            }
            Self::Provision => "http://schemas.ogf.org/nsi/2013/12/connection/service/provision",
            Self::Release => "http://schemas.ogf.org/nsi/2013/12/connection/service/release",
            Self::Terminate => "http://schemas.ogf.org/nsi/2013/12/connection/service/terminate",
            Self::QuerySummarySync => {
                "http://schemas.ogf.org/nsi/2013/12/connection/service/querySummarySync"
            }
        }
    }
}

/// Closed set of inbound `SOAPAction` values this agent knows how to route.
///
/// Replaces a string switch on the raw URN with an exhaustively-matched
/// enum: adding a new callback kind is a compile error everywhere the match
/// isn't updated, rather than a silently-ignored header value at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NsiAction {
    ReserveConfirmed,
    ReserveFailed,
    ReserveTimeout,
    ReserveCommitConfirmed,
    ProvisionConfirmed,
    ReleaseConfirmed,
    TerminateConfirmed,
    DataPlaneStateChange,
    ErrorEvent,
}

impl NsiAction {
    const PAIRS: &'static [(&'static str, NsiAction)] = &[
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/reserveConfirmed",
            NsiAction::ReserveConfirmed,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/reserveFailed",
            NsiAction::ReserveFailed,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/reserveTimeout",
            NsiAction::ReserveTimeout,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/reserveCommitConfirmed",
            NsiAction::ReserveCommitConfirmed,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/provisionConfirmed",
            NsiAction::ProvisionConfirmed,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/releaseConfirmed",
            NsiAction::ReleaseConfirmed,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/terminateConfirmed",
            NsiAction::TerminateConfirmed,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/dataPlaneStateChange",
            NsiAction::DataPlaneStateChange,
        ),
        (
            "http://schemas.ogf.org/nsi/2013/12/connection/service/errorEvent",
            NsiAction::ErrorEvent,
        ),
    ];

    /// Resolve a raw `SOAPAction` header value to a closed variant.
    ///
    /// # Test
    ///
    /// ```
    /// use nsi_aura_codec::NsiAction;
    ///
    /// let action = NsiAction::from_soap_action(
    ///     "http://schemas.ogf.org/nsi/2013/12/connection/service/reserveConfirmed",
    /// )
    /// .unwrap();
    /// assert_eq!(action, NsiAction::ReserveConfirmed);
    ///
    /// assert!(NsiAction::from_soap_action("bogus").is_err());
    /// ```
    pub fn from_soap_action(raw: &str) -> crate::Result<Self> {
        Self::PAIRS
            .iter()
            .find(|(urn, _)| *urn == raw)
            .map(|(_, action)| *action)
            .ok_or_else(|| Error::UnknownAction(raw.to_string()))
    }

    /// Whether this callback is correlated by `connectionId` rather than by
    /// the header `correlationId`.
    pub fn correlates_by_connection_id(self) -> bool {
        matches!(
            self,
            Self::ErrorEvent | Self::DataPlaneStateChange | Self::ReserveTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_round_trips() {
        for &(urn, action) in NsiAction::PAIRS {
            assert_eq!(NsiAction::from_soap_action(urn).unwrap(), action);
        }
    }

    #[test]
    fn connection_id_correlated_set() {
        assert!(NsiAction::ErrorEvent.correlates_by_connection_id());
        assert!(NsiAction::DataPlaneStateChange.correlates_by_connection_id());
        assert!(NsiAction::ReserveTimeout.correlates_by_connection_id());
        assert!(!NsiAction::ReserveConfirmed.correlates_by_connection_id());
    }
}
