use chrono::{DateTime, Utc};
use nsi_aura_codec::VlanRanges;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ConnectionState;

/// A directional port endpoint on a domain, derived from NML topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stp {
    pub id: i64,
    pub stp_id: String,
    pub inbound_port: Option<String>,
    pub outbound_port: Option<String>,
    pub inbound_alias: Option<String>,
    pub outbound_alias: Option<String>,
    pub vlan_range: VlanRanges,
    pub description: Option<String>,
    pub active: bool,
}

/// A bidirectional inter-domain link realized by two STPs that mutually
/// alias each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sdp {
    pub id: i64,
    pub stp_a_id: i64,
    pub stp_z_id: i64,
    pub vlan_range: VlanRanges,
    pub description: Option<String>,
    pub active: bool,
}

/// One cross-domain connection request and its complete NSI lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub connection_id: Option<Uuid>,
    pub global_reservation_id: Uuid,
    pub correlation_id: Uuid,
    pub description: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub source_stp_id: i64,
    pub dest_stp_id: i64,
    pub source_vlan: u16,
    pub dest_vlan: u16,
    pub bandwidth: u32,
    pub sdp_ids: Vec<i64>,
    pub state: ConnectionState,
}

impl Reservation {
    /// Whether this reservation currently counts against the free-VLAN set
    /// of the STPs it touches.
    pub fn holds_resources(&self) -> bool {
        self.state.holds_resources()
    }
}

/// Append-only, human-readable event record streamed to the GUI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub reservation_id: i64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub module: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
}

/// `stp.vlanRange - (union of sourceVlan over active reservations using it
/// as source) - (union of destVlan over active reservations using it as
/// dest)`, per the free-VLAN computation.
pub fn free_vlans(
    stp_vlan_range: &VlanRanges,
    reservations_using_as_source: impl Iterator<Item = u16>,
    reservations_using_as_dest: impl Iterator<Item = u16>,
) -> nsi_aura_codec::Result<VlanRanges> {
    let used_source = VlanRanges::from_members(reservations_using_as_source)?;
    let used_dest = VlanRanges::from_members(reservations_using_as_dest)?;
    Ok(stp_vlan_range
        .difference(&used_source)
        .difference(&used_dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn reservation(state: ConnectionState, source_vlan: u16, source_stp: i64) -> Reservation {
        Reservation {
            id: 1,
            connection_id: None,
            global_reservation_id: Uuid::nil(),
            correlation_id: Uuid::nil(),
            description: "test".to_string(),
            start_time: None,
            end_time: None,
            source_stp_id: source_stp,
            dest_stp_id: 2,
            source_vlan,
            dest_vlan: 200,
            bandwidth: 1000,
            sdp_ids: Vec::new(),
            state,
        }
    }

    #[test]
    fn free_vlans_excludes_only_active_reservations() {
        let stp_range = VlanRanges::from_str("100-200").unwrap();
        let active = reservation(ConnectionState::Active, 100, 1);
        let failed = reservation(ConnectionState::ReserveFailed, 101, 1);

        let reservations = [active, failed];
        let used_source = reservations
            .iter()
            .filter(|r| r.holds_resources() && r.source_stp_id == 1)
            .map(|r| r.source_vlan);

        let free = free_vlans(&stp_range, used_source, std::iter::empty()).unwrap();
        assert!(!free.contains(100));
        assert!(free.contains(101));
        assert!(free.contains(200));
    }
}
