//! Pure diff logic: a fresh DDS snapshot plus the current database rows in,
//! insert/update/reactivate/soft-delete operation lists out. No database
//! handle anywhere in this file — unit-testable on plain structs.

use nsi_aura_core::{Sdp, Stp};

use super::nml::StpRecord;

#[derive(Debug, PartialEq)]
pub struct StpDiff {
    pub to_insert: Vec<StpRecord>,
    /// existing row id, fresh attributes (also covers reactivation: an
    /// inactive row that reappears is always routed here, even if its
    /// other fields are unchanged).
    pub to_update: Vec<(i64, StpRecord)>,
    /// ids that must survive the soft-delete sweep: already-active rows
    /// that are unchanged and don't need writing.
    pub keep_ids: Vec<i64>,
}

fn stp_unchanged(existing: &Stp, fresh: &StpRecord) -> bool {
    existing.active
        && existing.inbound_port == fresh.inbound_port
        && existing.outbound_port == fresh.outbound_port
        && existing.inbound_alias == fresh.inbound_alias
        && existing.outbound_alias == fresh.outbound_alias
        && existing.vlan_range == fresh.vlan_range
        && existing.description == fresh.description
}

/// `existing` should include inactive rows too, so a vanished-then-returned
/// STP is reactivated in place rather than duplicated.
pub fn diff_stp(existing: &[Stp], fresh: &[StpRecord]) -> StpDiff {
    let mut to_insert = Vec::new();
    let mut to_update = Vec::new();
    let mut keep_ids = Vec::new();

    for record in fresh {
        match existing.iter().find(|s| s.stp_id == record.stp_id) {
            Some(row) if stp_unchanged(row, record) => keep_ids.push(row.id),
            Some(row) => to_update.push((row.id, record.clone())),
            None => to_insert.push(record.clone()),
        }
    }

    StpDiff {
        to_insert,
        to_update,
        keep_ids,
    }
}

/// An unordered pair of STPs whose mutual aliasing qualifies them as an
/// SDP, with the combined VLAN range the two endpoints admit.
#[derive(Debug, Clone, PartialEq)]
pub struct SdpCandidate {
    pub stp_a_id: i64,
    pub stp_z_id: i64,
    pub vlan_range: nsi_aura_codec::VlanRanges,
    pub description: Option<String>,
}

/// Recompute every `(a, z)` pair satisfying the mutual-alias condition from
/// the current, fully-resolved STP set. The pair is emitted once, ordered
/// by ascending surrogate key, so the caller never produces both `(A,Z)`
/// and `(Z,A)`.
pub fn compute_sdp_candidates(stps: &[Stp]) -> Vec<SdpCandidate> {
    let mut candidates = Vec::new();

    for a in stps {
        for z in stps {
            if a.id >= z.id {
                continue;
            }

            let (Some(a_in_alias), Some(a_out_alias)) = (&a.inbound_alias, &a.outbound_alias)
            else {
                continue;
            };
            let (Some(z_in_alias), Some(z_out_alias)) = (&z.inbound_alias, &z.outbound_alias)
            else {
                continue;
            };
            let (Some(a_in), Some(a_out)) = (&a.inbound_port, &a.outbound_port) else {
                continue;
            };
            let (Some(z_in), Some(z_out)) = (&z.inbound_port, &z.outbound_port) else {
                continue;
            };

            if a_in_alias == z_out && a_out_alias == z_in && z_in_alias == a_out && z_out_alias == a_in
            {
                candidates.push(SdpCandidate {
                    stp_a_id: a.id,
                    stp_z_id: z.id,
                    vlan_range: a.vlan_range.union(&z.vlan_range),
                    description: a.description.clone().or_else(|| z.description.clone()),
                });
            }
        }
    }

    candidates
}

#[derive(Debug, PartialEq)]
pub struct SdpDiff {
    pub to_insert: Vec<SdpCandidate>,
    pub to_update: Vec<(i64, SdpCandidate)>,
    pub keep_ids: Vec<i64>,
}

fn sdp_unchanged(existing: &Sdp, fresh: &SdpCandidate) -> bool {
    existing.active && existing.vlan_range == fresh.vlan_range && existing.description == fresh.description
}

fn same_unordered_pair(sdp: &Sdp, candidate: &SdpCandidate) -> bool {
    (sdp.stp_a_id == candidate.stp_a_id && sdp.stp_z_id == candidate.stp_z_id)
        || (sdp.stp_a_id == candidate.stp_z_id && sdp.stp_z_id == candidate.stp_a_id)
}

pub fn diff_sdp(existing: &[Sdp], fresh: &[SdpCandidate]) -> SdpDiff {
    let mut to_insert = Vec::new();
    let mut to_update = Vec::new();
    let mut keep_ids = Vec::new();

    for candidate in fresh {
        match existing.iter().find(|s| same_unordered_pair(s, candidate)) {
            Some(row) if sdp_unchanged(row, candidate) => keep_ids.push(row.id),
            Some(row) => to_update.push((row.id, candidate.clone())),
            None => to_insert.push(candidate.clone()),
        }
    }

    SdpDiff {
        to_insert,
        to_update,
        keep_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record(stp_id: &str) -> StpRecord {
        StpRecord {
            stp_id: stp_id.to_string(),
            inbound_port: Some(format!("{stp_id}:in")),
            outbound_port: Some(format!("{stp_id}:out")),
            inbound_alias: None,
            outbound_alias: None,
            vlan_range: nsi_aura_codec::VlanRanges::from_str("100-200").unwrap(),
            description: None,
        }
    }

    fn existing_stp(id: i64, stp_id: &str, active: bool) -> Stp {
        Stp {
            id,
            stp_id: stp_id.to_string(),
            inbound_port: Some(format!("{stp_id}:in")),
            outbound_port: Some(format!("{stp_id}:out")),
            inbound_alias: None,
            outbound_alias: None,
            vlan_range: nsi_aura_codec::VlanRanges::from_str("100-200").unwrap(),
            description: None,
            active,
        }
    }

    #[test]
    fn new_stp_is_inserted() {
        let diff = diff_stp(&[], &[record("x")]);
        assert_eq!(diff.to_insert.len(), 1);
        assert!(diff.to_update.is_empty());
    }

    #[test]
    fn unchanged_active_stp_is_kept_not_rewritten() {
        let existing = [existing_stp(1, "x", true)];
        let diff = diff_stp(&existing, &[record("x")]);
        assert_eq!(diff.keep_ids, vec![1]);
        assert!(diff.to_update.is_empty());
    }

    #[test]
    fn inactive_stp_that_reappears_is_reactivated_via_update() {
        let existing = [existing_stp(1, "x", false)];
        let diff = diff_stp(&existing, &[record("x")]);
        assert_eq!(diff.to_update, vec![(1, record("x"))]);
    }

    #[test]
    fn sdp_candidates_require_symmetric_aliasing() {
        let a = Stp {
            inbound_alias: Some("z:out".to_string()),
            outbound_alias: Some("z:in".to_string()),
            ..existing_stp(1, "a", true)
        };
        let z = Stp {
            inbound_alias: Some("a:out".to_string()),
            outbound_alias: Some("a:in".to_string()),
            ..existing_stp(2, "z", true)
        };
        let candidates = compute_sdp_candidates(&[a, z]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].stp_a_id, 1);
        assert_eq!(candidates[0].stp_z_id, 2);
    }

    #[test]
    fn sdp_candidates_never_emit_both_orderings() {
        let a = Stp {
            inbound_alias: Some("z:out".to_string()),
            outbound_alias: Some("z:in".to_string()),
            ..existing_stp(1, "a", true)
        };
        let z = Stp {
            inbound_alias: Some("a:out".to_string()),
            outbound_alias: Some("a:in".to_string()),
            ..existing_stp(2, "z", true)
        };
        let forward = compute_sdp_candidates(&[a.clone(), z.clone()]);
        let reversed = compute_sdp_candidates(&[z, a]);
        assert_eq!(forward.len(), 1);
        assert_eq!(reversed.len(), 1);
    }
}
