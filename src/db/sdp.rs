use std::str::FromStr;

use anyhow::Result;
use nsi_aura_codec::VlanRanges;
use nsi_aura_core::Sdp;
use sqlx::{AnyPool, Row};

struct SdpRow {
    id: i64,
    stp_a_id: i64,
    stp_z_id: i64,
    vlan_range: String,
    description: Option<String>,
    active: bool,
}

impl SdpRow {
    fn into_domain(self) -> Result<Sdp> {
        Ok(Sdp {
            id: self.id,
            stp_a_id: self.stp_a_id,
            stp_z_id: self.stp_z_id,
            vlan_range: VlanRanges::from_str(&self.vlan_range)?,
            description: self.description,
            active: self.active,
        })
    }

    fn from_row(row: &sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            stp_a_id: row.try_get("stp_a_id")?,
            stp_z_id: row.try_get("stp_z_id")?,
            vlan_range: row.try_get("vlan_range")?,
            description: row.try_get("description")?,
            active: row.try_get::<i64, _>("active")? != 0,
        })
    }
}

const SELECT_COLUMNS: &str = "id, stp_a_id, stp_z_id, vlan_range, description, active";

pub async fn list_active(pool: &AnyPool) -> Result<Vec<Sdp>> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM sdp WHERE active = 1"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| SdpRow::from_row(r)?.into_domain())
        .collect()
}

/// Active and inactive rows alike — reconciliation needs to see
/// soft-deleted SDPs too, since a vanished-then-reappeared pair must be
/// reactivated in place rather than inserted again.
pub async fn list_all(pool: &AnyPool) -> Result<Vec<Sdp>> {
    let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM sdp"))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| SdpRow::from_row(r)?.into_domain())
        .collect()
}

/// Find a row for the unordered pair `{stp_a_id, stp_z_id}`, in either
/// column order — an SDP's identity is the unordered pair, never a
/// directed one.
pub async fn find_unordered_pair(
    pool: &AnyPool,
    stp_a_id: i64,
    stp_z_id: i64,
) -> Result<Option<Sdp>> {
    let row = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM sdp WHERE (stp_a_id = ? AND stp_z_id = ?) \
         OR (stp_a_id = ? AND stp_z_id = ?)"
    ))
    .bind(stp_a_id)
    .bind(stp_z_id)
    .bind(stp_z_id)
    .bind(stp_a_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| SdpRow::from_row(&r)?.into_domain()).transpose()
}

pub struct NewSdp<'a> {
    pub stp_a_id: i64,
    pub stp_z_id: i64,
    pub vlan_range: &'a VlanRanges,
    pub description: Option<&'a str>,
}

pub async fn insert(pool: &AnyPool, sdp: &NewSdp<'_>) -> Result<i64> {
    sqlx::query(
        "INSERT INTO sdp (stp_a_id, stp_z_id, vlan_range, description, active) \
         VALUES (?, ?, ?, ?, 1)",
    )
    .bind(sdp.stp_a_id)
    .bind(sdp.stp_z_id)
    .bind(sdp.vlan_range.to_string())
    .bind(sdp.description)
    .execute(pool)
    .await?;

    let row = sqlx::query(
        "SELECT id FROM sdp WHERE stp_a_id = ? AND stp_z_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(sdp.stp_a_id)
    .bind(sdp.stp_z_id)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("id")?)
}

pub async fn update(pool: &AnyPool, id: i64, sdp: &NewSdp<'_>) -> Result<()> {
    sqlx::query("UPDATE sdp SET vlan_range = ?, description = ?, active = 1 WHERE id = ?")
        .bind(sdp.vlan_range.to_string())
        .bind(sdp.description)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Soft-delete every active SDP whose id isn't in `keep_ids`.
pub async fn deactivate_missing(pool: &AnyPool, keep_ids: &[i64]) -> Result<u64> {
    let active = list_active(pool).await?;
    let mut deactivated = 0;
    for sdp in active {
        if !keep_ids.contains(&sdp.id) {
            sqlx::query("UPDATE sdp SET active = 0 WHERE id = ?")
                .bind(sdp.id)
                .execute(pool)
                .await?;
            deactivated += 1;
        }
    }
    Ok(deactivated)
}
