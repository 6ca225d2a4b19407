use std::str::FromStr;

use anyhow::Result;
use nsi_aura_codec::VlanRanges;
use nsi_aura_core::Stp;
use sqlx::{AnyPool, Row};

/// Row shape used only at the persistence boundary; domain code works with
/// [`Stp`].
struct StpRow {
    id: i64,
    stp_id: String,
    inbound_port: Option<String>,
    outbound_port: Option<String>,
    inbound_alias: Option<String>,
    outbound_alias: Option<String>,
    vlan_range: String,
    description: Option<String>,
    active: bool,
}

impl StpRow {
    fn into_domain(self) -> Result<Stp> {
        Ok(Stp {
            id: self.id,
            stp_id: self.stp_id,
            inbound_port: self.inbound_port,
            outbound_port: self.outbound_port,
            inbound_alias: self.inbound_alias,
            outbound_alias: self.outbound_alias,
            vlan_range: VlanRanges::from_str(&self.vlan_range)?,
            description: self.description,
            active: self.active,
        })
    }

    fn from_row(row: &sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            stp_id: row.try_get("stp_id")?,
            inbound_port: row.try_get("inbound_port")?,
            outbound_port: row.try_get("outbound_port")?,
            inbound_alias: row.try_get("inbound_alias")?,
            outbound_alias: row.try_get("outbound_alias")?,
            vlan_range: row.try_get("vlan_range")?,
            description: row.try_get("description")?,
            active: row.try_get::<i64, _>("active")? != 0,
        })
    }
}

const SELECT_COLUMNS: &str = "id, stp_id, inbound_port, outbound_port, inbound_alias, \
     outbound_alias, vlan_range, description, active";

pub async fn get_by_stp_id(pool: &AnyPool, stp_id: &str) -> Result<Option<Stp>> {
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM stp WHERE stp_id = ?"))
        .bind(stp_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| StpRow::from_row(&r)?.into_domain())
        .transpose()
}

pub async fn get_by_id(pool: &AnyPool, id: i64) -> Result<Option<Stp>> {
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM stp WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| StpRow::from_row(&r)?.into_domain())
        .transpose()
}

/// Active and inactive rows alike — topology reconciliation needs to see
/// soft-deleted STPs too, since a vanished-then-reappeared STP must be
/// reactivated in place rather than inserted again.
pub async fn list_all(pool: &AnyPool) -> Result<Vec<Stp>> {
    let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM stp"))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| StpRow::from_row(r)?.into_domain())
        .collect()
}

pub async fn list_active(pool: &AnyPool) -> Result<Vec<Stp>> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM stp WHERE active = 1"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| StpRow::from_row(r)?.into_domain())
        .collect()
}

/// One row per STP the topology reconciler decided needs inserting.
pub struct NewStp<'a> {
    pub stp_id: &'a str,
    pub inbound_port: Option<&'a str>,
    pub outbound_port: Option<&'a str>,
    pub inbound_alias: Option<&'a str>,
    pub outbound_alias: Option<&'a str>,
    pub vlan_range: &'a VlanRanges,
    pub description: Option<&'a str>,
}

pub async fn insert(pool: &AnyPool, stp: &NewStp<'_>) -> Result<i64> {
    sqlx::query(
        "INSERT INTO stp (stp_id, inbound_port, outbound_port, inbound_alias, outbound_alias, \
         vlan_range, description, active) VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(stp.stp_id)
    .bind(stp.inbound_port)
    .bind(stp.outbound_port)
    .bind(stp.inbound_alias)
    .bind(stp.outbound_alias)
    .bind(stp.vlan_range.to_string())
    .bind(stp.description)
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT id FROM stp WHERE stp_id = ?")
        .bind(stp.stp_id)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("id")?)
}

pub async fn update(pool: &AnyPool, id: i64, stp: &NewStp<'_>) -> Result<()> {
    sqlx::query(
        "UPDATE stp SET inbound_port = ?, outbound_port = ?, inbound_alias = ?, \
         outbound_alias = ?, vlan_range = ?, description = ?, active = 1 WHERE id = ?",
    )
    .bind(stp.inbound_port)
    .bind(stp.outbound_port)
    .bind(stp.inbound_alias)
    .bind(stp.outbound_alias)
    .bind(stp.vlan_range.to_string())
    .bind(stp.description)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Soft-delete: every currently-active row whose id is not in `keep_ids`.
pub async fn deactivate_missing(pool: &AnyPool, keep_ids: &[i64]) -> Result<u64> {
    let active = list_active(pool).await?;
    let mut deactivated = 0;
    for stp in active {
        if !keep_ids.contains(&stp.id) {
            sqlx::query("UPDATE stp SET active = 0 WHERE id = ?")
                .bind(stp.id)
                .execute(pool)
                .await?;
            deactivated += 1;
        }
    }
    Ok(deactivated)
}
