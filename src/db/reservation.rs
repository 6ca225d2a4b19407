use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use nsi_aura_core::{ConnectionState, Reservation};
use sqlx::{AnyPool, Row};
use uuid::Uuid;

struct ReservationRow {
    id: i64,
    connection_id: Option<String>,
    global_reservation_id: String,
    correlation_id: String,
    description: String,
    start_time: Option<String>,
    end_time: Option<String>,
    source_stp_id: i64,
    dest_stp_id: i64,
    source_vlan: i64,
    dest_vlan: i64,
    bandwidth: i64,
    state: String,
}

impl ReservationRow {
    fn from_row(row: &sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            connection_id: row.try_get("connection_id")?,
            global_reservation_id: row.try_get("global_reservation_id")?,
            correlation_id: row.try_get("correlation_id")?,
            description: row.try_get("description")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            source_stp_id: row.try_get("source_stp_id")?,
            dest_stp_id: row.try_get("dest_stp_id")?,
            source_vlan: row.try_get("source_vlan")?,
            dest_vlan: row.try_get("dest_vlan")?,
            bandwidth: row.try_get("bandwidth")?,
            state: row.try_get("state")?,
        })
    }

    fn into_domain(self, sdp_ids: Vec<i64>) -> Result<Reservation> {
        Ok(Reservation {
            id: self.id,
            connection_id: self
                .connection_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("connection_id")?,
            global_reservation_id: Uuid::parse_str(&self.global_reservation_id)
                .context("global_reservation_id")?,
            correlation_id: Uuid::parse_str(&self.correlation_id).context("correlation_id")?,
            description: self.description,
            start_time: self
                .start_time
                .map(|s| parse_timestamp(&s))
                .transpose()?,
            end_time: self.end_time.map(|s| parse_timestamp(&s)).transpose()?,
            source_stp_id: self.source_stp_id,
            dest_stp_id: self.dest_stp_id,
            source_vlan: self.source_vlan as u16,
            dest_vlan: self.dest_vlan as u16,
            bandwidth: self.bandwidth as u32,
            sdp_ids,
            state: ConnectionState::from_str(&self.state)
                .map_err(|e| anyhow::anyhow!("stored state: {e}"))?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

const SELECT_COLUMNS: &str = "id, connection_id, global_reservation_id, correlation_id, \
     description, start_time, end_time, source_stp_id, dest_stp_id, source_vlan, dest_vlan, \
     bandwidth, state";

async fn sdp_ids_for(pool: &AnyPool, reservation_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT sdp_id FROM reservation_sdp_link WHERE reservation_id = ?")
        .bind(reservation_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(|r| Ok(r.try_get::<i64, _>("sdp_id")?)).collect()
}

pub async fn get(pool: &AnyPool, id: i64) -> Result<Option<Reservation>> {
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM reservation WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => {
            let sdp_ids = sdp_ids_for(pool, id).await?;
            Ok(Some(ReservationRow::from_row(&r)?.into_domain(sdp_ids)?))
        }
        None => Ok(None),
    }
}

pub async fn get_by_connection_id(pool: &AnyPool, connection_id: Uuid) -> Result<Option<Reservation>> {
    let row = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM reservation WHERE connection_id = ?"
    ))
    .bind(connection_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => {
            let parsed = ReservationRow::from_row(&r)?;
            let id = parsed.id;
            let sdp_ids = sdp_ids_for(pool, id).await?;
            Ok(Some(parsed.into_domain(sdp_ids)?))
        }
        None => Ok(None),
    }
}

pub async fn get_by_correlation_id(pool: &AnyPool, correlation_id: Uuid) -> Result<Option<Reservation>> {
    let row = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM reservation WHERE correlation_id = ?"
    ))
    .bind(correlation_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => {
            let parsed = ReservationRow::from_row(&r)?;
            let id = parsed.id;
            let sdp_ids = sdp_ids_for(pool, id).await?;
            Ok(Some(parsed.into_domain(sdp_ids)?))
        }
        None => Ok(None),
    }
}

/// Every reservation currently holding VLAN resources on `stp_id`, as a
/// source or a destination — feeds the free-VLAN computation.
pub async fn list_active_using_stp(pool: &AnyPool, stp_id: i64) -> Result<Vec<Reservation>> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM reservation WHERE source_stp_id = ? OR dest_stp_id = ?"
    ))
    .bind(stp_id)
    .bind(stp_id)
    .fetch_all(pool)
    .await?;

    let mut reservations = Vec::with_capacity(rows.len());
    for row in &rows {
        let parsed = ReservationRow::from_row(row)?;
        let id = parsed.id;
        let sdp_ids = sdp_ids_for(pool, id).await?;
        let reservation = parsed.into_domain(sdp_ids)?;
        if reservation.holds_resources() {
            reservations.push(reservation);
        }
    }
    Ok(reservations)
}

pub struct NewReservation<'a> {
    pub global_reservation_id: Uuid,
    pub correlation_id: Uuid,
    pub description: &'a str,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub source_stp_id: i64,
    pub dest_stp_id: i64,
    pub source_vlan: u16,
    pub dest_vlan: u16,
    pub bandwidth: u32,
    pub sdp_ids: &'a [i64],
}

pub async fn insert(pool: &AnyPool, reservation: &NewReservation<'_>) -> Result<i64> {
    sqlx::query(
        "INSERT INTO reservation (connection_id, global_reservation_id, correlation_id, \
         description, start_time, end_time, source_stp_id, dest_stp_id, source_vlan, \
         dest_vlan, bandwidth, state) VALUES (NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(reservation.global_reservation_id.to_string())
    .bind(reservation.correlation_id.to_string())
    .bind(reservation.description)
    .bind(reservation.start_time.map(|t| t.to_rfc3339()))
    .bind(reservation.end_time.map(|t| t.to_rfc3339()))
    .bind(reservation.source_stp_id)
    .bind(reservation.dest_stp_id)
    .bind(reservation.source_vlan as i64)
    .bind(reservation.dest_vlan as i64)
    .bind(reservation.bandwidth as i64)
    .bind(ConnectionState::New.as_str())
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT id FROM reservation WHERE global_reservation_id = ?")
        .bind(reservation.global_reservation_id.to_string())
        .fetch_one(pool)
        .await?;
    let id: i64 = row.try_get("id")?;

    for sdp_id in reservation.sdp_ids {
        sqlx::query("INSERT INTO reservation_sdp_link (reservation_id, sdp_id) VALUES (?, ?)")
            .bind(id)
            .bind(sdp_id)
            .execute(pool)
            .await?;
    }

    Ok(id)
}

/// Persist a state transition. Callers apply [`nsi_aura_core::state::apply`]
/// first and only then call this — the row write is the durability point
/// the job dispatcher waits on before issuing any network call.
pub async fn set_state(pool: &AnyPool, id: i64, state: ConnectionState) -> Result<()> {
    sqlx::query("UPDATE reservation SET state = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mint and persist a fresh correlation id, returning it. Called before
/// every outbound NSI message, including the first `reserve`.
pub async fn rotate_correlation_id(pool: &AnyPool, id: i64) -> Result<Uuid> {
    let fresh = Uuid::new_v4();
    sqlx::query("UPDATE reservation SET correlation_id = ? WHERE id = ?")
        .bind(fresh.to_string())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(fresh)
}

pub async fn set_connection_id(pool: &AnyPool, id: i64, connection_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE reservation SET connection_id = ? WHERE id = ?")
        .bind(connection_id.to_string())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
