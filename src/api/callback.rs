//! `POST /api/nsi/callback/` — the single inbound endpoint every async NSI
//! reply and notification arrives at. Routing key is the `SOAPAction`
//! header; correlation key depends on which callback it is.

use axum::extract::State;
use axum::http::HeaderMap;
use nsi_aura_codec::{NsiAction, xml::parse_dict};
use nsi_aura_core::state::{self, Event};

use crate::context::AppState;
use crate::db::reservation;
use crate::error::{ApiError, ApiResult};
use crate::nsi::{CorrelationKey, correlation_key_for};

/// The element `SOAPAction` names directly, one per callback kind.
fn body_element_name(action: NsiAction) -> &'static str {
    match action {
        NsiAction::ReserveConfirmed => "reserveConfirmed",
        NsiAction::ReserveFailed => "reserveFailed",
        NsiAction::ReserveTimeout => "reserveTimeout",
        NsiAction::ReserveCommitConfirmed => "reserveCommitConfirmed",
        NsiAction::ProvisionConfirmed => "provisionConfirmed",
        NsiAction::ReleaseConfirmed => "releaseConfirmed",
        NsiAction::TerminateConfirmed => "terminateConfirmed",
        NsiAction::DataPlaneStateChange => "dataPlaneStateChange",
        NsiAction::ErrorEvent => "errorEvent",
    }
}

/// Map an inbound callback to the state machine event it drives. A
/// `dataPlaneStateChange` needs the body's `dataPlaneActive` flag to pick
/// between "up" and "down" — it is the one callback that isn't a 1:1 action-
/// to-event mapping.
fn event_for(action: NsiAction, body: &nsi_aura_codec::xml::XmlDict) -> ApiResult<Event> {
    Ok(match action {
        NsiAction::ReserveConfirmed => Event::NsiReceiveReserveConfirmed,
        NsiAction::ReserveFailed => Event::NsiReceiveReserveFailed,
        NsiAction::ReserveTimeout => Event::NsiReceiveReserveTimeout,
        NsiAction::ReserveCommitConfirmed => Event::NsiReceiveReserveCommitConfirmed,
        NsiAction::ProvisionConfirmed => Event::NsiReceiveProvisionConfirmed,
        NsiAction::ReleaseConfirmed => Event::NsiReceiveReleaseConfirmed,
        NsiAction::TerminateConfirmed => Event::NsiReceiveTerminateConfirmed,
        NsiAction::ErrorEvent => Event::NsiReceiveErrorEvent,
        NsiAction::DataPlaneStateChange => {
            if body.get_bool("dataPlaneActive")? {
                Event::NsiReceiveDataPlaneUp
            } else {
                Event::NsiReceiveDataPlaneDown
            }
        }
    })
}

/// Best-effort extraction of the header's correlationId, used for the
/// acknowledgement regardless of whether [`process`] below accepts or
/// rejects the callback — every callback gets an acknowledgement, even a
/// malformed one we can't otherwise make sense of.
fn extract_correlation_id(body: &str) -> String {
    (|| -> nsi_aura_codec::Result<String> {
        let dict = parse_dict(body)?;
        let header = dict.child("Envelope")?.child("Header")?.child("nsiHeader")?;
        Ok(header.get_str("correlationId").unwrap_or_default().to_string())
    })()
    .unwrap_or_default()
}

/// Parse, correlate, and apply one callback's state transition. Every
/// rejection here — protocol violation or illegal transition alike — is
/// reported to the caller as an `Err` and never becomes an HTTP error
/// status: per the callback contract, a malformed or out-of-sequence
/// notification is logged and dropped, not surfaced to the provider.
async fn process(app: &AppState, headers: &HeaderMap, body: &str) -> ApiResult<()> {
    let soap_action = headers
        .get("SOAPAction")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("missing SOAPAction header".to_string()))?;
    let action = NsiAction::from_soap_action(soap_action.trim_matches('"'))?;

    let dict = parse_dict(body)?;
    let envelope = dict.child("Envelope")?;
    let inner_body = envelope.child("Body")?;
    let payload = inner_body.child(body_element_name(action))?;

    let key = correlation_key_for(action, payload)?;
    let reservation = match key {
        CorrelationKey::ConnectionId(id) => reservation::get_by_connection_id(&app.pool, id).await?,
        CorrelationKey::CorrelationId(id) => reservation::get_by_correlation_id(&app.pool, id).await?,
    }
    .ok_or_else(|| ApiError::Validation(format!("no reservation matches callback correlation {key:?}")))?;

    let event = event_for(action, payload)?;
    let next_state = state::apply(reservation.state, event)?;
    reservation::set_state(&app.pool, reservation.id, next_state).await?;
    crate::db::log::append(
        &app.pool,
        reservation.id,
        &format!("{action:?} received, transitioned to {}", next_state.as_str()),
        Some(module_path!()),
        None,
        None,
    )
    .await?;

    Ok(())
}

pub async fn handle(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ([(&'static str, &'static str); 1], String) {
    let correlation_id = extract_correlation_id(&body);

    if let Err(err) = process(&app, &headers, &body).await {
        log::warn!("dropping NSI callback: {err}");
    }

    let ack = app.nsi.render_acknowledgement(&correlation_id);
    ([("Content-Type", "text/xml")], ack)
}
