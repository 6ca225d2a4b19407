//! Outbound transport for the NSI-CS v2 protocol: a single shared, mutually
//! authenticated [`reqwest::Client`], built once at startup, mirroring how
//! the webhook client in the reference stack is constructed and shared.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use nsi_aura_codec::templates::{self, ConnectionIdParams, ReserveParams, TEMPLATE_FILE_NAMES, Templates};
use nsi_aura_codec::xml::{XmlDict, parse_dict};
use nsi_aura_codec::{Error as CodecError, NsiAction};
use uuid::Uuid;

use crate::config::Config;

const CONNECT_RETRIES: u32 = 3;
const BACKOFF_BASELINE: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read the seven SOAP templates out of `STATIC_DIRECTORY`. A missing or
/// unreadable file is a fatal startup error — there is no silent fallback
/// to the built-in defaults once a directory has been configured.
pub fn load_templates(dir: &Path) -> anyhow::Result<Templates> {
    let mut contents = Vec::with_capacity(TEMPLATE_FILE_NAMES.len());
    for name in TEMPLATE_FILE_NAMES {
        let path = dir.join(name);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading SOAP template {}", path.display()))?;
        contents.push(text);
    }
    let contents: [String; 7] = contents
        .try_into()
        .expect("TEMPLATE_FILE_NAMES has exactly 7 entries");
    Ok(Templates::from_files(contents))
}

/// Thin wrapper over the shared HTTP client plus the peer identity fields
/// every outbound message needs (`replyTo`, our own NSA id).
pub struct NsiClient {
    client: reqwest::Client,
    provider_url: String,
    provider_id: String,
    reply_to_url: String,
    templates: Templates,
}

/// Build the shared mutual-TLS client both the NSI transport and the DDS
/// fetcher use: one client certificate/key pair, one optional CA override,
/// for the whole process.
pub fn build_mtls_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

    if !config.certificate_path.is_empty() {
        let cert_pem = std::fs::read(&config.certificate_path)?;
        let key_pem = std::fs::read(&config.private_key_path)?;
        let mut identity_pem = cert_pem;
        identity_pem.extend_from_slice(&key_pem);
        let identity = reqwest::Identity::from_pem(&identity_pem)?;
        builder = builder.identity(identity);
    }

    if let Some(ca_path) = &config.ca_certificates {
        let ca_pem = std::fs::read(ca_path)?;
        let cert = reqwest::Certificate::from_pem(&ca_pem)?;
        builder = builder.add_root_certificate(cert);
    }

    if !config.verify_requests {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

impl NsiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_mtls_client(config)?,
            provider_url: config.provider_url.clone(),
            provider_id: config.provider_id.clone(),
            reply_to_url: config.reply_to_url(),
            templates: load_templates(Path::new(&config.static_directory))?,
        })
    }

    /// POST `body` to the provider with up to [`CONNECT_RETRIES`] connect
    /// retries and exponential backoff. No retry happens above this layer —
    /// the protocol only gets one shot per job.
    async fn post_soap(&self, body: String) -> nsi_aura_codec::Result<XmlDict> {
        let mut attempt = 0;
        let response = loop {
            match self
                .client
                .post(&self.provider_url)
                .header("Content-Type", "text/xml")
                .body(body.clone())
                .send()
                .await
            {
                Ok(response) => break response,
                Err(err) if attempt < CONNECT_RETRIES && err.is_connect() => {
                    attempt += 1;
                    tokio::time::sleep(BACKOFF_BASELINE * 2u32.pow(attempt - 1)).await;
                    continue;
                }
                Err(err) => return Err(CodecError::Xml(format!("transport error: {err}"))),
            }
        };

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.starts_with("application/xml") && !content_type.starts_with("text/xml") {
            return Err(CodecError::Xml(format!(
                "unexpected content-type on sync reply: {content_type}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| CodecError::Xml(format!("reading response body: {e}")))?;

        let dict = parse_dict(&text)?;
        let envelope = dict.child("Envelope")?;
        let body = envelope.child("Body")?;

        if let Ok(fault) = body.child("Fault") {
            return Err(CodecError::SoapFault {
                nsa_id: fault.get_str("nsaId").unwrap_or_default().to_string(),
                error_id: fault.get_str("errorId").unwrap_or_default().to_string(),
                text: fault.get_str("text").unwrap_or_default().to_string(),
            });
        }

        Ok(body.clone())
    }

    /// Send `reserve` and return the provider-assigned `connectionId`.
    pub async fn reserve(
        &self,
        correlation_id: Uuid,
        global_reservation_id: Uuid,
        description: &str,
        start_time: Option<chrono::DateTime<Utc>>,
        end_time: Option<chrono::DateTime<Utc>>,
        source_stp_urn: &str,
        dest_stp_urn: &str,
    ) -> nsi_aura_codec::Result<Uuid> {
        let (start, end) = templates::resolve_schedule(start_time, end_time, Utc::now());
        let body = ReserveParams {
            correlation_id: &correlation_id.to_string(),
            reply_to_url: &self.reply_to_url,
            provider_nsa_id: &self.provider_id,
            global_reservation_id: &global_reservation_id.to_string(),
            description,
            start_time: start,
            end_time: end,
            source_stp_urn,
            dest_stp_urn,
        }
        .render(&self.templates);

        let reply = self.post_soap(body).await?;
        let reserve_reply = reply.child("reserveResponse").or_else(|_| reply.child("reserve"))?;
        reserve_reply.get_uuid("connectionId")
    }

    async fn send_connection_id_message(
        &self,
        correlation_id: Uuid,
        connection_id: Uuid,
        render: impl FnOnce(&ConnectionIdParams<'_>) -> String,
    ) -> nsi_aura_codec::Result<()> {
        let params = ConnectionIdParams {
            correlation_id: &correlation_id.to_string(),
            reply_to_url: &self.reply_to_url,
            provider_nsa_id: &self.provider_id,
            connection_id: &connection_id.to_string(),
        };
        self.post_soap(render(&params)).await?;
        Ok(())
    }

    pub async fn reserve_commit(
        &self,
        correlation_id: Uuid,
        connection_id: Uuid,
    ) -> nsi_aura_codec::Result<()> {
        self.send_connection_id_message(correlation_id, connection_id, |p| {
            p.render_reserve_commit(&self.templates)
        })
        .await
    }

    pub async fn provision(
        &self,
        correlation_id: Uuid,
        connection_id: Uuid,
    ) -> nsi_aura_codec::Result<()> {
        self.send_connection_id_message(correlation_id, connection_id, |p| {
            p.render_provision(&self.templates)
        })
        .await
    }

    pub async fn release(
        &self,
        correlation_id: Uuid,
        connection_id: Uuid,
    ) -> nsi_aura_codec::Result<()> {
        self.send_connection_id_message(correlation_id, connection_id, |p| {
            p.render_release(&self.templates)
        })
        .await
    }

    pub async fn terminate(
        &self,
        correlation_id: Uuid,
        connection_id: Uuid,
    ) -> nsi_aura_codec::Result<()> {
        self.send_connection_id_message(correlation_id, connection_id, |p| {
            p.render_terminate(&self.templates)
        })
        .await
    }

    pub async fn query_summary_sync(
        &self,
        correlation_id: Uuid,
        connection_id: Uuid,
    ) -> nsi_aura_codec::Result<XmlDict> {
        let params = ConnectionIdParams {
            correlation_id: &correlation_id.to_string(),
            reply_to_url: &self.reply_to_url,
            provider_nsa_id: &self.provider_id,
            connection_id: &connection_id.to_string(),
        };
        self.post_soap(params.render_query_summary_sync(&self.templates)).await
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Render the SOAP acknowledgement sent back to the provider for every
    /// inbound callback, per the configured templates.
    pub fn render_acknowledgement(&self, correlation_id: &str) -> String {
        templates::render_acknowledgement(&self.templates, correlation_id, &self.provider_id)
    }
}

/// Resolve the local state `querySummarySync` implies, per the boundary
/// rule: `Provisioned ∧ active=true` maps to `Active`; `Released ∧ false`
/// maps to `ReserveCommitted`.
pub fn map_query_summary_state(
    provision_state: &str,
    data_plane_active: bool,
) -> Option<nsi_aura_core::ConnectionState> {
    use nsi_aura_core::ConnectionState;
    match (provision_state, data_plane_active) {
        ("Provisioned", true) => Some(ConnectionState::Active),
        ("Released", false) => Some(ConnectionState::ReserveCommitted),
        _ => None,
    }
}

/// Routing key for an inbound callback: `connectionId` for the three
/// connection-id-correlated actions, `correlationId` (from the SOAP
/// header) otherwise.
pub fn correlation_key_for(action: NsiAction, body: &XmlDict) -> nsi_aura_codec::Result<CorrelationKey> {
    if action.correlates_by_connection_id() {
        Ok(CorrelationKey::ConnectionId(body.get_uuid("connectionId")?))
    } else {
        Ok(CorrelationKey::CorrelationId(body.get_uuid("correlationId")?))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CorrelationKey {
    ConnectionId(Uuid),
    CorrelationId(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_summary_state_boundaries() {
        assert_eq!(
            map_query_summary_state("Provisioned", true),
            Some(nsi_aura_core::ConnectionState::Active)
        );
        assert_eq!(
            map_query_summary_state("Released", false),
            Some(nsi_aura_core::ConnectionState::ReserveCommitted)
        );
        assert_eq!(map_query_summary_state("Provisioning", true), None);
    }
}
