//! Textual SOAP templates, one per outbound NSI-CS v2 message kind, filled
//! in by named-placeholder substitution rather than a DOM builder. The
//! process reads these from the directory named by `STATIC_DIRECTORY` at
//! startup (see `nsi::load_templates`); the constants below are the shipped
//! defaults, both the seed content for a fresh `STATIC_DIRECTORY` and the
//! fallback this crate's own tests render against.

use chrono::{DateTime, Duration, Utc};

const RESERVE_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" replyTo="#REPLY-TO-URL#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <reserve>
      <globalReservationId>#GLOBAL-RESERVATION-ID#</globalReservationId>
      <description>#CONNECTION-DESCRIPTION#</description>
      <criteria>
        <schedule>
          <startTime>#CONNECTION-START-TIME#</startTime>
          <endTime>#CONNECTION-END-TIME#</endTime>
        </schedule>
        <path>
          <sourceSTP>#SOURCE-STP#</sourceSTP>
          <destSTP>#DEST-STP#</destSTP>
        </path>
      </criteria>
    </reserve>
  </soap:Body>
</soap:Envelope>"#;

const RESERVE_COMMIT_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" replyTo="#REPLY-TO-URL#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <reserveCommit>
      <connectionId>#CONNECTION-ID#</connectionId>
    </reserveCommit>
  </soap:Body>
</soap:Envelope>"#;

const PROVISION_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" replyTo="#REPLY-TO-URL#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <provision>
      <connectionId>#CONNECTION-ID#</connectionId>
    </provision>
  </soap:Body>
</soap:Envelope>"#;

const RELEASE_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" replyTo="#REPLY-TO-URL#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <release>
      <connectionId>#CONNECTION-ID#</connectionId>
    </release>
  </soap:Body>
</soap:Envelope>"#;

const TERMINATE_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" replyTo="#REPLY-TO-URL#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <terminate>
      <connectionId>#CONNECTION-ID#</connectionId>
    </terminate>
  </soap:Body>
</soap:Envelope>"#;

const QUERY_SUMMARY_SYNC_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" replyTo="#REPLY-TO-URL#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <querySummarySync>
      <connectionId>#CONNECTION-ID#</connectionId>
    </querySummarySync>
  </soap:Body>
</soap:Envelope>"#;

const ACKNOWLEDGEMENT_TEMPLATE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header>
    <nsiHeader correlationId="#CORRELATION-ID#" providerNSA="#PROVIDER-NSA-ID#"/>
  </soap:Header>
  <soap:Body>
    <acknowledgement/>
  </soap:Body>
</soap:Envelope>"#;

/// The seven outbound templates, loaded once from `STATIC_DIRECTORY` and
/// held for the life of the process. Each field is named after the file it
/// was read from, e.g. `reserve.xml` under the configured directory.
#[derive(Debug, Clone)]
pub struct Templates {
    reserve: String,
    reserve_commit: String,
    provision: String,
    release: String,
    terminate: String,
    query_summary_sync: String,
    acknowledgement: String,
}

/// Filenames `nsi::load_templates` reads out of `STATIC_DIRECTORY`, in the
/// same order `Templates::from_files` expects its arguments.
pub const TEMPLATE_FILE_NAMES: [&str; 7] = [
    "reserve.xml",
    "reserveCommit.xml",
    "provision.xml",
    "release.xml",
    "terminate.xml",
    "querySummarySync.xml",
    "acknowledgement.xml",
];

impl Templates {
    /// Build from the seven file contents, in [`TEMPLATE_FILE_NAMES`] order.
    /// The codec crate has no filesystem access of its own; the caller reads
    /// the files and hands the contents in.
    pub fn from_files(contents: [String; 7]) -> Self {
        let [reserve, reserve_commit, provision, release, terminate, query_summary_sync, acknowledgement] =
            contents;
        Self {
            reserve,
            reserve_commit,
            provision,
            release,
            terminate,
            query_summary_sync,
            acknowledgement,
        }
    }

    /// The built-in defaults, used by tests and as the seed content an
    /// operator copies into a fresh `STATIC_DIRECTORY`.
    pub fn defaults() -> Self {
        Self {
            reserve: RESERVE_TEMPLATE.to_string(),
            reserve_commit: RESERVE_COMMIT_TEMPLATE.to_string(),
            provision: PROVISION_TEMPLATE.to_string(),
            release: RELEASE_TEMPLATE.to_string(),
            terminate: TERMINATE_TEMPLATE.to_string(),
            query_summary_sync: QUERY_SUMMARY_SYNC_TEMPLATE.to_string(),
            acknowledgement: ACKNOWLEDGEMENT_TEMPLATE.to_string(),
        }
    }
}

/// Replace every `#TOKEN#` occurrence in `template` with its bound value.
/// Unbound tokens are left untouched, which surfaces as an XML parse error
/// downstream rather than silently emitting a stray `#...#` literal.
fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (token, value) in values {
        out = out.replace(&format!("#{token}#"), value);
    }
    out
}

/// `urn:ogf:network:<stpId>?vlan=<vlan>`
pub fn stp_urn(stp_id: &str, vlan: u16) -> String {
    format!("urn:ogf:network:{stp_id}?vlan={vlan}")
}

/// `1040 weeks` is the source's definition of "unbounded".
const UNBOUNDED_WEEKS: i64 = 1040;

/// Resolve the user-supplied (possibly absent) schedule bounds against
/// `now`: a null `start` means "now", a null `end` means "1040 weeks from
/// now".
pub fn resolve_schedule(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start.unwrap_or(now);
    let end = end.unwrap_or_else(|| now + Duration::weeks(UNBOUNDED_WEEKS));
    (start, end)
}

pub struct ReserveParams<'a> {
    pub correlation_id: &'a str,
    pub reply_to_url: &'a str,
    pub provider_nsa_id: &'a str,
    pub global_reservation_id: &'a str,
    pub description: &'a str,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source_stp_urn: &'a str,
    pub dest_stp_urn: &'a str,
}

impl ReserveParams<'_> {
    pub fn render(&self, templates: &Templates) -> String {
        substitute(
            &templates.reserve,
            &[
                ("CORRELATION-ID", self.correlation_id),
                ("REPLY-TO-URL", self.reply_to_url),
                ("PROVIDER-NSA-ID", self.provider_nsa_id),
                ("GLOBAL-RESERVATION-ID", self.global_reservation_id),
                ("CONNECTION-DESCRIPTION", self.description),
                ("CONNECTION-START-TIME", &self.start_time.to_rfc3339()),
                ("CONNECTION-END-TIME", &self.end_time.to_rfc3339()),
                ("SOURCE-STP", self.source_stp_urn),
                ("DEST-STP", self.dest_stp_urn),
            ],
        )
    }
}

/// Shared shape of `reserveCommit` / `provision` / `release` / `terminate` /
/// `querySummarySync`: all carry only a `connectionId`.
pub struct ConnectionIdParams<'a> {
    pub correlation_id: &'a str,
    pub reply_to_url: &'a str,
    pub provider_nsa_id: &'a str,
    pub connection_id: &'a str,
}

impl ConnectionIdParams<'_> {
    fn values(&self) -> [(&str, &str); 4] {
        [
            ("CORRELATION-ID", self.correlation_id),
            ("REPLY-TO-URL", self.reply_to_url),
            ("PROVIDER-NSA-ID", self.provider_nsa_id),
            ("CONNECTION-ID", self.connection_id),
        ]
    }

    pub fn render_reserve_commit(&self, templates: &Templates) -> String {
        substitute(&templates.reserve_commit, &self.values())
    }

    pub fn render_provision(&self, templates: &Templates) -> String {
        substitute(&templates.provision, &self.values())
    }

    pub fn render_release(&self, templates: &Templates) -> String {
        substitute(&templates.release, &self.values())
    }

    pub fn render_terminate(&self, templates: &Templates) -> String {
        substitute(&templates.terminate, &self.values())
    }

    pub fn render_query_summary_sync(&self, templates: &Templates) -> String {
        substitute(&templates.query_summary_sync, &self.values())
    }
}

pub fn render_acknowledgement(templates: &Templates, correlation_id: &str, provider_nsa_id: &str) -> String {
    substitute(
        &templates.acknowledgement,
        &[
            ("CORRELATION-ID", correlation_id),
            ("PROVIDER-NSA-ID", provider_nsa_id),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_dict;
    use chrono::TimeZone;

    #[test]
    fn reserve_round_trips_through_the_xml_parser() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (start, end) = resolve_schedule(None, None, now);
        let rendered = ReserveParams {
            correlation_id: "11111111-1111-1111-1111-111111111111",
            reply_to_url: "https://ra.example/api/nsi/callback/",
            provider_nsa_id: "urn:ogf:network:aggregator.example:2024:nsa",
            global_reservation_id: "22222222-2222-2222-2222-222222222222",
            description: "test reservation",
            start_time: start,
            end_time: end,
            source_stp_urn: &stp_urn("a.example:2024:ana-x:port-1", 100),
            dest_stp_urn: &stp_urn("z.example:2024:ana-x:port-1", 200),
        }
        .render(&Templates::defaults());

        let dict = parse_dict(&rendered).unwrap();
        let reserve = dict.child("reserve").unwrap();
        assert_eq!(
            reserve.get_str("globalReservationId").unwrap(),
            "22222222-2222-2222-2222-222222222222"
        );
        assert_eq!(reserve.get_str("description").unwrap(), "test reservation");
    }

    #[test]
    fn unbounded_end_time_is_1040_weeks_out() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (start, end) = resolve_schedule(None, None, now);
        assert_eq!(start, now);
        assert_eq!((end - now).num_weeks(), 1040);
    }

    #[test]
    fn stp_urn_form() {
        assert_eq!(
            stp_urn("domain.example:2024:ana-x:port-1", 100),
            "urn:ogf:network:domain.example:2024:ana-x:port-1?vlan=100"
        );
    }
}
