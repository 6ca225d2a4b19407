use nsi_aura_codec::dds_codec::{TOPOLOGY_MIME_TYPE, decode_payload};
use nsi_aura_codec::xml::parse_dict;

use crate::config::Config;
use crate::nsi::build_mtls_client;

/// One decompressed topology document pulled out of the DDS index.
pub struct TopologyDocument {
    pub xml: String,
}

/// Fetch the DDS index document and decompress every embedded payload of
/// type `vnd.ogf.nsi.topology.v2+xml`. Any network, decode, or parse error
/// here aborts the whole poll — the caller leaves the database untouched
/// and retries on the next tick.
pub async fn fetch_topology_documents(config: &Config) -> anyhow::Result<Vec<TopologyDocument>> {
    let client = build_mtls_client(config)?;
    let response = client
        .get(&config.dds_url)
        .header("Accept", "application/xml")
        .send()
        .await?
        .error_for_status()?;

    let body = response.text().await?;
    let dict = parse_dict(&body)?;
    let index = dict.child("documents").or_else(|_| dict.child("index"))?;

    let mut documents = Vec::new();
    for entry in index.children("document") {
        let mime_type = entry.get_str("type").unwrap_or_default();
        if mime_type != TOPOLOGY_MIME_TYPE {
            continue;
        }
        let payload = entry.text().or_else(|_| entry.get_str("content"))?;
        let xml = decode_payload(payload)?;
        documents.push(TopologyDocument { xml });
    }

    Ok(documents)
}
