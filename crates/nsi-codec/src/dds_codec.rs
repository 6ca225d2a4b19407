//! Decodes the embedded topology payloads the DDS index document carries:
//! base64 text wrapping a gzip stream (window bits `16 + MAX_WBITS`, i.e.
//! plain gzip framing, which is what [`flate2`]'s `Gz*` types speak).

use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::Error;

pub const TOPOLOGY_MIME_TYPE: &str = "vnd.ogf.nsi.topology.v2+xml";

/// Decompress a base64-encoded gzip payload into the XML text it carries.
pub fn decode_payload(base64_gzip: &str) -> crate::Result<String> {
    let compressed = BASE64
        .decode(base64_gzip.trim())
        .map_err(|e| Error::Base64(e.to_string()))?;

    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut xml = String::new();
    decoder
        .read_to_string(&mut xml)
        .map_err(|e| Error::Gzip(e.to_string()))?;
    Ok(xml)
}

/// Inverse of [`decode_payload`], used by tests and by any future DDS
/// publisher role.
pub fn encode_payload(xml: &str) -> crate::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .map_err(|e| Error::Gzip(e.to_string()))?;
    let compressed = encoder.finish().map_err(|e| Error::Gzip(e.to_string()))?;
    Ok(BASE64.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_xml() {
        let xml = "<topology><node/></topology>";
        let encoded = encode_payload(xml).unwrap();
        let decoded = decode_payload(&encoded).unwrap();
        assert_eq!(decoded, xml);
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(decode_payload("not-valid-base64!!!").is_err());
    }
}
