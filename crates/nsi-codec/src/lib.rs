//! Wire-level codecs for the NSI-CS v2 SOAP protocol and the DDS topology
//! transport: no I/O, no async, just bytes and strings in, typed values out.

pub mod action;
pub mod dds_codec;
pub mod templates;
pub mod vlan;
pub mod xml;

pub use action::NsiAction;
pub use vlan::VlanRanges;

use thiserror::Error;

/// Errors produced while encoding or decoding NSI-CS wire formats.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown SOAPAction: {0}")]
    UnknownAction(String),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("missing required field `{0}` in XML body")]
    MissingField(String),

    #[error("field `{field}` is not a valid {expected}: {value}")]
    FieldType {
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("gzip payload error: {0}")]
    Gzip(String),

    #[error("base64 payload error: {0}")]
    Base64(String),

    #[error("invalid VLAN set: {0}")]
    Vlan(String),

    #[error("SOAP fault from {nsa_id}: {error_id}: {text}")]
    SoapFault {
        nsa_id: String,
        error_id: String,
        text: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
