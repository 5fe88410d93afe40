//! Negotiated mapping data as received when a consumer is created
//!
//! Two sources are accepted: a schema-checked request deserialized with
//! serde, where the whole mapping block may be absent, and a loosely-typed
//! JSON document where every field is validated by hand and the first
//! offending field is named in the error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::Result;

/// One payload type pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecMapping {
    /// Payload type in the producer's id space
    pub payload_type: u8,

    /// Payload type in the consumer's id space
    pub mapped_payload_type: u8,
}

/// One header extension id pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderExtensionMapping {
    /// Extension id in the producer's id space
    pub id: u8,

    /// Extension id in the consumer's id space
    pub mapped_id: u8,
}

/// The `consumerRtpMapping` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerRtpMappingData {
    /// Payload type pairs
    pub codecs: Vec<CodecMapping>,

    /// Header extension id pairs
    pub header_extensions: Vec<HeaderExtensionMapping>,
}

impl ConsumerRtpMappingData {
    /// Validate a loosely-typed document. Both sections are required and
    /// every id must be an integer in 0..=255.
    pub fn from_value(value: &Value) -> Result<Self> {
        let codecs = section(value, "codecs")?
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Ok(CodecMapping {
                    payload_type: id_field(entry, "codecs", index, "payloadType")?,
                    mapped_payload_type: id_field(entry, "codecs", index, "mappedPayloadType")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let header_extensions = section(value, "headerExtensions")?
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Ok(HeaderExtensionMapping {
                    id: id_field(entry, "headerExtensions", index, "id")?,
                    mapped_id: id_field(entry, "headerExtensions", index, "mappedId")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            codecs,
            header_extensions,
        })
    }
}

/// Consumer creation request, reduced to the part this crate reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    /// Mapping block; absent means no remapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_rtp_mapping: Option<ConsumerRtpMappingData>,
}

impl ConsumeRequest {
    /// Deserialize a request from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn section<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>> {
    match value.get(name) {
        None | Some(Value::Null) => Err(Error::InvalidMapping(format!("missing {}", name))),
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(Error::InvalidMapping(format!("wrong {} (not an array)", name))),
    }
}

fn id_field(entry: &Value, section: &str, index: usize, field: &str) -> Result<u8> {
    let value = entry
        .get(field)
        .ok_or_else(|| Error::InvalidMapping(format!("missing {}[{}].{}", section, index, field)))?;

    value
        .as_u64()
        .and_then(|id| u8::try_from(id).ok())
        .ok_or_else(|| {
            Error::InvalidMapping(format!(
                "wrong {}[{}].{} (not an integer in 0..=255)",
                section, index, field
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_document() {
        let data = ConsumerRtpMappingData::from_value(&json!({
            "codecs": [{ "payloadType": 100, "mappedPayloadType": 96 }],
            "headerExtensions": [
                { "id": 1, "mappedId": 4 },
                { "id": 4, "mappedId": 1 }
            ]
        }))
        .unwrap();

        assert_eq!(
            data.codecs,
            vec![CodecMapping {
                payload_type: 100,
                mapped_payload_type: 96
            }]
        );
        assert_eq!(data.header_extensions.len(), 2);
        assert_eq!(data.header_extensions[1].mapped_id, 1);
    }

    #[test]
    fn test_loose_document_errors_name_the_field() {
        let cases = [
            (json!({ "headerExtensions": [] }), "missing codecs"),
            (json!({ "codecs": [] }), "missing headerExtensions"),
            (json!({ "codecs": {}, "headerExtensions": [] }), "wrong codecs (not an array)"),
            (
                json!({ "codecs": [{ "payloadType": 100 }], "headerExtensions": [] }),
                "missing codecs[0].mappedPayloadType",
            ),
            (
                json!({
                    "codecs": [{ "payloadType": 100, "mappedPayloadType": 96 }],
                    "headerExtensions": [{ "id": 1, "mappedId": -2 }]
                }),
                "wrong headerExtensions[0].mappedId (not an integer in 0..=255)",
            ),
            (
                json!({ "codecs": [{ "payloadType": 256, "mappedPayloadType": 1 }], "headerExtensions": [] }),
                "wrong codecs[0].payloadType (not an integer in 0..=255)",
            ),
            (
                json!({ "codecs": [{ "payloadType": "96", "mappedPayloadType": 1 }], "headerExtensions": [] }),
                "wrong codecs[0].payloadType (not an integer in 0..=255)",
            ),
        ];

        for (document, message) in cases {
            let err = ConsumerRtpMappingData::from_value(&document).unwrap_err();
            assert_eq!(err, Error::InvalidMapping(message.to_string()));
        }
    }

    #[test]
    fn test_strict_request_without_mapping() {
        let request = ConsumeRequest::from_json("{}").unwrap();
        assert!(request.consumer_rtp_mapping.is_none());
    }

    #[test]
    fn test_strict_request_rejects_out_of_range_id() {
        let err = ConsumeRequest::from_json(
            r#"{ "consumerRtpMapping": { "codecs": [{ "payloadType": 300, "mappedPayloadType": 1 }], "headerExtensions": [] } }"#,
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidMapping(_)));
    }
}
