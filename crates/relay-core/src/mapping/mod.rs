//! Consumer RTP mapping
//!
//! Translates payload types and header extension ids from the producer's id
//! space into the id space a consumer negotiated. A mapping is built once when
//! the consumer is created and is read-only afterwards, so it can be shared
//! by reference across packet processing threads.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::packet::RtpPacket;
use crate::Result;

mod data;
mod remap;

pub use data::{CodecMapping, ConsumeRequest, ConsumerRtpMappingData, HeaderExtensionMapping};
pub use remap::{remap_header_extensions, SwapHeaderExtensions, MAX_EXTENSION_MOVES};

/// Fixed-capacity table from one 8-bit id to another.
///
/// Iteration is in ascending source id order.
#[derive(Clone, PartialEq, Eq)]
pub struct IdMap {
    slots: [Option<u8>; 256],
    len: usize,
}

impl Default for IdMap {
    fn default() -> Self {
        Self {
            slots: [None; 256],
            len: 0,
        }
    }
}

impl IdMap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `id` to `mapped_id`, returning the previous mapping of `id`
    pub fn insert(&mut self, id: u8, mapped_id: u8) -> Option<u8> {
        let previous = self.slots[id as usize].replace(mapped_id);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Mapped id for `id`, if configured
    pub fn get(&self, id: u8) -> Option<u8> {
        self.slots[id as usize]
    }

    /// Number of configured ids
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no id is configured
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `(id, mapped_id)` pairs in ascending `id` order
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, mapped)| mapped.map(|mapped_id| (id as u8, mapped_id)))
    }
}

impl fmt::Debug for IdMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Payload type and header extension id mapping of one consumer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerRtpMapping {
    codecs: IdMap,
    header_extensions: IdMap,
}

impl ConsumerRtpMapping {
    /// Create an empty mapping: every id passes through unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from payload type pairs and header extension pairs.
    /// A repeated source id keeps the last pair.
    pub fn from_pairs(
        codecs: impl IntoIterator<Item = (u8, u8)>,
        header_extensions: impl IntoIterator<Item = (u8, u8)>,
    ) -> Self {
        let mut mapping = Self::new();

        for (payload_type, mapped_payload_type) in codecs {
            debug!(
                "RTP payload type mapping received: {} -> {}",
                payload_type, mapped_payload_type
            );
            mapping.codecs.insert(payload_type, mapped_payload_type);
        }

        for (id, mapped_id) in header_extensions {
            debug!("Header extension mapping received: {} -> {}", id, mapped_id);
            mapping.header_extensions.insert(id, mapped_id);
        }

        mapping
    }

    /// Build a mapping from a deserialized mapping block
    pub fn from_data(data: &ConsumerRtpMappingData) -> Self {
        Self::from_pairs(
            data.codecs
                .iter()
                .map(|codec| (codec.payload_type, codec.mapped_payload_type)),
            data.header_extensions
                .iter()
                .map(|extension| (extension.id, extension.mapped_id)),
        )
    }

    /// Build a mapping from a consumer creation request. An absent mapping
    /// block yields a passthrough mapping.
    pub fn from_request(request: &ConsumeRequest) -> Self {
        request
            .consumer_rtp_mapping
            .as_ref()
            .map(Self::from_data)
            .unwrap_or_default()
    }

    /// Build a mapping from a loosely-typed `consumerRtpMapping` document,
    /// validating every field
    pub fn from_value(value: &Value) -> Result<Self> {
        let data = ConsumerRtpMappingData::from_value(value)?;
        Ok(Self::from_data(&data))
    }

    /// Payload type in the consumer's id space; unknown payload types are
    /// left untouched
    pub fn map_payload_type(&self, payload_type: u8) -> u8 {
        self.codecs.get(payload_type).unwrap_or(payload_type)
    }

    /// Payload type table
    pub fn codecs(&self) -> &IdMap {
        &self.codecs
    }

    /// Header extension id table
    pub fn header_extensions(&self) -> &IdMap {
        &self.header_extensions
    }

    /// True when neither table has entries
    pub fn is_passthrough(&self) -> bool {
        self.codecs.is_empty() && self.header_extensions.is_empty()
    }

    /// Rewrite an outgoing packet into the consumer's id space: payload type
    /// first, then header extension ids
    pub fn map_packet(&self, packet: &mut RtpPacket) {
        packet.set_payload_type(self.map_payload_type(packet.payload_type()));
        remap_header_extensions(packet, self, false);
    }

    /// Reconstruct the mapping block this mapping was built from
    pub fn to_data(&self) -> ConsumerRtpMappingData {
        ConsumerRtpMappingData {
            codecs: self
                .codecs
                .iter()
                .map(|(payload_type, mapped_payload_type)| CodecMapping {
                    payload_type,
                    mapped_payload_type,
                })
                .collect(),
            header_extensions: self
                .header_extensions
                .iter()
                .map(|(id, mapped_id)| HeaderExtensionMapping { id, mapped_id })
                .collect(),
        }
    }

    /// JSON dump for diagnostics
    pub fn fill_json(&self) -> Value {
        // Plain structs of integers always serialize
        serde_json::to_value(self.to_data()).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_id_map() {
        let mut map = IdMap::new();
        assert!(map.is_empty());

        assert_eq!(map.insert(5, 6), None);
        assert_eq!(map.insert(1, 2), None);
        assert_eq!(map.insert(5, 7), Some(6));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(5), Some(7));
        assert_eq!(map.get(6), None);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(1, 2), (5, 7)]);
        assert_eq!(format!("{:?}", map), "{1: 2, 5: 7}");
    }

    #[test]
    fn test_map_payload_type() {
        let mapping = ConsumerRtpMapping::from_pairs([(100, 96), (101, 97)], []);

        assert_eq!(mapping.map_payload_type(100), 96);
        assert_eq!(mapping.map_payload_type(101), 97);
        assert_eq!(mapping.map_payload_type(96), 96);
        assert_eq!(mapping.map_payload_type(0), 0);
    }

    #[test]
    fn test_request_without_mapping_is_passthrough() {
        let request = ConsumeRequest::from_json("{}").unwrap();
        let mapping = ConsumerRtpMapping::from_request(&request);
        assert!(mapping.is_passthrough());

        let mut packet = RtpPacket::new_with_payload(111, 1, 2, 3, Bytes::from_static(b"opus"));
        packet.extensions_mut().set(1, Bytes::from_static(&[9]));
        let original = packet.clone();

        mapping.map_packet(&mut packet);
        assert_eq!(packet, original);
    }

    #[test]
    fn test_empty_mapping_block_is_passthrough() {
        let mapping = ConsumerRtpMapping::from_value(&json!({ "codecs": [], "headerExtensions": [] })).unwrap();

        assert!(mapping.is_passthrough());
        assert!((0..=255u8).all(|pt| mapping.map_payload_type(pt) == pt));
    }

    #[test]
    fn test_map_packet() {
        let request = ConsumeRequest::from_json(
            r#"{
                "consumerRtpMapping": {
                    "codecs": [{ "payloadType": 101, "mappedPayloadType": 100 }],
                    "headerExtensions": [{ "id": 1, "mappedId": 10 }, { "id": 3, "mappedId": 1 }]
                }
            }"#,
        )
        .unwrap();
        let mapping = ConsumerRtpMapping::from_request(&request);

        let mut packet = RtpPacket::new_with_payload(101, 1, 2, 3, Bytes::new());
        packet.extensions_mut().set(1, Bytes::from_static(b"mid"));
        packet.extensions_mut().set(3, Bytes::from_static(b"tcc"));

        mapping.map_packet(&mut packet);

        assert_eq!(packet.payload_type(), 100);
        assert_eq!(packet.extensions().get(10).unwrap().as_ref(), b"mid");
        assert_eq!(packet.extensions().get(1).unwrap().as_ref(), b"tcc");
        assert!(packet.extensions().get(3).is_none());
    }

    #[test]
    fn test_mapped_payload_type_outside_rtp_range_fails_on_serialize() {
        let mapping = ConsumerRtpMapping::from_value(&json!({
            "codecs": [{ "payloadType": 100, "mappedPayloadType": 200 }],
            "headerExtensions": []
        }))
        .unwrap();

        let mut packet = RtpPacket::new_with_payload(100, 1, 2, 3, Bytes::from_static(b"vp8"));
        mapping.map_packet(&mut packet);
        assert_eq!(packet.payload_type(), 200);

        assert!(matches!(packet.serialize(), Err(crate::Error::InvalidParameter(_))));
    }

    #[test]
    fn test_fill_json_reconstructs_lists() {
        let mapping = ConsumerRtpMapping::from_pairs([(101, 100), (97, 96)], [(4, 2)]);

        assert_eq!(
            mapping.fill_json(),
            json!({
                "codecs": [
                    { "payloadType": 97, "mappedPayloadType": 96 },
                    { "payloadType": 101, "mappedPayloadType": 100 }
                ],
                "headerExtensions": [{ "id": 4, "mappedId": 2 }]
            })
        );

        let rebuilt = ConsumerRtpMapping::from_value(&mapping.fill_json()).unwrap();
        assert_eq!(rebuilt, mapping);
    }

    #[test]
    fn test_duplicate_source_keeps_last_pair() {
        let mapping = ConsumerRtpMapping::from_pairs([(100, 96), (100, 98)], []);
        assert_eq!(mapping.map_payload_type(100), 98);
        assert_eq!(mapping.codecs().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_map_payload_type_is_total(pairs in proptest::collection::vec(any::<(u8, u8)>(), 0..64)) {
            let mapping = ConsumerRtpMapping::from_pairs(pairs.iter().copied(), []);
            let expected: HashMap<u8, u8> = pairs.into_iter().collect();

            for payload_type in 0..=255u8 {
                let mapped = expected.get(&payload_type).copied().unwrap_or(payload_type);
                prop_assert_eq!(mapping.map_payload_type(payload_type), mapped);
            }
        }
    }
}
