//! RTP header extensions (RFC 8285)
//!
//! Extensions are held as an ordered list of `(id, data)` elements so they
//! can be addressed and exchanged by id while a packet is being relayed.
//! Profiles other than the one-byte and two-byte forms are carried as opaque
//! data and are never addressed by id.

use bytes::{BufMut, Bytes};

use crate::error::Error;
use crate::Result;

/// Profile value of the one-byte header form (RFC 8285 Section 4.2)
pub const ONE_BYTE_PROFILE: u16 = 0xBEDE;

/// Profile value of the two-byte header form (RFC 8285 Section 4.3),
/// the low 4 bits carry application bits
pub const TWO_BYTE_PROFILE: u16 = 0x1000;

/// Highest id usable in the one-byte form
pub const MAX_ONE_BYTE_ID: u8 = 14;

/// Longest element usable in the one-byte form
pub const MAX_ONE_BYTE_LEN: usize = 16;

/// Id that terminates parsing in the one-byte form
const ONE_BYTE_TERMINATOR_ID: u8 = 15;

/// Extension block of a profile this crate does not interpret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueExtension {
    /// 16-bit profile-specific identifier
    pub profile: u16,

    /// Raw extension payload, without the 4-byte extension header
    pub data: Bytes,
}

/// Header extensions of one RTP packet, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtpHeaderExtensions {
    /// Elements in wire order
    elements: Vec<(u8, Bytes)>,

    /// Non RFC 8285 extension block, mutually exclusive with `elements`
    opaque: Option<OpaqueExtension>,
}

impl RtpHeaderExtensions {
    /// Create an empty extension set
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an extension block of an unknown profile
    pub fn opaque(profile: u16, data: Bytes) -> Self {
        Self {
            elements: Vec::new(),
            opaque: Some(OpaqueExtension { profile, data }),
        }
    }

    /// True when there is nothing to put on the wire
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.opaque.is_none()
    }

    /// Number of id-addressable elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Opaque extension block, if the packet used an unknown profile
    pub fn opaque_block(&self) -> Option<&OpaqueExtension> {
        self.opaque.as_ref()
    }

    /// Get the data stored under `id`
    pub fn get(&self, id: u8) -> Option<&Bytes> {
        self.position(id).map(|index| &self.elements[index].1)
    }

    /// Store `data` under `id`, replacing any previous value
    pub fn set(&mut self, id: u8, data: Bytes) {
        self.opaque = None;
        match self.position(id) {
            Some(index) => self.elements[index].1 = data,
            None => self.elements.push((id, data)),
        }
    }

    /// Remove the element stored under `id`
    pub fn remove(&mut self, id: u8) -> Option<Bytes> {
        let index = self.position(id)?;
        Some(self.elements.remove(index).1)
    }

    /// Ids present, in wire order
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.elements.iter().map(|(id, _)| *id)
    }

    /// Iterate over `(id, data)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Bytes)> + '_ {
        self.elements.iter().map(|(id, data)| (*id, data))
    }

    /// Exchange whatever is stored under `a` with whatever is stored under `b`.
    ///
    /// A missing id counts as "no content": the present element is relabeled
    /// to the other id and the vacated id ends up empty.
    pub fn swap(&mut self, a: u8, b: u8) {
        if a == b {
            return;
        }

        match (self.position(a), self.position(b)) {
            (Some(index_a), Some(index_b)) => {
                let (first, second) = (index_a.min(index_b), index_a.max(index_b));
                let (head, tail) = self.elements.split_at_mut(second);
                std::mem::swap(&mut head[first].1, &mut tail[0].1);
            }
            (Some(index_a), None) => self.elements[index_a].0 = b,
            (None, Some(index_b)) => self.elements[index_b].0 = a,
            (None, None) => {}
        }
    }

    fn position(&self, id: u8) -> Option<usize> {
        self.elements.iter().position(|(element_id, _)| *element_id == id)
    }

    fn fits_one_byte_form(&self) -> bool {
        self.elements.iter().all(|(id, data)| {
            (1..=MAX_ONE_BYTE_ID).contains(id) && (1..=MAX_ONE_BYTE_LEN).contains(&data.len())
        })
    }

    /// Length of the extension payload before padding
    fn body_len(&self) -> usize {
        if let Some(opaque) = &self.opaque {
            return opaque.data.len();
        }

        let per_element = if self.fits_one_byte_form() { 1 } else { 2 };
        self.elements
            .iter()
            .map(|(_, data)| per_element + data.len())
            .sum()
    }

    /// Size on the wire, including the 4-byte extension header and padding.
    /// Zero when there are no extensions.
    pub fn encoded_len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }

        4 + (self.body_len() + 3) / 4 * 4
    }

    /// Parse the payload of an extension block announced with `profile`
    pub fn parse(profile: u16, data: Bytes) -> Result<Self> {
        if profile == ONE_BYTE_PROFILE {
            Self::parse_one_byte(data)
        } else if profile & 0xFFF0 == TWO_BYTE_PROFILE {
            Self::parse_two_byte(data)
        } else {
            Ok(Self::opaque(profile, data))
        }
    }

    fn parse_one_byte(data: Bytes) -> Result<Self> {
        let mut elements = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let byte = data[offset];
            let id = byte >> 4;

            // Id 0 is padding whatever the length nibble says
            if id == 0 {
                offset += 1;
                continue;
            }

            let len = (byte & 0x0F) as usize + 1;

            if id == ONE_BYTE_TERMINATOR_ID {
                break;
            }

            let start = offset + 1;
            if start + len > data.len() {
                return Err(Error::InvalidPacket(format!(
                    "One-byte extension {} overruns extension block ({} > {})",
                    id,
                    start + len,
                    data.len()
                )));
            }

            elements.push((id, data.slice(start..start + len)));
            offset = start + len;
        }

        Ok(Self { elements, opaque: None })
    }

    fn parse_two_byte(data: Bytes) -> Result<Self> {
        let mut elements = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let id = data[offset];

            // Padding
            if id == 0 {
                offset += 1;
                continue;
            }

            if offset + 2 > data.len() {
                return Err(Error::InvalidPacket(format!(
                    "Two-byte extension {} truncated before its length field",
                    id
                )));
            }

            let len = data[offset + 1] as usize;
            let start = offset + 2;
            if start + len > data.len() {
                return Err(Error::InvalidPacket(format!(
                    "Two-byte extension {} overruns extension block ({} > {})",
                    id,
                    start + len,
                    data.len()
                )));
            }

            elements.push((id, data.slice(start..start + len)));
            offset = start + len;
        }

        Ok(Self { elements, opaque: None })
    }

    /// Serialize the extension header and payload, padded to 32 bits.
    /// Writes nothing when there are no extensions.
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let body_len = self.body_len();
        let padded_len = (body_len + 3) / 4 * 4;
        let words = padded_len / 4;
        if words > u16::MAX as usize {
            return Err(Error::EncodeError(format!(
                "Header extension block of {} bytes is too long",
                body_len
            )));
        }

        if let Some(opaque) = &self.opaque {
            buf.put_u16(opaque.profile);
            buf.put_u16(words as u16);
            buf.put_slice(&opaque.data);
        } else if self.fits_one_byte_form() {
            buf.put_u16(ONE_BYTE_PROFILE);
            buf.put_u16(words as u16);
            for (id, data) in &self.elements {
                buf.put_u8((id << 4) | (data.len() - 1) as u8);
                buf.put_slice(data);
            }
        } else {
            // Validate before writing anything
            for (id, data) in &self.elements {
                if *id == 0 {
                    return Err(Error::EncodeError(
                        "Header extension id 0 is reserved for padding".to_string(),
                    ));
                }
                if data.len() > u8::MAX as usize {
                    return Err(Error::EncodeError(format!(
                        "Header extension {} carries {} bytes, two-byte form allows 255",
                        id,
                        data.len()
                    )));
                }
            }

            buf.put_u16(TWO_BYTE_PROFILE);
            buf.put_u16(words as u16);
            for (id, data) in &self.elements {
                buf.put_u8(*id);
                buf.put_u8(data.len() as u8);
                buf.put_slice(data);
            }
        }

        buf.put_bytes(0, padded_len - body_len);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn sample() -> RtpHeaderExtensions {
        let mut ext = RtpHeaderExtensions::new();
        ext.set(1, Bytes::from_static(&[0xAA]));
        ext.set(3, Bytes::from_static(&[0xBB, 0xCC]));
        ext
    }

    #[test]
    fn test_swap_both_present() {
        let mut ext = sample();
        ext.swap(1, 3);

        assert_eq!(ext.get(1).unwrap().as_ref(), &[0xBB, 0xCC]);
        assert_eq!(ext.get(3).unwrap().as_ref(), &[0xAA]);
    }

    #[test]
    fn test_swap_with_absent_slot() {
        let mut ext = sample();
        ext.swap(1, 5);

        assert!(ext.get(1).is_none());
        assert_eq!(ext.get(5).unwrap().as_ref(), &[0xAA]);

        ext.swap(7, 5);
        assert!(ext.get(5).is_none());
        assert_eq!(ext.get(7).unwrap().as_ref(), &[0xAA]);

        // Neither present
        ext.swap(9, 10);
        assert_eq!(ext.len(), 2);
    }

    #[test]
    fn test_one_byte_form() {
        let ext = sample();
        let mut buf = BytesMut::new();
        ext.serialize(&mut buf).unwrap();

        // 1+1 and 1+2 bytes of body, padded to 8
        assert_eq!(ext.encoded_len(), 12);
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[..4], &[0xBE, 0xDE, 0x00, 0x02]);
        assert_eq!(&buf[4..], &[0x10, 0xAA, 0x31, 0xBB, 0xCC, 0, 0, 0]);

        let parsed = RtpHeaderExtensions::parse(ONE_BYTE_PROFILE, buf.freeze().slice(4..)).unwrap();
        assert_eq!(parsed, ext);
    }

    #[test]
    fn test_two_byte_form_for_large_ids() {
        let mut ext = sample();
        ext.set(200, Bytes::from_static(b"hello"));

        let mut buf = BytesMut::new();
        ext.serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), ext.encoded_len());
        assert_eq!(&buf[..2], &[0x10, 0x00]);

        let parsed = RtpHeaderExtensions::parse(TWO_BYTE_PROFILE, buf.freeze().slice(4..)).unwrap();
        assert_eq!(parsed.get(200).unwrap().as_ref(), b"hello");
        assert_eq!(parsed.get(3).unwrap().as_ref(), &[0xBB, 0xCC]);
    }

    #[test]
    fn test_one_byte_terminator_and_overrun() {
        // id 2, len 1, then terminator id 15
        let data = Bytes::from_static(&[0x20, 0x01, 0xF0, 0x00]);
        let parsed = RtpHeaderExtensions::parse(ONE_BYTE_PROFILE, data).unwrap();
        assert_eq!(parsed.ids().collect::<Vec<_>>(), vec![2]);

        // id 2 announces 4 bytes but only 2 follow
        let data = Bytes::from_static(&[0x23, 0x01, 0x02]);
        assert!(RtpHeaderExtensions::parse(ONE_BYTE_PROFILE, data).is_err());
    }

    #[test]
    fn test_one_byte_id_zero_is_padding() {
        // Nonzero length nibble on id 0, then id 3 with one byte
        let data = Bytes::from_static(&[0x05, 0x30, 0x7F, 0x00]);
        let parsed = RtpHeaderExtensions::parse(ONE_BYTE_PROFILE, data).unwrap();

        assert_eq!(parsed.ids().collect::<Vec<_>>(), vec![3]);
        assert_eq!(parsed.get(3).unwrap().as_ref(), &[0x7F]);

        let mut buf = BytesMut::new();
        assert!(parsed.serialize(&mut buf).is_ok());
    }

    #[test]
    fn test_opaque_profile_is_kept() {
        let data = Bytes::from_static(&[1, 2, 3, 4]);
        let ext = RtpHeaderExtensions::parse(0x1234, data.clone()).unwrap();

        assert_eq!(ext.len(), 0);
        assert_eq!(ext.opaque_block().unwrap().data, data);
        assert_eq!(ext.encoded_len(), 8);
    }

    #[test]
    fn test_id_zero_rejected() {
        let mut ext = RtpHeaderExtensions::new();
        ext.set(0, Bytes::from_static(&[1]));

        let mut buf = BytesMut::new();
        assert!(matches!(ext.serialize(&mut buf), Err(Error::EncodeError(_))));
        assert!(buf.is_empty());
    }
}
