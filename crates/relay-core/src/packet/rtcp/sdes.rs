use bytes::{Buf, BufMut, Bytes};

use super::{RtcpHeader, RtcpPacketType, MAX_COUNT, RTCP_HEADER_SIZE};
use crate::error::Error;
use crate::{Result, RtpSsrc};

/// SDES item types (RFC 3550 Section 6.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RtcpSdesItemType {
    /// Canonical end-point identifier
    CName = 1,
    /// User name
    Name = 2,
    /// Electronic mail address
    Email = 3,
    /// Phone number
    Phone = 4,
    /// Geographic user location
    Location = 5,
    /// Application or tool name
    Tool = 6,
    /// Notice/status
    Note = 7,
    /// Private extensions
    Private = 8,
}

impl TryFrom<u8> for RtcpSdesItemType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::CName),
            2 => Ok(Self::Name),
            3 => Ok(Self::Email),
            4 => Ok(Self::Phone),
            5 => Ok(Self::Location),
            6 => Ok(Self::Tool),
            7 => Ok(Self::Note),
            8 => Ok(Self::Private),
            _ => Err(Error::RtcpError(format!("Unknown SDES item type: {}", value))),
        }
    }
}

/// One SDES item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpSdesItem {
    /// Item type
    pub item_type: RtcpSdesItemType,

    /// Item value, at most 255 octets
    value: Bytes,
}

impl RtcpSdesItem {
    /// Create an item, rejecting values longer than the 8-bit length field
    pub fn new(item_type: RtcpSdesItemType, value: Bytes) -> Result<Self> {
        if value.len() > u8::MAX as usize {
            return Err(Error::InvalidParameter(format!(
                "SDES item of {} octets exceeds 255",
                value.len()
            )));
        }

        Ok(Self { item_type, value })
    }

    /// CNAME item
    pub fn cname(cname: &str) -> Result<Self> {
        Self::new(RtcpSdesItemType::CName, Bytes::copy_from_slice(cname.as_bytes()))
    }

    /// Item value
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Type, length and value octets
    pub fn size(&self) -> usize {
        2 + self.value.len()
    }
}

/// SDES chunk: one SSRC and its items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpSdesChunk {
    /// SSRC/CSRC described by this chunk
    pub ssrc: RtpSsrc,

    /// Items
    pub items: Vec<RtcpSdesItem>,
}

impl RtcpSdesChunk {
    /// Create an empty chunk
    pub fn new(ssrc: RtpSsrc) -> Self {
        Self {
            ssrc,
            items: Vec::new(),
        }
    }

    /// Chunk with a single CNAME item
    pub fn with_cname(ssrc: RtpSsrc, cname: &str) -> Result<Self> {
        Ok(Self {
            ssrc,
            items: vec![RtcpSdesItem::cname(cname)?],
        })
    }

    /// Add an item
    pub fn add_item(&mut self, item: RtcpSdesItem) {
        self.items.push(item);
    }

    /// Size on the wire: SSRC, items, and at least one null octet padding
    /// the chunk to a 32-bit boundary
    pub fn size(&self) -> usize {
        let items: usize = self.items.iter().map(RtcpSdesItem::size).sum();
        4 + (items + 1 + 3) / 4 * 4
    }

    /// Serialize the chunk
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.ssrc);

        let mut written = 0;
        for item in &self.items {
            buf.put_u8(item.item_type as u8);
            buf.put_u8(item.value.len() as u8);
            buf.put_slice(&item.value);
            written += item.size();
        }

        // Null item terminator plus padding
        buf.put_bytes(0, self.size() - 4 - written);
    }

    /// Parse one chunk, consuming its terminator and padding
    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 4 {
            return Err(Error::BufferTooSmall {
                required: 4,
                available: buf.remaining(),
            });
        }

        let mut chunk = Self::new(buf.get_u32());
        let mut consumed = 0;

        loop {
            if !buf.has_remaining() {
                return Err(Error::RtcpError(format!(
                    "SDES chunk for SSRC {} is missing its terminator",
                    chunk.ssrc
                )));
            }

            let item_type = buf.get_u8();
            consumed += 1;
            if item_type == 0 {
                break;
            }

            if !buf.has_remaining() {
                return Err(Error::BufferTooSmall {
                    required: 1,
                    available: 0,
                });
            }
            let len = buf.get_u8() as usize;
            if buf.remaining() < len {
                return Err(Error::BufferTooSmall {
                    required: len,
                    available: buf.remaining(),
                });
            }

            let value = buf.copy_to_bytes(len);
            consumed += 1 + len;
            chunk.add_item(RtcpSdesItem::new(RtcpSdesItemType::try_from(item_type)?, value)?);
        }

        let padding = (4 - consumed % 4) % 4;
        if buf.remaining() < padding {
            return Err(Error::BufferTooSmall {
                required: padding,
                available: buf.remaining(),
            });
        }
        buf.advance(padding);

        Ok(chunk)
    }
}

/// Source Description (SDES) group
///
/// More than 31 chunks are spread over several SDES packets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtcpSourceDescription {
    /// Chunks
    pub chunks: Vec<RtcpSdesChunk>,
}

impl RtcpSourceDescription {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk
    pub fn add_chunk(&mut self, chunk: RtcpSdesChunk) {
        self.chunks.push(chunk);
    }

    /// Serialized size once `additional` more chunks totalling
    /// `additional_bytes` are added. Zero while the group is empty.
    pub fn size_with(&self, additional: usize, additional_bytes: usize) -> usize {
        let count = self.chunks.len() + additional;
        if count == 0 {
            return 0;
        }

        let packets = (count + MAX_COUNT - 1) / MAX_COUNT;
        let chunk_bytes: usize = self.chunks.iter().map(RtcpSdesChunk::size).sum();
        packets * RTCP_HEADER_SIZE + chunk_bytes + additional_bytes
    }

    /// Calculate the total size in bytes, headers included
    pub fn size(&self) -> usize {
        self.size_with(0, 0)
    }

    /// Serialize as one or more SDES packets. Writes nothing when empty.
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        for chunks in self.chunks.chunks(MAX_COUNT) {
            let packet_size =
                RTCP_HEADER_SIZE + chunks.iter().map(RtcpSdesChunk::size).sum::<usize>();
            RtcpHeader::new(chunks.len() as u8, RtcpPacketType::SourceDescription, packet_size)?
                .serialize(buf);

            for chunk in chunks {
                chunk.serialize(buf);
            }
        }

        Ok(())
    }
}
