use bitvec::prelude::*;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use super::extension::RtpHeaderExtensions;
use crate::error::Error;
use crate::mapping::SwapHeaderExtensions;
use crate::{Result, RtpCsrc, RtpSequenceNumber, RtpSsrc, RtpTimestamp};

/// RTP protocol version (always 2 in practice)
pub const RTP_VERSION: u8 = 2;

/// Padding flag position in the first byte
pub const RTP_PADDING_FLAG: usize = 2;

/// Extension flag position in the first byte
pub const RTP_EXTENSION_FLAG: usize = 3;

/// CSRC count position in the first byte (4 bits)
pub const RTP_CC_OFFSET: usize = 4;

/// Marker bit position in the second byte
pub const RTP_MARKER_FLAG: usize = 0;

/// Payload type position in the second byte (7 bits)
pub const RTP_PT_OFFSET: usize = 1;

/// Minimum header size (without CSRC or extensions)
pub const RTP_MIN_HEADER_SIZE: usize = 12;

/// RTP header implementation according to RFC 3550
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// RTP version (should be 2)
    pub version: u8,

    /// Marker bit
    pub marker: bool,

    /// Payload type
    pub payload_type: u8,

    /// Sequence number
    pub sequence_number: RtpSequenceNumber,

    /// Timestamp
    pub timestamp: RtpTimestamp,

    /// Synchronization source identifier
    pub ssrc: RtpSsrc,

    /// Contributing source identifiers
    pub csrc: Vec<RtpCsrc>,

    /// Header extensions, addressed by id
    pub extensions: RtpHeaderExtensions,
}

impl Default for RtpHeader {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl RtpHeader {
    /// Create a new RTP header with default values
    pub fn new(
        payload_type: u8,
        sequence_number: RtpSequenceNumber,
        timestamp: RtpTimestamp,
        ssrc: RtpSsrc,
    ) -> Self {
        Self {
            version: RTP_VERSION,
            marker: false,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc: Vec::new(),
            extensions: RtpHeaderExtensions::new(),
        }
    }

    /// Whether the extension bit is set on the wire
    pub fn has_extensions(&self) -> bool {
        !self.extensions.is_empty()
    }

    /// Get the size of the header in bytes
    pub fn size(&self) -> usize {
        RTP_MIN_HEADER_SIZE + self.csrc.len() * 4 + self.extensions.encoded_len()
    }

    /// Parse an RTP header from bytes
    pub fn parse(buf: &mut Bytes) -> Result<Self> {
        let (header, _padding) = Self::parse_with_padding(buf)?;
        Ok(header)
    }

    /// Parse an RTP header, also returning the padding flag
    fn parse_with_padding(buf: &mut Bytes) -> Result<(Self, bool)> {
        if buf.remaining() < RTP_MIN_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                required: RTP_MIN_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        // First byte: version (2 bits), padding (1 bit), extension (1 bit), CSRC count (4 bits)
        let first_byte = buf.get_u8();
        let bits = first_byte.view_bits::<Msb0>();

        let version = bits[0..2].load_be::<u8>();
        if version != RTP_VERSION {
            return Err(Error::InvalidPacket(format!("Invalid RTP version: {}", version)));
        }

        let padding = bits[RTP_PADDING_FLAG];
        let extension = bits[RTP_EXTENSION_FLAG];
        let cc = bits[RTP_CC_OFFSET..RTP_CC_OFFSET + 4].load_be::<u8>();

        // Second byte: marker (1 bit), payload type (7 bits)
        let second_byte = buf.get_u8();
        let bits = second_byte.view_bits::<Msb0>();

        let marker = bits[RTP_MARKER_FLAG];
        let payload_type = bits[RTP_PT_OFFSET..RTP_PT_OFFSET + 7].load_be::<u8>();

        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        // Parse CSRC list if present
        let csrc_len = cc as usize * 4;
        if buf.remaining() < csrc_len {
            return Err(Error::BufferTooSmall {
                required: csrc_len,
                available: buf.remaining(),
            });
        }
        let csrc = (0..cc).map(|_| buf.get_u32()).collect();

        // Parse extension block if present
        let extensions = if extension {
            if buf.remaining() < 4 {
                return Err(Error::BufferTooSmall {
                    required: 4,
                    available: buf.remaining(),
                });
            }

            let profile = buf.get_u16();
            let ext_length = buf.get_u16() as usize * 4; // Length in 32-bit words

            if buf.remaining() < ext_length {
                return Err(Error::BufferTooSmall {
                    required: ext_length,
                    available: buf.remaining(),
                });
            }

            RtpHeaderExtensions::parse(profile, buf.split_to(ext_length))?
        } else {
            RtpHeaderExtensions::new()
        };

        let header = Self {
            version,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extensions,
        };

        Ok((header, padding))
    }

    /// Serialize the header to bytes
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.csrc.len() > 15 {
            return Err(Error::InvalidParameter(format!(
                "CSRC list of {} entries does not fit the 4-bit count",
                self.csrc.len()
            )));
        }
        if self.payload_type > 0x7F {
            return Err(Error::InvalidParameter(format!(
                "Payload type {} does not fit the 7-bit field",
                self.payload_type
            )));
        }

        // First byte: version (2 bits), padding (1 bit, never set on output),
        // extension (1 bit), CSRC count (4 bits)
        let mut first_byte = (self.version & 0x03) << 6;
        if self.has_extensions() {
            first_byte |= 1 << 4;
        }
        first_byte |= self.csrc.len() as u8 & 0x0F;
        buf.put_u8(first_byte);

        // Second byte: marker (1 bit), payload type (7 bits)
        let mut second_byte = self.payload_type;
        if self.marker {
            second_byte |= 1 << 7;
        }
        buf.put_u8(second_byte);

        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);

        for csrc in &self.csrc {
            buf.put_u32(*csrc);
        }

        self.extensions.serialize(buf)
    }
}

/// RTP packet implementation
///
/// Padding is stripped on parse and never written back; a relayed packet is
/// re-serialized without it.
#[derive(Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// RTP header
    pub header: RtpHeader,

    /// Payload data
    pub payload: Bytes,
}

impl RtpPacket {
    /// Create a new RTP packet
    pub fn new(header: RtpHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Create a new RTP packet with basic parameters
    pub fn new_with_payload(
        payload_type: u8,
        sequence_number: RtpSequenceNumber,
        timestamp: RtpTimestamp,
        ssrc: RtpSsrc,
        payload: Bytes,
    ) -> Self {
        let header = RtpHeader::new(payload_type, sequence_number, timestamp, ssrc);
        Self { header, payload }
    }

    /// Payload type carried in the header
    pub fn payload_type(&self) -> u8 {
        self.header.payload_type
    }

    /// Rewrite the payload type
    pub fn set_payload_type(&mut self, payload_type: u8) {
        self.header.payload_type = payload_type;
    }

    /// Header extensions of this packet
    pub fn extensions(&self) -> &RtpHeaderExtensions {
        &self.header.extensions
    }

    /// Mutable access to the header extensions
    pub fn extensions_mut(&mut self) -> &mut RtpHeaderExtensions {
        &mut self.header.extensions
    }

    /// Get the total size of the packet in bytes
    pub fn size(&self) -> usize {
        self.header.size() + self.payload.len()
    }

    /// Parse an RTP packet from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(data);

        let (header, padding) = RtpHeader::parse_with_padding(&mut buf)?;

        // Last octet of a padded packet counts the padding octets, itself included
        let padding_bytes = if padding {
            let count = buf.last().copied().unwrap_or(0) as usize;
            if count == 0 || count > buf.len() {
                return Err(Error::InvalidPacket(format!(
                    "Invalid padding value: {} with {} remaining bytes",
                    count,
                    buf.len()
                )));
            }
            count
        } else {
            0
        };

        let payload_len = buf.len() - padding_bytes;
        let payload = buf.slice(0..payload_len);

        Ok(Self { header, payload })
    }

    /// Serialize the packet to bytes
    pub fn serialize(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.size());

        self.header.serialize(&mut buf)?;
        buf.put_slice(&self.payload);

        Ok(buf.freeze())
    }
}

impl SwapHeaderExtensions for RtpPacket {
    fn swap_header_extensions(&mut self, a: u8, b: u8) {
        self.header.extensions.swap(a, b);
    }

    fn has_header_extensions(&self) -> bool {
        self.header.extensions.ids().next().is_some()
    }
}

impl fmt::Debug for RtpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtpPacket")
            .field("header", &self.header)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
