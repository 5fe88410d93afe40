//! RTCP Packet module
//!
//! Sub-report codecs for the outbound feedback an SFU emits (SR, RR, SDES
//! per RFC 3550 and XR per RFC 3611), and the compound packet that packs them
//! under a byte budget.

use bytes::{Buf, BufMut};

use crate::error::Error;
use crate::Result;

/// RTCP version (same as RTP, always 2)
pub const RTCP_VERSION: u8 = 2;

/// Size of the RTCP common header in bytes
pub const RTCP_HEADER_SIZE: usize = 4;

/// Largest value of the 5-bit count field
pub const MAX_COUNT: usize = 31;

/// RTCP packet types as defined in RFC 3550 and RFC 3611
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RtcpPacketType {
    /// Sender Report (SR)
    SenderReport = 200,

    /// Receiver Report (RR)
    ReceiverReport = 201,

    /// Source Description (SDES)
    SourceDescription = 202,

    /// Goodbye (BYE)
    Goodbye = 203,

    /// Application-Defined (APP)
    ApplicationDefined = 204,

    /// Extended Reports (XR)
    ExtendedReport = 207,
}

impl TryFrom<u8> for RtcpPacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            200 => Ok(RtcpPacketType::SenderReport),
            201 => Ok(RtcpPacketType::ReceiverReport),
            202 => Ok(RtcpPacketType::SourceDescription),
            203 => Ok(RtcpPacketType::Goodbye),
            204 => Ok(RtcpPacketType::ApplicationDefined),
            207 => Ok(RtcpPacketType::ExtendedReport),
            _ => Err(Error::RtcpError(format!("Unknown RTCP packet type: {}", value))),
        }
    }
}

mod compound;
mod ntp;
mod receiver_report;
mod report_block;
mod sdes;
mod sender_report;
mod xr;

pub use compound::CompoundPacket;
pub use ntp::NtpTimestamp;
pub use receiver_report::{parse_receiver_report, RtcpReceiverReport};
pub use report_block::RtcpReportBlock;
pub use sdes::{RtcpSdesChunk, RtcpSdesItem, RtcpSdesItemType, RtcpSourceDescription};
pub use sender_report::RtcpSenderReport;
pub use xr::{
    DelaySinceLastRrBlock, DlrrSubBlock, ReceiverReferenceTimeBlock, RtcpExtendedReport,
    RtcpXrBlock, RtcpXrBlockType,
};

/// RTCP common header (RFC 3550 Section 6.4.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcpHeader {
    /// Padding flag
    pub padding: bool,

    /// Report count / source count / subtype (5 bits)
    pub count: u8,

    /// Packet type
    pub packet_type: RtcpPacketType,

    /// Length in 32-bit words minus one, header included
    pub length: u16,
}

impl RtcpHeader {
    /// Header for a packet of `packet_size` bytes (header included)
    pub fn new(count: u8, packet_type: RtcpPacketType, packet_size: usize) -> Result<Self> {
        if count as usize > MAX_COUNT {
            return Err(Error::RtcpError(format!("RTCP count {} exceeds {}", count, MAX_COUNT)));
        }
        if packet_size < RTCP_HEADER_SIZE || packet_size % 4 != 0 {
            return Err(Error::RtcpError(format!(
                "RTCP packet size {} is not a positive multiple of 4",
                packet_size
            )));
        }

        let words = packet_size / 4 - 1;
        let length = u16::try_from(words)
            .map_err(|_| Error::RtcpError(format!("RTCP packet of {} bytes is too long", packet_size)))?;

        Ok(Self {
            padding: false,
            count,
            packet_type,
            length,
        })
    }

    /// Total packet size in bytes, header included
    pub fn packet_size(&self) -> usize {
        (self.length as usize + 1) * 4
    }

    /// Parse a common header
    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < RTCP_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                required: RTCP_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        let first_byte = buf.get_u8();
        let version = (first_byte >> 6) & 0x03;
        if version != RTCP_VERSION {
            return Err(Error::RtcpError(format!("Invalid RTCP version: {}", version)));
        }

        let padding = (first_byte >> 5) & 0x01 != 0;
        let count = first_byte & 0x1F;
        let packet_type = RtcpPacketType::try_from(buf.get_u8())?;
        let length = buf.get_u16();

        Ok(Self {
            padding,
            count,
            packet_type,
            length,
        })
    }

    /// Serialize the common header
    pub fn serialize(&self, buf: &mut impl BufMut) {
        let mut first_byte = RTCP_VERSION << 6;
        if self.padding {
            first_byte |= 1 << 5;
        }
        first_byte |= self.count & 0x1F;

        buf.put_u8(first_byte);
        buf.put_u8(self.packet_type as u8);
        buf.put_u16(self.length);
    }
}

/// Walk the packets of a serialized compound RTCP packet and return their
/// headers in order
pub fn parse_compound_headers(data: &[u8]) -> Result<Vec<RtcpHeader>> {
    let mut headers = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let header = RtcpHeader::parse(&mut &rest[..])?;
        let size = header.packet_size();
        if size > rest.len() {
            return Err(Error::BufferTooSmall {
                required: size,
                available: rest.len(),
            });
        }

        headers.push(header);
        rest = &rest[size..];
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_rtcp_packet_type_conversion() {
        assert_eq!(RtcpPacketType::try_from(200).unwrap(), RtcpPacketType::SenderReport);
        assert_eq!(RtcpPacketType::try_from(201).unwrap(), RtcpPacketType::ReceiverReport);
        assert_eq!(RtcpPacketType::try_from(202).unwrap(), RtcpPacketType::SourceDescription);
        assert_eq!(RtcpPacketType::try_from(207).unwrap(), RtcpPacketType::ExtendedReport);

        assert!(RtcpPacketType::try_from(100).is_err());
    }

    #[test]
    fn test_header_serialize_parse() {
        let header = RtcpHeader::new(3, RtcpPacketType::ReceiverReport, 80).unwrap();
        assert_eq!(header.length, 19);

        let mut buf = BytesMut::new();
        header.serialize(&mut buf);
        assert_eq!(&buf[..], &[0x83, 201, 0, 19]);

        let parsed = RtcpHeader::parse(&mut buf.freeze()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.packet_size(), 80);
    }

    #[test]
    fn test_header_rejects_bad_input() {
        assert!(RtcpHeader::new(32, RtcpPacketType::ReceiverReport, 8).is_err());
        assert!(RtcpHeader::new(0, RtcpPacketType::ReceiverReport, 6).is_err());
        assert!(RtcpHeader::parse(&mut &[0x40u8, 201, 0, 1][..]).is_err());
    }

    #[test]
    fn test_parse_compound_headers_truncated() {
        // Header announces 8 bytes, only 4 present
        let err = parse_compound_headers(&[0x80, 201, 0, 1]).unwrap_err();
        assert_eq!(err, Error::BufferTooSmall { required: 8, available: 4 });

        assert!(parse_compound_headers(&[]).unwrap().is_empty());
    }
}
