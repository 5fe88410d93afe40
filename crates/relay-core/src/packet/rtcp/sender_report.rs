use bytes::{Buf, BufMut};

use super::ntp::NtpTimestamp;
use super::{RtcpHeader, RtcpPacketType, RTCP_HEADER_SIZE};
use crate::error::Error;
use crate::{Result, RtpSsrc, RtpTimestamp};

/// RTCP Sender Report (SR) without report blocks
/// Defined in RFC 3550 Section 6.4.1
///
/// Each sender report travels as its own RTCP packet, since an SR carries
/// the sender info of exactly one SSRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpSenderReport {
    /// SSRC of the sender
    pub ssrc: RtpSsrc,

    /// NTP timestamp
    pub ntp_timestamp: NtpTimestamp,

    /// RTP timestamp corresponding to the NTP timestamp
    pub rtp_timestamp: RtpTimestamp,

    /// Sender's packet count
    pub sender_packet_count: u32,

    /// Sender's octet count
    pub sender_octet_count: u32,
}

impl RtcpSenderReport {
    /// SSRC plus sender info
    pub const BODY_SIZE: usize = 24;

    /// Size of the complete SR packet, common header included
    pub const PACKET_SIZE: usize = RTCP_HEADER_SIZE + Self::BODY_SIZE;

    /// Create a new sender report
    pub fn new(ssrc: RtpSsrc, ntp_timestamp: NtpTimestamp, rtp_timestamp: RtpTimestamp) -> Self {
        Self {
            ssrc,
            ntp_timestamp,
            rtp_timestamp,
            sender_packet_count: 0,
            sender_octet_count: 0,
        }
    }

    /// Serialize the SR as a standalone RTCP packet, header included
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        RtcpHeader::new(0, RtcpPacketType::SenderReport, Self::PACKET_SIZE)?.serialize(buf);

        buf.put_u32(self.ssrc);
        buf.put_u32(self.ntp_timestamp.seconds);
        buf.put_u32(self.ntp_timestamp.fraction);
        buf.put_u32(self.rtp_timestamp);
        buf.put_u32(self.sender_packet_count);
        buf.put_u32(self.sender_octet_count);

        Ok(())
    }

    /// Parse the SR body that follows the common header. Report blocks, if
    /// any, are left in the buffer.
    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < Self::BODY_SIZE {
            return Err(Error::BufferTooSmall {
                required: Self::BODY_SIZE,
                available: buf.remaining(),
            });
        }

        let ssrc = buf.get_u32();
        let ntp_timestamp = NtpTimestamp {
            seconds: buf.get_u32(),
            fraction: buf.get_u32(),
        };

        Ok(Self {
            ssrc,
            ntp_timestamp,
            rtp_timestamp: buf.get_u32(),
            sender_packet_count: buf.get_u32(),
            sender_octet_count: buf.get_u32(),
        })
    }
}
