//! RTCP Extended Reports (RFC 3611)
//!
//! Only the two blocks an SFU emits for RTT estimation toward receivers that
//! never send SRs are modeled: Receiver Reference Time (RRT) and
//! Delay since Last Receiver Report (DLRR).

use bytes::{Buf, BufMut};

use super::ntp::NtpTimestamp;
use super::{RtcpHeader, RtcpPacketType, RTCP_HEADER_SIZE};
use crate::error::Error;
use crate::{Result, RtpSsrc};

/// XR block header: block type, type-specific byte, block length
const XR_BLOCK_HEADER_SIZE: usize = 4;

/// XR block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RtcpXrBlockType {
    /// Receiver Reference Time Report Block (RFC 3611 Section 4.4)
    ReceiverReferenceTime = 4,

    /// DLRR Report Block (RFC 3611 Section 4.5)
    DelaySinceLastRr = 5,
}

/// Receiver Reference Time block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverReferenceTimeBlock {
    /// Wallclock time when this report was sent
    pub ntp_timestamp: NtpTimestamp,
}

impl ReceiverReferenceTimeBlock {
    /// Block header plus the 64-bit NTP timestamp
    pub const SIZE: usize = XR_BLOCK_HEADER_SIZE + 8;

    /// Create a new RRT block
    pub fn new(ntp_timestamp: NtpTimestamp) -> Self {
        Self { ntp_timestamp }
    }
}

/// One receiver entry of a DLRR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlrrSubBlock {
    /// SSRC of the receiver
    pub ssrc: RtpSsrc,

    /// Compact NTP timestamp of the last RRT received from that receiver
    pub last_rr: u32,

    /// Delay since that RRT, in units of 1/65536 seconds
    pub delay_since_last_rr: u32,
}

impl DlrrSubBlock {
    /// Size on the wire
    pub const SIZE: usize = 12;
}

/// Delay since Last Receiver Report block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelaySinceLastRrBlock {
    /// Per-receiver entries
    pub sub_blocks: Vec<DlrrSubBlock>,
}

impl DelaySinceLastRrBlock {
    /// Create an empty DLRR block
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a receiver entry
    pub fn add_sub_block(&mut self, sub_block: DlrrSubBlock) {
        self.sub_blocks.push(sub_block);
    }

    /// Size on the wire
    pub fn size(&self) -> usize {
        XR_BLOCK_HEADER_SIZE + self.sub_blocks.len() * DlrrSubBlock::SIZE
    }
}

/// An XR report block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpXrBlock {
    /// Receiver Reference Time
    ReceiverReferenceTime(ReceiverReferenceTimeBlock),

    /// Delay since Last Receiver Report
    DelaySinceLastRr(DelaySinceLastRrBlock),
}

impl RtcpXrBlock {
    /// Block type
    pub fn block_type(&self) -> RtcpXrBlockType {
        match self {
            RtcpXrBlock::ReceiverReferenceTime(_) => RtcpXrBlockType::ReceiverReferenceTime,
            RtcpXrBlock::DelaySinceLastRr(_) => RtcpXrBlockType::DelaySinceLastRr,
        }
    }

    /// Size on the wire, block header included
    pub fn size(&self) -> usize {
        match self {
            RtcpXrBlock::ReceiverReferenceTime(_) => ReceiverReferenceTimeBlock::SIZE,
            RtcpXrBlock::DelaySinceLastRr(block) => block.size(),
        }
    }

    /// Serialize the block
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        // Block length counts 32-bit words after the block header
        let words = (self.size() - XR_BLOCK_HEADER_SIZE) / 4;
        let length = u16::try_from(words)
            .map_err(|_| Error::RtcpError(format!("XR block of {} words is too long", words)))?;

        buf.put_u8(self.block_type() as u8);
        buf.put_u8(0);
        buf.put_u16(length);

        match self {
            RtcpXrBlock::ReceiverReferenceTime(block) => {
                buf.put_u32(block.ntp_timestamp.seconds);
                buf.put_u32(block.ntp_timestamp.fraction);
            }
            RtcpXrBlock::DelaySinceLastRr(block) => {
                for sub_block in &block.sub_blocks {
                    buf.put_u32(sub_block.ssrc);
                    buf.put_u32(sub_block.last_rr);
                    buf.put_u32(sub_block.delay_since_last_rr);
                }
            }
        }

        Ok(())
    }

    /// Parse one block. Blocks of other types are skipped and `None` is
    /// returned for them.
    pub fn parse(buf: &mut impl Buf) -> Result<Option<Self>> {
        if buf.remaining() < XR_BLOCK_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                required: XR_BLOCK_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        let block_type = buf.get_u8();
        let _type_specific = buf.get_u8();
        let length = buf.get_u16() as usize * 4;

        if buf.remaining() < length {
            return Err(Error::BufferTooSmall {
                required: length,
                available: buf.remaining(),
            });
        }

        let block = match block_type {
            4 if length == 8 => RtcpXrBlock::ReceiverReferenceTime(ReceiverReferenceTimeBlock {
                ntp_timestamp: NtpTimestamp {
                    seconds: buf.get_u32(),
                    fraction: buf.get_u32(),
                },
            }),
            4 => {
                return Err(Error::RtcpError(format!("Invalid RRT block length: {}", length)));
            }
            5 if length % DlrrSubBlock::SIZE == 0 => {
                let sub_blocks = (0..length / DlrrSubBlock::SIZE)
                    .map(|_| DlrrSubBlock {
                        ssrc: buf.get_u32(),
                        last_rr: buf.get_u32(),
                        delay_since_last_rr: buf.get_u32(),
                    })
                    .collect();
                RtcpXrBlock::DelaySinceLastRr(DelaySinceLastRrBlock { sub_blocks })
            }
            5 => {
                return Err(Error::RtcpError(format!("Invalid DLRR block length: {}", length)));
            }
            _ => {
                buf.advance(length);
                return Ok(None);
            }
        };

        Ok(Some(block))
    }
}

/// Extended Report group: one XR packet with the blocks of a compound packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtcpExtendedReport {
    /// SSRC of the packet sender
    pub ssrc: RtpSsrc,

    /// Report blocks
    pub blocks: Vec<RtcpXrBlock>,
}

impl RtcpExtendedReport {
    /// Create an empty XR group
    pub fn new(ssrc: RtpSsrc) -> Self {
        Self {
            ssrc,
            blocks: Vec::new(),
        }
    }

    /// Add a block
    pub fn add_block(&mut self, block: RtcpXrBlock) {
        self.blocks.push(block);
    }

    /// Whether any block has the given type
    pub fn has_block(&self, block_type: RtcpXrBlockType) -> bool {
        self.blocks.iter().any(|block| block.block_type() == block_type)
    }

    /// Serialized size once `additional` more blocks totalling
    /// `additional_bytes` are added. Zero while the group is empty.
    pub fn size_with(&self, additional: usize, additional_bytes: usize) -> usize {
        if self.blocks.len() + additional == 0 {
            return 0;
        }

        let block_bytes: usize = self.blocks.iter().map(RtcpXrBlock::size).sum();
        RTCP_HEADER_SIZE + 4 + block_bytes + additional_bytes
    }

    /// Calculate the total size in bytes, header included
    pub fn size(&self) -> usize {
        self.size_with(0, 0)
    }

    /// Serialize as a single XR packet. Writes nothing when empty.
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.blocks.is_empty() {
            return Ok(());
        }

        RtcpHeader::new(0, RtcpPacketType::ExtendedReport, self.size())?.serialize(buf);
        buf.put_u32(self.ssrc);

        for block in &self.blocks {
            block.serialize(buf)?;
        }

        Ok(())
    }

    /// Parse the body of one XR packet of `body_len` bytes (header excluded)
    pub fn parse(buf: &mut impl Buf, body_len: usize) -> Result<Self> {
        if body_len < 4 || buf.remaining() < body_len {
            return Err(Error::BufferTooSmall {
                required: body_len.max(4),
                available: buf.remaining(),
            });
        }

        let mut report = Self::new(buf.get_u32());
        let mut body = buf.copy_to_bytes(body_len - 4);

        while body.has_remaining() {
            if let Some(block) = RtcpXrBlock::parse(&mut body)? {
                report.add_block(block);
            }
        }

        Ok(report)
    }
}
