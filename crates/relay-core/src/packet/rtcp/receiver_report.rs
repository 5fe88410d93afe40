use bytes::{Buf, BufMut};

use super::report_block::RtcpReportBlock;
use super::{RtcpHeader, RtcpPacketType, MAX_COUNT, RTCP_HEADER_SIZE};
use crate::error::Error;
use crate::{Result, RtpSsrc};

/// RTCP Receiver Report (RR) group
/// Defined in RFC 3550 Section 6.4.2
///
/// Holds any number of report blocks; more than 31 are spread over several
/// RR packets sharing the same sender SSRC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtcpReceiverReport {
    /// SSRC of the receiver
    pub ssrc: RtpSsrc,

    /// Report blocks
    pub report_blocks: Vec<RtcpReportBlock>,
}

impl RtcpReceiverReport {
    /// Create a new receiver report
    pub fn new(ssrc: RtpSsrc) -> Self {
        Self {
            ssrc,
            report_blocks: Vec::new(),
        }
    }

    /// Add a report block
    pub fn add_report_block(&mut self, block: RtcpReportBlock) {
        self.report_blocks.push(block);
    }

    /// Serialized size once `additional` more blocks are added.
    /// Zero while the group is empty.
    pub fn size_with(&self, additional: usize) -> usize {
        let count = self.report_blocks.len() + additional;
        if count == 0 {
            return 0;
        }

        let packets = (count + MAX_COUNT - 1) / MAX_COUNT;
        packets * (RTCP_HEADER_SIZE + 4) + count * RtcpReportBlock::SIZE
    }

    /// Calculate the total size in bytes, headers included
    pub fn size(&self) -> usize {
        self.size_with(0)
    }

    /// Serialize as one or more RR packets. Writes nothing when empty.
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        for blocks in self.report_blocks.chunks(MAX_COUNT) {
            let packet_size = RTCP_HEADER_SIZE + 4 + blocks.len() * RtcpReportBlock::SIZE;
            RtcpHeader::new(blocks.len() as u8, RtcpPacketType::ReceiverReport, packet_size)?
                .serialize(buf);

            buf.put_u32(self.ssrc);
            for block in blocks {
                block.serialize(buf);
            }
        }

        Ok(())
    }
}

/// Parse the body of one RR packet, given the count from its header
pub fn parse_receiver_report(buf: &mut impl Buf, report_count: u8) -> Result<RtcpReceiverReport> {
    if buf.remaining() < 4 {
        return Err(Error::BufferTooSmall {
            required: 4,
            available: buf.remaining(),
        });
    }

    let ssrc = buf.get_u32();

    let report_blocks = (0..report_count)
        .map(|_| RtcpReportBlock::parse(buf))
        .collect::<Result<Vec<_>>>()?;

    Ok(RtcpReceiverReport {
        ssrc,
        report_blocks,
    })
}
