//! Compound RTCP packet builder
//!
//! Collects the feedback of one RTCP emission opportunity into four groups
//! that always go out in the same order: sender reports, receiver reports,
//! SDES chunks, extended report blocks. Budgeted additions either fit
//! entirely under the size ceiling or leave the packet untouched, so the
//! caller can send what it has and retry the same items on a fresh packet.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use super::receiver_report::RtcpReceiverReport;
use super::report_block::RtcpReportBlock;
use super::sdes::{RtcpSdesChunk, RtcpSourceDescription};
use super::sender_report::RtcpSenderReport;
use super::xr::{
    DelaySinceLastRrBlock, ReceiverReferenceTimeBlock, RtcpExtendedReport, RtcpXrBlock,
    RtcpXrBlockType,
};
use crate::config::RtcpConfig;
use crate::error::Error;
use crate::{Result, RtpSsrc};

/// Compound RTCP packet under construction
#[derive(Debug, Clone)]
pub struct CompoundPacket {
    /// Ceiling for budgeted additions
    max_size: usize,

    /// One SR packet per entry
    sender_reports: Vec<RtcpSenderReport>,

    /// Report blocks, emitted as RR packet(s)
    receiver_report: RtcpReceiverReport,

    /// SDES chunks, emitted as SDES packet(s)
    sdes: RtcpSourceDescription,

    /// RRT and DLRR blocks, emitted as one XR packet
    xr: RtcpExtendedReport,
}

impl Default for CompoundPacket {
    fn default() -> Self {
        Self::new(&RtcpConfig::default())
    }
}

impl CompoundPacket {
    /// Create an empty compound packet budgeted by `config`
    pub fn new(config: &RtcpConfig) -> Self {
        Self::with_max_size(config.max_compound_size())
    }

    /// Create an empty compound packet with an explicit ceiling
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            sender_reports: Vec::new(),
            receiver_report: RtcpReceiverReport::default(),
            sdes: RtcpSourceDescription::new(),
            xr: RtcpExtendedReport::default(),
        }
    }

    /// Ceiling for budgeted additions
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// SSRC written in the RR packet(s)
    pub fn set_receiver_report_ssrc(&mut self, ssrc: RtpSsrc) {
        self.receiver_report.ssrc = ssrc;
    }

    /// SSRC written in the XR packet
    pub fn set_extended_report_ssrc(&mut self, ssrc: RtpSsrc) {
        self.xr.ssrc = ssrc;
    }

    /// Number of sender reports
    pub fn sender_report_count(&self) -> usize {
        self.sender_reports.len()
    }

    /// Number of receiver report blocks
    pub fn receiver_report_count(&self) -> usize {
        self.receiver_report.report_blocks.len()
    }

    /// True when nothing has been added
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether a sender report is already present
    pub fn has_sender_report(&self) -> bool {
        !self.sender_reports.is_empty()
    }

    /// Whether a receiver reference time block is already present
    pub fn has_receiver_reference_time(&self) -> bool {
        self.xr.has_block(RtcpXrBlockType::ReceiverReferenceTime)
    }

    /// Total serialized size of the current contents
    pub fn size(&self) -> usize {
        self.sender_reports.len() * RtcpSenderReport::PACKET_SIZE
            + self.receiver_report.size()
            + self.sdes.size()
            + self.xr.size()
    }

    /// Size the packet would have after adding the given items
    fn projected_size(
        &self,
        sender_reports: usize,
        report_blocks: usize,
        sdes_chunks: &[RtcpSdesChunk],
        xr_blocks: usize,
        xr_bytes: usize,
    ) -> usize {
        let sdes_bytes: usize = sdes_chunks.iter().map(RtcpSdesChunk::size).sum();

        (self.sender_reports.len() + sender_reports) * RtcpSenderReport::PACKET_SIZE
            + self.receiver_report.size_with(report_blocks)
            + self.sdes.size_with(sdes_chunks.len(), sdes_bytes)
            + self.xr.size_with(xr_blocks, xr_bytes)
    }

    /// Append a sender report without checking the budget
    pub fn add_sender_report(&mut self, report: RtcpSenderReport) {
        self.sender_reports.push(report);
    }

    /// Append a receiver report block without checking the budget
    pub fn add_receiver_report(&mut self, report: RtcpReportBlock) {
        self.receiver_report.add_report_block(report);
    }

    /// Append an SDES chunk without checking the budget
    pub fn add_sdes_chunk(&mut self, chunk: RtcpSdesChunk) {
        self.sdes.add_chunk(chunk);
    }

    /// Append a receiver reference time block without checking the budget
    pub fn add_receiver_reference_time(&mut self, block: ReceiverReferenceTimeBlock) {
        self.xr.add_block(RtcpXrBlock::ReceiverReferenceTime(block));
    }

    /// Append a DLRR block without checking the budget
    pub fn add_delay_since_last_rr(&mut self, block: DelaySinceLastRrBlock) {
        self.xr.add_block(RtcpXrBlock::DelaySinceLastRr(block));
    }

    /// Feedback of a single consumer: its sender report, its SDES chunk and,
    /// when given, a DLRR block. Adds everything if it fits, otherwise
    /// nothing.
    pub fn add_consumer_reports(
        &mut self,
        sender_report: &RtcpSenderReport,
        sdes_chunk: &RtcpSdesChunk,
        delay_since_last_rr: Option<&DelaySinceLastRrBlock>,
    ) -> bool {
        let delays_since_last_rr: &[DelaySinceLastRrBlock] = match delay_since_last_rr {
            Some(block) => std::slice::from_ref(block),
            None => &[],
        };

        self.add_consumer_reports_batch(
            std::slice::from_ref(sender_report),
            std::slice::from_ref(sdes_chunk),
            delays_since_last_rr,
        )
    }

    /// Feedback of several consumers fed from one producer stream. Adds the
    /// whole batch if it fits, otherwise nothing.
    pub fn add_consumer_reports_batch(
        &mut self,
        sender_reports: &[RtcpSenderReport],
        sdes_chunks: &[RtcpSdesChunk],
        delays_since_last_rr: &[DelaySinceLastRrBlock],
    ) -> bool {
        let xr_bytes: usize = delays_since_last_rr.iter().map(DelaySinceLastRrBlock::size).sum();
        let projected = self.projected_size(
            sender_reports.len(),
            0,
            sdes_chunks,
            delays_since_last_rr.len(),
            xr_bytes,
        );

        if projected > self.max_size {
            return false;
        }

        self.sender_reports.extend_from_slice(sender_reports);
        self.sdes.chunks.extend_from_slice(sdes_chunks);
        for block in delays_since_last_rr {
            self.add_delay_since_last_rr(block.clone());
        }

        true
    }

    /// Feedback of a producer: its report blocks plus, when given, a
    /// receiver reference time block. Adds everything if it fits, otherwise
    /// nothing.
    pub fn add_producer_reports(
        &mut self,
        receiver_reports: &[RtcpReportBlock],
        receiver_reference_time: Option<&ReceiverReferenceTimeBlock>,
    ) -> bool {
        let (xr_blocks, xr_bytes) = match receiver_reference_time {
            Some(_) => (1, ReceiverReferenceTimeBlock::SIZE),
            None => (0, 0),
        };
        let projected = self.projected_size(0, receiver_reports.len(), &[], xr_blocks, xr_bytes);

        if projected > self.max_size {
            return false;
        }

        self.receiver_report.report_blocks.extend_from_slice(receiver_reports);
        if let Some(block) = receiver_reference_time {
            self.add_receiver_reference_time(*block);
        }

        true
    }

    /// Serialize into `buf`, which must hold at least `size()` bytes.
    /// Returns the number of bytes written. `buf` is left untouched on error.
    pub fn serialize_into(self, buf: &mut [u8]) -> Result<usize> {
        let size = self.size();
        if buf.len() < size {
            return Err(Error::BufferTooSmall {
                required: size,
                available: buf.len(),
            });
        }

        let encoded = self.serialize()?;
        buf[..size].copy_from_slice(&encoded);

        Ok(size)
    }

    /// Serialize into a newly allocated buffer
    pub fn serialize(self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.size());
        self.write_groups(&mut buf)?;

        Ok(buf.freeze())
    }

    fn write_groups(&self, buf: &mut impl bytes::BufMut) -> Result<()> {
        for report in &self.sender_reports {
            report.serialize(buf)?;
        }
        self.receiver_report.serialize(buf)?;
        self.sdes.serialize(buf)?;
        self.xr.serialize(buf)
    }

    /// Log the packet structure
    pub fn dump(&self) {
        debug!("<CompoundPacket>");
        debug!("  size: {} / {}", self.size(), self.max_size);
        for report in &self.sender_reports {
            debug!(
                "  SR ssrc={} rtp_ts={} packets={} octets={}",
                report.ssrc,
                report.rtp_timestamp,
                report.sender_packet_count,
                report.sender_octet_count
            );
        }
        if !self.receiver_report.report_blocks.is_empty() {
            debug!("  RR ssrc={}", self.receiver_report.ssrc);
            for block in &self.receiver_report.report_blocks {
                debug!(
                    "    block ssrc={} fraction_lost={} cumulative_lost={} jitter={}",
                    block.ssrc, block.fraction_lost, block.cumulative_lost, block.jitter
                );
            }
        }
        for chunk in &self.sdes.chunks {
            debug!("  SDES ssrc={} items={}", chunk.ssrc, chunk.items.len());
        }
        if !self.xr.blocks.is_empty() {
            debug!("  XR ssrc={}", self.xr.ssrc);
            for block in &self.xr.blocks {
                debug!("    {:?} ({} bytes)", block.block_type(), block.size());
            }
        }
        debug!("</CompoundPacket>");
    }
}
