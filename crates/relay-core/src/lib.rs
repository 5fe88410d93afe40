//! Relay core for the SFU media path
//!
//! This crate provides the two pieces of the forwarding path that need
//! algorithmic care:
//!
//! - `mapping`: per-consumer payload type and header extension id remapping,
//!   including the in-place permutation of a live packet's extensions
//! - `packet::rtcp::CompoundPacket`: size-bounded assembly of outbound RTCP
//!   feedback into a single compound packet
//!
//! Supporting modules:
//!
//! - `packet`: RTP packet model with RFC 8285 header extensions and the RTCP
//!   sub-report codecs
//! - `config`: RTCP size budget configuration

mod error;

pub mod config;
pub mod mapping;
pub mod packet;

pub use error::Error;

pub use config::RtcpConfig;
pub use mapping::{
    remap_header_extensions, CodecMapping, ConsumeRequest, ConsumerRtpMapping,
    ConsumerRtpMappingData, HeaderExtensionMapping, SwapHeaderExtensions,
};
pub use packet::rtcp::{
    CompoundPacket, DelaySinceLastRrBlock, NtpTimestamp, ReceiverReferenceTimeBlock,
    RtcpReportBlock, RtcpSdesChunk, RtcpSdesItem, RtcpSenderReport,
};
pub use packet::{RtpHeader, RtpHeaderExtensions, RtpPacket};

/// Typedef for RTP timestamp values
pub type RtpTimestamp = u32;

/// Typedef for RTP sequence numbers
pub type RtpSequenceNumber = u16;

/// Typedef for RTP synchronization source identifier
pub type RtpSsrc = u32;

/// Typedef for RTP contributing source identifier
pub type RtpCsrc = u32;

/// Result type for relay core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        CompoundPacket, ConsumerRtpMapping, Error, Result, RtcpConfig, RtpPacket, RtpSsrc,
        SwapHeaderExtensions,
    };
}
