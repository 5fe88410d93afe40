//! Packet module
//!
//! RTP packets as relayed through the SFU, with their header extensions
//! addressable by id, and the RTCP sub-reports assembled into outbound
//! compound packets.

pub mod extension;
pub mod rtcp;
pub mod rtp;

pub use extension::{OpaqueExtension, RtpHeaderExtensions};
pub use rtp::*;
