//! RTCP size budget configuration
//!
//! A compound RTCP packet has to fit in one datagram after SRTCP protection
//! has appended its trailer, so the usable size is the path MTU minus the
//! worst-case trailer.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// Default path MTU in bytes
pub const DEFAULT_MTU: usize = 1500;

/// Maximum number of octets SRTP protection may append to a packet
/// (maximum auth tag length plus maximum MKI length)
pub const SRTP_MAX_TRAILER_LEN: usize = 144;

/// Smallest budget that still holds one RTCP common header plus an SSRC
const MIN_COMPOUND_SIZE: usize = 8;

/// Size budget for outbound compound RTCP packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RtcpConfig {
    /// Path maximum transmission unit
    pub mtu: usize,

    /// Headroom withheld for the encryption trailer
    pub trailer_reserve: usize,
}

impl Default for RtcpConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            trailer_reserve: SRTP_MAX_TRAILER_LEN,
        }
    }
}

impl RtcpConfig {
    /// Create a configuration for the given MTU and trailer reserve
    pub fn new(mtu: usize, trailer_reserve: usize) -> Self {
        Self { mtu, trailer_reserve }
    }

    /// Check that the reserve leaves room for at least one RTCP packet
    pub fn validate(&self) -> Result<()> {
        if self.mtu < self.trailer_reserve.saturating_add(MIN_COMPOUND_SIZE) {
            return Err(Error::ConfigError(format!(
                "MTU {} leaves no room for RTCP after a {} byte trailer reserve",
                self.mtu, self.trailer_reserve
            )));
        }

        Ok(())
    }

    /// Maximum serialized size of a compound RTCP packet
    pub fn max_compound_size(&self) -> usize {
        self.mtu.saturating_sub(self.trailer_reserve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let config = RtcpConfig::default();
        assert_eq!(config.max_compound_size(), 1356);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RtcpConfig = serde_json::from_str(r#"{ "mtu": 1344 }"#).unwrap();
        assert_eq!(config.mtu, 1344);
        assert_eq!(config.trailer_reserve, SRTP_MAX_TRAILER_LEN);
        assert_eq!(config.max_compound_size(), 1200);
    }

    #[test]
    fn test_reserve_larger_than_mtu() {
        let config = RtcpConfig::new(100, 144);
        assert_eq!(config.max_compound_size(), 0);
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_huge_reserve_is_rejected() {
        let config: RtcpConfig =
            serde_json::from_value(serde_json::json!({ "mtu": 1500, "trailerReserve": usize::MAX })).unwrap();

        assert_eq!(config.max_compound_size(), 0);
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}
