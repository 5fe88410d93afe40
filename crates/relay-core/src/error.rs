use thiserror::Error;

/// Error type for relay core operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid or incomplete RTP mapping data received at consumer creation
    #[error("Invalid RTP mapping: {0}")]
    InvalidMapping(String),

    /// Error when encoding a packet
    #[error("Failed to encode packet: {0}")]
    EncodeError(String),

    /// Invalid packet format
    #[error("Invalid RTP packet format: {0}")]
    InvalidPacket(String),

    /// Buffer too small
    #[error("Buffer too small: need {required} but have {available}")]
    BufferTooSmall {
        required: usize,
        available: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// RTCP error
    #[error("RTCP error: {0}")]
    RtcpError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidMapping(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let mapping_err = Error::InvalidMapping("missing codecs".to_string());
        assert_eq!(mapping_err.to_string(), "Invalid RTP mapping: missing codecs");

        let buffer_err = Error::BufferTooSmall { required: 100, available: 50 };
        assert_eq!(buffer_err.to_string(), "Buffer too small: need 100 but have 50");

        let json_err = serde_json::from_str::<u8>("300").unwrap_err();
        assert!(Error::from(json_err).to_string().starts_with("Invalid RTP mapping"));
    }
}
