//! Error kinds surfaced by a mic check attempt.
//!
//! Every one of these has already been shown through the
//! [`ErrorPresenter`](crate::banner::ErrorPresenter) by the time a caller
//! sees it as a value.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MicCheckError {
    /// The runtime has no capture capability at all.
    #[error("audio recording is not supported on this system")]
    DeviceUnsupported,

    /// The capture stream failed to open or to flush a recording.
    #[error("recording stream failed: {0}")]
    DeviceStream(String),

    /// Network or server error while submitting the recorded sample.
    #[error("could not reach the server: {0}")]
    UploadConnectivity(String),
}

impl MicCheckError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceUnsupported => "device_unsupported",
            Self::DeviceStream(_) => "device_stream_error",
            Self::UploadConnectivity(_) => "upload_connectivity_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(MicCheckError::DeviceUnsupported.kind(), "device_unsupported");
        assert_eq!(
            MicCheckError::DeviceStream("denied".into()).kind(),
            "device_stream_error"
        );
        assert_eq!(
            MicCheckError::UploadConnectivity("refused".into()).kind(),
            "upload_connectivity_failure"
        );
    }

    #[test]
    fn test_error_display_carries_message() {
        let err = MicCheckError::DeviceStream("Permission denied".into());
        assert_eq!(
            err.to_string(),
            "recording stream failed: Permission denied"
        );
    }
}
