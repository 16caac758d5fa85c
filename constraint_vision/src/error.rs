//! Error types for the constraint_vision library

use thiserror::Error;

/// Result type alias for constraint_vision operations
pub type Result<T> = std::result::Result<T, DetectionError>;

/// Everything that can go wrong between receiving image bytes and returning regions.
///
/// Only decoding (and the I/O around settings files) can fail for a well-formed call;
/// the numeric stages themselves are total functions.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Input bytes could not be decoded into a pixel buffer
    #[error("Failed to decode image: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<image::ImageError>,
    },

    /// The visualization could not be encoded back into PNG bytes
    #[error("Failed to encode image: {message}")]
    Encode {
        message: String,
        #[source]
        source: image::ImageError,
    },

    /// A raw RGBA buffer does not match its declared dimensions
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Detection settings failed validation
    #[error("Invalid setting {parameter} = {value}: {reason}")]
    InvalidSettings {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Settings JSON could not be parsed
    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),

    /// Settings file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pool worker went away before answering
    #[error("Detection worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl DetectionError {
    /// Create a decode error with context
    pub fn decode(message: impl Into<String>, source: image::ImageError) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an encode error with context
    pub fn encode(message: impl Into<String>, source: image::ImageError) -> Self {
        Self::Encode {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn invalid(
        parameter: &'static str,
        value: impl ToString,
        reason: &'static str,
    ) -> Self {
        Self::InvalidSettings {
            parameter,
            value: value.to_string(),
            reason,
        }
    }

    /// Short explanation suitable for showing to whoever uploaded the template
    pub fn user_message(&self) -> String {
        match self {
            DetectionError::Decode { .. } | DetectionError::BufferSize { .. } => {
                "The image could not be read. Please upload a PNG or JPEG file.".to_string()
            }
            DetectionError::InvalidSettings { parameter, reason, .. } => {
                format!("Detection setting '{parameter}' is not valid: {reason}.")
            }
            DetectionError::SettingsParse(_) => {
                "The detection settings could not be parsed.".to_string()
            }
            _ => "Constraint detection failed. Please try again.".to_string(),
        }
    }
}
