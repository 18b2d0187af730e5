//! Conversion outcome codes and the crate error type.
//!
//! Every run ends in exactly one outcome: a finished [`ConvertOutput`](crate::ConvertOutput)
//! or an [`Error`] carrying an [`ErrorCode`] plus a message. The message is the
//! detail reported by the failing stage, or the code's fixed fallback text when
//! the stage had nothing more specific to say.

use std::collections::TryReserveError;

use crate::limits::LimitExceeded;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome category of a failed conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// No conversion strategy covers the image's color model, depth and transparency.
    Unsupported,
    /// A buffer or table allocation failed.
    OutOfMemory,
    /// The decoder rejected the stream (including resource-limit violations).
    Decoder,
    /// The input is not a structurally valid PNG image.
    Malformed,
    /// The input stream could not be read, or ended early.
    Read,
    /// An internal consistency check failed.
    Internal,
}

impl ErrorCode {
    /// Fixed message used when no stage-specific detail is available.
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unsupported => "Unsupported image type",
            Self::OutOfMemory => "Unable to allocate memory",
            Self::Decoder => "PNG decoder reported an error",
            Self::Malformed => "Invalid PNG image",
            Self::Read => "Unable to read file",
            Self::Internal => "Unknown error",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.default_message())
    }
}

/// A failed conversion: outcome code plus human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.code, .detail))]
pub struct Error {
    code: ErrorCode,
    detail: Option<String>,
}

fn describe<'a>(code: &ErrorCode, detail: &'a Option<String>) -> &'a str {
    match detail.as_deref() {
        Some(msg) if !msg.is_empty() => msg,
        _ => code.default_message(),
    }
}

impl Error {
    /// Error with only an outcome code; displays the code's fallback text.
    pub fn new(code: ErrorCode) -> Self {
        Self { code, detail: None }
    }

    /// Error with a stage-specific message.
    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }

    pub(crate) fn unsupported(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorCode::Unsupported, detail)
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorCode::Malformed, detail)
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorCode::Internal, detail)
    }

    pub(crate) fn out_of_memory(bytes: usize) -> Self {
        Self::with_detail(
            ErrorCode::OutOfMemory,
            format!("Unable to allocate memory ({bytes} bytes)"),
        )
    }

    /// The outcome code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The message: stage detail if present, otherwise the code's fallback text.
    pub fn message(&self) -> &str {
        describe(&self.code, &self.detail)
    }
}

impl From<LimitExceeded> for Error {
    fn from(err: LimitExceeded) -> Self {
        Self::with_detail(ErrorCode::Decoder, format!("[limits] {err}"))
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Self::with_detail(ErrorCode::OutOfMemory, err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::with_detail(ErrorCode::Read, format!("Read error: {err}"))
    }
}

impl From<png::DecodingError> for Error {
    fn from(err: png::DecodingError) -> Self {
        let code = match &err {
            // The stream is already in memory, so running dry means it was cut short.
            png::DecodingError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                ErrorCode::Decoder
            }
            png::DecodingError::IoError(_) => ErrorCode::Read,
            png::DecodingError::Format(_) => ErrorCode::Malformed,
            png::DecodingError::LimitsExceeded => ErrorCode::Decoder,
            png::DecodingError::Parameter(_) => ErrorCode::Internal,
            #[allow(unreachable_patterns)]
            _ => ErrorCode::Decoder,
        };
        Self::with_detail(code, format!("[png] {err}"))
    }
}
