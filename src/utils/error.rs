//! Error handling for vidfetch

use thiserror::Error;

/// Main error type for vidfetch
///
/// The three variants map to the three terminal failure classes a caller can
/// act on: give up (`Configuration`), mark the source dead
/// (`ResourceUnavailable`), or retry later from persisted state
/// (`TransferIo`).
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Target directory or output file cannot be set up. Fatal, not retried.
    #[error("Download configuration error: {0}")]
    Configuration(String),

    /// The remote source answered with a not-found class response.
    ///
    /// Only the default strategy surfaces this as an error; for chunked
    /// downloads a not-found chunk means the sequence ended.
    #[error("Remote resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Any other network or file I/O fault. On-disk state reflects only
    /// fully completed chunks/bytes, so a later run can resume.
    #[error("Transfer I/O error: {0}")]
    TransferIo(String),
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::TransferIo(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_transfer_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: DownloadError = io.into();
        assert!(matches!(err, DownloadError::TransferIo(_)));
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn test_error_display() {
        let err = DownloadError::Configuration("unavailable target directory".to_string());
        assert_eq!(
            err.to_string(),
            "Download configuration error: unavailable target directory"
        );
    }
}
