// Transcoder trait and the byte stream type passed between pipeline stages

use futures::stream::BoxStream;

use super::errors::DownloadError;
use super::transcoder::ConversionOptions;

/// Chunked media bytes flowing from the source towards the client
pub type ByteStream = BoxStream<'static, Result<bytes::Bytes, std::io::Error>>;

/// Trait for transcoder implementations
pub trait Transcoder: Send + Sync {
    /// Name of the transcoder (for logging)
    fn name(&self) -> &'static str;

    /// Wrap `input` with a conversion process and return its output stream.
    ///
    /// Errors returned here happen before any output exists. Failures once
    /// the process runs surface as an `Err` item on the returned stream.
    fn transcode(
        &self,
        input: ByteStream,
        options: &ConversionOptions,
    ) -> Result<ByteStream, DownloadError>;
}
