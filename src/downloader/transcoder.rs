// Stream transcoding through an ffmpeg child process
//
// Input bytes are written to ffmpeg's stdin while its stdout is forwarded as
// the output stream, one chunk at a time. Nothing touches the disk.

use futures::StreamExt;
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use super::errors::DownloadError;
use super::models::{OutputFormat, TimeRange};
use super::traits::{ByteStream, Transcoder};
use super::utils::find_binary;

/// Lines of ffmpeg stderr kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// Options handed to the transcoder
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    pub format: OutputFormat,
    /// Input seek in seconds
    pub start_time: Option<f64>,
    /// End of the window in seconds, relative to the source start
    pub end_time: Option<f64>,
    /// Encoder bitrate for audio outputs (e.g. "192k")
    pub audio_bitrate: Option<String>,
    /// Container of the selected source variant
    pub source_container: Option<String>,
}

impl ConversionOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            start_time: None,
            end_time: None,
            audio_bitrate: None,
            source_container: None,
        }
    }

    pub fn with_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_audio_bitrate(mut self, bitrate: Option<String>) -> Self {
        self.audio_bitrate = bitrate;
        self
    }

    pub fn with_source_container(mut self, container: Option<String>) -> Self {
        self.source_container = container;
        self
    }

    /// Seconds to seek on the input before decoding
    pub fn seek(&self) -> Option<f64> {
        self.start_time
    }

    /// Output length in seconds: `end - start`, never the absolute end.
    pub fn duration(&self) -> Option<f64> {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
        .duration()
    }

    /// Video outputs whose source already uses the target container are re-muxed.
    fn can_copy_streams(&self) -> bool {
        !self.format.is_audio_only()
            && self
                .source_container
                .as_deref()
                .map_or(false, |c| c.eq_ignore_ascii_case(self.format.as_str()))
    }

    fn muxer(&self) -> &'static str {
        match self.format {
            OutputFormat::M4a => "ipod",
            other => other.as_str(),
        }
    }

    fn codec_args(&self) -> Vec<&'static str> {
        if self.can_copy_streams() {
            return vec!["-c", "copy"];
        }
        match self.format {
            OutputFormat::Mp3 => vec!["-c:a", "libmp3lame"],
            OutputFormat::Wav => vec!["-c:a", "pcm_s16le"],
            OutputFormat::M4a => vec!["-c:a", "aac"],
            OutputFormat::Mp4 => vec!["-c:v", "libx264", "-preset", "veryfast", "-c:a", "aac"],
            OutputFormat::Webm => vec!["-c:v", "libvpx-vp9", "-deadline", "realtime", "-c:a", "libopus"],
            OutputFormat::Avi => vec!["-c:v", "mpeg4", "-c:a", "libmp3lame"],
        }
    }

    /// Translate the options into an ffmpeg command line reading stdin and writing stdout.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(start) = self.seek() {
            args.push("-ss".to_string());
            args.push(format_seconds(start));
        }

        args.push("-i".to_string());
        args.push("pipe:0".to_string());

        if let Some(duration) = self.duration() {
            args.push("-t".to_string());
            args.push(format_seconds(duration));
        }

        if self.format.is_audio_only() {
            args.push("-vn".to_string());
        }

        args.extend(self.codec_args().into_iter().map(String::from));

        if self.format.is_audio_only() {
            if let Some(bitrate) = &self.audio_bitrate {
                args.push("-b:a".to_string());
                args.push(bitrate.clone());
            }
        }

        args.push("-f".to_string());
        args.push(self.muxer().to_string());

        // mp4 family needs a seekable output unless fragmented
        if matches!(self.format, OutputFormat::Mp4 | OutputFormat::M4a) {
            args.push("-movflags".to_string());
            args.push("frag_keyframe+empty_moov".to_string());
        }

        args.push("pipe:1".to_string());
        args
    }
}

fn format_seconds(seconds: f64) -> String {
    let rounded = (seconds * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

/// Transcoder backed by the ffmpeg binary
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
}

impl FfmpegTranscoder {
    pub fn new(override_path: Option<&str>) -> Self {
        Self {
            ffmpeg_path: find_binary("ffmpeg", override_path),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn transcode(
        &self,
        mut input: ByteStream,
        options: &ConversionOptions,
    ) -> Result<ByteStream, DownloadError> {
        let args = options.ffmpeg_args();
        info!(format = %options.format, args = %args.join(" "), "Starting ffmpeg");

        let mut child = TokioCommand::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    DownloadError::ToolNotFound(self.ffmpeg_path.clone())
                }
                _ => DownloadError::Transcode(format!("Failed to start ffmpeg: {}", e)),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DownloadError::Transcode("Failed to capture ffmpeg stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Transcode("Failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Transcode("Failed to capture ffmpeg stderr".to_string()))?;

        // Source -> stdin. Only source failures are errors: ffmpeg closes its
        // stdin early once a `-t` window is satisfied.
        let feeder = tokio::spawn(async move {
            while let Some(chunk) = input.next().await {
                let chunk = chunk?;
                if let Err(e) = stdin.write_all(&chunk).await {
                    debug!(error = %e, "ffmpeg stopped reading input");
                    return Ok(());
                }
            }
            let _ = stdin.shutdown().await;
            Ok::<(), std::io::Error>(())
        });

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let (tx, rx) = mpsc::channel::<Result<bytes::Bytes, std::io::Error>>(8);

        tokio::spawn(async move {
            let mut output = ReaderStream::new(stdout);
            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        debug!("Client disconnected, stopping ffmpeg");
                        let _ = child.kill().await;
                        feeder.abort();
                        return;
                    }
                    chunk = output.next() => chunk,
                };

                match next {
                    Some(Ok(bytes)) => {
                        if tx.send(Ok(bytes)).await.is_err() {
                            let _ = child.kill().await;
                            feeder.abort();
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Failed to read ffmpeg output");
                        let _ = child.kill().await;
                        feeder.abort();
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                    None => break,
                }
            }

            let status = child.wait().await;
            let fed = feeder.await;
            let stderr_tail = stderr_task.await.unwrap_or_default();

            let failure = match (status, fed) {
                (_, Ok(Err(e))) => Some(format!("input stream failed: {}", e)),
                (Ok(status), _) if !status.success() => {
                    Some(format!("ffmpeg exited with {}: {}", status, stderr_tail))
                }
                (Err(e), _) => Some(format!("failed to wait for ffmpeg: {}", e)),
                _ => None,
            };

            match failure {
                Some(message) => {
                    error!(error = %message, "Conversion failed");
                    let _ = tx
                        .send(Err(std::io::Error::other(DownloadError::Transcode(message))))
                        .await;
                }
                None => debug!("ffmpeg finished"),
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}
