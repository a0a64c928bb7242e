use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::AsyncRead;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::io::StreamReader;

use super::event::{ProtocolEvent, decode_frame};

/// Message surfaced when the transport fails mid-stream.
pub const TRANSPORT_ERROR_MESSAGE: &str =
    "Lost connection to the analysis service. Please try again.";

/// Decodes `data:` frames from a line-oriented reader into protocol events.
///
/// Undecodable frames are skipped, including lines that are not UTF-8.
/// A read failure yields one terminal
/// `Error` event. The stream ends after the first terminal event even if the
/// transport keeps sending.
pub struct FrameStream<R> {
    lines: FramedRead<R, AnyDelimiterCodec>,
    finished: bool,
}

impl<R: AsyncRead> FrameStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: FramedRead::new(
                reader,
                AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new()),
            ),
            finished: false,
        }
    }
}

impl<S, E> FrameStream<StreamReader<S, Bytes>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<std::io::Error>,
{
    /// Adapts a byte-chunk stream (e.g. an HTTP body).
    pub fn from_byte_stream(stream: S) -> Self {
        Self::new(StreamReader::new(stream))
    }
}

impl<R> Stream for FrameStream<R>
where
    R: AsyncRead + Unpin,
{
    type Item = ProtocolEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            let line = match Pin::new(&mut self.lines).poll_next(cx) {
                Poll::Ready(Some(Ok(line))) => line,
                Poll::Ready(Some(Err(err))) => {
                    tracing::warn!("Event stream read failed: {err}");
                    self.finished = true;
                    return Poll::Ready(Some(ProtocolEvent::error(TRANSPORT_ERROR_MESSAGE)));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            };

            let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
            let Ok(line) = std::str::from_utf8(line) else {
                tracing::debug!("Skipping frame: line is not valid UTF-8");
                continue;
            };

            match decode_frame(line) {
                Ok(Some(event)) => {
                    if event.is_terminal() {
                        self.finished = true;
                    }
                    return Poll::Ready(Some(event));
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(kind = %err.kind, "Skipping frame: {err}");
                }
            }
        }
    }
}
