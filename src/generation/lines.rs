//! Line framing for streamed HTTP bodies (SSE and newline-delimited JSON).

use bytes::Bytes;
use futures_util::Stream;

use super::GenerationError;

/// Splits a raw byte stream into trimmed, non-empty lines.
///
/// A trailing line without a newline is emitted when the body ends.
pub fn body_lines(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String, GenerationError>> + Send {
    async_stream::stream! {
        use futures_util::StreamExt;

        let mut byte_stream = std::pin::pin!(byte_stream);
        let mut buffer = String::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(GenerationError::Network(format!("stream error: {e}")));
                    return;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line: String = buffer.drain(..=line_end).collect();
                let line = line.trim();
                if !line.is_empty() {
                    yield Ok(line.to_string());
                }
            }
        }

        let rest = buffer.trim();
        if !rest.is_empty() {
            yield Ok(rest.to_string());
        }
    }
}
