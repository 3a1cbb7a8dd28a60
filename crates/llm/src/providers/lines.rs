//! Line re-assembly for chunked HTTP bodies.
//!
//! Network reads do not respect record boundaries: a single NDJSON object or
//! SSE `data:` line may arrive split across two reads, or several may arrive
//! in one. This turns a byte stream into a stream of complete, trimmed,
//! non-empty lines.

use docent_core::{AppError, AppResult};
use futures::{Stream, StreamExt};

pub(crate) fn line_stream<S, B, E>(byte_stream: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::unfold(
        (byte_stream, Vec::<u8>::with_capacity(8192), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    let line = String::from_utf8_lossy(&line_bytes).trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    return Some((Ok(line), (stream, buffer, false)));
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        let err = AppError::Llm(format!("Stream error: {}", e));
                        return Some((Err(err), (stream, buffer, true)));
                    }
                    None => {
                        // Trailing record without a newline
                        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
                        buffer.clear();
                        if rest.is_empty() {
                            return None;
                        }
                        return Some((Ok(rest), (stream, buffer, true)));
                    }
                }
            }
        },
    )
}
