//! Streaming delivery of decoded record batches
//!
//! [`RecordBatchStream`] adapts the transport's raw byte chunks (the sink
//! side) into decoded record batches (the source side). It is handed to the
//! caller before any network activity happens: the request is only sent once
//! the stream is first polled, so no emission can be lost to a wiring race.
//!
//! The stream is pull-based. The connection is read only while the caller
//! polls, which is the flow-control equivalent of pause/resume: stop polling
//! to pause, poll again to resume, drop the stream to abort the request.

use crate::errors::{ExportError, Result};
use crate::framing::decoder::{decode_chunk, Record};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

enum StreamState {
    /// Request not yet sent; the future resolves to the response headers
    Connecting(BoxFuture<'static, Result<reqwest::Response>>),

    /// Response body being consumed chunk by chunk
    Reading(BoxStream<'static, Result<Bytes>>),

    /// Terminated: body finished, an error was emitted, or the caller saw
    /// the final flush
    Done,
}

/// Stream of decoded record batches, one `Ok` batch per transport chunk.
///
/// A chunk that completes no record still yields an empty batch; its bytes
/// are carried as the remainder into the next step. After any `Err` item the
/// stream is spent and yields `None`.
pub struct RecordBatchStream {
    state: StreamState,
    remainder: String,
    utf8_tail: Vec<u8>,
}

impl RecordBatchStream {
    /// Build a stream that sends `request` on first poll
    pub(crate) fn from_request(request: reqwest::RequestBuilder) -> Self {
        let connect: BoxFuture<'static, Result<reqwest::Response>> = Box::pin(async move {
            request
                .send()
                .await
                .map_err(|e| ExportError::Connection(e.to_string()))
        });
        Self {
            state: StreamState::Connecting(connect),
            remainder: String::new(),
            utf8_tail: Vec::new(),
        }
    }

    #[cfg(test)]
    fn from_chunks(chunks: BoxStream<'static, Result<Bytes>>) -> Self {
        Self {
            state: StreamState::Reading(chunks),
            remainder: String::new(),
            utf8_tail: Vec::new(),
        }
    }
}

/// Decode the UTF-8 text completed by `held + bytes`.
///
/// Transport chunks are cut at byte boundaries, not character boundaries, so
/// a multi-byte character can be split across chunks. An incomplete trailing
/// sequence (at most three bytes) is written back into `held` for the next
/// chunk; a sequence that can never complete is a parse failure.
fn decode_utf8_prefix(held: &mut Vec<u8>, bytes: &[u8]) -> Result<String> {
    let mut buf = mem::take(held);
    buf.extend_from_slice(bytes);

    match String::from_utf8(buf) {
        Ok(text) => Ok(text),
        Err(e) => {
            let utf8_error = e.utf8_error();
            if utf8_error.error_len().is_some() {
                return Err(ExportError::Parse(
                    "response body is not valid UTF-8".to_string(),
                ));
            }
            let mut buf = e.into_bytes();
            *held = buf.split_off(utf8_error.valid_up_to());
            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
    }
}

impl Stream for RecordBatchStream {
    type Item = Result<Vec<Record>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                StreamState::Connecting(connect) => match connect.as_mut().poll(cx) {
                    Poll::Ready(Ok(response)) => {
                        let chunks = response
                            .bytes_stream()
                            .map(|chunk| {
                                chunk.map_err(|e| ExportError::Connection(e.to_string()))
                            })
                            .boxed();
                        this.state = StreamState::Reading(chunks);
                    }
                    Poll::Ready(Err(e)) => {
                        this.state = StreamState::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                },

                StreamState::Reading(chunks) => match chunks.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(bytes))) => {
                        let chunk = match decode_utf8_prefix(&mut this.utf8_tail, &bytes) {
                            Ok(chunk) => chunk,
                            Err(e) => {
                                this.state = StreamState::Done;
                                return Poll::Ready(Some(Err(e)));
                            }
                        };
                        match decode_chunk(&this.remainder, &chunk) {
                            Ok(batch) => {
                                this.remainder = batch.remainder;
                                return Poll::Ready(Some(Ok(batch.records)));
                            }
                            Err(e) => {
                                this.state = StreamState::Done;
                                return Poll::Ready(Some(Err(e)));
                            }
                        }
                    }
                    Poll::Ready(Some(Err(e))) => {
                        this.state = StreamState::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(None) => {
                        this.state = StreamState::Done;
                        if !this.utf8_tail.is_empty() {
                            return Poll::Ready(Some(Err(ExportError::Parse(
                                "truncated UTF-8 sequence at end of response body".to_string(),
                            ))));
                        }
                        if this.remainder.is_empty() {
                            return Poll::Ready(None);
                        }
                        // The wire format allows the final record to arrive
                        // without its trailing newline; at end of body the
                        // held fragment is complete and must be flushed
                        let tail = mem::take(&mut this.remainder);
                        return match decode_chunk(&tail, "\n") {
                            Ok(batch) if batch.records.is_empty() => Poll::Ready(None),
                            Ok(batch) => Poll::Ready(Some(Ok(batch.records))),
                            Err(e) => Poll::Ready(Some(Err(e))),
                        };
                    }
                    Poll::Pending => return Poll::Pending,
                },

                StreamState::Done => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde_json::json;

    fn chunk_stream(chunks: Vec<Result<&'static str>>) -> RecordBatchStream {
        let items = chunks
            .into_iter()
            .map(|c| c.map(Bytes::from))
            .collect::<Vec<_>>();
        RecordBatchStream::from_chunks(stream::iter(items).boxed())
    }

    #[tokio::test]
    async fn test_partial_record_spans_chunks() {
        let mut s = chunk_stream(vec![Ok("{\"a\":1"), Ok("}\n{\"b\":2}\n")]);

        let batch1 = s.next().await.unwrap().unwrap();
        assert!(batch1.is_empty());

        let batch2 = s.next().await.unwrap().unwrap();
        assert_eq!(batch2, vec![json!({"a": 1}), json!({"b": 2})]);

        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_final_record_without_newline_is_flushed() {
        let mut s = chunk_stream(vec![Ok("{\"a\":1}\n{\"b\":"), Ok("2}")]);

        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"a": 1})]);
        assert!(s.next().await.unwrap().unwrap().is_empty());
        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"b": 2})]);
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_tail_fails_at_end_of_body() {
        let mut s = chunk_stream(vec![Ok("{\"a\":1}\n{trunc")]);

        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"a": 1})]);
        assert!(matches!(
            s.next().await,
            Some(Err(ExportError::Parse(_)))
        ));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_service_fault_ends_stream() {
        let mut s = chunk_stream(vec![
            Ok("{\"error\":\"X\",\"code\":123}\n"),
            Ok("{\"never\":\"delivered\"}\n"),
        ]);

        match s.next().await {
            Some(Err(ExportError::Service { message, code })) => {
                assert_eq!(message, "X");
                assert_eq!(code, 123);
            }
            other => panic!("expected service error, got {:?}", other),
        }
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream() {
        let mut s = chunk_stream(vec![
            Ok("{\"a\":1}\n"),
            Err(ExportError::Connection("connection reset".to_string())),
        ]);

        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"a": 1})]);
        assert!(matches!(
            s.next().await,
            Some(Err(ExportError::Connection(_)))
        ));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_body_yields_no_batches() {
        let mut s = chunk_stream(vec![]);
        assert!(s.next().await.is_none());
    }

    fn byte_chunk_stream(chunks: Vec<&'static [u8]>) -> RecordBatchStream {
        let items = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect::<Vec<_>>();
        RecordBatchStream::from_chunks(stream::iter(items).boxed())
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        // "é" is C3 A9 on the wire; the transport may cut between the bytes.
        // The record must come out intact, exactly as buffered decoding of
        // the whole body would produce it.
        let mut s = byte_chunk_stream(vec![b"{\"name\":\"Ren\xC3", b"\xA9\"}\n"]);

        assert!(s.next().await.unwrap().unwrap().is_empty());
        assert_eq!(
            s.next().await.unwrap().unwrap(),
            vec![json!({"name": "René"})]
        );
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_multibyte_char_split_after_newline() {
        // Split point right after a record boundary: the held byte belongs
        // to the next record, not the completed one
        let mut s = byte_chunk_stream(vec![b"{\"a\":1}\n{\"b\":\"\xE2\x82", b"\xAC\"}\n"]);

        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"a": 1})]);
        assert_eq!(
            s.next().await.unwrap().unwrap(),
            vec![json!({"b": "€"})]
        );
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_parse_error() {
        // 0xFF can never start a UTF-8 sequence
        let mut s = byte_chunk_stream(vec![b"{\"a\":1}\n", b"\xFF{\"b\":2}\n"]);

        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"a": 1})]);
        assert!(matches!(
            s.next().await,
            Some(Err(ExportError::Parse(_)))
        ));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_truncated_multibyte_char_at_end_of_body() {
        let mut s = byte_chunk_stream(vec![b"{\"a\":1}\n\"\xC3"]);

        assert_eq!(s.next().await.unwrap().unwrap(), vec![json!({"a": 1})]);
        assert!(matches!(
            s.next().await,
            Some(Err(ExportError::Parse(_)))
        ));
        assert!(s.next().await.is_none());
    }
}
