use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::AiError;
use crate::Result;

// ─── Utf8Decoder ──────────────────────────────────────────────────────────

/// Incremental UTF-8 decoder. A multi-byte character split across two
/// network chunks is held back until its remaining bytes arrive; invalid
/// sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete tail; wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is left; a truncated character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

// ─── InsightStream ────────────────────────────────────────────────────────

/// Text chunks of a streamed provider reply.
///
/// A background task owns the HTTP response and forwards decoded text over
/// an mpsc channel. [`InsightStream::cancel`] aborts that task, which drops
/// the in-flight request; the stream then ends. Dropping the stream does
/// the same.
pub struct InsightStream {
    rx: mpsc::Receiver<Result<String>>,
    task: JoinHandle<()>,
}

impl InsightStream {
    /// Run `start` on a background task and forward the byte stream it
    /// resolves to as decoded text.
    pub fn spawn<F, S, E>(start: F) -> Self
    where
        F: Future<Output = Result<S>> + Send + 'static,
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<AiError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(async move {
            let source = match start.await {
                Ok(s) => s,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            let mut source = std::pin::pin!(source);
            let mut decoder = Utf8Decoder::default();
            while let Some(chunk) = source.next().await {
                let item = match chunk {
                    Ok(bytes) => Ok(decoder.push(&bytes)),
                    Err(e) => Err(e.into()),
                };
                let failed = item.is_err();
                match item {
                    Ok(text) if text.is_empty() => continue,
                    item => {
                        if tx.send(item).await.is_err() {
                            return; // Receiver dropped
                        }
                    }
                }
                if failed {
                    return;
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                let _ = tx.send(Ok(tail)).await;
            }
        });
        Self { rx, task }
    }

    /// Abort the in-flight request. Chunks already buffered are still
    /// yielded; nothing new arrives afterwards.
    pub fn cancel(&self) {
        tracing::debug!("insight stream cancelled");
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Stream for InsightStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for InsightStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ─── InsightBuffer ────────────────────────────────────────────────────────

/// Accumulates streamed text and publishes every growing snapshot. The
/// watch channel holds the only copy of the text.
pub struct InsightBuffer {
    tx: watch::Sender<String>,
}

impl InsightBuffer {
    pub fn new() -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(String::new());
        (Self { tx }, rx)
    }

    pub fn push(&mut self, chunk: &str) {
        self.tx.send_modify(|text| text.push_str(chunk));
    }

    pub fn text(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Drain `stream` into the buffer and return the full text. The first
    /// error stops consumption; text received so far stays published.
    pub async fn consume(mut self, mut stream: InsightStream) -> Result<String> {
        while let Some(chunk) = stream.next().await {
            self.push(&chunk?);
        }
        Ok(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn from_chunks(chunks: Vec<&'static [u8]>) -> InsightStream {
        InsightStream::spawn(async move {
            Ok(stream::iter(
                chunks
                    .into_iter()
                    .map(|c| Ok::<_, AiError>(Bytes::from_static(c))),
            ))
        })
    }

    #[test]
    fn decoder_joins_split_characters() {
        let mut d = Utf8Decoder::default();
        let bytes = "héllo".as_bytes();
        // 'é' is two bytes at index 1..3; split inside it.
        assert_eq!(d.push(&bytes[..2]), "h");
        assert_eq!(d.push(&bytes[2..]), "éllo");
        assert_eq!(d.finish(), "");
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut d = Utf8Decoder::default();
        assert_eq!(d.push(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(d.push(b"\xe2\x82"), "");
        assert_eq!(d.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn stream_yields_decoded_text() {
        let s = from_chunks(vec![&b"Risk "[..], &b"\xe2\x80"[..], &b"\x94 low"[..]]);
        let parts: Vec<String> = s.map(|r| r.unwrap()).collect().await;
        assert_eq!(parts.concat(), "Risk \u{2014} low");
    }

    #[tokio::test]
    async fn start_failure_is_yielded_once() {
        let mut s = InsightStream::spawn(async {
            Err::<stream::Empty<std::result::Result<Bytes, AiError>>, _>(AiError::NotConfigured)
        });
        assert!(matches!(s.next().await, Some(Err(AiError::NotConfigured))));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn cancel_ends_a_pending_stream() {
        let mut s = InsightStream::spawn(async {
            Ok(stream::pending::<std::result::Result<Bytes, AiError>>())
        });
        s.cancel();
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn buffer_publishes_snapshots() {
        let (buf, rx) = InsightBuffer::new();
        let text = buf
            .consume(from_chunks(vec![&b"one "[..], &b"two"[..]]))
            .await
            .unwrap();
        assert_eq!(text, "one two");
        assert_eq!(*rx.borrow(), "one two");
    }

    #[test]
    fn push_publishes_each_snapshot() {
        let (mut buf, mut rx) = InsightBuffer::new();
        buf.push("Risks ");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "Risks ");
        buf.push("look fine.");
        assert_eq!(*rx.borrow_and_update(), "Risks look fine.");
        assert_eq!(buf.text(), "Risks look fine.");
    }
}
