use std::pin::Pin;

use futures::{Stream, StreamExt};
use ragchat_core::RequestError;

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, RequestError>> + Send>>;

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two reads is held back until the
/// rest of it arrives. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next block, returning all text that is complete so far
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        let mut consumed = 0;

        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    consumed += rest.len();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(REPLACEMENT);
                            consumed += valid + invalid;
                        }
                        // incomplete trailing sequence, wait for more bytes
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        out
    }

    /// Flush at end of input. A dangling partial character becomes U+FFFD.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            self.pending.clear();
            Some(REPLACEMENT.to_string())
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Lazy, finite, non-restartable sequence of text chunks from a chat response.
///
/// Pull with [`ChatStream::next_chunk`]; `Ok(None)` means the transport
/// finished. After an error or the end, every further pull returns `Ok(None)`.
pub struct ChatStream {
    inner: Option<ByteStream>,
    decoder: Utf8Decoder,
}

impl ChatStream {
    /// Wrap any byte stream
    pub fn from_byte_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, RequestError>> + Send + 'static,
    {
        Self {
            inner: Some(Box::pin(stream)),
            decoder: Utf8Decoder::new(),
        }
    }

    /// A stream that yields the given text pieces in order
    pub fn from_text_chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let blocks: Vec<Result<Vec<u8>, RequestError>> = chunks
            .into_iter()
            .map(|c| Ok(c.into().into_bytes()))
            .collect();
        Self::from_byte_stream(futures::stream::iter(blocks))
    }

    /// Pull the next decoded chunk
    pub async fn next_chunk(&mut self) -> Result<Option<String>, RequestError> {
        loop {
            let Some(inner) = self.inner.as_mut() else {
                return Ok(None);
            };

            match inner.next().await {
                Some(Ok(bytes)) => {
                    let text = self.decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                }
                Some(Err(err)) => {
                    self.inner = None;
                    self.decoder = Utf8Decoder::new();
                    return Err(err);
                }
                None => {
                    self.inner = None;
                    return Ok(self.decoder.finish());
                }
            }
        }
    }

    /// Drain the whole stream into one string
    pub async fn collect_text(mut self) -> Result<String, RequestError> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            text.push_str(&chunk);
        }
        Ok(text)
    }

    /// Adapt into a `futures::Stream` of chunks
    pub fn into_stream(self) -> impl Stream<Item = Result<String, RequestError>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            match stream.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), stream)),
                Ok(None) => None,
                Err(err) => Some((Err(err), stream)),
            }
        })
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("finished", &self.inner.is_none())
            .field("decoder", &self.decoder)
            .finish()
    }
}
