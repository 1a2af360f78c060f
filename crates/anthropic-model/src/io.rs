//! Byte-level plumbing for streamed responses.

mod sse;

#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

pub use sse::Sse;

/// Reading the response body failed.
#[derive(Debug, PartialEq, Eq)]
pub struct ChunksError(pub String);

/// A source of body chunks, either a live response or canned bytes.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Canned(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn canned(chunks: &[&'static [u8]]) -> Self {
        Chunks::Canned(chunks.iter().copied().map(Bytes::from_static).collect())
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, ChunksError> {
        match self {
            Chunks::Response(response) => response
                .chunk()
                .await
                .map_err(|err| ChunksError(err.to_string())),
            #[cfg(test)]
            Chunks::Canned(chunks) => Ok(chunks.pop_front()),
        }
    }
}
