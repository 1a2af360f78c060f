use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field of each event is surfaced. Event names, ids and
/// comments are skipped, since every payload names its own type.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    /// Returns the data of the next event that carries any.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // An event may already be sitting in the buffer.
            if let Some(data) = self.try_parse_event()? {
                return Ok(Some(data));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::Chunks)?
            else {
                // A trailing partial event is dropped.
                return Ok(None);
            };
            self.buf.extend_from_slice(&bytes);
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // For `end-of-line`, we only handle line feed.
        //
        // event         = *( comment / field ) end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        // comment       = colon *any-char end-of-line
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let block = self.buf.drain(..end + 2).collect::<Vec<_>>();
            // Chunks may split a character, so decode whole events only.
            let Ok(block) = str::from_utf8(&block[..end]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.lines() {
                if line.starts_with(':') {
                    continue;
                }
                let Some((name, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                if name == "data" {
                    match &mut data {
                        Some(data) => {
                            data.push('\n');
                            data.push_str(value);
                        }
                        None => data = Some(value.to_owned()),
                    }
                }
            }

            if data.is_some() {
                return Ok(data);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_named_events() {
        let chunks = Chunks::canned(&[
            b"event: message_start\ndata: hello\n\n",
            b": keep-alive\n\nevent: ping\ndata: bye\n\n",
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_chunks() {
        let chunks = Chunks::canned(&[
            b"data:",
            b" caf\xc3",
            b"\xa9\n",
            b"data: au lait\n",
            b"\n",
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(
            sse.next_event().await.unwrap().unwrap(),
            "caf\u{e9}\nau lait"
        );
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let chunks = Chunks::canned(&[b"xxxxxx\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let chunks = Chunks::canned(&[b"data: \xff\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let chunks = Chunks::canned(&[b"data: hello\n", b"data: bye\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);
    }
}
