//! Framed channel halves with LSP header framing.
//!
//! LSP uses a simple framing protocol over a byte stream:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! The reader and writer halves are separate types so the session can hand
//! the read side to its demultiplexing thread while the write side stays
//! behind a mutex on the send path.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use super::error::TransportError;

/// Writes LSP-framed messages to the outbound half of the channel.
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Creates a writer half over the given byte sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Sends one LSP-framed message, flushing it completely.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Io` if writing to the channel fails.
    pub fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let header = format!("Content-Length: {}\r\n\r\n", message.len());
        self.writer.write_all(header.as_bytes())?;
        self.writer.write_all(message)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads LSP-framed messages from the inbound half of the channel.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Creates a reader half over the given byte source.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Receives one LSP-framed message (blocks until complete).
    ///
    /// # Errors
    ///
    /// Returns `TransportError::MissingContentLength` if no Content-Length
    /// header is found, and `TransportError::Io` if reading fails or the
    /// channel closes mid-message.
    pub fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let content_length = self.read_headers()?;
        let mut content = vec![0u8; content_length];
        self.reader.read_exact(&mut content)?;
        Ok(content)
    }

    /// Reads headers and extracts the Content-Length value.
    fn read_headers(&mut self) -> Result<usize, TransportError> {
        let mut content_length: Option<usize> = None;

        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line)?;
            if bytes_read == 0 {
                // EOF reached
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed while reading headers",
                )));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                // Empty line marks end of headers
                break;
            }

            if let Some(value) = trimmed.strip_prefix("Content-Length: ") {
                content_length = Some(value.parse().map_err(|_| TransportError::InvalidHeader)?);
            }
            // Ignore other headers (e.g. Content-Type)
        }

        content_length.ok_or(TransportError::MissingContentLength)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn written_bytes(writer: FrameWriter<Vec<u8>>) -> Vec<u8> {
        writer.writer.into_inner().expect("flush failed")
    }

    #[rstest]
    fn sends_lsp_framed_message() {
        let mut writer = FrameWriter::new(Vec::new());

        writer.send(b"test payload").expect("send failed");

        let written = String::from_utf8(written_bytes(writer)).expect("invalid utf8");
        assert!(written.starts_with("Content-Length: 12\r\n\r\n"));
        assert!(written.ends_with("test payload"));
    }

    #[rstest]
    fn sends_empty_message() {
        let mut writer = FrameWriter::new(Vec::new());

        writer.send(b"").expect("send failed");

        let written = String::from_utf8(written_bytes(writer)).expect("invalid utf8");
        assert_eq!(written, "Content-Length: 0\r\n\r\n");
    }

    #[rstest]
    fn receives_lsp_framed_message() {
        let input = b"Content-Length: 5\r\n\r\nhello";
        let mut reader = FrameReader::new(Cursor::new(input.to_vec()));

        let received = reader.receive().expect("receive failed");

        assert_eq!(received, b"hello");
    }

    #[rstest]
    fn receives_message_with_multiple_headers() {
        let input = b"Content-Length: 4\r\nContent-Type: application/json\r\n\r\ntest";
        let mut reader = FrameReader::new(Cursor::new(input.to_vec()));

        let received = reader.receive().expect("receive failed");

        assert_eq!(received, b"test");
    }

    #[rstest]
    fn handles_missing_content_length() {
        let input = b"Content-Type: application/json\r\n\r\ntest";
        let mut reader = FrameReader::new(Cursor::new(input.to_vec()));

        let result = reader.receive();

        assert!(matches!(result, Err(TransportError::MissingContentLength)));
    }

    #[rstest]
    fn handles_invalid_content_length() {
        let input = b"Content-Length: invalid\r\n\r\ntest";
        let mut reader = FrameReader::new(Cursor::new(input.to_vec()));

        let result = reader.receive();

        assert!(matches!(result, Err(TransportError::InvalidHeader)));
    }

    #[rstest]
    fn handles_eof_during_headers() {
        let input = b"Content-Length: 10";
        let mut reader = FrameReader::new(Cursor::new(input.to_vec()));

        let result = reader.receive();

        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    #[rstest]
    fn round_trips_json_message() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"test"}"#;
        let mut writer = FrameWriter::new(Vec::new());

        writer.send(json.as_bytes()).expect("send failed");

        let mut reader = FrameReader::new(Cursor::new(written_bytes(writer)));
        let received = reader.receive().expect("receive failed");

        assert_eq!(received, json.as_bytes());
    }
}
