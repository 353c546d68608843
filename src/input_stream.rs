use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// A position in the source text. Lines and columns are 1-based, the offset
/// counts characters from the start of the (newline-normalized) input.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl std::fmt::Debug for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

// Encoding defines the way the buffer stream is read, as what defines a "character".
#[derive(PartialEq)]
pub enum Encoding {
    UTF8,
    ASCII,
}

// The confidence decides how confident we are that the input stream is of this encoding
#[derive(PartialEq)]
pub enum Confidence {
    Tentative,
    Certain,
}

/// HTML(5) input stream. The whole document is buffered up front; CR and CRLF
/// are normalized to LF before the buffer is charified, so all locations refer
/// to the normalized text.
pub struct InputStream {
    encoding: Encoding,
    pub(crate) confidence: Confidence,
    current: usize,          // Current offset of the reader (in chars)
    length: usize,           // Length (in chars) of the buffer
    src_bytes: usize,        // Length (in bytes) of the original input
    buffer: Vec<char>,       // The actual buffer stream in characters
    line_starts: Vec<usize>, // Char offsets at which each line begins
}

impl Default for InputStream {
    fn default() -> Self {
        Self::new()
    }
}

impl InputStream {
    pub fn new() -> Self {
        InputStream {
            encoding: Encoding::UTF8,
            confidence: Confidence::Tentative,
            current: 0,
            length: 0,
            src_bytes: 0,
            buffer: Vec::new(),
            line_starts: vec![0],
        }
    }

    // Returns true when the encoding encountered is defined as certain
    pub fn is_certain_encoding(&self) -> bool {
        self.confidence == Confidence::Certain
    }

    // Set the given confidence of the input stream encoding
    pub fn set_confidence(&mut self, c: Confidence) {
        self.confidence = c;
    }

    // Returns true when the stream pointer is at the end of the stream
    pub fn eof(&self) -> bool {
        self.current >= self.length
    }

    // Reset the stream reader back to the start
    pub fn reset(&mut self) {
        self.current = 0
    }

    // Seek explicit offset in the stream (based on chars)
    pub fn seek(&mut self, mut off: usize) {
        if off > self.length {
            off = self.length
        }

        self.current = off
    }

    pub fn tell(&self) -> usize {
        self.current
    }

    /// Byte length of the original (un-normalized) input.
    pub fn src_bytes(&self) -> usize {
        self.src_bytes
    }

    // Populates the current buffer with the contents of the given string s
    pub fn read_from_str(&mut self, s: &str, e: Option<Encoding>) {
        self.src_bytes = s.len();
        self.fill(s, e.unwrap_or(Encoding::UTF8));
        self.current = 0;
    }

    // Populates the current buffer with the given raw bytes. Fails when the
    // bytes are not valid for the requested encoding. Strings are decoded
    // already, so read_from_str substitutes instead of failing.
    pub fn read_from_bytes(&mut self, b: &[u8], e: Option<Encoding>) -> Result<()> {
        if e == Some(Encoding::ASCII) && !b.is_ascii() {
            return Err(Error::Encoding(
                "ascii input contains non-ascii bytes".to_string(),
            ));
        }

        let s = std::str::from_utf8(b)?;
        self.read_from_str(s, e);
        Ok(())
    }

    fn fill(&mut self, s: &str, e: Encoding) {
        self.buffer.clear();
        self.line_starts.clear();
        self.line_starts.push(0);

        let mut chars = s.chars().peekable();
        while let Some(mut ch) = chars.next() {
            if ch == '\r' {
                // CRLF and a lone CR both normalize to LF
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                ch = '\n';
            }

            if e == Encoding::ASCII && !ch.is_ascii() {
                ch = '?';
            }

            self.buffer.push(ch);
            if ch == '\n' {
                self.line_starts.push(self.buffer.len());
            }
        }

        self.length = self.buffer.len();
        self.encoding = e;
    }

    // Returns the number of characters left in the buffer
    pub(crate) fn chars_left(&self) -> usize {
        self.length - self.current
    }

    // Reads a character and increases the current pointer
    pub(crate) fn read_char(&mut self) -> Option<char> {
        if self.eof() {
            return None;
        }

        let c = self.buffer[self.current];
        self.current += 1;

        Some(c)
    }

    pub(crate) fn unread(&mut self) {
        if self.current > 0 {
            self.current -= 1;
        }
    }

    // Looks ahead in the stream without consuming. look_ahead(0) is the next
    // char that read_char() would return.
    pub(crate) fn look_ahead(&self, idx: usize) -> Option<char> {
        self.buffer.get(self.current + idx).copied()
    }

    // Returns the next up-to-len characters as a string, without consuming
    pub(crate) fn look_ahead_slice(&self, len: usize) -> String {
        let end = std::cmp::min(self.current + len, self.length);
        self.buffer[self.current..end].iter().collect()
    }

    /// Location of the next character to be read.
    pub(crate) fn location(&self) -> Location {
        self.location_of(self.current)
    }

    /// Location of the given char offset.
    pub(crate) fn location_of(&self, offset: usize) -> Location {
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        Location {
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
            offset,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stream() {
        let mut is = InputStream::new();
        assert!(is.eof());

        is.read_from_str("foo", Some(Encoding::ASCII));
        assert!(!is.eof());
        assert_eq!(is.chars_left(), 3);

        is.read_from_str("f👽f", Some(Encoding::UTF8));
        assert!(!is.eof());
        assert_eq!(is.chars_left(), 3);
        assert_eq!(is.read_char().unwrap(), 'f');
        assert_eq!(is.chars_left(), 2);
        assert_eq!(is.read_char().unwrap(), '👽');
        assert_eq!(is.chars_left(), 1);
        assert_eq!(is.read_char().unwrap(), 'f');
        assert!(is.eof());
        assert_eq!(is.chars_left(), 0);

        is.read_from_str("f👽f", Some(Encoding::ASCII));
        assert_eq!(is.read_char().unwrap(), 'f');
        assert_eq!(is.read_char().unwrap(), '?');
        assert_eq!(is.read_char().unwrap(), 'f');
        assert_eq!(is.read_char(), None);

        is.unread();
        assert_eq!(is.chars_left(), 1);
        is.unread();
        assert_eq!(is.chars_left(), 2);
    }

    #[test]
    fn test_look_ahead() {
        let mut is = InputStream::new();
        is.read_from_str("abcd", None);
        assert_eq!(is.look_ahead(0).unwrap(), 'a');
        assert_eq!(is.look_ahead(3).unwrap(), 'd');
        assert_eq!(is.look_ahead(4), None);
        assert_eq!(is.look_ahead_slice(3), "abc");
        assert_eq!(is.look_ahead_slice(9), "abcd");
        is.seek(2);
        assert_eq!(is.look_ahead(0).unwrap(), 'c');
        assert_eq!(is.look_ahead_slice(2), "cd");
    }

    #[test]
    fn test_locations() {
        let mut is = InputStream::new();
        is.read_from_str("ab\ncd\r\nef\rg", None);

        // normalized: "ab\ncd\nef\ng"
        assert_eq!(is.location(), Location::new(1, 1, 0));
        is.seek(1);
        assert_eq!(is.location(), Location::new(1, 2, 1));
        is.seek(3);
        assert_eq!(is.location(), Location::new(2, 1, 3));
        is.seek(6);
        assert_eq!(is.location(), Location::new(3, 1, 6));
        is.seek(9);
        assert_eq!(is.location(), Location::new(4, 1, 9));
        assert_eq!(is.src_bytes(), 11);
    }

    #[test]
    fn test_read_from_bytes() {
        let mut is = InputStream::new();
        assert!(is.read_from_bytes(b"hello", None).is_ok());
        assert_eq!(is.chars_left(), 5);
        assert!(is.read_from_bytes(&[0xff, 0xfe], None).is_err());
    }

    #[test]
    fn test_read_from_bytes_checks_requested_encoding() {
        let mut is = InputStream::new();
        assert!(is.read_from_bytes(b"hello", Some(Encoding::ASCII)).is_ok());

        let err = is
            .read_from_bytes("h\u{00e9}llo".as_bytes(), Some(Encoding::ASCII))
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));

        // valid utf-8 that is not ascii is still fine as utf-8
        assert!(is
            .read_from_bytes("h\u{00e9}llo".as_bytes(), Some(Encoding::UTF8))
            .is_ok());
    }

    #[test]
    fn test_certainty() {
        let mut is = InputStream::new();
        assert!(!is.is_certain_encoding());

        is.set_confidence(Confidence::Certain);
        assert!(is.is_certain_encoding());

        is.set_confidence(Confidence::Tentative);
        assert!(!is.is_certain_encoding());
    }
}
