//! DXF group-code stream reader
//!
//! Reads the two-lines-per-pair ASCII form.  Leading whitespace on the code
//! line and trailing carriage returns are tolerated; non-UTF8 bytes fall
//! back to a configured encoding, or Latin-1 when none is set.

use crate::error::{CamError, Result};
use encoding_rs::Encoding;
use std::io::{BufReader, Read};

/// A DXF code/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CodePair {
    /// The group code.
    pub code: i32,
    /// The raw value line, stored losslessly as a string.
    pub value: String,
}

impl CodePair {
    /// Create a new code/value pair.
    pub fn new(code: i32, value: impl Into<String>) -> Self {
        CodePair {
            code,
            value: value.into(),
        }
    }
}

/// Streaming reader over DXF code/value pairs.
pub struct CodePairReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    peeked: Option<CodePair>,
    /// Non-UTF8 fallback encoding.  `None` means Latin-1 (byte-to-char).
    encoding: Option<&'static Encoding>,
}

impl<R: Read> CodePairReader<R> {
    /// Create a new pair reader.
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            line_number: 0,
            peeked: None,
            encoding: None,
        }
    }

    /// Set the fallback encoding for non-UTF8 value lines.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = Some(encoding);
    }

    /// Line number of the most recently read line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read a single line, handling non-UTF8 bytes gracefully.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut bytes = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.reader.read(&mut byte) {
                Ok(0) => {
                    if bytes.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    bytes.push(byte[0]);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.line_number += 1;

        let line = match String::from_utf8(bytes.clone()) {
            Ok(s) => s,
            Err(_) => {
                if let Some(enc) = self.encoding {
                    let (decoded, _, _) = enc.decode(&bytes);
                    decoded.into_owned()
                } else {
                    // Latin-1 maps bytes 0-255 onto code points 1:1
                    bytes.iter().map(|&b| b as char).collect()
                }
            }
        };

        Ok(Some(line.trim().to_string()))
    }

    /// Read the next code/value pair.
    pub fn read_pair(&mut self) -> Result<Option<CodePair>> {
        if let Some(pair) = self.peeked.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.read_line()? {
            Some(line) => line,
            None => return Ok(None),
        };

        let code = code_line.parse::<i32>().map_err(|_| {
            CamError::Parse(format!(
                "invalid group code at line {}: '{}'",
                self.line_number, code_line
            ))
        })?;

        let value = match self.read_line()? {
            Some(line) => line,
            None => {
                return Err(CamError::Parse(format!(
                    "unexpected EOF after group code {} at line {}",
                    code, self.line_number
                )))
            }
        };

        Ok(Some(CodePair::new(code, value)))
    }

    /// Peek at the next code without consuming the pair.
    pub fn peek_code(&mut self) -> Result<Option<i32>> {
        if let Some(ref pair) = self.peeked {
            return Ok(Some(pair.code));
        }
        if let Some(pair) = self.read_pair()? {
            let code = pair.code;
            self.peeked = Some(pair);
            Ok(Some(code))
        } else {
            Ok(None)
        }
    }

    /// Push a pair back to be returned by the next `read_pair`.
    pub fn push_back(&mut self, pair: CodePair) {
        self.peeked = Some(pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &str) -> CodePairReader<Cursor<Vec<u8>>> {
        CodePairReader::new(Cursor::new(data.as_bytes().to_vec()))
    }

    #[test]
    fn test_read_simple_pair() {
        let mut r = reader("0\nSECTION\n");
        let pair = r.read_pair().unwrap().unwrap();
        assert_eq!(pair.code, 0);
        assert_eq!(pair.value, "SECTION");
        assert!(r.read_pair().unwrap().is_none());
    }

    #[test]
    fn test_whitespace_tolerance() {
        let mut r = reader("  0\r\nSECTION\r\n 10\n1.5\r\n");
        assert_eq!(r.read_pair().unwrap().unwrap(), CodePair::new(0, "SECTION"));
        assert_eq!(r.read_pair().unwrap().unwrap(), CodePair::new(10, "1.5"));
    }

    #[test]
    fn test_bad_code_line() {
        let mut r = reader("SECTION\n0\n");
        assert!(matches!(r.read_pair(), Err(CamError::Parse(_))));
    }

    #[test]
    fn test_truncated_pair() {
        let mut r = reader("0\n");
        assert!(matches!(r.read_pair(), Err(CamError::Parse(_))));
    }

    #[test]
    fn test_peek_and_push_back() {
        let mut r = reader("0\nSECTION\n2\nHEADER\n");
        assert_eq!(r.peek_code().unwrap(), Some(0));
        let pair = r.read_pair().unwrap().unwrap();
        assert_eq!(pair.code, 0);
        assert_eq!(r.peek_code().unwrap(), Some(2));
        let next = r.read_pair().unwrap().unwrap();
        r.push_back(next.clone());
        assert_eq!(r.read_pair().unwrap().unwrap(), next);
    }

    #[test]
    fn test_latin1_fallback() {
        let mut data: Vec<u8> = b"1\n".to_vec();
        data.extend([0xE4, b'\n']); // ä in Latin-1, invalid UTF-8
        let mut r = CodePairReader::new(Cursor::new(data));
        let pair = r.read_pair().unwrap().unwrap();
        assert_eq!(pair.value, "\u{e4}");
    }
}
