/// Forward-only token cursor over a scene buffer
///
/// Tokens are separated by spaces, carriage returns and line feeds. Every
/// read consumes the token and the whitespace after it, so the cursor always
/// rests on the first byte of the next token (or at the end of input).
use nom::{
    bytes::complete::{tag, take, take_till, take_while},
    character::complete::i64 as leading_i64,
    number::complete::float as leading_float,
    sequence::{delimited, terminated},
    IResult,
};

use crate::config::NumericMode;
use crate::error::{FormatError, FormatResult};

fn is_space(c: u8) -> bool {
    c == b' ' || c == b'\r' || c == b'\n'
}

fn spaces(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(is_space)(input)
}

fn token(input: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(take_till(is_space), spaces)(input)
}

fn quoted(input: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(
        delimited(tag("\""), take_till(|c| c == b'"'), tag("\"")),
        spaces,
    )(input)
}

fn blob(input: &[u8], len: usize) -> IResult<&[u8], &[u8]> {
    terminated(take(len), spaces)(input)
}

/// Cursor over a text buffer with embedded binary blobs
#[derive(Debug, Clone)]
pub struct Stream<'a> {
    input: &'a [u8],
    numeric_mode: NumericMode,
}

impl<'a> Stream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_numeric_mode(data, NumericMode::Strict)
    }

    pub fn with_numeric_mode(data: &'a [u8], numeric_mode: NumericMode) -> Self {
        // Leading whitespace is never part of a token.
        let input = match spaces(data) {
            Ok((rest, _)) => rest,
            Err(_) => data,
        };
        Self {
            input,
            numeric_mode,
        }
    }

    /// Whether any input remains
    pub fn pending(&self) -> bool {
        !self.input.is_empty()
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Read one whitespace-delimited token
    pub fn read_token(&mut self) -> FormatResult<&'a str> {
        if !self.pending() {
            return Err(FormatError::UnexpectedEof);
        }
        let (rest, raw) = token(self.input).map_err(|_| FormatError::UnexpectedEof)?;
        self.input = rest;
        std::str::from_utf8(raw).map_err(|_| FormatError::InvalidUtf8)
    }

    /// Read a token, or a double-quoted string that may contain spaces
    pub fn read_string(&mut self) -> FormatResult<&'a str> {
        if self.input.first() != Some(&b'"') {
            return self.read_token();
        }
        let (rest, raw) = quoted(self.input).map_err(|_| FormatError::UnexpectedEof)?;
        self.input = rest;
        std::str::from_utf8(raw).map_err(|_| FormatError::InvalidUtf8)
    }

    /// Consume exactly `len` raw bytes
    pub fn read_blob(&mut self, len: usize) -> FormatResult<&'a [u8]> {
        let (rest, raw) = blob(self.input, len).map_err(|_| FormatError::UnexpectedEof)?;
        self.input = rest;
        Ok(raw)
    }

    /// Read a token and check it matches `expected`
    pub fn expect_token(&mut self, expected: &'static str) -> FormatResult<()> {
        let found = self.read_token()?;
        if found == expected {
            Ok(())
        } else {
            Err(FormatError::UnexpectedToken {
                expected,
                found: found.to_string(),
            })
        }
    }

    pub fn read_integer(&mut self) -> FormatResult<i64> {
        let token = self.read_token()?;
        match (parse_integer(token), self.numeric_mode) {
            (Some(value), _) => Ok(value),
            (None, NumericMode::Lenient) => Ok(lenient_integer(token)),
            (None, NumericMode::Strict) => Err(FormatError::NumericParse {
                token: token.to_string(),
            }),
        }
    }

    /// Read a non-negative integer used as a count or an index
    pub fn read_count(&mut self) -> FormatResult<usize> {
        let value = self.read_integer()?;
        usize::try_from(value).map_err(|_| FormatError::NumericParse {
            token: value.to_string(),
        })
    }

    pub fn read_float(&mut self) -> FormatResult<f32> {
        let token = self.read_token()?;
        match (token.parse::<f32>(), self.numeric_mode) {
            (Ok(value), NumericMode::Lenient) => Ok(value),
            (Err(_), NumericMode::Lenient) => Ok(lenient_float(token)),
            // `nan` and `inf` spellings parse, but are never valid coordinates.
            (Ok(value), NumericMode::Strict) if value.is_finite() => Ok(value),
            (_, NumericMode::Strict) => Err(FormatError::NumericParse {
                token: token.to_string(),
            }),
        }
    }

    /// Read `N` consecutive floats
    pub fn read_vector<const N: usize>(&mut self) -> FormatResult<[f32; N]> {
        let mut vector = [0.0; N];
        for value in &mut vector {
            *value = self.read_float()?;
        }
        Ok(vector)
    }
}

/// Decimal or `0x`-prefixed hexadecimal integer, optionally signed
fn parse_integer(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Longest numeric prefix, or 0
fn lenient_integer(token: &str) -> i64 {
    leading_i64::<_, nom::error::Error<&str>>(token)
        .map(|(_, value)| value)
        .unwrap_or(0)
}

/// Longest numeric prefix, or NaN
fn lenient_float(token: &str) -> f32 {
    leading_float::<_, nom::error::Error<&str>>(token)
        .map(|(_, value)| value)
        .unwrap_or(f32::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_whitespace() {
        let mut stream = Stream::new(b"  AC3Db\r\nMATERIAL  \"red paint\" rgb\n");
        assert_eq!(stream.read_token().unwrap(), "AC3Db");
        assert_eq!(stream.read_token().unwrap(), "MATERIAL");
        assert_eq!(stream.read_string().unwrap(), "red paint");
        assert_eq!(stream.read_string().unwrap(), "rgb");
        assert!(!stream.pending());
        assert_eq!(stream.read_token(), Err(FormatError::UnexpectedEof));
    }

    #[test]
    fn test_unterminated_quote() {
        let mut stream = Stream::new(b"\"no end");
        assert_eq!(stream.read_string(), Err(FormatError::UnexpectedEof));
    }

    #[test]
    fn test_blob_is_raw() {
        let mut stream = Stream::new(b"data 5\nab \ncd\nkids 0\n");
        stream.expect_token("data").unwrap();
        let len = stream.read_count().unwrap();
        assert_eq!(stream.read_blob(len).unwrap(), b"ab \nc");
        assert_eq!(stream.read_token().unwrap(), "d");
        stream.expect_token("kids").unwrap();
        assert_eq!(stream.read_integer().unwrap(), 0);
    }

    #[test]
    fn test_blob_past_end() {
        let mut stream = Stream::new(b"abc");
        assert_eq!(stream.read_blob(10), Err(FormatError::UnexpectedEof));
    }

    #[test]
    fn test_numbers() {
        let mut stream = Stream::new(b"0x30 -7 1.5 -2e1 0.25 0 1");
        assert_eq!(stream.read_integer().unwrap(), 0x30);
        assert_eq!(stream.read_integer().unwrap(), -7);
        assert_eq!(stream.read_float().unwrap(), 1.5);
        assert_eq!(stream.read_float().unwrap(), -20.0);
        assert_eq!(stream.read_vector::<3>().unwrap(), [0.25, 0.0, 1.0]);
    }

    #[test]
    fn test_strict_numeric_error() {
        let mut stream = Stream::new(b"abc 1.2.3");
        assert_eq!(
            stream.read_integer(),
            Err(FormatError::NumericParse {
                token: "abc".to_string()
            })
        );
        assert!(matches!(
            stream.read_float(),
            Err(FormatError::NumericParse { .. })
        ));
    }

    #[test]
    fn test_strict_rejects_non_finite() {
        let mut stream = Stream::new(b"nan NaN inf -infinity 1e40");
        for _ in 0..5 {
            assert!(matches!(
                stream.read_float(),
                Err(FormatError::NumericParse { .. })
            ));
        }

        let mut stream = Stream::with_numeric_mode(b"NaN inf", NumericMode::Lenient);
        assert!(stream.read_float().unwrap().is_nan());
        assert_eq!(stream.read_float().unwrap(), f32::INFINITY);
    }

    #[test]
    fn test_lenient_numbers() {
        let mut stream = Stream::with_numeric_mode(b"12abc abc 3.5x abc", NumericMode::Lenient);
        assert_eq!(stream.read_integer().unwrap(), 12);
        assert_eq!(stream.read_integer().unwrap(), 0);
        assert_eq!(stream.read_float().unwrap(), 3.5);
        assert!(stream.read_float().unwrap().is_nan());
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut stream = Stream::new(b"-1");
        assert!(stream.read_count().is_err());
    }

    #[test]
    fn test_expect_token_mismatch() {
        let mut stream = Stream::new(b"amb 0 0 0");
        assert_eq!(
            stream.expect_token("rgb"),
            Err(FormatError::UnexpectedToken {
                expected: "rgb",
                found: "amb".to_string()
            })
        );
    }
}
