//! Decimal parsing of write buffers, following the kernel's `kstrtou32_from_user`.

use crate::error::ParseError;

///The kernel copies at most this many bytes of a write before parsing:
///sign, 32 binary digits, newline (the terminator slot is not copied).
pub const MAX_PARSE_LEN: usize = 1 + 32 + 1;

///Parse a write buffer as an unsigned 32 bit decimal.
///
/// Accepts an optional leading `+`, at least one digit and an optional single trailing newline.
/// Bytes past `MAX_PARSE_LEN` are never looked at and a NUL byte ends the text.
pub fn parse_u32(buf: &[u8]) -> Result<u32, ParseError> {
    let buf = &buf[..buf.len().min(MAX_PARSE_LEN)];
    let text = match buf.iter().position(|b| *b == 0) {
        Some(nul) => &buf[..nul],
        None => buf,
    };

    let text = text.strip_prefix(b"+").unwrap_or(text);

    let mut value: u64 = 0;
    let mut overflow = false;
    let mut digits = 0;
    for b in text.iter().take_while(|b| b.is_ascii_digit()) {
        digits += 1;
        //keep consuming digits after an overflow so trailing junk is still detected as a range error
        match value.checked_mul(10).and_then(|v| v.checked_add(u64::from(b - b'0'))) {
            Some(v) => value = v,
            None => overflow = true,
        }
    }

    if overflow {
        return Err(ParseError::OutOfRange);
    }
    if digits == 0 {
        return Err(ParseError::Invalid);
    }

    let rest = &text[digits..];
    let rest = rest.strip_prefix(b"\n").unwrap_or(rest);
    if !rest.is_empty() {
        return Err(ParseError::Invalid);
    }

    u32::try_from(value).map_err(|_| ParseError::OutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_values() {
        assert_eq!(parse_u32(b"0"), Ok(0));
        assert_eq!(parse_u32(b"10"), Ok(10));
        assert_eq!(parse_u32(b"4294967295"), Ok(u32::MAX));
        assert_eq!(parse_u32(b"007"), Ok(7));
    }

    #[test]
    fn test_sign_and_newline() {
        assert_eq!(parse_u32(b"+5"), Ok(5));
        assert_eq!(parse_u32(b"5\n"), Ok(5));
        assert_eq!(parse_u32(b"+5\n"), Ok(5));
        assert_eq!(parse_u32(b"5\n\n"), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"-5"), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"++5"), Err(ParseError::Invalid));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_u32(b""), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"\n"), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"abc"), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b" 5"), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"5 "), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"0x10"), Err(ParseError::Invalid));
        assert_eq!(parse_u32(b"1.5"), Err(ParseError::Invalid));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(parse_u32(b"4294967296"), Err(ParseError::OutOfRange));
        assert_eq!(parse_u32(b"99999999999999999999"), Err(ParseError::OutOfRange));
        //a u64 overflow is reported before the trailing junk
        assert_eq!(parse_u32(b"99999999999999999999x"), Err(ParseError::OutOfRange));
    }

    #[test]
    fn test_nul_terminates() {
        assert_eq!(parse_u32(b"12\0junk"), Ok(12));
        assert_eq!(parse_u32(b"\012"), Err(ParseError::Invalid));
    }

    #[test]
    fn test_only_prefix_is_parsed() {
        //34 zeros then a 7: the 7 is never seen
        let mut buf = vec![b'0'; MAX_PARSE_LEN];
        buf.push(b'7');
        assert_eq!(parse_u32(&buf), Ok(0));

        //junk past the limit is ignored as well
        let mut buf = vec![b'0'; MAX_PARSE_LEN - 1];
        buf.push(b'\n');
        buf.extend_from_slice(b"trailing");
        assert_eq!(parse_u32(&buf), Ok(0));
    }
}
