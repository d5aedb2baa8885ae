use nom::bytes::complete::take;
use nom::number::complete::{be_u32, be_u64, le_u32, le_u64};
use nom::{IResult, Parser};
use serde::Serialize;

/// Byte order of the integers stored in a binary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Most significant byte first (fat headers, PowerPC slices).
    Big,
    /// Least significant byte first (Intel and ARM slices).
    Little,
}

impl ByteOrder {
    pub(crate) fn u32(self, input: &[u8]) -> IResult<&[u8], u32> {
        match self {
            ByteOrder::Big => be_u32(input),
            ByteOrder::Little => le_u32(input),
        }
    }

    pub(crate) fn i32(self, input: &[u8]) -> IResult<&[u8], i32> {
        let (input, value) = self.u32(input)?;
        Ok((input, value as i32))
    }

    pub(crate) fn u64(self, input: &[u8]) -> IResult<&[u8], u64> {
        match self {
            ByteOrder::Big => be_u64(input),
            ByteOrder::Little => le_u64(input),
        }
    }

    #[cfg(any(test, feature = "test_tools"))]
    pub(crate) fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }

    #[cfg(any(test, feature = "test_tools"))]
    pub(crate) fn u64_bytes(self, value: u64) -> [u8; 8] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }
}

pub(crate) fn fixed_bytes(input: &[u8], count: usize) -> IResult<&[u8], &[u8]> {
    take(count).parse(input)
}

/// Read a NUL terminated string, stopping at the end of `bytes` if there is no terminator.
pub(crate) fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_integers_in_both_orders() {
        let bytes = [0xca, 0xfe, 0xba, 0xbe, 0x01];

        assert_eq!(0xcafe_babe, ByteOrder::Big.u32(&bytes).unwrap().1);
        assert_eq!(0xbeba_feca, ByteOrder::Little.u32(&bytes).unwrap().1);
        assert_eq!(&[0x01], ByteOrder::Big.u32(&bytes).unwrap().0);
    }

    #[test]
    fn reading_past_the_end_fails() {
        ByteOrder::Little.u64(&[0; 7]).unwrap_err();
        fixed_bytes(&[0; 3], 4).unwrap_err();
    }

    #[test]
    fn c_string_stops_at_nul_or_end() {
        assert_eq!("__TEXT", c_string(b"__TEXT\0\0\0\0\0\0\0\0\0\0"));
        assert_eq!("abc", c_string(b"abc"));
        assert_eq!("", c_string(b"\0abc"));
    }
}
