//! Bounds-checked cursor over raw container bytes.

use anyhow::{Result, bail};

pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Reader<'a> {
        Reader { data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(
                "truncated: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            );
        }
        let res = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(res)
    }

    pub fn byte(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn word(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.bytes(2)?.try_into()?))
    }

    pub fn dword(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.bytes(4)?.try_into()?))
    }

    /// One byte below 0xFF, otherwise the 0xFF escape plus a word.
    pub fn extended_byte(&mut self) -> Result<u16> {
        match self.byte()? {
            0xFF => self.word(),
            b => Ok(b as u16),
        }
    }

    /// NUL-terminated byte string; the terminator is consumed.
    pub fn string(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        match self.data[self.pos..].iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos = start + end + 1;
                Ok(self.data[start..start + end].to_vec())
            }
            None => bail!("unterminated string at offset {start}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reads() {
        let mut r = Reader::new(&[0x01, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(r.byte().unwrap(), 0x01);
        assert_eq!(r.word().unwrap(), 0x1234);
        assert_eq!(r.dword().unwrap(), 0xDEADBEEF);
        assert!(r.at_end());
        assert!(r.byte().is_err());
    }

    #[test]
    fn test_extended_byte() {
        let mut r = Reader::new(&[0x07, 0xFF, 0xFF, 0x00, 0xFF, 0x34, 0x12]);
        assert_eq!(r.extended_byte().unwrap(), 7);
        assert_eq!(r.extended_byte().unwrap(), 0xFF);
        assert_eq!(r.extended_byte().unwrap(), 0x1234);
    }

    #[test]
    fn test_string() {
        let mut r = Reader::new(b"abc\0\0rest");
        assert_eq!(r.string().unwrap(), b"abc");
        assert_eq!(r.string().unwrap(), b"");
        assert!(r.string().is_err(), "no terminator left");
    }

    #[test]
    fn test_truncation_reports_offset() {
        let mut r = Reader::new(&[1, 2]);
        r.byte().unwrap();
        let err = r.dword().unwrap_err().to_string();
        assert!(err.contains("offset 1"), "got: {err}");
    }
}
