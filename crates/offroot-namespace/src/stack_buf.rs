//! Fixed-capacity formatting buffer for use after `clone` and before `exec`

use std::ffi::CStr;
use std::fmt;

/// A byte buffer on the stack that implements [`fmt::Write`].
///
/// Writes past the capacity fail with [`fmt::Error`] instead of growing.
/// One byte is always kept free for the NUL terminator added by
/// [`StackBuf::as_cstr`].
pub struct StackBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> StackBuf<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        let end = self.len.checked_add(bytes.len()).ok_or(fmt::Error)?;
        if end >= N {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// NUL-terminate the contents and view them as a C string.
    ///
    /// Returns `None` if the contents already hold an interior NUL.
    pub fn as_cstr(&mut self) -> Option<&CStr> {
        self.buf[self.len] = 0;
        CStr::from_bytes_with_nul(&self.buf[..=self.len]).ok()
    }
}

impl<const N: usize> Default for StackBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for StackBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn formats_numbers_in_place() {
        let mut buf = StackBuf::<32>::new();
        write!(buf, "/proc/{}/uid_map", 4242).unwrap();
        assert_eq!(buf.as_bytes(), b"/proc/4242/uid_map");
        assert_eq!(buf.as_cstr().unwrap().to_bytes(), b"/proc/4242/uid_map");
    }

    #[test]
    fn rejects_overflow_and_keeps_room_for_nul() {
        let mut buf = StackBuf::<4>::new();
        assert!(buf.push_bytes(b"abc").is_ok());
        assert!(buf.push_bytes(b"d").is_err());
        assert_eq!(buf.len(), 3);
        assert!(buf.as_cstr().is_some());
    }

    #[test]
    fn interior_nul_is_not_a_cstr() {
        let mut buf = StackBuf::<8>::new();
        buf.push_bytes(b"a\0b").unwrap();
        assert!(buf.as_cstr().is_none());
    }

    #[test]
    fn starts_empty() {
        let buf = StackBuf::<8>::default();
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes(), b"");
    }
}
