use std::io::{Error, ErrorKind, Result};

/// Random-access, read-only view of a firmware image.
pub trait ReadAt {
    /// Fill `buf` with the bytes starting at `offset`, or fail if the range runs off the end.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()>;

    fn read_vec_at(&self, len: usize, offset: u64) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.read_exact_at(&mut out, offset)?;
        Ok(out)
    }
}

/// The part of `b` covering `len` bytes at `offset`, checked before anything is copied or allocated.
fn window(b: &[u8], len: usize, offset: u64) -> Result<&[u8]> {
    let start = usize::try_from(offset).map_err(|_| Error::new(ErrorKind::InvalidInput, "offset too large"))?;
    start.checked_add(len).and_then(|end| b.get(start..end)).ok_or_else(|| {
        Error::new(
            ErrorKind::UnexpectedEof,
            format!("read of {} bytes at {:08x} exceeds image size {:08x}", len, offset, b.len()),
        )
    })
}

impl ReadAt for [u8] {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        buf.copy_from_slice(window(self, buf.len(), offset)?);
        Ok(())
    }

    fn read_vec_at(&self, len: usize, offset: u64) -> Result<Vec<u8>> { Ok(window(self, len, offset)?.to_vec()) }
}

impl ReadAt for Vec<u8> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.as_slice().read_exact_at(buf, offset)
    }

    fn read_vec_at(&self, len: usize, offset: u64) -> Result<Vec<u8>> { self.as_slice().read_vec_at(len, offset) }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> { (**self).read_exact_at(buf, offset) }

    fn read_vec_at(&self, len: usize, offset: u64) -> Result<Vec<u8>> { (**self).read_vec_at(len, offset) }
}
