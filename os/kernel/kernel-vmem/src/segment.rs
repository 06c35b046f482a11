//! Segment loader contract.
//!
//! The executable loader is outside the VM core. What the fault path needs
//! from it is a file it can read byte ranges from; [`load_page`] turns such a
//! range into the initial contents of one page.

use crate::LoadError;
use alloc::vec::Vec;

/// A random-access byte source backing a loaded segment.
pub trait SegmentFile: Send + Sync {
    /// Read up to `buf.len()` bytes at `offset`, returning how many were read.
    /// Fewer bytes than requested means end of file.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, LoadError>;
}

impl SegmentFile for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, LoadError> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        let Some(src) = self.get(start..) else {
            return Ok(0);
        };
        let n = src.len().min(buf.len());
        buf[..n].copy_from_slice(&src[..n]);
        Ok(n)
    }
}

impl SegmentFile for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, LoadError> {
        self.as_slice().read_at(offset, buf)
    }
}

/// Fill `dest` with `file_len` bytes read from `file` at `offset` and zero
/// the remaining `dest.len() - file_len` bytes.
///
/// # Errors
/// [`LoadError::ShortRead`] if the file holds fewer than `file_len` bytes at
/// `offset`; any error `file` reports is passed through.
pub fn load_page(
    file: &dyn SegmentFile,
    offset: u64,
    dest: &mut [u8],
    file_len: usize,
) -> Result<(), LoadError> {
    let file_len = file_len.min(dest.len());
    let (data, rest) = dest.split_at_mut(file_len);
    rest.fill(0);

    let mut done = 0;
    while done < file_len {
        let n = file.read_at(offset + done as u64, &mut data[done..])?;
        if n == 0 {
            return Err(LoadError::ShortRead {
                expected: file_len,
                read: done,
            });
        }
        done += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn loads_prefix_and_zero_fills_rest() {
        let file: Vec<u8> = (0..=255).collect();
        let mut page = [0xAA_u8; 64];
        load_page(&file, 16, &mut page, 8).unwrap();
        assert_eq!(&page[..8], &[16, 17, 18, 19, 20, 21, 22, 23]);
        assert!(page[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn short_file_is_an_error() {
        let file = vec![1_u8; 10];
        let mut page = [0_u8; 32];
        let err = load_page(&file, 4, &mut page, 16).unwrap_err();
        assert_eq!(err, LoadError::ShortRead { expected: 16, read: 6 });
    }

    #[test]
    fn zero_length_reads_nothing() {
        struct Failing;
        impl SegmentFile for Failing {
            fn read_at(&self, _: u64, _: &mut [u8]) -> Result<usize, LoadError> {
                Err(LoadError::Io)
            }
        }

        let mut page = [7_u8; 16];
        load_page(&Failing, 0, &mut page, 0).unwrap();
        assert_eq!(page, [0; 16]);
        assert_eq!(load_page(&Failing, 0, &mut page, 1), Err(LoadError::Io));
    }
}
