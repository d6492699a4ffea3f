use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;

use super::mode::OpenMode;

/// A seekable byte source/sink that can also be cut to length.
///
/// Rewriting the header on close requires seeking back over data already
/// written, so append-only sinks cannot implement this.
pub trait ByteStream: Read + Write + Seek {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl ByteStream for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl ByteStream for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}

impl<T: ByteStream + ?Sized> ByteStream for &mut T {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }
}

/// Open the file at `path` with the access `mode` requires.
pub fn open_file<P: AsRef<Path>>(path: P, mode: &OpenMode) -> io::Result<File> {
    mode.open_options().open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_truncate() {
        let mut c = Cursor::new(vec![1u8, 2, 3, 4]);
        c.truncate(2).unwrap();
        assert_eq!(c.get_ref(), &vec![1u8, 2]);
        c.truncate(3).unwrap();
        assert_eq!(c.get_ref(), &vec![1u8, 2, 0]);
    }

    #[test]
    fn test_file_truncate() {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(&[0u8; 10]).unwrap();
        ByteStream::truncate(&mut f, 4).unwrap();
        assert_eq!(f.metadata().unwrap().len(), 4);
    }
}
