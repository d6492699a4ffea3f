pub use dasp_sample::I24;

use byteorder::{ByteOrder, LittleEndian};

/// A sample type that can be moved to and from little-endian file bytes.
///
/// The byte width of the type must equal the file's sample size for the
/// typed transfer methods of `WavFile`. No conversion between encodings is
/// done; `dasp_sample::Sample` is available for that.
pub trait Sample: dasp_sample::Sample + Copy {
    /// Bytes per sample on disk.
    const SIZE: usize;

    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(self, bytes: &mut [u8]);
}

impl Sample for u8 {
    const SIZE: usize = 1;

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }
}

impl Sample for i16 {
    const SIZE: usize = 2;

    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_i16(bytes)
    }

    fn write_le(self, bytes: &mut [u8]) {
        LittleEndian::write_i16(bytes, self)
    }
}

impl Sample for I24 {
    const SIZE: usize = 3;

    fn read_le(bytes: &[u8]) -> Self {
        I24::new_unchecked(LittleEndian::read_i24(bytes))
    }

    fn write_le(self, bytes: &mut [u8]) {
        LittleEndian::write_i24(bytes, self.inner())
    }
}

impl Sample for i32 {
    const SIZE: usize = 4;

    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_i32(bytes)
    }

    fn write_le(self, bytes: &mut [u8]) {
        LittleEndian::write_i32(bytes, self)
    }
}

impl Sample for f32 {
    const SIZE: usize = 4;

    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_f32(bytes)
    }

    fn write_le(self, bytes: &mut [u8]) {
        LittleEndian::write_f32(bytes, self)
    }
}

impl Sample for f64 {
    const SIZE: usize = 8;

    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_f64(bytes)
    }

    fn write_le(self, bytes: &mut [u8]) {
        LittleEndian::write_f64(bytes, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i24() {
        let mut buf = [0u8; 3];
        I24::new_unchecked(-2).write_le(&mut buf);
        assert_eq!(buf, [0xfe, 0xff, 0xff]);
        assert_eq!(I24::read_le(&buf).inner(), -2);
    }

    #[test]
    fn test_widths() {
        let mut buf = [0u8; 8];
        0x1234i16.write_le(&mut buf);
        assert_eq!(&buf[..2], &[0x34, 0x12]);
        1.5f64.write_le(&mut buf);
        assert_eq!(f64::read_le(&buf), 1.5);
        assert_eq!(<f32 as Sample>::SIZE, 4);
    }
}
