use std::io::{Read, Write};

use byteorder::LittleEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use super::errors::Error;
use super::fmt::{WaveFmt, WaveFmtExtended};

pub trait ReadWaveChunks: Read {
    /// Read a `fmt ` payload of `size` bytes (16, 18 or 40).
    fn read_wave_fmt(&mut self, size: u32) -> Result<WaveFmt, Error>;
}

pub trait WriteWaveChunks: Write {
    fn write_wave_fmt(&mut self, format: &WaveFmt) -> Result<(), Error>;
}

impl<T> ReadWaveChunks for T
where
    T: Read,
{
    fn read_wave_fmt(&mut self, size: u32) -> Result<WaveFmt, Error> {
        if size != 16 && size != 18 && size != 40 {
            return Err(Error::InvalidFmtSize { size });
        }

        let mut fmt = WaveFmt {
            tag: self.read_u16::<LittleEndian>()?,
            channel_count: self.read_u16::<LittleEndian>()?,
            sample_rate: self.read_u32::<LittleEndian>()?,
            bytes_per_second: self.read_u32::<LittleEndian>()?,
            block_alignment: self.read_u16::<LittleEndian>()?,
            bits_per_sample: self.read_u16::<LittleEndian>()?,
            extra_size: None,
            extended_format: None,
        };

        if size >= 18 {
            fmt.extra_size = Some(self.read_u16::<LittleEndian>()?);
        }

        if size == 40 {
            let valid_bits_per_sample = self.read_u16::<LittleEndian>()?;
            let channel_mask = self.read_u32::<LittleEndian>()?;
            let mut guid = [0u8; 16];
            self.read_exact(&mut guid)?;
            fmt.extended_format = Some(WaveFmtExtended {
                valid_bits_per_sample,
                channel_mask,
                type_guid: Uuid::from_bytes(guid),
            });
        }

        Ok(fmt)
    }
}

impl<T> WriteWaveChunks for T
where
    T: Write,
{
    fn write_wave_fmt(&mut self, format: &WaveFmt) -> Result<(), Error> {
        self.write_u16::<LittleEndian>(format.tag)?;
        self.write_u16::<LittleEndian>(format.channel_count)?;
        self.write_u32::<LittleEndian>(format.sample_rate)?;
        self.write_u32::<LittleEndian>(format.bytes_per_second)?;
        self.write_u16::<LittleEndian>(format.block_alignment)?;
        self.write_u16::<LittleEndian>(format.bits_per_sample)?;

        if let Some(extra_size) = format.extra_size {
            self.write_u16::<LittleEndian>(extra_size)?;
        }

        if let Some(ext) = format.extended_format {
            self.write_u16::<LittleEndian>(ext.valid_bits_per_sample)?;
            self.write_u32::<LittleEndian>(ext.channel_mask)?;
            self.write_all(ext.type_guid.as_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_format::FormatCode;
    use crate::fmt::FormatSpec;
    use std::io::Cursor;

    #[test]
    fn test_fmt_layout_bytes() {
        let spec = FormatSpec::new(FormatCode::Pcm, 2, 44100, 2).unwrap();
        let mut buf = vec![];
        buf.write_wave_fmt(&spec.to_wave_fmt()).unwrap();
        assert_eq!(
            buf,
            vec![
                0x01, 0x00, 0x02, 0x00, 0x44, 0xac, 0x00, 0x00, 0x10, 0xb1, 0x02, 0x00, 0x04, 0x00,
                0x10, 0x00
            ]
        );
    }

    #[test]
    fn test_extensible_read_back() {
        let spec = FormatSpec::new(FormatCode::Extensible, 6, 48000, 3)
            .and_then(|s| s.with_valid_bits_per_sample(20))
            .unwrap();
        let mut buf = vec![];
        buf.write_wave_fmt(&spec.to_wave_fmt()).unwrap();
        assert_eq!(buf.len(), 40);

        let fmt = Cursor::new(&buf).read_wave_fmt(40).unwrap();
        assert_eq!(fmt.extra_size, Some(22));
        assert_eq!(FormatSpec::from_wave_fmt(&fmt).unwrap(), spec);
    }

    #[test]
    fn test_unknown_size() {
        match Cursor::new(vec![0u8; 20]).read_wave_fmt(20) {
            Err(Error::InvalidFmtSize { size: 20 }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
