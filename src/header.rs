use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::LittleEndian;
use byteorder::WriteBytesExt;

use super::chunks::WriteWaveChunks;
use super::errors::Error;
use super::fmt::FormatSpec;
use super::fourcc::{WriteFourCC, DATA_SIG, FACT_SIG, FMT__SIG, RIFF_SIG, WAVE_SIG};
use super::parser::ChunkLayout;

/// File offsets of the header fields that depend on the data length.
///
/// The RIFF size field is always at offset 4.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeaderFields {
    /// Start of the `fact` payload, its first four bytes are the frame count
    pub fact_count_pos: Option<u64>,

    /// Start of the `data` payload, its size field is the 4 bytes before
    pub data_start: u64,
}

impl HeaderFields {
    /// Fields of a header already on disk.
    pub fn from_layout(layout: &ChunkLayout) -> Self {
        HeaderFields {
            fact_count_pos: layout.fact_start,
            data_start: layout.data_start,
        }
    }

    /// Fields of the header `synthesize_header` writes for `format`.
    pub fn for_format(format: &FormatSpec) -> Self {
        let fmt_end = 12 + 8 + format.to_wave_fmt().chunk_size() as u64;
        let (fact_count_pos, fact_end) = if format.format_code().has_fact_chunk() {
            (Some(fmt_end + 8), fmt_end + 12)
        } else {
            (None, fmt_end)
        };
        HeaderFields {
            fact_count_pos,
            data_start: fact_end + 8,
        }
    }

    pub fn data_size_pos(&self) -> u64 {
        self.data_start - 4
    }
}

/// A synthesized header: every byte before the first sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub bytes: Vec<u8>,
    pub fields: HeaderFields,
}

/// Length of the even padding after a data payload of `data_length` bytes.
pub fn data_padding(data_length: u64) -> u64 {
    data_length % 2
}

/// The RIFF form size for a file whose data chunk is last.
pub fn riff_form_size(data_start: u64, data_length: u64) -> Result<u32, Error> {
    let size = (data_start - 8)
        .checked_add(data_length)
        .and_then(|s| s.checked_add(data_padding(data_length)));
    match size {
        Some(size) if size <= u32::MAX as u64 => Ok(size as u32),
        _ => Err(Error::InvalidParameter {
            reason: "data exceeds the RIFF 4 GiB limit",
        }),
    }
}

/// Build the header for `format` with `data_length` bytes of samples.
///
/// The result depends on nothing else, so synthesizing twice with the same
/// inputs gives identical bytes.
///
/// ```
/// use wavio::{synthesize_header, FormatSpec};
///
/// let header = synthesize_header(&FormatSpec::default(), 400).unwrap();
/// assert_eq!(header.bytes.len(), 44);
/// assert_eq!(&header.bytes[0..4], b"RIFF");
/// assert_eq!(&header.bytes[4..8], &436u32.to_le_bytes());
/// assert_eq!(&header.bytes[40..44], &400u32.to_le_bytes());
/// ```
pub fn synthesize_header(format: &FormatSpec, data_length: u64) -> Result<Header, Error> {
    let fields = HeaderFields::for_format(format);
    let riff_size = riff_form_size(fields.data_start, data_length)?;
    let wave_fmt = format.to_wave_fmt();

    let mut cursor = Cursor::new(Vec::with_capacity(fields.data_start as usize));
    cursor.write_fourcc(RIFF_SIG)?;
    cursor.write_u32::<LittleEndian>(riff_size)?;
    cursor.write_fourcc(WAVE_SIG)?;

    cursor.write_fourcc(FMT__SIG)?;
    cursor.write_u32::<LittleEndian>(wave_fmt.chunk_size())?;
    cursor.write_wave_fmt(&wave_fmt)?;

    if fields.fact_count_pos.is_some() {
        cursor.write_fourcc(FACT_SIG)?;
        cursor.write_u32::<LittleEndian>(4)?;
        cursor.write_u32::<LittleEndian>(frame_count(format, data_length))?;
    }

    cursor.write_fourcc(DATA_SIG)?;
    cursor.write_u32::<LittleEndian>(data_length as u32)?;

    Ok(Header {
        bytes: cursor.into_inner(),
        fields,
    })
}

fn frame_count(format: &FormatSpec, data_length: u64) -> u32 {
    (data_length / format.frame_size() as u64) as u32
}

pub trait WriteHeaderFields: Write + Seek {
    /// Rewrite only the length-dependent fields of a header on disk.
    fn write_size_fields(
        &mut self,
        fields: &HeaderFields,
        format: &FormatSpec,
        data_length: u64,
    ) -> Result<(), Error>;
}

impl<T> WriteHeaderFields for T
where
    T: Write + Seek,
{
    fn write_size_fields(
        &mut self,
        fields: &HeaderFields,
        format: &FormatSpec,
        data_length: u64,
    ) -> Result<(), Error> {
        let riff_size = riff_form_size(fields.data_start, data_length)?;

        self.seek(SeekFrom::Start(4))?;
        self.write_u32::<LittleEndian>(riff_size)?;

        if let Some(pos) = fields.fact_count_pos {
            self.seek(SeekFrom::Start(pos))?;
            self.write_u32::<LittleEndian>(frame_count(format, data_length))?;
        }

        self.seek(SeekFrom::Start(fields.data_size_pos()))?;
        self.write_u32::<LittleEndian>(data_length as u32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_format::FormatCode;
    use crate::parser::scan_layout;

    #[test]
    fn test_layout_sizes() {
        let pcm = FormatSpec::default();
        assert_eq!(synthesize_header(&pcm, 0).unwrap().bytes.len(), 44);

        let float = FormatSpec::new(FormatCode::IeeeFloat, 1, 48000, 4).unwrap();
        let header = synthesize_header(&float, 0).unwrap();
        assert_eq!(header.bytes.len(), 44 + 12);
        assert_eq!(&header.bytes[36..40], b"fact");

        let mulaw = FormatSpec::new(FormatCode::MuLaw, 1, 8000, 1).unwrap();
        let header = synthesize_header(&mulaw, 0).unwrap();
        assert_eq!(header.bytes.len(), 46 + 12);
        assert_eq!(&header.bytes[16..20], &18u32.to_le_bytes());

        let ext = FormatSpec::new(FormatCode::Extensible, 4, 48000, 3).unwrap();
        let header = synthesize_header(&ext, 0).unwrap();
        assert_eq!(header.bytes.len(), 68 + 12);
        assert_eq!(header.fields.data_start, 80);
        assert_eq!(header.fields.fact_count_pos, Some(68));
    }

    #[test]
    fn test_idempotent() {
        let ext = FormatSpec::new(FormatCode::Extensible, 2, 96000, 4).unwrap();
        let a = synthesize_header(&ext, 1024).unwrap();
        let b = synthesize_header(&ext, 1024).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_odd_padding() {
        let mono8 = FormatSpec::new(FormatCode::Pcm, 1, 8000, 1).unwrap();
        let header = synthesize_header(&mono8, 3).unwrap();
        assert_eq!(&header.bytes[4..8], &(36u32 + 4).to_le_bytes());
        assert_eq!(&header.bytes[40..44], &3u32.to_le_bytes());
    }

    #[test]
    fn test_fact_count() {
        let float = FormatSpec::new(FormatCode::IeeeFloat, 2, 48000, 4).unwrap();
        let header = synthesize_header(&float, 80).unwrap();
        assert_eq!(&header.bytes[44..48], &10u32.to_le_bytes());
    }

    #[test]
    fn test_size_fields_match_synthesis() {
        let float = FormatSpec::new(FormatCode::IeeeFloat, 2, 48000, 4).unwrap();
        let mut stream = Cursor::new(synthesize_header(&float, 0).unwrap().bytes);
        stream.get_mut().extend_from_slice(&[0u8; 16]);

        let layout = scan_layout(&mut stream).unwrap();
        let fields = HeaderFields::from_layout(&layout);
        assert_eq!(fields, HeaderFields::for_format(&float));

        stream.write_size_fields(&fields, &float, 16).unwrap();
        let expected = synthesize_header(&float, 16).unwrap().bytes;
        assert_eq!(&stream.get_ref()[..expected.len()], expected.as_slice());
    }

    #[test]
    fn test_too_large() {
        assert!(riff_form_size(44, u32::MAX as u64).is_err());
        assert!(riff_form_size(44, u64::MAX).is_err());
        assert_eq!(riff_form_size(44, u32::MAX as u64 - 37).unwrap(), u32::MAX - 1);
    }
}
