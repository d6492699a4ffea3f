use std::fs::File;
use std::io::SeekFrom::{End, Start};
use std::io::{Seek, Write};
use std::path::Path;

use log::{debug, warn};

use super::common_format::FormatCode;
use super::errors::{Error, ErrorKind};
use super::fmt::FormatSpec;
use super::header::{
    data_padding, riff_form_size, synthesize_header, HeaderFields, WriteHeaderFields,
};
use super::mode::{Mode, OpenMode};
use super::parser::scan_layout;
use super::stream::{open_file, ByteStream};

/// Origin of a `WavFile::seek`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum State {
    /// Opening failed, no stream is held
    Invalid,
    Ready,
    Closed,
}

/// A wave file opened with stdio-like semantics.
///
/// Samples are transferred frame by frame, either as per-channel buffers
/// (`read`/`write`), interleaved frame bytes (`read_raw`/`write_raw`) or
/// typed per-channel slices (`read_samples`/`write_samples`).
///
/// Every operation returns a `Result` and also records its outcome, so
/// `error()` and `errno()` describe the last operation like `ferror` and
/// `errno` would. The header is written lazily: on the first write, on
/// `flush` and on `close`. A handle that goes out of scope is closed, but
/// an error during that implicit close can only be observed in the log.
///
/// The format getters cannot fail: on a closed or invalid handle they keep
/// reporting the last known format and length, while every operation that
/// touches the stream fails with a `Mode` error.
///
/// ```
/// use std::io::Cursor;
/// use wavio::{FormatCode, WavFile};
///
/// let mut w = WavFile::from_stream(Cursor::new(vec![]), "w".parse().unwrap()).unwrap();
/// w.set_format(FormatCode::Pcm).unwrap();
/// w.set_num_channels(2).unwrap();
/// w.set_sample_rate(44100).unwrap();
/// w.set_sample_size(2).unwrap();
///
/// let left = vec![0u8; 200];
/// let right = vec![0u8; 200];
/// assert_eq!(w.write(&[&left, &right], 100).unwrap(), 100);
/// let bytes = w.into_inner().unwrap().into_inner();
///
/// let mut r = WavFile::from_stream(Cursor::new(bytes), "r".parse().unwrap()).unwrap();
/// assert_eq!(r.length(), 100);
/// assert_eq!(r.num_channels(), 2);
/// assert_eq!(r.sample_rate(), 44100);
/// ```
pub struct WavFile<S: ByteStream = File> {
    pub(crate) stream: Option<S>,
    pub(crate) state: State,
    pub(crate) mode: OpenMode,
    pub(crate) format: FormatSpec,

    /// Layout of the header on disk, `None` until one has been written
    pub(crate) fields: Option<HeaderFields>,

    /// Bytes of sample data, always a multiple of the frame size
    pub(crate) data_length: u64,

    /// Current frame index
    pub(crate) position: u64,

    pub(crate) header_dirty: bool,
    pub(crate) eof: bool,
    pub(crate) errno: ErrorKind,
}

impl WavFile<File> {
    /// Open a wave file with an `fopen` mode string.
    ///
    /// A handle is always returned. If opening failed, `error()` is true,
    /// `errno()` tells why and every other operation fails with a `Mode`
    /// error. Use `try_open` to get the error itself.
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Self {
        match Self::try_open(path, mode) {
            Ok(handle) => handle,
            Err(error) => Self::invalid(error.kind()),
        }
    }

    /// Open a wave file, returning the reason on failure.
    pub fn try_open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self, Error> {
        let open_mode: OpenMode = mode.parse()?;
        let file = open_file(path.as_ref(), &open_mode)?;
        debug!("opened {:?} with mode {:?}", path.as_ref(), open_mode);
        Self::from_stream(file, open_mode)
    }

    /// Close the current file and open another with this handle.
    ///
    /// The previous file is released even if finalizing it fails; that
    /// failure is logged. The result reflects the new open.
    pub fn reopen<P: AsRef<Path>>(&mut self, path: P, mode: &str) -> Result<(), Error> {
        if self.state == State::Ready {
            if let Err(e) = self.close_stream() {
                warn!("error closing wave file on reopen: {}", e);
            }
        }

        match Self::try_open(path, mode) {
            Ok(handle) => {
                *self = handle;
                Ok(())
            }
            Err(error) => {
                *self = Self::invalid(error.kind());
                Err(error)
            }
        }
    }
}

impl<S: ByteStream> WavFile<S> {
    /// Wrap an already opened stream.
    ///
    /// In `Read` mode, and in `Append` mode when the stream is not empty,
    /// the stream must hold a valid wave file. In `Write` mode the stream is
    /// truncated.
    pub fn from_stream(stream: S, mode: OpenMode) -> Result<Self, Error> {
        let mut handle = WavFile {
            stream: Some(stream),
            state: State::Ready,
            mode,
            format: FormatSpec::default(),
            fields: None,
            data_length: 0,
            position: 0,
            header_dirty: false,
            eof: false,
            errno: ErrorKind::Ok,
        };

        if let Err(error) = handle.initialize() {
            // nothing may be written back to a stream that failed to open
            handle.state = State::Invalid;
            return Err(error);
        }

        Ok(handle)
    }

    fn initialize(&mut self) -> Result<(), Error> {
        match self.mode.mode {
            Mode::Read => self.load_existing()?,
            Mode::Write => {
                self.stream_mut()?.truncate(0)?;
                self.header_dirty = true;
            }
            Mode::Append => {
                if self.stream_mut()?.seek(End(0))? == 0 {
                    self.header_dirty = true;
                } else {
                    self.load_existing()?;
                    self.position = self.length();
                }
            }
        }
        Ok(())
    }

    fn invalid(errno: ErrorKind) -> Self {
        WavFile {
            stream: None,
            state: State::Invalid,
            mode: OpenMode::new(Mode::Read, false),
            format: FormatSpec::default(),
            fields: None,
            data_length: 0,
            position: 0,
            header_dirty: false,
            eof: false,
            errno,
        }
    }

    fn load_existing(&mut self) -> Result<(), Error> {
        let stream = self.stream_mut()?;
        let layout = scan_layout(stream)?;
        let format = FormatSpec::from_wave_fmt(&layout.fmt)?;

        let frame_size = format.frame_size() as u64;
        let remainder = layout.data_length % frame_size;
        if remainder != 0 {
            warn!(
                "data chunk ends with a partial frame, ignoring {} bytes",
                remainder
            );
        }

        debug!(
            "format {:?}, data at {} length {}",
            format, layout.data_start, layout.data_length
        );

        self.format = format;
        self.fields = Some(HeaderFields::from_layout(&layout));
        self.data_length = layout.data_length - remainder;
        self.header_dirty = false;
        Ok(())
    }

    /// Finalize the file and release the stream.
    ///
    /// Further operations fail with a `Mode` error. The stream is released
    /// even when writing the header fails.
    pub fn close(&mut self) -> Result<(), Error> {
        let result = match self.state {
            State::Ready => self.close_stream(),
            State::Invalid => {
                self.state = State::Closed;
                Ok(())
            }
            State::Closed => Err(Error::Closed),
        };
        self.record(result)
    }

    /// Finalize the file and return the stream.
    pub fn into_inner(mut self) -> Result<S, Error> {
        self.ready()?;
        let result = self.finalize();
        let stream = self.stream.take();
        self.state = State::Closed;
        result?;
        stream.ok_or(Error::Closed)
    }

    fn close_stream(&mut self) -> Result<(), Error> {
        let result = self.finalize();
        self.stream = None;
        self.state = State::Closed;
        result
    }

    fn finalize(&mut self) -> Result<(), Error> {
        if self.mode.writable() && self.header_dirty {
            self.write_header()?;
        }
        if self.mode.writable() {
            self.stream_mut()?.flush()?;
        }
        Ok(())
    }

    /// Write the header now without closing.
    pub fn flush(&mut self) -> Result<(), Error> {
        let result = self.ready().and_then(|_| self.finalize());
        self.record(result)
    }

    /// Bring the on-disk header in line with the format and data length.
    ///
    /// The stream position is restored afterwards.
    fn write_header(&mut self) -> Result<(), Error> {
        let format = self.format;
        let data_length = self.data_length;
        let fields = self.fields;
        let stream = self.stream_mut()?;
        let saved = stream.stream_position()?;

        let fields = match fields {
            Some(fields) => {
                stream.write_size_fields(&fields, &format, data_length)?;
                fields
            }
            None => {
                let header = synthesize_header(&format, data_length)?;
                stream.seek(Start(0))?;
                stream.write_all(&header.bytes)?;
                header.fields
            }
        };

        let data_end = fields.data_start + data_length;
        let padding = data_padding(data_length);
        if padding > 0 {
            stream.seek(Start(data_end))?;
            stream.write_all(&[0u8])?;
        }
        stream.truncate(data_end + padding)?;
        stream.seek(Start(saved))?;

        debug!("header written, {} bytes of data", data_length);
        self.fields = Some(fields);
        self.header_dirty = false;
        Ok(())
    }

    /// Write the header if none is on disk yet, reserving its space.
    pub(crate) fn ensure_header(&mut self) -> Result<(), Error> {
        if self.fields.is_none() {
            self.write_header()?;
            self.header_dirty = true;
        }
        Ok(())
    }

    /// Current frame index.
    pub fn tell(&self) -> Result<u64, Error> {
        self.ready()?;
        Ok(self.position)
    }

    /// Move to a frame.
    ///
    /// A target before the first frame is a `Param` error and leaves the
    /// position unchanged, as is a target past the last frame in a
    /// read-only handle. A writable handle may seek past the end, as long
    /// as the target frame still fits the RIFF 4 GiB limit; the gap is
    /// zero-filled by the next write.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, Error> {
        let result = self.seek_frames(offset, whence);
        self.record(result)
    }

    fn seek_frames(&mut self, offset: i64, whence: Whence) -> Result<u64, Error> {
        self.ready()?;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.length(),
        };
        let target = base as i128 + offset as i128;
        if target < 0 {
            return Err(Error::InvalidParameter {
                reason: "seek before the first frame",
            });
        }
        if target > self.length() as i128 && !self.mode.writable() {
            return Err(Error::InvalidParameter {
                reason: "seek past the last frame of a read-only file",
            });
        }
        if target > u64::MAX as i128 {
            return Err(Error::InvalidParameter {
                reason: "seek target out of range",
            });
        }
        if self.mode.writable() {
            let offset = (target as u64)
                .checked_mul(self.format.frame_size() as u64)
                .ok_or(Error::InvalidParameter {
                    reason: "seek target out of range",
                })?;
            riff_form_size(self.data_start(), offset)?;
        }
        self.position = target as u64;
        self.eof = false;
        Ok(self.position)
    }

    /// Seek to the first frame and clear the error and end-of-file flags.
    pub fn rewind(&mut self) -> Result<(), Error> {
        let result = self.seek_frames(0, Whence::Start).map(|_| ());
        self.clear_error();
        self.record(result)
    }

    /// Whether the last read reached the end of the data.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Whether the last operation failed.
    pub fn error(&self) -> bool {
        self.errno != ErrorKind::Ok
    }

    /// Error category of the last operation.
    pub fn errno(&self) -> ErrorKind {
        self.errno
    }

    pub fn clear_error(&mut self) {
        self.errno = ErrorKind::Ok;
        self.eof = false;
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn spec(&self) -> FormatSpec {
        self.format
    }

    pub fn format(&self) -> FormatCode {
        self.format.format_code()
    }

    pub fn num_channels(&self) -> u16 {
        self.format.num_channels()
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }

    pub fn valid_bits_per_sample(&self) -> u16 {
        self.format.valid_bits_per_sample()
    }

    /// Bytes per sample of one channel.
    pub fn sample_size(&self) -> u16 {
        self.format.sample_size()
    }

    /// Number of frames of sample data.
    pub fn length(&self) -> u64 {
        self.data_length / self.format.frame_size() as u64
    }

    pub fn channel_mask(&self) -> u32 {
        self.format.channel_mask()
    }

    pub fn sub_format(&self) -> u16 {
        self.format.sub_format()
    }

    // Every setter below discards all sample data when it succeeds: the
    // geometry is baked into the bytes already written.

    pub fn set_format(&mut self, format_code: FormatCode) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_format(format_code));
        self.record(result)
    }

    pub fn set_num_channels(&mut self, num_channels: u16) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_num_channels(num_channels));
        self.record(result)
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_sample_rate(sample_rate));
        self.record(result)
    }

    /// Set the bytes per sample; valid bits become `8 * sample_size`.
    pub fn set_sample_size(&mut self, sample_size: u16) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_sample_size(sample_size));
        self.record(result)
    }

    /// Set the significant bits of each sample container.
    ///
    /// Zero or more than `8 * sample_size` is a `Param` error. Values below
    /// `8 * sample_size` are also a `Param` error unless the format is
    /// extensible, since only the 40-byte `fmt ` layout has a field for them.
    pub fn set_valid_bits_per_sample(&mut self, bits: u16) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_valid_bits_per_sample(bits));
        self.record(result)
    }

    /// Requires the extensible format.
    pub fn set_channel_mask(&mut self, channel_mask: u32) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_channel_mask(channel_mask));
        self.record(result)
    }

    /// Requires the extensible format.
    pub fn set_sub_format(&mut self, tag: u16) -> Result<(), Error> {
        let result = self.update_format(|f| f.with_sub_format(tag));
        self.record(result)
    }

    fn update_format<F>(&mut self, change: F) -> Result<(), Error>
    where
        F: FnOnce(FormatSpec) -> Result<FormatSpec, Error>,
    {
        self.require_writable()?;
        let format = change(self.format)?;
        self.reset_data()?;
        self.format = format;
        Ok(())
    }

    /// Drop all samples and the header; a fresh header follows.
    fn reset_data(&mut self) -> Result<(), Error> {
        self.stream_mut()?.truncate(0)?;
        if self.data_length > 0 {
            debug!("format changed, discarding {} bytes of data", self.data_length);
        }
        self.fields = None;
        self.data_length = 0;
        self.position = 0;
        self.header_dirty = true;
        self.eof = false;
        Ok(())
    }

    /// Offset of the first sample byte, present or future.
    pub(crate) fn data_start(&self) -> u64 {
        match self.fields {
            Some(fields) => fields.data_start,
            None => HeaderFields::for_format(&self.format).data_start,
        }
    }

    pub(crate) fn stream_mut(&mut self) -> Result<&mut S, Error> {
        match self.state {
            State::Ready => self.stream.as_mut().ok_or(Error::Closed),
            State::Invalid => Err(Error::Invalid),
            State::Closed => Err(Error::Closed),
        }
    }

    pub(crate) fn ready(&self) -> Result<(), Error> {
        match self.state {
            State::Ready => Ok(()),
            State::Invalid => Err(Error::Invalid),
            State::Closed => Err(Error::Closed),
        }
    }

    pub(crate) fn require_readable(&self) -> Result<(), Error> {
        self.ready()?;
        if self.mode.readable() {
            Ok(())
        } else {
            Err(Error::NotReadable)
        }
    }

    pub(crate) fn require_writable(&self) -> Result<(), Error> {
        self.ready()?;
        if self.mode.writable() {
            Ok(())
        } else {
            Err(Error::NotWritable)
        }
    }

    /// Per-channel transfers need one sample per channel per frame, which
    /// is not how an extensible file is guaranteed to be laid out.
    pub(crate) fn require_channel_io(&self) -> Result<(), Error> {
        if self.format.format_code() == FormatCode::Extensible {
            Err(Error::ExtensibleTransfer)
        } else {
            Ok(())
        }
    }

    pub(crate) fn record<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        self.errno = match &result {
            Ok(_) => ErrorKind::Ok,
            Err(e) => e.kind(),
        };
        result
    }

    /// Record a transfer outcome.
    ///
    /// A failure after some frames moved is reported as a short count with
    /// the error recorded on the handle.
    pub(crate) fn finish_transfer(
        &mut self,
        result: Result<(usize, Option<Error>), Error>,
    ) -> Result<usize, Error> {
        match result {
            Ok((frames, None)) => {
                self.errno = ErrorKind::Ok;
                Ok(frames)
            }
            Ok((frames, Some(error))) if frames > 0 => {
                warn!("transfer stopped after {} frames: {}", frames, error);
                self.errno = error.kind();
                Ok(frames)
            }
            Ok((_, Some(error))) | Err(error) => {
                self.errno = error.kind();
                Err(error)
            }
        }
    }
}

impl<S: ByteStream> Drop for WavFile<S> {
    fn drop(&mut self) {
        if self.state == State::Ready {
            if let Err(e) = self.close_stream() {
                warn!("error finalizing wave file on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_handle() -> WavFile<Cursor<Vec<u8>>> {
        WavFile::from_stream(Cursor::new(vec![]), OpenMode::new(Mode::Write, false)).unwrap()
    }

    #[test]
    fn test_empty_file_gets_header() {
        let w = write_handle();
        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[40..44], &[0u8; 4]);
    }

    #[test]
    fn test_defaults() {
        let w = write_handle();
        assert_eq!(w.format(), FormatCode::Pcm);
        assert_eq!(w.num_channels(), 2);
        assert_eq!(w.sample_rate(), 44100);
        assert_eq!(w.sample_size(), 2);
        assert_eq!(w.valid_bits_per_sample(), 16);
        assert_eq!(w.length(), 0);
        assert_eq!(w.tell().unwrap(), 0);
    }

    #[test]
    fn test_rejected_setter_keeps_state() {
        let mut w = write_handle();
        w.write_raw(&[1u8; 8]).unwrap();
        assert_eq!(w.length(), 2);

        match w.set_num_channels(0) {
            Err(e) => assert_eq!(e.kind(), ErrorKind::Param),
            Ok(_) => panic!("zero channels accepted"),
        }
        assert_eq!(w.errno(), ErrorKind::Param);
        assert_eq!(w.length(), 2);
        assert_eq!(w.num_channels(), 2);
        assert_eq!(w.tell().unwrap(), 2);
    }

    #[test]
    fn test_setter_resets_data() {
        let mut w = write_handle();
        w.write_raw(&[1u8; 8]).unwrap();
        w.set_sample_rate(48000).unwrap();
        assert_eq!(w.length(), 0);
        assert_eq!(w.tell().unwrap(), 0);
        assert!(!w.error());

        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[24..28], &48000u32.to_le_bytes());
    }

    #[test]
    fn test_seek() {
        let mut w = write_handle();
        w.write_raw(&[0u8; 40]).unwrap();
        assert_eq!(w.seek(-3, Whence::End).unwrap(), 7);
        assert_eq!(w.seek(2, Whence::Current).unwrap(), 9);

        match w.seek(-10, Whence::Current) {
            Err(Error::InvalidParameter { .. }) => (),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
        assert_eq!(w.errno(), ErrorKind::Param);
        assert_eq!(w.tell().unwrap(), 9);

        assert_eq!(w.seek(20, Whence::Start).unwrap(), 20);
        w.rewind().unwrap();
        assert_eq!(w.tell().unwrap(), 0);
    }

    #[test]
    fn test_closed_handle() {
        let mut w = write_handle();
        w.close().unwrap();
        assert!(!w.error());

        match w.close() {
            Err(Error::Closed) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(w.errno(), ErrorKind::Mode);
        assert!(w.tell().is_err());
        assert_eq!(w.set_sample_rate(8000).unwrap_err().kind(), ErrorKind::Mode);
        assert_eq!(w.flush().unwrap_err().kind(), ErrorKind::Mode);
    }

    #[test]
    fn test_getters_after_close() {
        let mut w = write_handle();
        w.set_sample_rate(22050).unwrap();
        w.write_raw(&[0u8; 8]).unwrap();
        w.close().unwrap();

        assert_eq!(w.sample_rate(), 22050);
        assert_eq!(w.length(), 2);
        assert_eq!(w.tell().unwrap_err().kind(), ErrorKind::Mode);
        assert_eq!(w.write_raw(&[0u8; 4]).unwrap_err().kind(), ErrorKind::Mode);
        assert_eq!(w.length(), 2);
    }

    #[test]
    fn test_read_only_setters() {
        let bytes = write_handle().into_inner().unwrap().into_inner();
        let mut r =
            WavFile::from_stream(Cursor::new(bytes), OpenMode::new(Mode::Read, false)).unwrap();
        match r.set_sample_size(3) {
            Err(Error::NotWritable) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(r.errno(), ErrorKind::Mode);
        assert_eq!(r.sample_size(), 2);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut w = write_handle();
        w.write_raw(&[7u8; 12]).unwrap();
        w.flush().unwrap();
        let first = w.stream.as_ref().unwrap().get_ref().clone();
        w.flush().unwrap();
        let second = w.stream.as_ref().unwrap().get_ref().clone();
        assert_eq!(first, second);
        assert_eq!(&first[40..44], &12u32.to_le_bytes());
        assert_eq!(first.len(), 56);
    }
}
