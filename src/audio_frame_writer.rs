use std::io::{self, Read, Seek, SeekFrom::Start, Write};

use log::trace;

use super::audio_frame_reader::{check_channel_buffers, scratch_buffer, BLOCK_FRAMES};
use super::errors::Error;
use super::header::riff_form_size;
use super::mode::Mode;
use super::sample::Sample;
use super::stream::ByteStream;
use super::wavfile::WavFile;

/// Merge per-channel sample buffers into interleaved frames.
///
/// Fills `frames` with whole frames taken from sample `first_frame` onward
/// in each channel buffer.
pub fn interleave(channels: &[&[u8]], sample_size: usize, first_frame: usize, frames: &mut [u8]) {
    let frame_size = sample_size * channels.len();
    for (i, frame) in frames.chunks_exact_mut(frame_size).enumerate() {
        let at = (first_frame + i) * sample_size;
        for (channel, sample) in channels.iter().zip(frame.chunks_exact_mut(sample_size)) {
            sample.copy_from_slice(&channel[at..at + sample_size]);
        }
    }
}

impl<S: ByteStream> WavFile<S> {
    /// Write `count` frames from one buffer per channel.
    ///
    /// Each buffer must hold at least `count * sample_size()` bytes. Frames
    /// are written at the current position, overwriting existing frames and
    /// extending the data past its end; in `Append` mode they always go to
    /// the end. Returns the number of frames written, fewer than `count`
    /// only when the stream failed (`error()`).
    ///
    /// Not available for the extensible format, use `write_raw`.
    pub fn write(&mut self, channels: &[&[u8]], count: usize) -> Result<usize, Error> {
        let result = self.write_channels(channels, count);
        self.finish_transfer(result)
    }

    /// Write whole interleaved frames from `buf`.
    ///
    /// `buf.len()` must be a multiple of the frame size. Works for every
    /// format.
    pub fn write_raw(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let result = self.write_interleaved(buf);
        self.finish_transfer(result)
    }

    /// Write typed samples from one slice per channel.
    ///
    /// Writes as many frames as the shortest slice holds. The width of `T`
    /// must equal `sample_size()`.
    pub fn write_samples<T: Sample>(&mut self, channels: &[&[T]]) -> Result<usize, Error> {
        let result = self.write_typed(channels);
        self.finish_transfer(result)
    }

    fn write_channels(
        &mut self,
        channels: &[&[u8]],
        count: usize,
    ) -> Result<(usize, Option<Error>), Error> {
        self.require_writable()?;
        self.require_channel_io()?;

        let sample_size = self.format.sample_size() as usize;
        let frame_size = self.format.frame_size();
        check_channel_buffers(
            channels.iter().map(|c| c.len()),
            channels.len(),
            self.format.num_channels(),
            count,
            sample_size,
        )?;

        self.prepare_write(count)?;

        let mut scratch = scratch_buffer(count.min(BLOCK_FRAMES) * frame_size)?;
        let mut done = 0;
        while done < count {
            let wanted = (count - done).min(BLOCK_FRAMES);
            let block = &mut scratch[..wanted * frame_size];
            interleave(channels, sample_size, done, block);
            let (put, error) = self.transfer_out(block);
            done += put;
            if error.is_some() {
                return Ok((done, error));
            }
        }
        Ok((done, None))
    }

    fn write_interleaved(&mut self, buf: &[u8]) -> Result<(usize, Option<Error>), Error> {
        self.require_writable()?;
        let frame_size = self.format.frame_size();
        if buf.len() % frame_size != 0 {
            return Err(Error::InvalidParameter {
                reason: "buffer is not a whole number of frames",
            });
        }
        self.prepare_write(buf.len() / frame_size)?;
        Ok(self.transfer_out(buf))
    }

    fn write_typed<T: Sample>(&mut self, channels: &[&[T]]) -> Result<(usize, Option<Error>), Error> {
        self.require_writable()?;
        self.require_channel_io()?;

        let sample_size = self.format.sample_size() as usize;
        if T::SIZE != sample_size {
            return Err(Error::SampleWidthMismatch {
                sample_size: self.format.sample_size(),
                type_size: T::SIZE,
            });
        }
        let count = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        check_channel_buffers(
            channels.iter().map(|c| c.len()),
            channels.len(),
            self.format.num_channels(),
            count,
            1,
        )?;

        self.prepare_write(count)?;

        let frame_size = self.format.frame_size();
        let mut scratch = scratch_buffer(count.min(BLOCK_FRAMES) * frame_size)?;
        let mut done = 0;
        while done < count {
            let wanted = (count - done).min(BLOCK_FRAMES);
            let block = &mut scratch[..wanted * frame_size];
            for (i, frame) in block.chunks_exact_mut(frame_size).enumerate() {
                for (channel, sample) in channels.iter().zip(frame.chunks_exact_mut(sample_size)) {
                    channel[done + i].write_le(sample);
                }
            }
            let (put, error) = self.transfer_out(block);
            done += put;
            if error.is_some() {
                return Ok((done, error));
            }
        }
        Ok((done, None))
    }

    /// Everything that must hold before the first byte of a write.
    ///
    /// Positions an append at the end, rejects writes past the RIFF size
    /// limit, emits the header if none is on disk and zero-fills any gap
    /// left by seeking past the end.
    fn prepare_write(&mut self, frames: usize) -> Result<(), Error> {
        if self.mode.mode == Mode::Append {
            self.position = self.length();
        }

        let frame_size = self.format.frame_size() as u64;
        let end = self
            .position
            .checked_add(frames as u64)
            .and_then(|f| f.checked_mul(frame_size))
            .ok_or(Error::InvalidParameter {
                reason: "data exceeds the RIFF 4 GiB limit",
            })?;
        riff_form_size(self.data_start(), end.max(self.data_length))?;

        self.ensure_header()?;
        self.fill_gap()
    }

    fn fill_gap(&mut self) -> Result<(), Error> {
        let start = self.position * self.format.frame_size() as u64;
        if start <= self.data_length {
            return Ok(());
        }

        let gap = start - self.data_length;
        let gap_start = self.data_start() + self.data_length;
        let stream = self.stream_mut()?;
        stream.seek(Start(gap_start))?;
        io::copy(&mut io::repeat(0).take(gap), stream)?;

        trace!("zero-filled {} bytes at {}", gap, gap_start);
        self.data_length = start;
        self.header_dirty = true;
        Ok(())
    }

    /// Write whole frames from `buf` at the current position.
    ///
    /// Only complete frames count; a partial frame left by a failing stream
    /// lies past the data length and is cut off when the header is written.
    fn transfer_out(&mut self, buf: &[u8]) -> (usize, Option<Error>) {
        let frame_size = self.format.frame_size() as u64;
        let offset = self.data_start() + self.position * frame_size;

        let mut written = 0;
        let mut error = None;
        match self.stream_mut() {
            Ok(stream) => match stream.seek(Start(offset)) {
                Ok(_) => {
                    while written < buf.len() {
                        match stream.write(&buf[written..]) {
                            Ok(0) => {
                                error = Some(
                                    io::Error::new(
                                        io::ErrorKind::WriteZero,
                                        "stream accepted no more bytes",
                                    )
                                    .into(),
                                );
                                break;
                            }
                            Ok(n) => written += n,
                            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                            Err(e) => {
                                error = Some(e.into());
                                break;
                            }
                        }
                    }
                }
                Err(e) => error = Some(e.into()),
            },
            Err(e) => error = Some(e),
        }

        let put = written as u64 / frame_size;
        self.position += put;
        let end = self.position * frame_size;
        if end > self.data_length {
            self.data_length = end;
            self.header_dirty = true;
        }
        trace!("wrote {} frames at {}", put, offset);
        (put as usize, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave() {
        let left = [1u8, 2, 5, 6];
        let right = [3u8, 4, 7, 8];
        let mut frames = [0u8; 4];
        interleave(&[&left, &right], 2, 1, &mut frames);
        assert_eq!(frames, [5, 6, 7, 8]);

        let mut frames = [0u8; 8];
        interleave(&[&left, &right], 2, 0, &mut frames);
        assert_eq!(frames, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
