use std::io::{ErrorKind, Read, Seek, SeekFrom::Start};

use log::trace;

use super::errors::Error;
use super::sample::Sample;
use super::stream::ByteStream;
use super::wavfile::WavFile;

/// Frames moved between the stream and caller buffers per pass.
pub(crate) const BLOCK_FRAMES: usize = 4096;

/// Split interleaved frames into per-channel sample buffers.
///
/// `frames` holds whole frames of `channels.len()` samples of
/// `sample_size` bytes each. Sample `n` of a channel lands at
/// `(first_frame + n) * sample_size` in that channel's buffer.
pub fn deinterleave(
    frames: &[u8],
    channels: &mut [&mut [u8]],
    sample_size: usize,
    first_frame: usize,
) {
    let frame_size = sample_size * channels.len();
    for (i, frame) in frames.chunks_exact(frame_size).enumerate() {
        let at = (first_frame + i) * sample_size;
        for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(sample_size)) {
            channel[at..at + sample_size].copy_from_slice(sample);
        }
    }
}

/// Check one buffer per channel, each long enough for `frames` samples of
/// `unit` elements.
pub(crate) fn check_channel_buffers<I>(
    lengths: I,
    buffer_count: usize,
    channel_count: u16,
    frames: usize,
    unit: usize,
) -> Result<(), Error>
where
    I: IntoIterator<Item = usize>,
{
    let required_len = frames.checked_mul(unit);
    let fits = match required_len {
        Some(required) => lengths.into_iter().all(|l| l >= required),
        None => false,
    };
    if buffer_count != channel_count as usize || !fits {
        Err(Error::InvalidBufferSize {
            buffer_count,
            channel_count,
            required_len: required_len.unwrap_or(usize::MAX),
        })
    } else {
        Ok(())
    }
}

/// A zeroed scratch buffer, reporting allocation failure as an error.
pub(crate) fn scratch_buffer(len: usize) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);
    Ok(buf)
}

impl<S: ByteStream> WavFile<S> {
    /// Read up to `count` frames into one buffer per channel.
    ///
    /// Each buffer must hold at least `count * sample_size()` bytes. Returns
    /// the number of frames read; fewer than `count` means the end of the
    /// data was reached (`eof()`) or an error occurred (`error()`).
    ///
    /// Not available for the extensible format, use `read_raw`.
    pub fn read(&mut self, channels: &mut [&mut [u8]], count: usize) -> Result<usize, Error> {
        let result = self.read_channels(channels, count);
        self.finish_transfer(result)
    }

    /// Read whole interleaved frames into `buf`.
    ///
    /// `buf.len()` must be a multiple of the frame size. Works for every
    /// format.
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let result = self.read_interleaved(buf);
        self.finish_transfer(result)
    }

    /// Read typed samples into one slice per channel.
    ///
    /// Reads as many frames as the shortest slice holds. The width of `T`
    /// must equal `sample_size()`.
    pub fn read_samples<T: Sample>(&mut self, channels: &mut [&mut [T]]) -> Result<usize, Error> {
        let result = self.read_typed(channels);
        self.finish_transfer(result)
    }

    fn read_channels(
        &mut self,
        channels: &mut [&mut [u8]],
        count: usize,
    ) -> Result<(usize, Option<Error>), Error> {
        self.require_readable()?;
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

        let mut scratch = scratch_buffer(count.min(BLOCK_FRAMES) * frame_size)?;
        let mut done = 0;
        while done < count {
            let wanted = (count - done).min(BLOCK_FRAMES);
            let (got, error) = self.transfer_in(&mut scratch[..wanted * frame_size]);
            deinterleave(&scratch[..got * frame_size], channels, sample_size, done);
            done += got;
            if error.is_some() || got < wanted {
                return Ok((done, error));
            }
        }
        self.update_eof();
        Ok((done, None))
    }

    fn read_interleaved(&mut self, buf: &mut [u8]) -> Result<(usize, Option<Error>), Error> {
        self.require_readable()?;
        let frame_size = self.format.frame_size();
        if buf.len() % frame_size != 0 {
            return Err(Error::InvalidParameter {
                reason: "buffer is not a whole number of frames",
            });
        }
        Ok(self.transfer_in(buf))
    }

    fn read_typed<T: Sample>(
        &mut self,
        channels: &mut [&mut [T]],
    ) -> Result<(usize, Option<Error>), Error> {
        self.require_readable()?;
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

        let frame_size = self.format.frame_size();
        let mut scratch = scratch_buffer(count.min(BLOCK_FRAMES) * frame_size)?;
        let mut done = 0;
        while done < count {
            let wanted = (count - done).min(BLOCK_FRAMES);
            let (got, error) = self.transfer_in(&mut scratch[..wanted * frame_size]);
            for (i, frame) in scratch[..got * frame_size].chunks_exact(frame_size).enumerate() {
                for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(sample_size)) {
                    channel[done + i] = T::read_le(sample);
                }
            }
            done += got;
            if error.is_some() || got < wanted {
                return Ok((done, error));
            }
        }
        self.update_eof();
        Ok((done, None))
    }

    /// Read whole frames at the current position into `buf`.
    ///
    /// Stops at the end of the data. Bytes of a trailing partial frame are
    /// discarded and the position only advances by whole frames.
    fn transfer_in(&mut self, buf: &mut [u8]) -> (usize, Option<Error>) {
        let frame_size = self.format.frame_size();
        let requested = (buf.len() / frame_size) as u64;
        let available = self.length().saturating_sub(self.position);
        let frames = requested.min(available) as usize;
        let offset = self.data_start() + self.position * frame_size as u64;
        let bytes = frames * frame_size;

        let mut filled = 0;
        let mut error = None;
        match self.stream_mut() {
            Ok(stream) => match stream.seek(Start(offset)) {
                Ok(_) => {
                    while filled < bytes {
                        match stream.read(&mut buf[filled..bytes]) {
                            Ok(0) => break,
                            Ok(n) => filled += n,
                            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
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

        let got = filled / frame_size;
        self.position += got as u64;
        self.update_eof();
        trace!("read {} of {} frames at {}", got, requested, offset);
        (got, error)
    }

    fn update_eof(&mut self) {
        self.eof = self.position >= self.length();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let frames = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut left = [0u8; 6];
        let mut right = [0u8; 6];
        {
            let mut channels: [&mut [u8]; 2] = [&mut left, &mut right];
            deinterleave(&frames, &mut channels, 2, 1);
        }
        assert_eq!(left, [0, 0, 1, 2, 5, 6]);
        assert_eq!(right, [0, 0, 3, 4, 7, 8]);
    }

    #[test]
    fn test_check_channel_buffers() {
        assert!(check_channel_buffers(vec![4, 4], 2, 2, 2, 2).is_ok());
        assert!(check_channel_buffers(vec![4, 3], 2, 2, 2, 2).is_err());
        assert!(check_channel_buffers(vec![4], 1, 2, 2, 2).is_err());

        match check_channel_buffers(vec![2, 2], 2, 2, usize::MAX, 2) {
            Err(Error::InvalidBufferSize { required_len, .. }) => {
                assert_eq!(required_len, usize::MAX)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
