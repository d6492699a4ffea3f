use std::convert::TryFrom;

use uuid::Uuid;

use super::common_format::{basic_tag_from_uuid, uuid_from_basic_tag, FormatCode, UUID_PCM};
use super::errors::Error;

/// Generates a bitmask with `channels` ones in the least significant bits.
///
/// This is the speaker assignment written for extensible files unless a
/// mask is set explicitly.
pub fn default_channel_mask(channels: u16) -> u32 {
    (0..channels.min(32)).fold(0u32, |mask, c| mask | (1 << c))
}

/**
 * Extended Wave Format
 *
 * https://docs.microsoft.com/en-us/windows/win32/api/mmreg/ns-mmreg-waveformatextensible
 */
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WaveFmtExtended {
    /// Valid bits per sample
    pub valid_bits_per_sample: u16,

    /// Channel mask
    ///
    /// Identifies the speaker assignment for each channel in the file
    pub channel_mask: u32,

    /// Codec GUID
    pub type_guid: Uuid,
}

/**
 * The `fmt ` chunk payload as it appears on disk.
 *
 * No validation is done on this record, see `FormatSpec::from_wave_fmt`.
 */
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WaveFmt {
    /// A tag identifying the codec in use.
    pub tag: u16,

    /// Count of audio channels in each frame
    pub channel_count: u16,

    /// Sample rate of the audio data
    pub sample_rate: u32,

    /// Count of bytes per second
    ///
    /// By rule, this is `block_alignment * sample_rate`
    pub bytes_per_second: u32,

    /// Count of bytes per audio frame
    pub block_alignment: u16,

    /// Count of bits stored in the file per sample
    pub bits_per_sample: u16,

    /// The `cbSize` field, present in the 18 and 40 byte layouts
    pub extra_size: Option<u16>,

    /// Extension present in the 40 byte layout
    pub extended_format: Option<WaveFmtExtended>,
}

impl WaveFmt {
    /// Size of the chunk payload this record serializes to.
    pub fn chunk_size(&self) -> u32 {
        let mut size = 16;
        if self.extra_size.is_some() {
            size += 2;
        }
        if self.extended_format.is_some() {
            size += 22;
        }
        size
    }
}

/// Sample geometry of a wave file.
///
/// A `FormatSpec` is always valid: the constructors and the `with_*`
/// methods reject values that would produce an unusable header, and leave
/// the receiver untouched when they do.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FormatSpec {
    format_code: FormatCode,
    num_channels: u16,
    sample_rate: u32,
    sample_size: u16,
    valid_bits_per_sample: u16,
    channel_mask: u32,
    sub_format: Uuid,
}

impl Default for FormatSpec {
    /// 16-bit stereo integer PCM at 44.1 kHz.
    fn default() -> Self {
        FormatSpec {
            format_code: FormatCode::Pcm,
            num_channels: 2,
            sample_rate: 44100,
            sample_size: 2,
            valid_bits_per_sample: 16,
            channel_mask: 0,
            sub_format: Uuid::nil(),
        }
    }
}

impl FormatSpec {
    /// Create a format with full valid bits.
    ///
    /// ```
    /// use wavio::{FormatCode, FormatSpec};
    ///
    /// let spec = FormatSpec::new(FormatCode::IeeeFloat, 2, 48000, 4).unwrap();
    /// assert_eq!(spec.frame_size(), 8);
    /// assert_eq!(spec.valid_bits_per_sample(), 32);
    ///
    /// assert!(FormatSpec::new(FormatCode::Pcm, 0, 48000, 2).is_err());
    /// ```
    pub fn new(
        format_code: FormatCode,
        num_channels: u16,
        sample_rate: u32,
        sample_size: u16,
    ) -> Result<Self, Error> {
        FormatSpec::default()
            .with_sample_size(sample_size)?
            .with_num_channels(num_channels)?
            .with_sample_rate(sample_rate)?
            .with_format(format_code)
    }

    pub fn format_code(&self) -> FormatCode {
        self.format_code
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bytes per sample of a single channel.
    pub fn sample_size(&self) -> u16 {
        self.sample_size
    }

    /// Container bits per sample, always `8 * sample_size`.
    pub fn bits_per_sample(&self) -> u16 {
        self.sample_size * 8
    }

    pub fn valid_bits_per_sample(&self) -> u16 {
        self.valid_bits_per_sample
    }

    /// Speaker assignment, zero unless the format is extensible.
    pub fn channel_mask(&self) -> u32 {
        self.channel_mask
    }

    /// Sub-format GUID, nil unless the format is extensible.
    pub fn sub_format_guid(&self) -> Uuid {
        self.sub_format
    }

    /// Sub-format tag, the first two bytes of the sub-format GUID.
    pub fn sub_format(&self) -> u16 {
        basic_tag_from_uuid(&self.sub_format)
    }

    /// Bytes per frame.
    pub fn frame_size(&self) -> usize {
        self.sample_size as usize * self.num_channels as usize
    }

    pub fn block_align(&self) -> u16 {
        self.sample_size * self.num_channels
    }

    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }

    /// Change the format code.
    ///
    /// Switching to `Extensible` assigns the default channel mask and a PCM
    /// sub-format; switching away drops them and restores full valid bits.
    pub fn with_format(self, format_code: FormatCode) -> Result<Self, Error> {
        let mut spec = self;
        match (self.format_code, format_code) {
            (FormatCode::Extensible, FormatCode::Extensible) => (),
            (_, FormatCode::Extensible) => {
                spec.channel_mask = default_channel_mask(self.num_channels);
                spec.sub_format = UUID_PCM;
            }
            (_, _) => {
                spec.valid_bits_per_sample = self.bits_per_sample();
                spec.channel_mask = 0;
                spec.sub_format = Uuid::nil();
            }
        }
        spec.format_code = format_code;
        Ok(spec)
    }

    pub fn with_num_channels(self, num_channels: u16) -> Result<Self, Error> {
        if num_channels == 0 {
            return Err(Error::InvalidParameter {
                reason: "channel count must be at least 1",
            });
        }
        check_block_align(self.sample_size, num_channels)?;

        let mut spec = self;
        spec.num_channels = num_channels;
        if spec.format_code == FormatCode::Extensible {
            spec.channel_mask = default_channel_mask(num_channels);
        }
        Ok(spec)
    }

    pub fn with_sample_rate(self, sample_rate: u32) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::InvalidParameter {
                reason: "sample rate must be at least 1",
            });
        }
        let mut spec = self;
        spec.sample_rate = sample_rate;
        Ok(spec)
    }

    /// Change the bytes per sample. Valid bits become `8 * sample_size`.
    pub fn with_sample_size(self, sample_size: u16) -> Result<Self, Error> {
        if sample_size == 0 {
            return Err(Error::InvalidParameter {
                reason: "sample size must be at least 1 byte",
            });
        }
        if sample_size > u16::MAX / 8 {
            return Err(Error::InvalidParameter {
                reason: "sample size overflows bits per sample",
            });
        }
        check_block_align(sample_size, self.num_channels)?;

        let mut spec = self;
        spec.sample_size = sample_size;
        spec.valid_bits_per_sample = sample_size * 8;
        Ok(spec)
    }

    /// Change the valid bits per sample.
    ///
    /// Zero or more than `8 * sample_size` is rejected. So is any narrowing
    /// below `8 * sample_size` on a non-extensible format: only the 40-byte
    /// layout carries a valid-bits field.
    pub fn with_valid_bits_per_sample(self, bits: u16) -> Result<Self, Error> {
        if bits == 0 || bits > self.bits_per_sample() {
            return Err(Error::InvalidParameter {
                reason: "valid bits must be in 1..=8*sample_size",
            });
        }
        if bits != self.bits_per_sample() && self.format_code != FormatCode::Extensible {
            return Err(Error::InvalidParameter {
                reason: "narrowed valid bits require the extensible format",
            });
        }
        let mut spec = self;
        spec.valid_bits_per_sample = bits;
        Ok(spec)
    }

    pub fn with_channel_mask(self, channel_mask: u32) -> Result<Self, Error> {
        self.require_extensible()?;
        let mut spec = self;
        spec.channel_mask = channel_mask;
        Ok(spec)
    }

    pub fn with_sub_format(self, tag: u16) -> Result<Self, Error> {
        self.require_extensible()?;
        let mut spec = self;
        spec.sub_format = uuid_from_basic_tag(tag);
        Ok(spec)
    }

    fn require_extensible(&self) -> Result<(), Error> {
        if self.format_code == FormatCode::Extensible {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                reason: "channel mask and sub-format require the extensible format",
            })
        }
    }

    /// Interpret a raw `fmt ` record read from a file.
    pub fn from_wave_fmt(fmt: &WaveFmt) -> Result<Self, Error> {
        let format_code = FormatCode::try_from(fmt.tag)?;

        if fmt.bits_per_sample == 0 || fmt.bits_per_sample % 8 != 0 {
            return Err(Error::InvalidBitsPerSample {
                bits: fmt.bits_per_sample,
            });
        }
        if fmt.channel_count == 0 {
            return Err(Error::InvalidFormat {
                reason: "zero channels",
            });
        }
        if fmt.sample_rate == 0 {
            return Err(Error::InvalidFormat {
                reason: "zero sample rate",
            });
        }

        let sample_size = fmt.bits_per_sample / 8;
        let expected_align = sample_size as u32 * fmt.channel_count as u32;
        if fmt.block_alignment as u32 != expected_align {
            return Err(Error::InvalidFormat {
                reason: "block alignment does not match channels and sample size",
            });
        }

        let mut spec = FormatSpec {
            format_code,
            num_channels: fmt.channel_count,
            sample_rate: fmt.sample_rate,
            sample_size,
            valid_bits_per_sample: fmt.bits_per_sample,
            channel_mask: 0,
            sub_format: Uuid::nil(),
        };

        if format_code == FormatCode::Extensible {
            let ext = match (fmt.extra_size, fmt.extended_format) {
                (Some(22), Some(ext)) => ext,
                _ => {
                    return Err(Error::InvalidFormat {
                        reason: "extensible format requires the 40-byte fmt chunk",
                    })
                }
            };
            if ext.valid_bits_per_sample > fmt.bits_per_sample {
                return Err(Error::InvalidFormat {
                    reason: "valid bits exceed bits per sample",
                });
            }
            if ext.valid_bits_per_sample != 0 {
                spec.valid_bits_per_sample = ext.valid_bits_per_sample;
            }
            spec.channel_mask = ext.channel_mask;
            spec.sub_format = ext.type_guid;
        }

        Ok(spec)
    }

    /// The raw `fmt ` record written for this format.
    pub fn to_wave_fmt(&self) -> WaveFmt {
        let (extra_size, extended_format) = match self.format_code {
            FormatCode::Pcm | FormatCode::IeeeFloat => (None, None),
            FormatCode::ALaw | FormatCode::MuLaw => (Some(0), None),
            FormatCode::Extensible => (
                Some(22),
                Some(WaveFmtExtended {
                    valid_bits_per_sample: self.valid_bits_per_sample,
                    channel_mask: self.channel_mask,
                    type_guid: self.sub_format,
                }),
            ),
        };

        WaveFmt {
            tag: self.format_code.tag(),
            channel_count: self.num_channels,
            sample_rate: self.sample_rate,
            bytes_per_second: self.bytes_per_second(),
            block_alignment: self.block_align(),
            bits_per_sample: self.bits_per_sample(),
            extra_size,
            extended_format,
        }
    }
}

fn check_block_align(sample_size: u16, num_channels: u16) -> Result<(), Error> {
    if sample_size as u32 * num_channels as u32 > u16::MAX as u32 {
        Err(Error::InvalidParameter {
            reason: "frame size overflows block alignment",
        })
    } else {
        Ok(())
    }
}
