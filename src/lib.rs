/*!
# wavio

Rust Wave File Reader/Writer with stdio-style semantics.

A `WavFile` is opened with an `fopen` mode string and then read, written and
positioned frame by frame, much like a `FILE*`. The header is synthesized for
you and kept in step with the sample data: it is written on the first write,
on `flush` and on `close`.

```
use std::io::Cursor;
use wavio::{WavFile, Whence};

let mut w = WavFile::from_stream(Cursor::new(vec![]), "w+".parse().unwrap()).unwrap();
w.set_num_channels(1).unwrap();
w.set_sample_size(2).unwrap();

let samples: Vec<i16> = (0..100).collect();
assert_eq!(w.write_samples(&[&samples]).unwrap(), 100);

w.seek(10, Whence::Start).unwrap();
let mut back = vec![0i16; 5];
assert_eq!(w.read_samples(&mut [&mut back]).unwrap(), 5);
assert_eq!(back, vec![10, 11, 12, 13, 14]);
```

## Supported formats

Reading and writing are supported for these wave codecs:

- tag 0x0001 Integer Linear PCM
- tag 0x0003 IEEE Float Linear PCM
- tag 0x0006 A-law
- tag 0x0007 mu-law
- tag 0xFFFE `WAVE_FORMAT_EXTENSIBLE`, with a channel mask and one of the
  above as the sub-format

Samples are moved as raw little-endian bytes; no conversion between sample
encodings is made. Files larger than 4 GiB (RF64) and metadata chunks other
than `fact` are not written. Unknown chunks before `data` are skipped on
reading.

## Error reporting

Every operation returns a `Result<_, wavio::Error>`. The handle also
remembers the `ErrorKind` of its last operation, available through
`errno()` and `error()`, and tracks end-of-file in `eof()`.

## Resources

### Implementation of Wave format `fmt` chunk
- [MSDN WAVEFORMATEX](https://docs.microsoft.com/en-us/windows/win32/api/mmeapi/ns-mmeapi-waveformatex)
- [MSDN WAVEFORMATEXTENSIBLE](https://docs.microsoft.com/en-us/windows/win32/api/mmreg/ns-mmreg-waveformatextensible)

### Other resources
- [RFC 2361][rfc2361] (June 1998) "WAVE and AVI Codec Registries"
- [Peter Kabal, McGill University](http://www-mmsp.ece.mcgill.ca/Documents/AudioFormats/WAVE/WAVE.html)
 - [Multimedia Programming Interface and Data Specifications 1.0](http://www-mmsp.ece.mcgill.ca/Documents/AudioFormats/WAVE/Docs/riffmci.pdf)
    (August 1991), IBM Corporation and Microsoft Corporation

[rfc2361]: https://tools.ietf.org/html/rfc2361
*/

extern crate byteorder;
extern crate uuid;

mod fourcc;
mod errors;
mod common_format;

mod parser;

mod chunks;
mod fmt;
mod header;

mod mode;
mod stream;
mod sample;

mod wavfile;
mod audio_frame_reader;
mod audio_frame_writer;

pub use errors::{Error, ErrorKind};
pub use fourcc::FourCC;
pub use common_format::FormatCode;
pub use fmt::{default_channel_mask, FormatSpec, WaveFmt, WaveFmtExtended};
pub use parser::{scan_layout, ChunkLayout};
pub use header::{synthesize_header, Header, HeaderFields};
pub use mode::{Mode, OpenMode};
pub use stream::ByteStream;
pub use sample::{Sample, I24};
pub use wavfile::{WavFile, Whence};
pub use audio_frame_reader::deinterleave;
pub use audio_frame_writer::interleave;
