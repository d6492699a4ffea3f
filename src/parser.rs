use std::io::SeekFrom::{End, Start};
use std::io::{Read, Seek};

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use log::debug;

use super::chunks::ReadWaveChunks;
use super::errors::Error;
use super::fmt::WaveFmt;
use super::fourcc::{FourCC, ReadFourCC};
use super::fourcc::{DATA_SIG, FACT_SIG, FMT__SIG, RIFF_SIG, WAVE_SIG};

// RIFF documentation http://www-mmsp.ece.mcgill.ca/Documents/AudioFormats/WAVE/Docs/riffmci.pdf
//
// Chunks after `data` are never visited: the scan completes as soon as the
// data chunk header has been read.

#[derive(Debug)]
pub enum Event {
    StartParse,
    ReadHeader,
    BeginChunk {
        signature: FourCC,
        content_start: u64,
        content_length: u64,
    },
    Failed { error: Error },
    FinishParse,
}

#[derive(Debug)]
enum State {
    New,
    ReadyForHeader,
    ReadyForChunk { at: u64 },
    Error,
    Complete,
}

pub struct Parser<R: Read + Seek> {
    stream: R,
    stream_length: u64,
    state: State,
}

#[derive(Debug)]
pub struct ChunkIteratorItem {
    pub signature: FourCC,
    pub start: u64,
    pub length: u64,
}

impl<R: Read + Seek> Parser<R> {
    // wraps a stream
    pub fn make(stream: R) -> Result<Self, Error> {
        let mut the_stream = stream;
        let stream_length = the_stream.seek(End(0))?;
        the_stream.seek(Start(0))?;
        Ok(Parser {
            stream: the_stream,
            stream_length,
            state: State::New,
        })
    }

    pub fn into_chunk_iterator(self) -> impl Iterator<Item = Result<ChunkIteratorItem, Error>> {
        self.filter_map(|event| match event {
            Event::BeginChunk {
                signature,
                content_start,
                content_length,
            } => Some(Ok(ChunkIteratorItem {
                signature,
                start: content_start,
                length: content_length,
            })),
            Event::Failed { error } => Some(Err(error)),
            _ => None,
        })
    }

    pub fn into_chunk_list(self) -> Result<Vec<ChunkIteratorItem>, Error> {
        self.into_chunk_iterator().collect()
    }
}

impl<R: Read + Seek> Iterator for Parser<R> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let (event, next_state) = self.advance();
        self.state = next_state;
        event
    }
}

impl<R: Read + Seek> Parser<R> {
    fn parse_header(&mut self) -> Result<(Event, State), Error> {
        if self.stream_length < 12 {
            return Err(Error::HeaderNotRecognized);
        }

        let file_sig = self.stream.read_fourcc()?;
        let length = self.stream.read_u32::<LittleEndian>()?;
        let list_sig = self.stream.read_fourcc()?;

        match (file_sig, list_sig) {
            (RIFF_SIG, WAVE_SIG) => {
                debug!(
                    "RIFF form declares {} bytes, stream holds {}",
                    length,
                    self.stream_length - 8
                );
                Ok((Event::ReadHeader, State::ReadyForChunk { at: 12 }))
            }
            _ => Err(Error::HeaderNotRecognized),
        }
    }

    fn enter_chunk(&mut self, at: u64) -> Result<(Event, State), Error> {
        if at + 8 > self.stream_length {
            return Ok((Event::FinishParse, State::Complete));
        }

        self.stream.seek(Start(at))?;
        let signature = self.stream.read_fourcc()?;
        let content_length = self.stream.read_u32::<LittleEndian>()? as u64;
        let content_start = at + 8;

        let available = self.stream_length - content_start;
        if content_length > available {
            return Err(Error::ChunkOverrun {
                signature,
                declared: content_length,
                available,
            });
        }

        debug!(
            "chunk {:?} at {} length {}",
            signature, content_start, content_length
        );

        let event = Event::BeginChunk {
            signature,
            content_start,
            content_length,
        };

        let state = if signature == DATA_SIG {
            State::Complete
        } else {
            let displacement = content_length + content_length % 2;
            State::ReadyForChunk {
                at: content_start + displacement,
            }
        };

        Ok((event, state))
    }

    fn handle_state(&mut self) -> Result<(Option<Event>, State), Error> {
        match self.state {
            State::New => Ok((Some(Event::StartParse), State::ReadyForHeader)),
            State::ReadyForHeader => {
                let (event, state) = self.parse_header()?;
                Ok((Some(event), state))
            }
            State::ReadyForChunk { at } => {
                let (event, state) = self.enter_chunk(at)?;
                Ok((Some(event), state))
            }
            State::Error => Ok((Some(Event::FinishParse), State::Complete)),
            State::Complete => Ok((None, State::Complete)),
        }
    }

    fn advance(&mut self) -> (Option<Event>, State) {
        match self.handle_state() {
            Ok((event, state)) => (event, state),
            Err(error) => (Some(Event::Failed { error }), State::Error),
        }
    }
}

/// Location of everything in a wave file the handle needs.
#[derive(Debug)]
pub struct ChunkLayout {
    pub fmt: WaveFmt,
    pub fact_start: Option<u64>,
    pub data_start: u64,
    pub data_length: u64,
}

/// Scan a RIFF/WAVE stream up to and including the `data` chunk header.
///
/// ```
/// use std::io::Cursor;
/// use wavio::scan_layout;
///
/// let mut riff = Cursor::new(b"RIFX\x04\x00\x00\x00WAVE".to_vec());
/// assert!(scan_layout(&mut riff).is_err());
/// ```
pub fn scan_layout<R: Read + Seek>(stream: &mut R) -> Result<ChunkLayout, Error> {
    let chunks = Parser::make(&mut *stream)?.into_chunk_list()?;

    let mut fmt_extent: Option<(u64, u64)> = None;
    let mut fact_start: Option<u64> = None;
    let mut data_extent: Option<(u64, u64)> = None;

    for chunk in chunks.iter() {
        match chunk.signature {
            FMT__SIG => {
                if fmt_extent.is_some() {
                    return Err(Error::DuplicateChunk {
                        signature: FMT__SIG,
                    });
                }
                fmt_extent = Some((chunk.start, chunk.length));
            }
            FACT_SIG => {
                if chunk.length < 4 {
                    return Err(Error::InvalidFormat {
                        reason: "fact chunk shorter than 4 bytes",
                    });
                }
                fact_start = Some(chunk.start);
            }
            DATA_SIG => data_extent = Some((chunk.start, chunk.length)),
            _ => (),
        }
    }

    let (fmt_start, fmt_length) = fmt_extent.ok_or(Error::ChunkMissing {
        signature: FMT__SIG,
    })?;
    let (data_start, data_length) = data_extent.ok_or(Error::ChunkMissing {
        signature: DATA_SIG,
    })?;

    if fmt_length != 16 && fmt_length != 18 && fmt_length != 40 {
        return Err(Error::InvalidFmtSize {
            size: fmt_length as u32,
        });
    }

    stream.seek(Start(fmt_start))?;
    let fmt = stream.read_wave_fmt(fmt_length as u32)?;

    Ok(ChunkLayout {
        fmt,
        fact_start,
        data_start,
        data_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(sig: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut v = sig.to_vec();
        v.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        v.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            v.push(0);
        }
        v
    }

    fn riff(chunks: &[Vec<u8>]) -> Cursor<Vec<u8>> {
        let body: Vec<u8> = chunks.concat();
        let mut v = b"RIFF".to_vec();
        v.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
        v.extend_from_slice(b"WAVE");
        v.extend_from_slice(&body);
        Cursor::new(v)
    }

    fn fmt16(bits: u16) -> Vec<u8> {
        let mut v = vec![];
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&8000u32.to_le_bytes());
        v.extend_from_slice(&(8000u32 * (bits as u32 / 8)).to_le_bytes());
        v.extend_from_slice(&(bits / 8).to_le_bytes());
        v.extend_from_slice(&bits.to_le_bytes());
        v
    }

    #[test]
    fn test_scan_minimal() {
        let mut f = riff(&[chunk(b"fmt ", &fmt16(16)), chunk(b"data", &[0u8; 8])]);
        let layout = scan_layout(&mut f).unwrap();
        assert_eq!(layout.data_start, 44);
        assert_eq!(layout.data_length, 8);
        assert_eq!(layout.fmt.bits_per_sample, 16);
        assert_eq!(layout.fact_start, None);
    }

    #[test]
    fn test_skips_unknown_odd_chunks() {
        let mut f = riff(&[
            chunk(b"fmt ", &fmt16(8)),
            chunk(b"LIST", &[1u8, 2, 3]),
            chunk(b"fact", &[4u8, 0, 0, 0]),
            chunk(b"data", &[0u8; 4]),
            chunk(b"junk", &[0u8; 2]),
        ]);
        let layout = scan_layout(&mut f).unwrap();
        assert_eq!(layout.fact_start, Some(12 + 24 + 12 + 8));
        assert_eq!(layout.data_start, 12 + 24 + 12 + 12 + 8);
        assert_eq!(layout.data_length, 4);
    }

    #[test]
    fn test_stops_at_data() {
        let mut f = riff(&[chunk(b"fmt ", &fmt16(16)), chunk(b"data", &[0u8; 2])]);
        f.get_mut().extend_from_slice(b"garbage!");
        let chunks = Parser::make(&mut f).unwrap().into_chunk_list().unwrap();
        let sigs: Vec<FourCC> = chunks.iter().map(|c| c.signature).collect();
        assert_eq!(sigs, vec![FMT__SIG, DATA_SIG]);
    }

    #[test]
    fn test_event_sequence() {
        let mut f = riff(&[chunk(b"fmt ", &fmt16(16)), chunk(b"data", &[0u8; 2])]);
        let events: Vec<Event> = Parser::make(&mut f).unwrap().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], Event::StartParse));
        assert!(matches!(events[1], Event::ReadHeader));
        assert!(matches!(
            events[3],
            Event::BeginChunk {
                signature: DATA_SIG,
                content_length: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_signature() {
        let mut f = riff(&[chunk(b"fmt ", &fmt16(16)), chunk(b"data", &[])]);
        f.get_mut()[8..12].copy_from_slice(b"AVI ");
        match scan_layout(&mut f) {
            Err(Error::HeaderNotRecognized) => (),
            other => panic!("unexpected {:?}", other),
        }

        match scan_layout(&mut Cursor::new(b"RIFF".to_vec())) {
            Err(Error::HeaderNotRecognized) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_chunks() {
        let mut f = riff(&[chunk(b"fmt ", &fmt16(16))]);
        match scan_layout(&mut f) {
            Err(Error::ChunkMissing { signature }) => assert_eq!(signature, DATA_SIG),
            other => panic!("unexpected {:?}", other),
        }

        let mut f = riff(&[chunk(b"data", &[0u8; 2]), chunk(b"fmt ", &fmt16(16))]);
        match scan_layout(&mut f) {
            Err(Error::ChunkMissing { signature }) => assert_eq!(signature, FMT__SIG),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overrun() {
        let mut f = riff(&[chunk(b"fmt ", &fmt16(16)), chunk(b"data", &[0u8; 4])]);
        let len = f.get_ref().len();
        f.get_mut()[len - 8..len - 4].copy_from_slice(&100u32.to_le_bytes());
        match scan_layout(&mut f) {
            Err(Error::ChunkOverrun {
                declared,
                available,
                ..
            }) => {
                assert_eq!(declared, 100);
                assert_eq!(available, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_fmt_size() {
        let mut f = riff(&[chunk(b"fmt ", &[0u8; 20]), chunk(b"data", &[])]);
        match scan_layout(&mut f) {
            Err(Error::InvalidFmtSize { size: 20 }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_fmt() {
        let mut f = riff(&[
            chunk(b"fmt ", &fmt16(16)),
            chunk(b"fmt ", &fmt16(16)),
            chunk(b"data", &[]),
        ]);
        match scan_layout(&mut f) {
            Err(Error::DuplicateChunk { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
