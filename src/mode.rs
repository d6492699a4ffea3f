use std::fs::OpenOptions;
use std::str::FromStr;

use super::errors::Error;

/// How a `WavFile` was opened.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// An existing, valid wave file is required.
    Read,

    /// The file is created or truncated, and a default format is assumed.
    Write,

    /// The file is created if missing; an existing wave file keeps its
    /// format and samples, and writes always extend it.
    Append,
}

/// A parsed stdio mode string such as `"r"`, `"w+"` or `"ab"`.
///
/// The `b` flag is accepted and ignored. `+` opens for update: the file
/// becomes writable in `Read` mode and readable in `Write`/`Append` mode.
///
/// ```
/// use wavio::{Mode, OpenMode};
///
/// let m: OpenMode = "rb+".parse().unwrap();
/// assert_eq!(m.mode, Mode::Read);
/// assert!(m.writable());
///
/// assert!("x".parse::<OpenMode>().is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpenMode {
    pub mode: Mode,
    pub update: bool,
}

impl OpenMode {
    pub fn new(mode: Mode, update: bool) -> Self {
        OpenMode { mode, update }
    }

    pub fn readable(&self) -> bool {
        self.mode == Mode::Read || self.update
    }

    pub fn writable(&self) -> bool {
        self.mode != Mode::Read || self.update
    }

    /// File open options that give the stream access this mode needs.
    ///
    /// Append mode opens read-write without `O_APPEND`, the header has to be
    /// rewritten in place.
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self.mode {
            Mode::Read => {
                options.read(true).write(self.update);
            }
            Mode::Write => {
                options
                    .read(self.update)
                    .write(true)
                    .create(true)
                    .truncate(true);
            }
            Mode::Append => {
                options.read(true).write(true).create(true);
            }
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidMode {
            mode: s.to_string(),
        };

        let mut chars = s.chars();
        let mode = match chars.next() {
            Some('r') => Mode::Read,
            Some('w') => Mode::Write,
            Some('a') => Mode::Append,
            _ => return Err(invalid()),
        };

        let mut update = false;
        let mut binary = false;
        for c in chars {
            match c {
                '+' if !update => update = true,
                'b' if !binary => binary = true,
                _ => return Err(invalid()),
            }
        }

        Ok(OpenMode { mode, update })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cases = [
            ("r", Mode::Read, false),
            ("rb", Mode::Read, false),
            ("r+", Mode::Read, true),
            ("w", Mode::Write, false),
            ("w+b", Mode::Write, true),
            ("wb+", Mode::Write, true),
            ("a", Mode::Append, false),
            ("a+", Mode::Append, true),
        ];
        for (s, mode, update) in cases.iter() {
            let m: OpenMode = s.parse().unwrap();
            assert_eq!(m, OpenMode::new(*mode, *update), "{}", s);
        }
    }

    #[test]
    fn test_reject() {
        for s in ["", "x", "rw", "r++", "wbb", "+r"].iter() {
            match s.parse::<OpenMode>() {
                Err(Error::InvalidMode { mode }) => assert_eq!(mode, *s),
                other => panic!("{:?} parsed as {:?}", s, other),
            }
        }
    }

    #[test]
    fn test_access() {
        let r = OpenMode::new(Mode::Read, false);
        assert!(r.readable() && !r.writable());
        let w = OpenMode::new(Mode::Write, false);
        assert!(!w.readable() && w.writable());
        let a = OpenMode::new(Mode::Append, true);
        assert!(a.readable() && a.writable());
    }
}
