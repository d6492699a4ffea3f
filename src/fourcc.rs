use std::fmt::Debug;
use std::io;

/// A Four-character Code
///
/// Identifies a chunk within a RIFF container.
#[derive(Eq, PartialEq, Hash, Copy, Clone)]
pub struct FourCC([u8; 4]);

impl FourCC {
    pub const fn make(s: &[u8; 4]) -> Self {
        Self(*s)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }
}

impl From<FourCC> for [u8; 4] {
    fn from(fourcc: FourCC) -> Self {
        fourcc.0
    }
}

impl From<FourCC> for String {
    fn from(f: FourCC) -> Self {
        f.0.iter().map(|b| *b as char).collect()
    }
}

impl Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: String = (*self).into();
        write!(f, "FourCC({})", s)
    }
}

pub trait ReadFourCC: io::Read {
    fn read_fourcc(&mut self) -> Result<FourCC, io::Error>;
}

pub trait WriteFourCC: io::Write {
    fn write_fourcc(&mut self, fourcc: FourCC) -> Result<(), io::Error>;
}

impl<T> ReadFourCC for T
where
    T: io::Read,
{
    fn read_fourcc(&mut self) -> Result<FourCC, io::Error> {
        let mut buf: [u8; 4] = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(FourCC::from(buf))
    }
}

impl<T> WriteFourCC for T
where
    T: io::Write,
{
    fn write_fourcc(&mut self, fourcc: FourCC) -> Result<(), io::Error> {
        self.write_all(fourcc.as_bytes())
    }
}

pub const RIFF_SIG: FourCC = FourCC::make(b"RIFF");
pub const WAVE_SIG: FourCC = FourCC::make(b"WAVE");

pub const FMT__SIG: FourCC = FourCC::make(b"fmt ");
pub const FACT_SIG: FourCC = FourCC::make(b"fact");
pub const DATA_SIG: FourCC = FourCC::make(b"data");

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_to_string() {
        let a = FourCC::make(b"fmt ");
        let s: String = a.into();
        assert_eq!(s, "fmt ");
        assert_eq!(format!("{:?}", a), "FourCC(fmt )");
    }

    #[test]
    fn test_read_write() {
        let mut cursor = Cursor::new(vec![]);
        cursor.write_fourcc(DATA_SIG).unwrap();
        assert_eq!(cursor.get_ref().as_slice(), b"data");

        cursor.set_position(0);
        assert_eq!(cursor.read_fourcc().unwrap(), DATA_SIG);
        assert!(cursor.read_fourcc().is_err());
    }
}
