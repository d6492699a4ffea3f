use std::convert::TryFrom;

use uuid::Uuid;

use super::errors::Error;

const BASIC_PCM: u16 = 0x0001;
const BASIC_FLOAT: u16 = 0x0003;
const BASIC_ALAW: u16 = 0x0006;
const BASIC_MULAW: u16 = 0x0007;
const BASIC_EXTENDED: u16 = 0xFFFE;

/* RFC 2361 §4:

 WAVE Format IDs are converted to GUIDs by inserting the hexadecimal
   value of the WAVE Format ID into the XXXXXXXX part of the following
   template: {XXXXXXXX-0000-0010-8000-00AA00389B71}.

*/

pub const UUID_PCM: Uuid = Uuid::from_bytes([
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
]);

pub const UUID_FLOAT: Uuid = Uuid::from_bytes([
    0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
]);

/// The sub-format GUID for a basic format tag.
///
/// The bytes are in on-disk order, so the tag occupies the first two bytes
/// in little-endian order.
pub fn uuid_from_basic_tag(tag: u16) -> Uuid {
    let mut bytes = *UUID_PCM.as_bytes();
    bytes[0..2].copy_from_slice(&tag.to_le_bytes());
    Uuid::from_bytes(bytes)
}

/// The basic tag carried in the first two bytes of a sub-format GUID.
pub fn basic_tag_from_uuid(uuid: &Uuid) -> u16 {
    let bytes = uuid.as_bytes();
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Wave format code, the `wFormatTag` field of the `fmt ` chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormatCode {
    /// Integer linear PCM
    Pcm,

    /// IEEE floating-point linear PCM
    IeeeFloat,

    /// ITU G.711 A-law
    ALaw,

    /// ITU G.711 mu-law
    MuLaw,

    /// `WAVE_FORMAT_EXTENSIBLE`, the codec is identified by a sub-format GUID
    Extensible,
}

impl FormatCode {
    /// The on-disk tag value.
    pub fn tag(self) -> u16 {
        match self {
            Self::Pcm => BASIC_PCM,
            Self::IeeeFloat => BASIC_FLOAT,
            Self::ALaw => BASIC_ALAW,
            Self::MuLaw => BASIC_MULAW,
            Self::Extensible => BASIC_EXTENDED,
        }
    }

    /// Whether a `fact` chunk accompanies this code.
    pub fn has_fact_chunk(self) -> bool {
        self != Self::Pcm
    }
}

impl TryFrom<u16> for FormatCode {
    type Error = Error;

    fn try_from(tag: u16) -> Result<Self, Error> {
        match tag {
            BASIC_PCM => Ok(Self::Pcm),
            BASIC_FLOAT => Ok(Self::IeeeFloat),
            BASIC_ALAW => Ok(Self::ALaw),
            BASIC_MULAW => Ok(Self::MuLaw),
            BASIC_EXTENDED => Ok(Self::Extensible),
            tag => Err(Error::UnsupportedFormatTag { tag }),
        }
    }
}

impl From<FormatCode> for u16 {
    fn from(code: FormatCode) -> u16 {
        code.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_tags() {
        assert_eq!(uuid_from_basic_tag(BASIC_PCM), UUID_PCM);
        assert_eq!(uuid_from_basic_tag(BASIC_FLOAT), UUID_FLOAT);
        assert_eq!(basic_tag_from_uuid(&UUID_FLOAT), 3);
        assert_eq!(basic_tag_from_uuid(&uuid_from_basic_tag(0x0050)), 0x0050);
    }

    #[test]
    fn test_tags() {
        for code in [
            FormatCode::Pcm,
            FormatCode::IeeeFloat,
            FormatCode::ALaw,
            FormatCode::MuLaw,
            FormatCode::Extensible,
        ]
        .iter()
        {
            assert_eq!(FormatCode::try_from(code.tag()).unwrap(), *code);
        }

        match FormatCode::try_from(0x0050) {
            Err(Error::UnsupportedFormatTag { tag: 0x0050 }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
