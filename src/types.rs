use core::ops::Not;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum QrError {
    /// The payload does not fit any version at the requested error
    /// correction level.
    #[error("payload too large for every QR code version at this error correction level")]
    PayloadTooLarge,

    /// A caller-supplied parameter is out of range, e.g. a mask id above 7
    /// or a version outside 1..=40.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The requested text encoding cannot be used for this operation, e.g.
    /// ECI was requested for an encoding with no known assignment.
    #[error("unsupported text encoding")]
    UnsupportedEncoding,

    /// A character cannot be represented in the selected mode or text
    /// encoding.
    #[error("invalid character for the selected mode or encoding")]
    InvalidCharacter,

    /// The build lacks Shift_JIS conversion support (`shift-jis` feature).
    #[error("Shift_JIS conversion is not available in this build")]
    EncodingUnavailable,

    /// The capacity table has no entry for this version / level pair.
    #[error("no capacity entry for version {version} at level {ec_level:?}")]
    UnknownCapacityEntry { version: u8, ec_level: EcLevel },
}

/// `QrResult` is a convenient alias for a QR code generation result.
pub type QrResult<T> = Result<T, QrError>;

/// The color of a finished module.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Color {
    /// The module is light colored.
    Light,
    /// The module is dark colored.
    Dark,
}

impl Color {
    /// Selects a value according to color of the module. Equivalent to
    /// `if self != Color::Light { dark } else { light }`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use otpqr::types::Color;
    /// assert_eq!(Color::Light.select(1, 0), 0);
    /// assert_eq!(Color::Dark.select("black", "white"), "black");
    /// ```
    pub fn select<T>(self, dark: T, light: T) -> T {
        match self {
            Color::Light => light,
            Color::Dark => dark,
        }
    }
}

impl Not for Color {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Color::Light => Color::Dark,
            Color::Dark => Color::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcLevel {
    /// Low error correction. Allows up to 7% of wrong blocks.
    L = 0,

    /// Medium error correction (default). Allows up to 15% of wrong blocks.
    M = 1,

    /// "Quartile" error correction. Allows up to 25% of wrong blocks.
    Q = 2,

    /// High error correction. Allows up to 30% of wrong blocks.
    H = 3,
}

/// A QR code version. The wrapped number is between 1 and 40.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u8);

impl Version {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 40;

    /// Wraps a version number after range checking it.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::InvalidParameter)` if the number is outside
    /// 1..=40.
    pub fn new(version: u8) -> QrResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&version) {
            Ok(Self(version))
        } else {
            Err(QrError::InvalidParameter("version must be between 1 and 40"))
        }
    }

    /// The version number itself.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Get the number of modules on each side of the QR code,
    /// i.e. `21 + 4·(version − 1)`.
    pub fn width(self) -> usize {
        self.0 as usize * 4 + 17
    }

    /// Obtains an object from a hard-coded table indexed by version and
    /// error correction level, in the order [L, M, Q, H].
    pub fn fetch<T>(self, ec_level: EcLevel, table: &[[T; 4]; 40]) -> T
    where
        T: Copy,
    {
        table[(self.0 - 1) as usize][ec_level as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    /// An ECI designator followed by a byte segment under the requested
    /// text encoding.
    Eci,
}

impl Mode {
    /// Computes the number of bits needed to encode the data length.
    ///
    ///     use otpqr::types::{Version, Mode};
    ///
    ///     let v1 = Version::new(1).unwrap();
    ///     assert_eq!(Mode::Numeric.length_bits_count(v1), 10);
    ///
    /// The version groups break at 9 and 26. An `Eci` segment carries its
    /// payload as a byte segment, so it uses the byte-mode widths.
    pub fn length_bits_count(self, version: Version) -> usize {
        match version.number() {
            1..=9 => match self {
                Mode::Numeric => 10,
                Mode::Alphanumeric => 9,
                Mode::Byte | Mode::Eci | Mode::Kanji => 8,
            },
            10..=26 => match self {
                Mode::Numeric => 12,
                Mode::Alphanumeric => 11,
                Mode::Byte | Mode::Eci => 16,
                Mode::Kanji => 10,
            },
            _ => match self {
                Mode::Numeric => 14,
                Mode::Alphanumeric => 13,
                Mode::Byte | Mode::Eci => 16,
                Mode::Kanji => 12,
            },
        }
    }

    /// Computes the number of bits needed for data of a given raw length.
    ///
    ///     use otpqr::types::Mode;
    ///
    ///     assert_eq!(Mode::Numeric.data_bits_count(7), 24);
    ///
    /// Note that in Kanji mode, the `raw_data_len` is the number of Kanjis,
    /// i.e. half the total size of bytes.
    pub fn data_bits_count(self, raw_data_len: usize) -> usize {
        match self {
            Mode::Numeric => (raw_data_len * 10 + 2) / 3,
            Mode::Alphanumeric => (raw_data_len * 11 + 1) / 2,
            Mode::Byte | Mode::Eci => raw_data_len * 8,
            Mode::Kanji => raw_data_len * 13,
        }
    }
}

/// The character set a text payload is converted with before byte or Kanji
/// mode encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    /// UTF-8 (default). Needs no ECI designator.
    #[default]
    Utf8,
    /// ISO-8859-1, byte-for-byte for code points up to U+00FF. Needs no ECI
    /// designator.
    Iso8859_1,
    /// UTF-16 big-endian.
    Utf16Be,
    /// Shift_JIS, available when the `shift-jis` feature is enabled.
    ShiftJis,
}

impl TextEncoding {
    /// The ECI assignment number registered for this encoding.
    pub fn eci_assignment(self) -> u8 {
        match self {
            TextEncoding::Iso8859_1 => 3,
            TextEncoding::ShiftJis => 20,
            TextEncoding::Utf16Be => 25,
            TextEncoding::Utf8 => 26,
        }
    }

    /// Whether a segment in this encoding must be preceded by an ECI
    /// designator. UTF-8 and ISO-8859-1 are assumed readable without one.
    pub fn needs_eci(self) -> bool {
        !matches!(self, TextEncoding::Utf8 | TextEncoding::Iso8859_1)
    }
}
