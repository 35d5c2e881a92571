//! The `bits` module encodes a text payload into the raw data bit stream
//! of a QR code: mode indicator, character count, mode-specific payload
//! bits, terminator and pad codewords.
//!
//! It also hosts the version sizer, which classifies a payload into an
//! encoding mode and scans for the smallest version that can hold it.

use core::cmp::min;

use crate::ec;
use crate::types::{EcLevel, Mode, QrError, QrResult, TextEncoding, Version};

/// The `Bits` structure stores the encoded data stream for a QR code.
///
/// Bits are appended MSB-first and consumed exactly once into codewords by
/// [`Bits::into_bytes`].
pub struct Bits {
    data: Vec<u8>,
    bit_len: usize,
    version: Version,
}

impl Bits {
    /// Constructs a new, empty bits structure.
    pub fn new(version: Version) -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            version,
        }
    }

    fn push_bit(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 1 << (7 - offset);
        }
        self.bit_len += 1;
    }

    /// Pushes an N-bit big-endian integer to the end of the bits.
    ///
    /// Note: It is up to the caller to ensure that `number` really only is
    /// `n` bits in size. Otherwise the excess bits are dropped.
    fn push_number(&mut self, n: usize, number: u16) {
        debug_assert!(
            n == 16 || n < 16 && number < (1 << n),
            "{number} is too big as a {n}-bit number"
        );
        for i in (0..n).rev() {
            self.push_bit(number >> i & 1 != 0);
        }
    }

    /// Pushes an N-bit big-endian integer, checking that the number fits.
    ///
    /// Returns `Err(QrError::PayloadTooLarge)` on overflow, since the only
    /// caller-visible way to overflow an indicator is an oversized payload.
    pub fn push_number_checked(&mut self, n: usize, number: usize) -> QrResult<()> {
        if n > 16 || number >= 1 << n {
            Err(QrError::PayloadTooLarge)
        } else {
            self.push_number(n, number as u16);
            Ok(())
        }
    }

    /// Reserves `n` extra bits of space for pushing.
    fn reserve(&mut self, n: usize) {
        let extra_bytes = (n + 7) / 8;
        self.data.reserve(extra_bytes);
    }

    /// Convert the bits into a bytes vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Total number of bits currently pushed.
    pub fn len(&self) -> usize {
        self.bit_len
    }

    /// Whether there are any bits pushed.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// The maximum number of data bits allowed by the provided QR code
    /// version and error correction level.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::UnknownCapacityEntry)` if the capacity table
    /// has no entry for the pair.
    pub fn max_len(&self, ec_level: EcLevel) -> QrResult<usize> {
        Ok(ec::capacity(self.version, ec_level)?.total_data * 8)
    }

    /// Version of the QR code.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Push the four-bit mode indicator to the end of the bits.
    pub fn push_mode_indicator(&mut self, mode: Mode) {
        let number = match mode {
            Mode::Numeric => 0b0001,
            Mode::Alphanumeric => 0b0010,
            Mode::Byte => 0b0100,
            Mode::Kanji => 0b1000,
            Mode::Eci => 0b0111,
        };
        self.push_number(4, number);
    }

    /// Push an ECI designator: the ECI mode indicator followed by the
    /// single-byte assignment number.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::UnsupportedEncoding)` for assignment numbers
    /// above 127, which do not fit the single-byte designator form.
    pub fn push_eci_designator(&mut self, assignment: u8) -> QrResult<()> {
        if assignment > 127 {
            return Err(QrError::UnsupportedEncoding);
        }
        self.push_mode_indicator(Mode::Eci);
        self.push_number(8, u16::from(assignment));
        Ok(())
    }

    fn push_header(&mut self, mode: Mode, raw_data_len: usize) -> QrResult<()> {
        let length_bits = mode.length_bits_count(self.version);
        self.reserve(length_bits + 4 + mode.data_bits_count(raw_data_len));
        self.push_mode_indicator(mode);
        self.push_number_checked(length_bits, raw_data_len)?;
        Ok(())
    }
}

/// Mode::Numeric mode
impl Bits {
    /// Encodes a numeric string to the bits: groups of 3 digits become 10
    /// bits, a trailing pair 7 bits, a trailing digit 4 bits.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::InvalidCharacter)` if the data contains a
    /// non-digit, and `Err(QrError::PayloadTooLarge)` on overflow.
    pub fn push_numeric_data(&mut self, data: &[u8]) -> QrResult<()> {
        if !data.iter().all(u8::is_ascii_digit) {
            return Err(QrError::InvalidCharacter);
        }
        self.push_header(Mode::Numeric, data.len())?;
        for chunk in data.chunks(3) {
            let number = chunk
                .iter()
                .map(|b| u16::from(*b - b'0'))
                .fold(0, |a, b| a * 10 + b);
            let length = chunk.len() * 3 + 1;
            self.push_number(length, number);
        }
        Ok(())
    }
}

/// Mode::Alphanumeric mode

/// In QR code `Mode::Alphanumeric` mode, a pair of characters is encoded
/// as a base-45 integer. `alphanumeric_digit` converts each character into
/// its corresponding base-45 digit.
///
/// The conversion is specified in ISO/IEC 18004:2006, §8.4.3, Table 5.
#[inline]
fn alphanumeric_digit(character: u8) -> Option<u16> {
    let digit = match character {
        b'0'..=b'9' => u16::from(character - b'0'),
        b'A'..=b'Z' => u16::from(character - b'A') + 10,
        b' ' => 36,
        b'$' => 37,
        b'%' => 38,
        b'*' => 39,
        b'+' => 40,
        b'-' => 41,
        b'.' => 42,
        b'/' => 43,
        b':' => 44,
        _ => return None,
    };
    Some(digit)
}

impl Bits {
    /// Encodes an alphanumeric string to the bits: pairs map to
    /// `45·index(a) + index(b)` in 11 bits, a trailing single character to
    /// 6 bits.
    ///
    /// The data should only contain the characters A to Z (excluding
    /// lowercase), 0 to 9, space, `$`, `%`, `*`, `+`, `-`, `.`, `/` or `:`.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::InvalidCharacter)` on a character outside that
    /// set, and `Err(QrError::PayloadTooLarge)` on overflow.
    pub fn push_alphanumeric_data(&mut self, data: &[u8]) -> QrResult<()> {
        if !data.iter().all(|b| alphanumeric_digit(*b).is_some()) {
            return Err(QrError::InvalidCharacter);
        }
        self.push_header(Mode::Alphanumeric, data.len())?;
        for chunk in data.chunks(2) {
            let number = chunk
                .iter()
                .filter_map(|b| alphanumeric_digit(*b))
                .fold(0, |a, b| a * 45 + b);
            let length = chunk.len() * 5 + 1;
            self.push_number(length, number);
        }
        Ok(())
    }
}

/// Mode::Byte mode

impl Bits {
    /// Encodes 8-bit byte data to the bits, MSB-first.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::PayloadTooLarge)` on overflow.
    pub fn push_byte_data(&mut self, data: &[u8]) -> QrResult<()> {
        self.push_header(Mode::Byte, data.len())?;
        for b in data {
            self.push_number(8, u16::from(*b));
        }
        Ok(())
    }
}

/// Mode::Kanji mode

impl Bits {
    /// Encodes Shift_JIS double-byte data to the bits, 13 bits per
    /// character.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::InvalidCharacter)` if the data is not a whole
    /// number of Shift_JIS double-byte pairs, or a pair falls outside the
    /// ranges 0x8140..=0x9FFC and 0xE040..=0xEBBF.
    ///
    /// Returns `Err(QrError::PayloadTooLarge)` on overflow.
    pub fn push_kanji_data(&mut self, data: &[u8]) -> QrResult<()> {
        if data.len() % 2 != 0 {
            return Err(QrError::InvalidCharacter);
        }
        self.push_header(Mode::Kanji, data.len() / 2)?;
        for kanji in data.chunks(2) {
            let cp = u16::from(kanji[0]) << 8 | u16::from(kanji[1]);
            let offset = match cp {
                0x8140..=0x9FFC => cp - 0x8140,
                0xE040..=0xEBBF => cp - 0xC140,
                _ => return Err(QrError::InvalidCharacter),
            };
            let number = (offset >> 8) * 0xC0 + (offset & 0xFF);
            self.push_number(13, number);
        }
        Ok(())
    }
}

/// Terminator and padding

impl Bits {
    /// Pushes the ending bits: up to 4 zero terminator bits clamped to the
    /// remaining capacity, zero padding to a codeword boundary, then
    /// alternating 0xEC/0x11 pad codewords up to the version's data
    /// codeword count.
    ///
    /// # Errors
    ///
    /// Returns `Err(QrError::PayloadTooLarge)` if the stream already
    /// exceeds the capacity, and `Err(QrError::UnknownCapacityEntry)` for a
    /// missing capacity table entry.
    pub fn push_terminator(&mut self, ec_level: EcLevel) -> QrResult<()> {
        let total_data = ec::capacity(self.version, ec_level)?.total_data;
        let data_bits = total_data * 8;
        if self.len() > data_bits {
            return Err(QrError::PayloadTooLarge);
        }

        let terminator_size = min(4, data_bits - self.len());
        if terminator_size > 0 {
            self.push_number(terminator_size, 0);
        }
        while self.bit_len % 8 != 0 {
            self.push_bit(false);
        }

        const PADDING_BYTES: &[u8] = &[0b1110_1100, 0b0001_0001];
        let padding_count = total_data.saturating_sub(self.data.len());
        let padding = PADDING_BYTES.iter().cloned().cycle().take(padding_count);
        self.data.extend(padding);

        // Safety net only; the capacity check above keeps this from ever
        // cutting real codewords.
        self.data.truncate(total_data);
        self.bit_len = self.data.len() * 8;
        Ok(())
    }
}

/// Converts a text payload to bytes under the selected text encoding.
///
/// # Errors
///
/// Returns `Err(QrError::InvalidCharacter)` for a code point above U+00FF
/// under ISO-8859-1 or a character Shift_JIS cannot map, and
/// `Err(QrError::EncodingUnavailable)` when the build lacks Shift_JIS
/// support.
pub fn encode_text(text: &str, encoding: TextEncoding) -> QrResult<Vec<u8>> {
    match encoding {
        TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        TextEncoding::Iso8859_1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).or(Err(QrError::InvalidCharacter)))
            .collect(),
        TextEncoding::Utf16Be => Ok(text
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect()),
        TextEncoding::ShiftJis => shift_jis_bytes(text),
    }
}

#[cfg(feature = "shift-jis")]
fn shift_jis_bytes(text: &str) -> QrResult<Vec<u8>> {
    let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
    if had_errors {
        return Err(QrError::InvalidCharacter);
    }
    Ok(bytes.into_owned())
}

#[cfg(not(feature = "shift-jis"))]
fn shift_jis_bytes(_text: &str) -> QrResult<Vec<u8>> {
    Err(QrError::EncodingUnavailable)
}

/// Version sizer

/// Classifies a payload into the densest mode that can represent it:
/// numeric if every character is a digit, alphanumeric if every character
/// is in the 45-symbol set, kanji for a non-empty Shift_JIS payload, byte
/// for the encodings readable without an ECI designator, and eci
/// otherwise.
pub fn classify(text: &str, encoding: TextEncoding) -> Mode {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return Mode::Numeric;
    }
    if !text.is_empty() && text.bytes().all(|b| alphanumeric_digit(b).is_some()) {
        return Mode::Alphanumeric;
    }
    match encoding {
        TextEncoding::ShiftJis if !text.is_empty() => Mode::Kanji,
        TextEncoding::Utf8 | TextEncoding::Iso8859_1 => Mode::Byte,
        _ => Mode::Eci,
    }
}

/// Approximates the payload's codeword footprint for version selection:
/// ⌈n/3⌉ for numeric, ⌈n/2⌉ for alphanumeric, two codewords per kanji,
/// the encoded byte length for byte mode, and one extra codeword for an
/// ECI designator.
pub fn estimated_codewords(text: &str, mode: Mode, encoding: TextEncoding) -> QrResult<usize> {
    let estimate = match mode {
        Mode::Numeric => (text.len() + 2) / 3,
        Mode::Alphanumeric => (text.len() + 1) / 2,
        Mode::Kanji => text.chars().count() * 2,
        Mode::Byte => encode_text(text, encoding)?.len(),
        Mode::Eci => 1 + encode_text(text, encoding)?.len(),
    };
    Ok(estimate)
}

/// Scans versions 1..=40 in ascending order and returns the first whose
/// data capacity covers the payload's estimated codeword count.
///
/// # Errors
///
/// Returns `Err(QrError::PayloadTooLarge)` if no version fits.
pub fn find_min_version(
    text: &str,
    mode: Mode,
    encoding: TextEncoding,
    ec_level: EcLevel,
) -> QrResult<Version> {
    let estimate = estimated_codewords(text, mode, encoding)?;
    for number in Version::MIN..=Version::MAX {
        let version = Version::new(number)?;
        if ec::capacity(version, ec_level)?.total_data >= estimate {
            return Ok(version);
        }
    }
    Err(QrError::PayloadTooLarge)
}

/// Encodes a payload into a terminated bit stream for the given version.
///
/// An ECI designator is prepended when the text encoding requires one or
/// when `Mode::Eci` is requested explicitly; an explicit `Mode::Eci`
/// carries the payload as a byte segment under the requested encoding.
///
/// # Errors
///
/// Propagates conversion errors ([`encode_text`]) and capacity errors
/// ([`Bits::push_terminator`]).
pub fn encode_payload(
    text: &str,
    version: Version,
    mode: Mode,
    encoding: TextEncoding,
    ec_level: EcLevel,
) -> QrResult<Bits> {
    let mut bits = Bits::new(version);
    if encoding.needs_eci() || mode == Mode::Eci {
        bits.push_eci_designator(encoding.eci_assignment())?;
    }
    match mode {
        Mode::Numeric => bits.push_numeric_data(text.as_bytes())?,
        Mode::Alphanumeric => bits.push_alphanumeric_data(text.as_bytes())?,
        Mode::Byte | Mode::Eci => {
            let bytes = encode_text(text, encoding)?;
            bits.push_byte_data(&bytes)?;
        }
        Mode::Kanji => {
            let bytes = encode_text(text, TextEncoding::ShiftJis)?;
            bits.push_kanji_data(&bytes)?;
        }
    }
    bits.push_terminator(ec_level)?;
    Ok(bits)
}

#[test]
fn test_push_number() {
    let mut bits = Bits::new(Version::new(1).unwrap());

    bits.push_number(3, 0b010); // 0:0 .. 0:3
    bits.push_number(3, 0b110); // 0:3 .. 0:6
    bits.push_number(3, 0b101); // 0:6 .. 1:1
    bits.push_number(7, 0b001_1010); // 1:1 .. 2:0
    bits.push_number(4, 0b1100); // 2:0 .. 2:4
    bits.push_number(12, 0b1011_0110_1101); // 2:4 .. 4:0
    bits.push_number(10, 0b01_1001_0001); // 4:0 .. 5:2
    bits.push_number(15, 0b111_0010_1110_0011); // 5:2 .. 7:1

    let bytes = bits.into_bytes();

    assert_eq!(
        bytes,
        vec![
            0b0101_1010, // 90
            0b1001_1010, // 154
            0b1100_1011, // 203
            0b0110_1101, // 109
            0b0110_0100, // 100
            0b0111_1001, // 121
            0b0111_0001, // 113
            0b1000_0000, // 128
        ]
    );
}







#[cfg(test)]
mod terminator_tests {
    use super::*;
    use crate::types::EcLevel::M;

    #[test]
    fn test_hello_alphanumeric_v1_m() {
        let bits = encode_payload(
            "HELLO",
            Version::new(1).unwrap(),
            Mode::Alphanumeric,
            TextEncoding::Utf8,
            M,
        )
        .unwrap();
        let bytes = bits.into_bytes();
        assert_eq!(bytes.len(), 16);
        // Leading four bits are the alphanumeric mode indicator.
        assert_eq!(bytes[0] >> 4, 0b0010);
        assert_eq!(
            bytes,
            vec![
                0x20, 0x2B, 0x0B, 0x78, 0xCC, 0x00, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC,
                0x11, 0xEC, 0x11
            ]
        );
    }

    #[test]
    fn test_terminator_clamped_when_full() {
        // 14 bytes in byte mode leave 128 - 124 = 4 bits free; a nearly
        // full stream clamps the terminator instead of overflowing.
        let mut bits = Bits::new(Version::new(1).unwrap());
        bits.push_byte_data(&[0xAB; 14]).unwrap();
        assert_eq!(bits.len(), 4 + 8 + 112);
        assert_eq!(bits.push_terminator(M), Ok(()));
        let bytes = bits.into_bytes();
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut bits = Bits::new(Version::new(1).unwrap());
        bits.push_byte_data(&[0xAB; 20]).unwrap();
        assert_eq!(bits.push_terminator(M), Err(QrError::PayloadTooLarge));
    }

    #[test]
    fn test_eci_designator_layout() {
        let bits = encode_payload(
            "AB",
            Version::new(1).unwrap(),
            Mode::Eci,
            TextEncoding::Utf16Be,
            M,
        )
        .unwrap();
        let bytes = bits.into_bytes();
        // 0111 (ECI) + 0001_1001 (assignment 25) + 0100 (byte mode)
        assert_eq!(bytes[0], 0x71);
        assert_eq!(bytes[1], 0x94);
        // character count 4, then the UTF-16BE payload
        assert_eq!(bytes[2], 0x04);
        assert_eq!(&bytes[3..7], &[0x00, 0x41, 0x00, 0x42]);
    }
}
