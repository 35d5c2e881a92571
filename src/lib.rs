//! QR code encoder for TOTP provisioning URIs
//!
//! This crate encodes text payloads, typically `otpauth://` provisioning
//! URIs, into QR code symbols: segment encoding, Reed-Solomon error
//! correction, masking and format/version metadata. The output is a module
//! grid; rendering it to an image is left to the caller.
//!
//! ```
//! use otpqr::QrCode;
//!
//! let uri = "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example";
//! let code = QrCode::new(uri).unwrap();
//!
//! // Print the symbol to a terminal.
//! println!("{}", code.to_str('█', ' '));
//! ```

pub mod bits;
pub mod canvas;
pub mod ec;
pub mod gf;
pub mod types;

pub use crate::types::{Color, EcLevel, Mode, QrError, QrResult, TextEncoding, Version};

/// Generation options for [`QrCode::with_options`].
///
/// The defaults match [`QrCode::new`]: byte mode, UTF-8, medium error
/// correction, automatic version and mask selection.
#[derive(Debug, Clone, Copy)]
pub struct QrOptions {
    /// The error correction level.
    pub ec_level: EcLevel,
    /// The symbol version, or `None` to pick the smallest version that
    /// fits the payload.
    pub version: Option<Version>,
    /// The encoding mode, or `None` to classify the payload automatically
    /// (numeric, then alphanumeric, then Kanji or byte).
    pub mode: Option<Mode>,
    /// The character encoding the payload is converted with.
    pub encoding: TextEncoding,
    /// A pinned mask pattern id (0..=7), or `None` to pick the mask with
    /// the lowest penalty score.
    pub mask: Option<u8>,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::M,
            version: None,
            mode: Some(Mode::Byte),
            encoding: TextEncoding::Utf8,
            mask: None,
        }
    }
}

/// A finished QR code symbol.
#[derive(Clone)]
pub struct QrCode {
    content: Vec<Color>,
    version: Version,
    ec_level: EcLevel,
    mask: u8,
    width: usize,
}

impl QrCode {
    /// Constructs a new QR code which encodes the given text in byte mode.
    ///
    /// This method uses the "medium" error correction level and
    /// automatically chooses the smallest version and the best mask.
    ///
    ///     use otpqr::QrCode;
    ///
    ///     let code = QrCode::new("otpauth://totp/A?secret=JBSWY3DP").unwrap();
    ///
    /// # Errors
    ///
    /// Returns error if the QR code cannot be constructed, e.g. when the
    /// text is too long.
    pub fn new(text: &str) -> QrResult<Self> {
        Self::with_options(text, QrOptions::default())
    }

    /// Constructs a new QR code at a specific error correction level,
    /// automatically choosing the smallest version.
    ///
    ///     use otpqr::{QrCode, EcLevel};
    ///
    ///     let code = QrCode::with_error_correction_level("otpauth://totp/A?secret=JBSWY3DP", EcLevel::H).unwrap();
    ///
    /// # Errors
    ///
    /// Returns error if the QR code cannot be constructed, e.g. when the
    /// text is too long.
    pub fn with_error_correction_level(text: &str, ec_level: EcLevel) -> QrResult<Self> {
        Self::with_options(
            text,
            QrOptions {
                ec_level,
                ..QrOptions::default()
            },
        )
    }

    /// Constructs a new QR code for the given version and error correction
    /// level.
    ///
    ///     use otpqr::{QrCode, Version, EcLevel};
    ///
    ///     let version = Version::new(5).unwrap();
    ///     let code = QrCode::with_version("Some data", version, EcLevel::M).unwrap();
    ///
    /// # Errors
    ///
    /// Returns error if the QR code cannot be constructed, e.g. when the
    /// text does not fit the requested version.
    pub fn with_version(text: &str, version: Version, ec_level: EcLevel) -> QrResult<Self> {
        Self::with_options(
            text,
            QrOptions {
                ec_level,
                version: Some(version),
                ..QrOptions::default()
            },
        )
    }

    /// Constructs a new QR code with full control over the generation
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the QR code cannot be constructed, e.g. when the
    /// text is too long, a character cannot be represented in the selected
    /// mode or encoding, or a pinned mask id is above 7.
    pub fn with_options(text: &str, options: QrOptions) -> QrResult<Self> {
        let mode = match options.mode {
            Some(mode) => mode,
            None => bits::classify(text, options.encoding),
        };
        let version = match options.version {
            Some(version) => version,
            None => bits::find_min_version(text, mode, options.encoding, options.ec_level)?,
        };
        let bits = bits::encode_payload(text, version, mode, options.encoding, options.ec_level)?;
        Self::assemble(bits, options.ec_level, options.mask)
    }

    /// Constructs a new QR code from already encoded bits.
    ///
    /// Use this method only if there is a special need to manipulate the
    /// raw bit stream before assembly, e.g. to mix segments of different
    /// modes.
    ///
    /// # Errors
    ///
    /// Returns error if the QR code cannot be constructed, e.g. when the
    /// bits are too long for their version.
    pub fn with_bits(bits: bits::Bits, ec_level: EcLevel) -> QrResult<Self> {
        Self::assemble(bits, ec_level, None)
    }

    /// Runs the matrix assembly pipeline: codeword construction, function
    /// patterns, data placement, masking, then format and version info.
    fn assemble(bits: bits::Bits, ec_level: EcLevel, pinned_mask: Option<u8>) -> QrResult<Self> {
        let version = bits.version();
        let data = bits.into_bytes();
        let (encoded_data, ec_data) = ec::construct_codewords(&data, version, ec_level)?;

        let mut canvas = canvas::Canvas::new(version, ec_level);
        canvas.draw_all_functional_patterns();
        let reserved = canvas::ReservedMask::build(&canvas);
        canvas.draw_data(&encoded_data, &ec_data, &reserved);

        let mask = match pinned_mask {
            Some(mask) if mask > 7 => {
                return Err(QrError::InvalidParameter("mask id must be between 0 and 7"));
            }
            Some(mask) => mask,
            None => canvas.choose_best_mask(&reserved),
        };
        canvas.apply_mask(mask, &reserved);
        canvas.draw_format_bits(mask)?;
        canvas.draw_version_bits()?;

        Ok(Self {
            content: canvas.into_colors(),
            version,
            ec_level,
            mask,
            width: version.width(),
        })
    }

    /// Gets the version of this QR code.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Gets the error correction level of this QR code.
    pub fn error_correction_level(&self) -> EcLevel {
        self.ec_level
    }

    /// Gets the mask pattern id applied to this QR code.
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Gets the number of modules per side of this QR code.
    ///
    /// The width here does not contain the quiet zone paddings.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Converts the QR code to a vector of colors, row by row.
    pub fn to_colors(&self) -> Vec<Color> {
        self.content.clone()
    }

    /// Converts the QR code into a vector of colors, row by row.
    pub fn into_colors(self) -> Vec<Color> {
        self.content
    }

    /// Converts the QR code to a vector of booleans, `true` for dark
    /// modules, row by row.
    pub fn to_vec(&self) -> Vec<bool> {
        self.content
            .iter()
            .map(|color| *color == Color::Dark)
            .collect()
    }

    /// Converts the QR code into a human-readable string.
    pub fn to_str(&self, dark: char, light: char) -> String {
        let mut s = String::with_capacity(self.width * (self.width + 1));
        for y in 0..self.width {
            for x in 0..self.width {
                s.push(self.content[y * self.width + x].select(dark, light));
            }
            s.push('\n');
        }
        s
    }
}

#[cfg(test)]
mod qrcode_tests {
    use super::*;

    #[test]
    fn test_new_small_payload() {
        let code = QrCode::new("HELLO").unwrap();
        assert_eq!(code.version().number(), 1);
        assert_eq!(code.error_correction_level(), EcLevel::M);
        assert_eq!(code.width(), 21);
        assert_eq!(code.to_vec().len(), 441);
        assert!(code.mask() < 8);
    }

    #[test]
    fn test_provisioning_uri() {
        let uri =
            "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example";
        let code = QrCode::new(uri).unwrap();
        // 79 bytes of payload plus the segment header exceed the 64 data
        // codewords of version 4 at level M.
        assert!(code.version().number() >= 5);
        let grid = code.to_vec();
        assert_eq!(grid.len(), code.width() * code.width());
        // The top-left finder corner is always dark.
        assert!(grid[0]);
    }

    #[test]
    fn test_auto_everything_keeps_dark_module() {
        let code = QrCode::with_options(
            "HELLO WORLD",
            QrOptions {
                ec_level: EcLevel::Q,
                mode: None,
                ..QrOptions::default()
            },
        )
        .unwrap();
        let width = code.width();
        assert!(width >= 21 && width % 2 == 1);
        // The dark module at (8, width - 8) survives whichever mask wins.
        assert!(code.to_vec()[(width - 8) * width + 8]);
    }

    #[test]
    fn test_deterministic() {
        let a = QrCode::new("otpauth://totp/A?secret=JBSWY3DP").unwrap();
        let b = QrCode::new("otpauth://totp/A?secret=JBSWY3DP").unwrap();
        assert_eq!(a.to_vec(), b.to_vec());
        assert_eq!(a.mask(), b.mask());
    }

    #[test]
    fn test_with_version_pins_version() {
        let version = Version::new(10).unwrap();
        let code = QrCode::with_version("pinned", version, EcLevel::Q).unwrap();
        assert_eq!(code.version(), version);
        assert_eq!(code.width(), 57);
    }

    #[test]
    fn test_with_version_overflow() {
        let text = "A".repeat(200);
        let version = Version::new(1).unwrap();
        assert_eq!(
            QrCode::with_version(&text, version, EcLevel::M).err(),
            Some(QrError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_pinned_mask() {
        for mask in 0..8 {
            let code = QrCode::with_options(
                "MASKED",
                QrOptions {
                    mask: Some(mask),
                    ..QrOptions::default()
                },
            )
            .unwrap();
            assert_eq!(code.mask(), mask);
        }
    }

    #[test]
    fn test_pinned_mask_out_of_range() {
        let result = QrCode::with_options(
            "MASKED",
            QrOptions {
                mask: Some(8),
                ..QrOptions::default()
            },
        );
        assert!(matches!(result, Err(QrError::InvalidParameter(_))));
    }

    #[test]
    fn test_auto_mode_picks_numeric() {
        let code = QrCode::with_options(
            "1234567890",
            QrOptions {
                mode: None,
                ..QrOptions::default()
            },
        )
        .unwrap();
        // Ten digits take 48 bits in numeric mode, well inside version 1.
        assert_eq!(code.version().number(), 1);
    }

    #[test]
    fn test_version_info_symbol() {
        // Version 7 is the first to carry the BCH-protected version info.
        let version = Version::new(7).unwrap();
        let code = QrCode::with_version("with version info", version, EcLevel::M).unwrap();
        let width = code.width();
        assert_eq!(width, 45);
        let grid = code.to_vec();
        // 0x07C94 bit 0 is placed at (width - 11, 0) and mirrored.
        assert!(!grid[width - 11]);
        assert!(!grid[(width - 11) * width]);
    }

    #[test]
    fn test_utf16_payload() {
        let code = QrCode::with_options(
            "токен",
            QrOptions {
                mode: None,
                encoding: TextEncoding::Utf16Be,
                ..QrOptions::default()
            },
        )
        .unwrap();
        assert!(code.width() >= 21);
    }

    #[test]
    fn test_to_str_shape() {
        let code = QrCode::new("x").unwrap();
        let s = code.to_str('#', '.');
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 21);
        assert!(lines.iter().all(|line| line.chars().count() == 21));
        // Finder pattern border.
        assert!(lines[0].starts_with("#######"));
        assert!(lines[0].ends_with("#######"));
    }
}
