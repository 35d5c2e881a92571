//! The `gf` module implements GF(256) arithmetic for Reed-Solomon coding.
//!
//! The field is generated by the primitive polynomial `x^8 + x^4 + x^3 +
//! x^2 + 1` (0x11D) used by QR codes. Multiplication and division are
//! exponent/log table lookups; the tables are built once per process and
//! are read-only afterwards.

use std::sync::OnceLock;

const PRIMITIVE: u16 = 0x11D;

/// Exponent and log tables over GF(256).
///
/// The exponent table is doubled so `exp[log(a) + log(b)]` never needs a
/// modulo reduction.
pub struct GaloisField {
    exp: [u8; 512],
    log: [u8; 256],
}

impl GaloisField {
    fn build() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        for i in 0..255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }
        Self { exp, log }
    }

    /// The process-wide field context, built on first use.
    pub fn global() -> &'static GaloisField {
        static FIELD: OnceLock<GaloisField> = OnceLock::new();
        FIELD.get_or_init(GaloisField::build)
    }

    /// `α^i`, for `i` up to 510.
    pub fn exp(&self, i: usize) -> u8 {
        self.exp[i]
    }

    /// The discrete log of a non-zero element.
    pub fn log(&self, a: u8) -> usize {
        debug_assert!(a != 0, "log of zero is undefined in GF(256)");
        self.log[a as usize] as usize
    }

    /// Multiplication by table lookup.
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            self.exp[self.log(a) + self.log(b)]
        }
    }

    /// Division by table lookup.
    ///
    /// # Panics
    ///
    /// Dividing by zero is an internal invariant violation, not a
    /// recoverable error, and panics.
    pub fn div(&self, a: u8, b: u8) -> u8 {
        assert!(b != 0, "division by zero in GF(256)");
        if a == 0 {
            0
        } else {
            self.exp[self.log(a) + 255 - self.log(b)]
        }
    }
}
