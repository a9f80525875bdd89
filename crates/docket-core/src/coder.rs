//! Coder: deterministic encoding of serial integers into short strings.
//!
//! Encoding is a pure function of the integer. Uniqueness comes entirely
//! from the serial that produced the integer; the coder adds no randomness.
//!
//! Every alphabet is in ascending ASCII order, so two encodings of the same
//! width compare exactly like the integers they encode. Set a pad width when
//! callers rely on string order (range scans, sorted listings).

use serde::{Deserialize, Serialize};

use crate::error::CoderError;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const CROCKFORD32: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const NO_VALUE: u8 = 255;

/// Largest accepted pad width.
pub const MAX_PAD_WIDTH: usize = 64;

/// Digit set used by a [`Coder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    /// `0-9A-Z`, case-insensitive on decode.
    Base36,
    /// `0-9A-Za-z`, case-sensitive.
    #[default]
    Base62,
    /// Crockford base32: no `I`, `L`, `O`, `U`. Decode accepts lower case and
    /// the usual `O`->0, `I`/`L`->1 aliases.
    Crockford32,
}

impl Alphabet {
    pub fn digits(self) -> &'static [u8] {
        match self {
            Alphabet::Base36 => BASE36,
            Alphabet::Base62 => BASE62,
            Alphabet::Crockford32 => CROCKFORD32,
        }
    }

    pub fn radix(self) -> u64 {
        self.digits().len() as u64
    }

    /// Numeric value of an input byte, or `None` if it is not a digit.
    fn value_of(self, byte: u8) -> Option<u8> {
        let lut = match self {
            Alphabet::Base36 => &BASE36_LOOKUP,
            Alphabet::Base62 => &BASE62_LOOKUP,
            Alphabet::Crockford32 => &CROCKFORD32_LOOKUP,
        };
        match lut[byte as usize] {
            NO_VALUE => None,
            v => Some(v),
        }
    }
}

const fn build_lookup(digits: &[u8], fold_case: bool) -> [u8; 256] {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0;
    while i < digits.len() {
        let c = digits[i];
        lut[c as usize] = i as u8;
        if fold_case && c.is_ascii_uppercase() {
            lut[(c + 32) as usize] = i as u8;
        }
        i += 1;
    }
    lut
}

const BASE36_LOOKUP: [u8; 256] = build_lookup(BASE36, true);
const BASE62_LOOKUP: [u8; 256] = build_lookup(BASE62, false);
const CROCKFORD32_LOOKUP: [u8; 256] = {
    let mut lut = build_lookup(CROCKFORD32, true);
    lut[b'O' as usize] = 0;
    lut[b'o' as usize] = 0;
    lut[b'I' as usize] = 1;
    lut[b'i' as usize] = 1;
    lut[b'L' as usize] = 1;
    lut[b'l' as usize] = 1;
    lut
};

/// Encodes non-negative integers in a fixed alphabet, optionally zero-padded
/// to a fixed width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coder {
    pub alphabet: Alphabet,
    /// Minimum output width. Shorter encodings are left-padded with the zero
    /// digit; longer ones are returned unpadded. At most [`MAX_PAD_WIDTH`].
    #[serde(default)]
    pub pad_width: Option<usize>,
}

impl Coder {
    pub const fn new(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            pad_width: None,
        }
    }

    pub const fn padded(alphabet: Alphabet, width: usize) -> Self {
        Self {
            alphabet,
            pad_width: Some(width),
        }
    }

    /// Smallest pad width that holds every value up to `max` in `alphabet`.
    pub fn width_for(alphabet: Alphabet, max: i64) -> usize {
        let radix = alphabet.radix();
        let mut n = max.max(0) as u64;
        let mut width = 1;
        while n >= radix {
            n /= radix;
            width += 1;
        }
        width
    }

    /// Reject configurations `encode` cannot honor.
    pub fn check(&self) -> Result<(), CoderError> {
        match self.pad_width {
            Some(width) if width > MAX_PAD_WIDTH => Err(CoderError::PadWidth {
                width,
                max: MAX_PAD_WIDTH,
            }),
            _ => Ok(()),
        }
    }

    pub fn encode(&self, value: i64) -> Result<String, CoderError> {
        if value < 0 {
            return Err(CoderError::Negative(value));
        }
        self.check()?;
        let pad = self.pad_width.unwrap_or(0);

        let digits = self.alphabet.digits();
        let radix = self.alphabet.radix();

        // i64::MAX needs 13 base-32 digits; 64 leaves room for any radix >= 2.
        let mut buf = [0u8; 64];
        let mut pos = buf.len();
        let mut n = value as u64;
        loop {
            pos -= 1;
            buf[pos] = digits[(n % radix) as usize];
            n /= radix;
            if n == 0 {
                break;
            }
        }

        let encoded = &buf[pos..];
        let mut out = String::with_capacity(pad.max(encoded.len()));
        for _ in encoded.len()..pad {
            out.push(digits[0] as char);
        }
        // Alphabets are ASCII, so each byte is one char.
        out.extend(encoded.iter().map(|&b| b as char));
        Ok(out)
    }

    /// Inverse of [`encode`](Self::encode). Leading zero digits are accepted.
    pub fn decode(&self, encoded: &str) -> Result<i64, CoderError> {
        if encoded.is_empty() {
            return Err(CoderError::Empty);
        }

        let radix = self.alphabet.radix() as i64;
        let mut acc: i64 = 0;
        for (index, byte) in encoded.bytes().enumerate() {
            let digit = self
                .alphabet
                .value_of(byte)
                .ok_or(CoderError::InvalidChar { byte, index })?;
            acc = acc
                .checked_mul(radix)
                .and_then(|v| v.checked_add(i64::from(digit)))
                .ok_or(CoderError::Overflow)?;
        }
        Ok(acc)
    }
}
