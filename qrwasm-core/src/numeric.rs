//! Integer and float encodings layered on the bit stream.
//!
//! Four families of encodings, all MSB-first within their fields:
//!
//! - fixed-width unsigned / sign-magnitude signed (provided by
//!   [`BitWriter::write_bits_unsigned`] and friends),
//! - tagged: a 6-bit width field followed by the value in that many bits,
//! - grouped LEB: `group`-bit chunks emitted least-significant first, each
//!   chunk followed by a continuation bit (1 = more chunks, 0 = last),
//! - IEEE floats with the low mantissa bits trimmed.
//!
//! Signed variants always lead with a single sign bit (1 = negative) and
//! encode the magnitude with the unsigned scheme. Magnitudes are taken with
//! `unsigned_abs`, so `i64::MIN` never overflows; it is still refused by the
//! tagged encodings because its 64-bit magnitude cannot be described by a
//! 6-bit width field.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{QrWasmError, Result};

/// Width of the tag field in tagged encodings.
pub const TAG_WIDTH_BITS: u8 = 6;

/// Minimum number of bits that hold the magnitude of `value`.
///
/// Defined as 1 for zero, so every value occupies at least one bit in the
/// fixed and tagged schemes.
pub fn required_bits(value: i64) -> u8 {
    required_bits_unsigned(value.unsigned_abs())
}

/// Minimum number of bits that hold `value`; 1 for zero.
pub fn required_bits_unsigned(value: u64) -> u8 {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros()) as u8
    }
}

/// Number of bits an unsigned LEB write of `value` occupies.
pub fn leb_bit_len_unsigned(value: u64, group: u8) -> u64 {
    let mut chunks = 1u64;
    let mut rest = value >> group;
    while rest != 0 {
        chunks += 1;
        rest >>= group;
    }
    chunks * (group as u64 + 1)
}

impl BitWriter {
    /// Write a 6-bit width field followed by `value` in that many bits.
    ///
    /// The width is the minimal one, so readers recover it exactly.
    pub fn write_tagged_unsigned(&mut self, value: u64) -> Result<()> {
        let width = required_bits_unsigned(value);
        if width > 63 {
            return Err(QrWasmError::unsupported(
                "value magnitude needs 64 bits, beyond the 6-bit width tag",
            ));
        }
        self.write_bits_unsigned(width as u64, TAG_WIDTH_BITS);
        self.write_bits_unsigned(value, width);
        Ok(())
    }

    /// Write a 6-bit width field, a sign bit, and the magnitude.
    pub fn write_tagged_signed(&mut self, value: i64) -> Result<()> {
        let width = required_bits(value);
        if width > 63 {
            return Err(QrWasmError::unsupported(
                "value magnitude needs 64 bits, beyond the 6-bit width tag",
            ));
        }
        self.write_bits_unsigned(width as u64, TAG_WIDTH_BITS);
        self.write_bits_signed(value, width);
        Ok(())
    }

    /// Write `value` as grouped LEB: `group`-bit chunks low-first, each
    /// followed by a continuation bit. Zero still emits one chunk.
    pub fn write_leb_unsigned(&mut self, value: u64, group: u8) {
        debug_assert!((1..=32).contains(&group));
        let mut rest = value;
        loop {
            let chunk = rest & ((1u64 << group) - 1);
            rest >>= group;
            self.write_bits_unsigned(chunk, group);
            self.write_bit(rest != 0);
            if rest == 0 {
                break;
            }
        }
    }

    /// Write a sign bit, then the magnitude as grouped LEB.
    pub fn write_leb_signed(&mut self, value: i64, group: u8) {
        self.write_bit(value < 0);
        self.write_leb_unsigned(value.unsigned_abs(), group);
    }

    /// Write an `f32` bit pattern with the `trim` lowest mantissa bits
    /// discarded.
    pub fn write_f32_trimmed(&mut self, value: f32, trim: u8) {
        debug_assert!(trim <= 23, "cannot trim past the f32 mantissa");
        self.write_bits_unsigned((value.to_bits() >> trim) as u64, 32 - trim);
    }

    /// Write an `f64` bit pattern with the `trim` lowest mantissa bits
    /// discarded.
    pub fn write_f64_trimmed(&mut self, value: f64, trim: u8) {
        debug_assert!(trim <= 52, "cannot trim past the f64 mantissa");
        self.write_bits_unsigned(value.to_bits() >> trim, 64 - trim);
    }
}

impl BitReader<'_> {
    /// Read a tagged unsigned value; returns `(value, stored_width)`.
    pub fn read_tagged_unsigned(&mut self) -> Result<(u64, u8)> {
        let width = self.read_bits_unsigned(TAG_WIDTH_BITS)? as u8;
        let value = self.read_bits_unsigned(width)?;
        Ok((value, width))
    }

    /// Read a tagged signed value.
    pub fn read_tagged_signed(&mut self) -> Result<i64> {
        let width = self.read_bits_unsigned(TAG_WIDTH_BITS)? as u8;
        self.read_bits_signed(width)
    }

    /// Read a grouped LEB unsigned value.
    pub fn read_leb_unsigned(&mut self, group: u8) -> Result<u64> {
        let mut out = 0u64;
        let mut offset = 0u32;
        loop {
            let chunk = self.read_bits_unsigned(group)?;
            if offset >= 64 {
                if chunk != 0 {
                    return Err(QrWasmError::corrupt(
                        self.bit_position(),
                        "LEB value exceeds 64 bits",
                    ));
                }
            } else {
                if offset + group as u32 > 64 && (chunk >> (64 - offset)) != 0 {
                    return Err(QrWasmError::corrupt(
                        self.bit_position(),
                        "LEB value exceeds 64 bits",
                    ));
                }
                out |= chunk << offset;
            }
            offset += group as u32;
            if !self.read_bit()? {
                break;
            }
        }
        Ok(out)
    }

    /// Read a sign bit, then a grouped LEB magnitude.
    pub fn read_leb_signed(&mut self, group: u8) -> Result<i64> {
        let negative = self.read_bit()?;
        let magnitude = self.read_leb_unsigned(group)?;
        let limit = if negative {
            1u64 << 63
        } else {
            i64::MAX as u64
        };
        if magnitude > limit {
            return Err(QrWasmError::corrupt(
                self.bit_position(),
                "signed LEB magnitude out of range",
            ));
        }
        if negative {
            Ok((magnitude as i64).wrapping_neg())
        } else {
            Ok(magnitude as i64)
        }
    }

    /// Read an `f32` written with `trim` mantissa bits removed; the trimmed
    /// bits are restored as zero.
    pub fn read_f32_trimmed(&mut self, trim: u8) -> Result<f32> {
        let bits = self.read_bits_unsigned(32 - trim)? as u32;
        Ok(f32::from_bits(bits << trim))
    }

    /// Read an `f64` written with `trim` mantissa bits removed.
    pub fn read_f64_trimmed(&mut self, trim: u8) -> Result<f64> {
        let bits = self.read_bits_unsigned(64 - trim)?;
        Ok(f64::from_bits(bits << trim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_bits() {
        assert_eq!(required_bits(0), 1);
        assert_eq!(required_bits(1), 1);
        assert_eq!(required_bits(2), 2);
        assert_eq!(required_bits(-2), 2);
        assert_eq!(required_bits(255), 8);
        assert_eq!(required_bits(256), 9);
        assert_eq!(required_bits(i64::MAX), 63);
        assert_eq!(required_bits(i64::MIN), 64);
    }

    #[test]
    fn test_leb_roundtrip_all_groups() {
        let values = [
            0u64,
            1,
            2,
            127,
            128,
            255,
            300,
            65_535,
            1 << 20,
            u32::MAX as u64,
            u64::MAX,
        ];
        for group in 3..=7u8 {
            let mut writer = BitWriter::new();
            for &v in &values {
                writer.write_leb_unsigned(v, group);
            }
            let bytes = writer.finalize();
            let mut reader = BitReader::new(&bytes);
            for &v in &values {
                assert_eq!(reader.read_leb_unsigned(group).unwrap(), v, "group {group}");
            }
        }
    }

    #[test]
    fn test_leb_signed_roundtrip() {
        let values = [0i64, -1, 1, -64, 63, -129, 128, i64::MAX, i64::MIN];
        for group in 3..=7u8 {
            let mut writer = BitWriter::new();
            for &v in &values {
                writer.write_leb_signed(v, group);
            }
            let bytes = writer.finalize();
            let mut reader = BitReader::new(&bytes);
            for &v in &values {
                assert_eq!(reader.read_leb_signed(group).unwrap(), v, "group {group}");
            }
        }
    }

    #[test]
    fn test_leb_zero_emits_one_chunk() {
        let mut writer = BitWriter::new();
        writer.write_leb_unsigned(0, 7);
        // One 7-bit chunk plus the final continuation bit.
        assert_eq!(writer.cursor(), 8);
    }

    #[test]
    fn test_leb_bit_len_matches_writes() {
        for group in 3..=7u8 {
            for v in [0u64, 1, 5, 200, 77_777, u64::MAX] {
                let mut writer = BitWriter::new();
                writer.write_leb_unsigned(v, group);
                assert_eq!(writer.cursor(), leb_bit_len_unsigned(v, group));
            }
        }
    }

    #[test]
    fn test_tagged_width_recovery() {
        for v in [0u64, 1, 2, 42, 1023, 1024, u32::MAX as u64] {
            let mut writer = BitWriter::new();
            writer.write_tagged_unsigned(v).unwrap();
            let bytes = writer.finalize();
            let mut reader = BitReader::new(&bytes);
            let (value, width) = reader.read_tagged_unsigned().unwrap();
            assert_eq!(value, v);
            assert_eq!(width, required_bits_unsigned(v));
        }
    }

    #[test]
    fn test_tagged_signed_roundtrip() {
        for v in [0i64, 1, -1, 500, -500, i64::MAX, i64::MIN + 1] {
            let mut writer = BitWriter::new();
            writer.write_tagged_signed(v).unwrap();
            let bytes = writer.finalize();
            let mut reader = BitReader::new(&bytes);
            assert_eq!(reader.read_tagged_signed().unwrap(), v);
        }
    }

    #[test]
    fn test_tagged_rejects_64_bit_magnitude() {
        let mut writer = BitWriter::new();
        assert!(writer.write_tagged_signed(i64::MIN).is_err());
        assert!(writer.write_tagged_unsigned(u64::MAX).is_err());
    }

    #[test]
    fn test_float_trim_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_f32_trimmed(1.5f32, 0);
        writer.write_f64_trimmed(-2.25f64, 0);
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_f32_trimmed(0).unwrap(), 1.5f32);
        assert_eq!(reader.read_f64_trimmed(0).unwrap(), -2.25f64);
    }

    #[test]
    fn test_float_trim_zeroes_low_mantissa() {
        let value = f32::from_bits(0x3FC0_0007);
        let mut writer = BitWriter::new();
        writer.write_f32_trimmed(value, 4);
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        let restored = reader.read_f32_trimmed(4).unwrap();
        assert_eq!(restored.to_bits(), 0x3FC0_0000);
    }

    #[test]
    fn test_leb_rejects_overlong() {
        // 14 chunks of 5 bits declare up to 70 bits of payload; non-zero
        // bits past 64 must be rejected.
        let mut writer = BitWriter::new();
        for _ in 0..13 {
            writer.write_bits_unsigned(0x1F, 5);
            writer.write_bit(true);
        }
        writer.write_bits_unsigned(0x1F, 5);
        writer.write_bit(false);
        let bytes = writer.finalize();
        let mut reader = BitReader::new(&bytes);
        assert!(reader.read_leb_unsigned(5).is_err());
    }
}
