//! Arithmetic Oracle
//!
//! Ground-truth fixed-width arithmetic computed over unbounded integers.
//!
//! Every result is reduced into `[0, 2^bits)` the way a fixed-width unsigned
//! type wraps, and is paired with the exact hexadecimal literal that the
//! generated test program compares against.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use thiserror::Error;

/// Errors raised when the oracle is handed values outside its domain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("bit width must be positive")]
    ZeroWidth,

    #[error("operand {value} does not fit in {bits} bits")]
    OperandOutOfRange { value: String, bits: u32 },

    #[error("shift count {shift} must be below the bit width {bits}")]
    ShiftOutOfRange { shift: u32, bits: u32 },
}

/// A checked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Shl,
    Shr,
}

impl Op {
    /// All operations, in the order the generated checks appear.
    pub const ALL: [Op; 5] = [Op::Add, Op::Sub, Op::Mul, Op::Shl, Op::Shr];

    /// Operator token as written in C++ source.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Shl => "<<",
            Op::Shr => ">>",
        }
    }

    /// Whether the right-hand side is the shift count rather than operand `b`.
    pub fn is_shift(self) -> bool {
        matches!(self, Op::Shl | Op::Shr)
    }
}

/// A bit-width-correct result and its literal encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    pub value: BigUint,
    pub literal: String,
}

/// Fixed-width arithmetic oracle.
#[derive(Debug, Clone)]
pub struct Oracle {
    bits: u32,
    modulus: BigUint,
}

impl Oracle {
    /// Create an oracle for `bits`-wide unsigned arithmetic.
    pub fn new(bits: u32) -> Result<Self, OracleError> {
        if bits == 0 {
            return Err(OracleError::ZeroWidth);
        }
        Ok(Self {
            bits,
            modulus: BigUint::one() << bits,
        })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// `2^bits`
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Largest representable value, `2^bits - 1`.
    pub fn max_value(&self) -> BigUint {
        &self.modulus - BigUint::one()
    }

    /// Whether `value` lies in `[0, 2^bits)`.
    pub fn contains(&self, value: &BigUint) -> bool {
        value < &self.modulus
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.modulus
    }

    /// Wrapping subtraction; never negative.
    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let a = a % &self.modulus;
        let b = b % &self.modulus;
        (&self.modulus + a - b) % &self.modulus
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    /// Left shift with the overflowed high bits truncated.
    pub fn shl(&self, a: &BigUint, shift: u32) -> BigUint {
        (a << shift) % &self.modulus
    }

    /// Logical right shift.
    pub fn shr(&self, a: &BigUint, shift: u32) -> BigUint {
        a >> shift
    }

    /// Evaluate `op` after checking that every input is inside the domain.
    pub fn eval(
        &self,
        op: Op,
        a: &BigUint,
        b: &BigUint,
        shift: u32,
    ) -> Result<OracleResult, OracleError> {
        self.check_operand(a)?;
        if op.is_shift() {
            if shift >= self.bits {
                return Err(OracleError::ShiftOutOfRange {
                    shift,
                    bits: self.bits,
                });
            }
        } else {
            self.check_operand(b)?;
        }

        let value = match op {
            Op::Add => self.add(a, b),
            Op::Sub => self.sub(a, b),
            Op::Mul => self.mul(a, b),
            Op::Shl => self.shl(a, shift),
            Op::Shr => self.shr(a, shift),
        };
        let literal = hexit(&value);
        Ok(OracleResult { value, literal })
    }

    fn check_operand(&self, value: &BigUint) -> Result<(), OracleError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(OracleError::OperandOutOfRange {
                value: hexit(value),
                bits: self.bits,
            })
        }
    }
}

/// Render `value` as a `0x`-prefixed lowercase hex literal.
pub fn hexit(value: &BigUint) -> String {
    if value.is_zero() {
        return "0x0".to_string();
    }
    format!("{:#x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u128) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_add_carries_past_low_byte() {
        let oracle = Oracle::new(128).unwrap();
        let r = oracle.eval(Op::Add, &big(0xff), &big(0x01), 0).unwrap();
        assert_eq!(r.value, big(0x100));
        assert_eq!(r.literal, "0x100");
    }

    #[test]
    fn test_add_wraps() {
        let oracle = Oracle::new(128).unwrap();
        let r = oracle.add(&oracle.max_value(), &big(2));
        assert_eq!(r, big(1));
    }

    #[test]
    fn test_sub_underflow_is_all_ones() {
        let oracle = Oracle::new(128).unwrap();
        let r = oracle.eval(Op::Sub, &big(0), &big(1), 0).unwrap();
        assert_eq!(r.value, big(u128::MAX));
        assert_eq!(r.literal, format!("0x{}", "f".repeat(32)));
    }

    #[test]
    fn test_mul_truncates() {
        let oracle = Oracle::new(128).unwrap();
        let a = big(1u128 << 100);
        let r = oracle.mul(&a, &big(1u128 << 30));
        assert_eq!(r, big(0));
        let r = oracle.mul(&big(u128::MAX), &big(u128::MAX));
        assert_eq!(r, big(1));
    }

    #[test]
    fn test_shifts() {
        let oracle = Oracle::new(128).unwrap();
        let a = big(0x8000_0000_0000_0000_0000_0000_0000_0001);
        assert_eq!(oracle.shl(&a, 1), big(2));
        assert_eq!(oracle.shr(&a, 127), big(1));
        assert_eq!(oracle.shl(&a, 0), a);
    }

    #[test]
    fn test_shift_at_width_rejected() {
        let oracle = Oracle::new(128).unwrap();
        let err = oracle.eval(Op::Shl, &big(1), &big(0), 128).unwrap_err();
        assert_eq!(err, OracleError::ShiftOutOfRange { shift: 128, bits: 128 });
    }

    #[test]
    fn test_operand_out_of_range() {
        let oracle = Oracle::new(8).unwrap();
        let err = oracle.eval(Op::Add, &big(256), &big(0), 0).unwrap_err();
        assert!(matches!(err, OracleError::OperandOutOfRange { bits: 8, .. }));
        // the right operand is irrelevant for shifts
        assert!(oracle.eval(Op::Shr, &big(255), &big(4096), 3).is_ok());
    }

    #[test]
    fn test_zero_width() {
        assert_eq!(Oracle::new(0).unwrap_err(), OracleError::ZeroWidth);
    }

    #[test]
    fn test_hexit() {
        assert_eq!(hexit(&big(0)), "0x0");
        assert_eq!(hexit(&big(0xdead_beef)), "0xdeadbeef");
    }
}
