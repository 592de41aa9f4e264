//! Self-Checking Program Generator
//!
//! Draws random operands at each requested bit width and emits a flat C++
//! program where every block compares the library's arithmetic against
//! literals computed by the [`Oracle`].
//!
//! ```text
//! {
//!     Uint128 a = 0xff_u128;
//!     Uint128 b = 0x1_u128;
//!     int shiftcount = 7;
//!     if (a != a) std::cout << "OOPS! " << a << " != " << a << "\n";
//!     ...
//!     if ((a + b) != 0x100_u128)
//!         std::cout << "OOPS! " << a << " + " << b << " = " << (a + b) << " not 0x100\n";
//! }
//! ```
//!
//! Mismatches are never detected here; they surface when the generated
//! program runs.

use crate::oracle::{hexit, Op, Oracle, OracleError};
use num_bigint::{BigUint, RandBigInt};
use rand::Rng;
use std::io::Write;
use thiserror::Error;

/// Prefix of every runtime diagnostic in the generated program.
pub const MISMATCH_PREFIX: &str = "OOPS! ";

/// Width of a single limb of the library under test.
const LIMB_BITS: u32 = 64;

/// Widths with a user-defined literal (`_u128`, ...) in `wider_io.h`.
pub const SUPPORTED_WIDTHS: [u32; 3] = [128, 256, 512];

#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("unsupported bit width {0}: must be one of 128, 256, 512")]
    UnsupportedWidth(u32),

    #[error("oracle rejected vector: {0}")]
    Oracle(#[from] OracleError),

    #[error("failed to write generated program: {0}")]
    Io(#[from] std::io::Error),
}

/// One randomly drawn vector. Operands lie in `[0, 2^bits)` and the shift
/// count in `[0, bits)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    pub bits: u32,
    pub a: BigUint,
    pub b: BigUint,
    pub shift: u32,
}

impl TestVector {
    /// Draw a fresh vector for `oracle`'s width.
    pub fn draw<R: Rng + ?Sized>(oracle: &Oracle, rng: &mut R) -> Self {
        let bits = oracle.bits();
        Self {
            bits,
            a: rng.gen_biguint_below(oracle.modulus()),
            b: rng.gen_biguint_below(oracle.modulus()),
            shift: rng.gen_range(0..bits),
        }
    }
}

/// Name of the C++ alias for a `bits`-wide library type, e.g. `Uint256`.
pub fn type_alias(bits: u32) -> Result<String, FuzzError> {
    if !SUPPORTED_WIDTHS.contains(&bits) {
        return Err(FuzzError::UnsupportedWidth(bits));
    }
    Ok(format!("Uint{}", bits))
}

/// Literal suffix for a `bits`-wide literal, e.g. `_u256`.
fn literal_suffix(bits: u32) -> String {
    format!("_u{}", bits)
}

/// Emits self-checking programs.
#[derive(Debug, Clone)]
pub struct ProgramGenerator {
    widths: Vec<u32>,
}

impl ProgramGenerator {
    /// Create a generator for the given widths. Every width is validated up
    /// front so a bad width fails before anything is written.
    pub fn new(widths: &[u32]) -> Result<Self, FuzzError> {
        for &bits in widths {
            type_alias(bits)?;
        }
        Ok(Self {
            widths: widths.to_vec(),
        })
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Write a complete program with `count` blocks per width.
    ///
    /// Returns the number of blocks written.
    pub fn write_program<W, R>(
        &self,
        out: &mut W,
        rng: &mut R,
        count: usize,
    ) -> Result<usize, FuzzError>
    where
        W: Write + ?Sized,
        R: Rng + ?Sized,
    {
        out.write_all(self.render_header().as_bytes())?;

        let mut written = 0;
        for &bits in &self.widths {
            let oracle = Oracle::new(bits)?;
            for _ in 0..count {
                let vector = TestVector::draw(&oracle, rng);
                out.write_all(render_block(&oracle, &vector)?.as_bytes())?;
                written += 1;
            }
            tracing::info!(bits, blocks = count, "emitted check blocks");
        }

        out.write_all(b"}\n")?;
        out.flush()?;
        Ok(written)
    }

    /// Includes, `main` opening, and one alias per width up to the widest.
    pub fn render_header(&self) -> String {
        let mut s = String::new();
        s.push_str("#include \"wider.h\"\n");
        s.push_str("#include \"wider_io.h\"\n");
        s.push_str("int main() {\n");

        let widest = self.widths.iter().copied().max().unwrap_or(2 * LIMB_BITS);
        let mut half = "uint64_t".to_string();
        let mut bits = 2 * LIMB_BITS;
        while bits <= widest {
            let alias = format!("Uint{}", bits);
            s.push_str(&format!("    using {} = Wider<{}>;\n", alias, half));
            half = alias;
            bits *= 2;
        }
        s
    }
}

/// Render the check block for one vector.
pub fn render_block(oracle: &Oracle, vector: &TestVector) -> Result<String, FuzzError> {
    let alias = type_alias(vector.bits)?;
    let suffix = literal_suffix(vector.bits);

    let mut s = String::new();
    s.push_str("{\n");
    s.push_str(&format!("    {} a = {}{};\n", alias, hexit(&vector.a), suffix));
    s.push_str(&format!("    {} b = {}{};\n", alias, hexit(&vector.b), suffix));
    s.push_str(&format!("    int shiftcount = {};\n", vector.shift));

    for name in ["a", "b"] {
        s.push_str(&format!(
            "    if ({n} != {n}) std::cout << \"{p}\" << {n} << \" != \" << {n} << \"\\n\";\n",
            n = name,
            p = MISMATCH_PREFIX,
        ));
    }

    for op in Op::ALL {
        let expected = oracle.eval(op, &vector.a, &vector.b, vector.shift)?;
        let rhs = if op.is_shift() { "shiftcount" } else { "b" };
        let expr = format!("(a {} {})", op.symbol(), rhs);
        s.push_str(&format!(
            "    if ({} != {}{})\n",
            expr, expected.literal, suffix
        ));
        s.push_str(&format!(
            "        std::cout << \"{p}\" << a << \" {sym} \" << {rhs} << \" = \" << {expr} << \" not {lit}\\n\";\n",
            p = MISMATCH_PREFIX,
            sym = op.symbol(),
            rhs = rhs,
            expr = expr,
            lit = expected.literal,
        ));
    }

    s.push_str("}\n");
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_type_alias() {
        assert_eq!(type_alias(128).unwrap(), "Uint128");
        assert_eq!(type_alias(512).unwrap(), "Uint512");
        assert!(type_alias(64).is_err());
        assert!(type_alias(192).is_err());
        assert!(type_alias(100).is_err());
        assert!(matches!(type_alias(1024), Err(FuzzError::UnsupportedWidth(1024))));
        assert!(type_alias(1 << 31).is_err());
    }

    #[test]
    fn test_draw_in_domain() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let oracle = Oracle::new(128).unwrap();
        for _ in 0..200 {
            let v = TestVector::draw(&oracle, &mut rng);
            assert!(oracle.contains(&v.a));
            assert!(oracle.contains(&v.b));
            assert!(v.shift < 128);
        }
    }

    #[test]
    fn test_block_layout() {
        let oracle = Oracle::new(128).unwrap();
        let v = TestVector {
            bits: 128,
            a: BigUint::from(0xffu32),
            b: BigUint::from(1u32),
            shift: 4,
        };
        let block = render_block(&oracle, &v).unwrap();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "{");
        assert_eq!(lines[1], "    Uint128 a = 0xff_u128;");
        assert_eq!(lines[2], "    Uint128 b = 0x1_u128;");
        assert_eq!(lines[3], "    int shiftcount = 4;");
        assert!(lines[4].starts_with("    if (a != a)"));
        assert!(lines[5].starts_with("    if (b != b)"));
        assert_eq!(lines[6], "    if ((a + b) != 0x100_u128)");
        assert!(block.contains("    if ((a << shiftcount) != 0xff0_u128)"));
        assert!(block.contains("    if ((a >> shiftcount) != 0xf_u128)"));
        assert!(block.contains("    if ((a * b) != 0xff_u128)"));
        assert_eq!(*lines.last().unwrap(), "}");
        // two self-checks plus two lines per operation, wrapped in braces
        assert_eq!(lines.len(), 4 + 2 + 2 * Op::ALL.len() + 1);
    }

    #[test]
    fn test_header_aliases() {
        let gen = ProgramGenerator::new(&[128, 512]).unwrap();
        let header = gen.render_header();
        assert!(header.contains("    using Uint128 = Wider<uint64_t>;\n"));
        assert!(header.contains("    using Uint256 = Wider<Uint128>;\n"));
        assert!(header.contains("    using Uint512 = Wider<Uint256>;\n"));
        assert!(!header.contains("Uint1024"));
    }

    #[test]
    fn test_rejects_bad_width_early() {
        assert!(matches!(
            ProgramGenerator::new(&[128, 96]),
            Err(FuzzError::UnsupportedWidth(96))
        ));
    }

    #[test]
    fn test_write_program_counts_blocks() {
        let gen = ProgramGenerator::new(&[128, 256]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut out = Vec::new();
        let written = gen.write_program(&mut out, &mut rng, 3).unwrap();
        assert_eq!(written, 6);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("int shiftcount").count(), 6);
        assert_eq!(text.matches("Uint256 a =").count(), 3);
        assert!(text.ends_with("}\n}\n"));
    }
}
