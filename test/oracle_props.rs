//! Oracle Property Tests
//!
//! Checks the fixed-width oracle against native wrapping arithmetic and the
//! operand/shift domains of drawn vectors.

use num_bigint::BigUint;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use widecheck::{Op, Oracle, TestVector};

fn big(v: u128) -> BigUint {
    BigUint::from(v)
}

// ============================================================================
// Arithmetic against native 128-bit and 64-bit wrapping ops
// ============================================================================

proptest! {
    #[test]
    fn add_sub_mul_wrap_at_128(a in any::<u128>(), b in any::<u128>()) {
        let oracle = Oracle::new(128).unwrap();
        prop_assert_eq!(oracle.add(&big(a), &big(b)), big(a.wrapping_add(b)));
        prop_assert_eq!(oracle.sub(&big(a), &big(b)), big(a.wrapping_sub(b)));
        prop_assert_eq!(oracle.mul(&big(a), &big(b)), big(a.wrapping_mul(b)));
    }

    #[test]
    fn shifts_at_128(a in any::<u128>(), shift in 0u32..128) {
        let oracle = Oracle::new(128).unwrap();
        prop_assert_eq!(oracle.shl(&big(a), shift), big(a << shift));
        prop_assert_eq!(oracle.shr(&big(a), shift), big(a >> shift));
    }

    #[test]
    fn add_sub_at_64(a in any::<u64>(), b in any::<u64>(), shift in 0u32..64) {
        let oracle = Oracle::new(64).unwrap();
        let (ba, bb) = (BigUint::from(a), BigUint::from(b));
        prop_assert_eq!(oracle.add(&ba, &bb), BigUint::from(a.wrapping_add(b)));
        prop_assert_eq!(oracle.sub(&ba, &bb), BigUint::from(a.wrapping_sub(b)));
        prop_assert_eq!(oracle.shl(&ba, shift), BigUint::from(a << shift));
    }

    #[test]
    fn results_stay_in_domain(a in any::<u128>(), b in any::<u128>(), shift in 0u32..128) {
        let oracle = Oracle::new(128).unwrap();
        for op in Op::ALL {
            let r = oracle.eval(op, &big(a), &big(b), shift).unwrap();
            prop_assert!(oracle.contains(&r.value));
            prop_assert!(r.literal.starts_with("0x"));
            prop_assert!(!r.literal.starts_with("0x-"));
        }
    }

    #[test]
    fn sub_matches_modular_definition(a in any::<u128>(), b in any::<u128>()) {
        let oracle = Oracle::new(128).unwrap();
        let m = oracle.modulus().clone();
        let expected = (&m + big(a) - big(b)) % &m;
        prop_assert_eq!(oracle.sub(&big(a), &big(b)), expected);
    }

    #[test]
    fn drawn_vectors_are_in_domain(seed in any::<u64>(), bits in prop::sample::select(vec![128u32, 256, 512])) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let oracle = Oracle::new(bits).unwrap();
        let v = TestVector::draw(&oracle, &mut rng);
        prop_assert!(oracle.contains(&v.a));
        prop_assert!(oracle.contains(&v.b));
        prop_assert!(v.shift < bits);
        // self-equality holds for every drawn operand
        prop_assert_eq!(&v.a, &v.a.clone());
    }
}

// ============================================================================
// Shift-count range
// ============================================================================

#[test]
fn shift_count_covers_exactly_0_to_127() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let oracle = Oracle::new(128).unwrap();
    let mut seen = [false; 128];
    for _ in 0..20_000 {
        let v = TestVector::draw(&oracle, &mut rng);
        assert!(v.shift < 128, "drew shift count {}", v.shift);
        seen[v.shift as usize] = true;
    }
    assert!(seen[0], "shift count 0 never drawn");
    assert!(seen[127], "shift count 127 never drawn");
}

#[test]
fn shift_by_full_width_is_rejected() {
    let oracle = Oracle::new(128).unwrap();
    assert!(oracle.eval(Op::Shl, &big(1), &big(0), 128).is_err());
    assert!(oracle.eval(Op::Shr, &big(1), &big(0), 128).is_err());
    assert!(oracle.eval(Op::Shr, &big(1), &big(0), 127).is_ok());
}

#[test]
fn extreme_operands() {
    let oracle = Oracle::new(256).unwrap();
    let max = oracle.max_value();
    let zero = BigUint::from(0u32);
    assert_eq!(oracle.add(&max, &BigUint::from(1u32)), zero);
    assert_eq!(oracle.sub(&zero, &BigUint::from(1u32)), max);
    assert_eq!(oracle.mul(&max, &max), BigUint::from(1u32));
    assert_eq!(oracle.shr(&max, 255), BigUint::from(1u32));
}
