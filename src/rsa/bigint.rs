// RSA Big Integer Operations
// Wrapper around num-bigint for the arithmetic the RSA pipeline needs

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::{Result, RsaError};

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Create a big integer from bytes (big-endian).
/// The empty slice maps to zero.
pub fn from_bytes(bytes: &[u8]) -> RsaBigInt {
    RsaBigInt::from_bytes_be(bytes)
}

/// Convert big integer to bytes (big-endian, no leading zeros).
///
/// Zero converts to the empty sequence, so `from_bytes(to_bytes(n)) == n`
/// holds for every `n` but `to_bytes(from_bytes(b)) == b` does not hold when
/// `b` starts with zero bytes.
pub fn to_bytes(n: &RsaBigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    n.to_bytes_be()
}

/// Like [`to_bytes`], left-padded with zeros to at least `width` bytes
pub fn to_bytes_padded(n: &RsaBigInt, width: usize) -> Vec<u8> {
    let bytes = to_bytes(n);
    if bytes.len() >= width {
        return bytes;
    }
    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend_from_slice(&bytes);
    padded
}

/// Modular exponentiation: base^exp mod modulus
/// Uses square-and-multiply algorithm
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> Result<RsaBigInt> {
    if modulus.is_zero() {
        return Err(RsaError::InvalidArgument("modulus must be positive".to_string()));
    }
    if modulus.is_one() {
        return Ok(RsaBigInt::zero());
    }

    let mut result = RsaBigInt::one();
    let mut base = base % modulus;
    let mut exp = exp.clone();

    while !exp.is_zero() {
        if exp.is_odd() {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exp >>= 1;
    }

    Ok(result)
}

/// Extended Euclidean Algorithm
/// Returns (d, i, j) such that d = gcd(a, b) = i*a + j*b
///
/// Iterative, so the depth does not grow with the operand size.
pub fn extended_gcd(a: &RsaBigInt, b: &RsaBigInt) -> (RsaBigInt, BigInt, BigInt) {
    let mut old_r = BigInt::from(a.clone());
    let mut r = BigInt::from(b.clone());
    let (mut old_i, mut i) = (BigInt::one(), BigInt::zero());
    let (mut old_j, mut j) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let (quotient, remainder) = old_r.div_rem(&r);

        old_r = std::mem::replace(&mut r, remainder);

        let next_i = &old_i - &quotient * &i;
        old_i = std::mem::replace(&mut i, next_i);

        let next_j = &old_j - &quotient * &j;
        old_j = std::mem::replace(&mut j, next_j);
    }

    // Both inputs are non-negative, so the remainder chain never goes negative
    let d = old_r.to_biguint().unwrap_or_default();
    (d, old_i, old_j)
}

/// Greatest common divisor, gcd(a, 0) = a
pub fn gcd(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    a.gcd(b)
}

/// True iff gcd(a, b) == 1
pub fn is_relatively_prime(a: &RsaBigInt, b: &RsaBigInt) -> bool {
    gcd(a, b).is_one()
}
