// Probable Primes
// Random sampling and the Jacobi-symbol (Solovay-Strassen) primality test

use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use super::bigint::{from_bytes, mod_pow, RsaBigInt};
use crate::error::{Result, RsaError};

/// Rounds of the witness test unless the caller asks otherwise
pub const DEFAULT_CONFIDENCE: u32 = 5;

/// Lower bound on the bits drawn by [`random_int`], whatever the range
const MIN_SAMPLE_BITS: u64 = 64;

// Trial divisors, checked before any witness is drawn
const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97,
];

/// Parameters of a prime search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeSearch {
    /// A composite survives the test with probability at most 2^-confidence
    pub confidence: u32,
    /// Candidates to try before giving up; `None` searches forever
    pub max_attempts: Option<usize>,
}

impl Default for PrimeSearch {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            max_attempts: None,
        }
    }
}

/// Read `ceil(nbits / 8)` random bytes and interpret them big-endian
pub fn read_random_int<R: RngCore + CryptoRng + ?Sized>(rng: &mut R, nbits: u64) -> RsaBigInt {
    let nbytes = nbits.div_ceil(8) as usize;
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    from_bytes(&buf)
}

/// Random integer in `[min, max]`.
///
/// Draws at least twice as many bits as the range needs (and never fewer
/// than 64) before reducing, which keeps the modulo bias small. It is not
/// exactly uniform.
pub fn random_int<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    min: &RsaBigInt,
    max: &RsaBigInt,
) -> Result<RsaBigInt> {
    if min > max {
        return Err(RsaError::InvalidArgument(format!(
            "empty range: min {} is above max {}",
            min, max
        )));
    }

    let range = max - min + 1u8;
    let nbits = std::cmp::max(range.bits() * 2, MIN_SAMPLE_BITS);

    Ok(read_random_int(rng, nbits) % &range + min)
}

fn residue(n: &RsaBigInt, m: u32) -> u32 {
    (n % m).to_u32().unwrap_or(0)
}

/// Jacobi symbol (a/n) for odd n > 0, one of -1, 0 or 1
pub fn jacobi(a: &RsaBigInt, n: &RsaBigInt) -> i8 {
    if n.is_zero() || n.is_even() {
        return 0;
    }

    let mut a = a % n;
    let mut n = n.clone();
    let mut result = 1i8;

    while !a.is_zero() {
        while a.is_even() {
            a >>= 1;
            // (2/n) = -1 iff n = 3 or 5 (mod 8)
            let r = residue(&n, 8);
            if r == 3 || r == 5 {
                result = -result;
            }
        }

        std::mem::swap(&mut a, &mut n);
        // Quadratic reciprocity
        if residue(&a, 4) == 3 && residue(&n, 4) == 3 {
            result = -result;
        }
        a = &a % &n;
    }

    if n.is_one() {
        result
    } else {
        0
    }
}

/// True if `x` proves that odd `n` is composite, false if `n` is an Euler
/// pseudoprime to base `x`
pub fn is_jacobi_witness(x: &RsaBigInt, n: &RsaBigInt) -> Result<bool> {
    let j = match jacobi(x, n) {
        -1 => n - 1u8,
        0 => RsaBigInt::zero(),
        _ => RsaBigInt::one(),
    };
    let f = mod_pow(x, &((n - 1u8) >> 1), n)?;

    Ok(j != f)
}

/// Solovay-Strassen probable prime test.
///
/// Composites are always reported correctly once a witness is drawn; a
/// composite passes with probability at most 2^-confidence.
pub fn is_probable_prime<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    n: &RsaBigInt,
    confidence: u32,
) -> Result<bool> {
    if n < &RsaBigInt::from(2u8) {
        return Ok(false);
    }

    for &sp in SMALL_PRIMES.iter() {
        let sp = RsaBigInt::from(sp);
        if n == &sp {
            return Ok(true);
        }
        if (n % &sp).is_zero() {
            return Ok(false);
        }
    }

    // Each round halves the false positive probability, so
    // t = ceil(confidence / log2(1 / 0.5)) = confidence
    let rounds = confidence.max(1);
    let one = RsaBigInt::one();
    let n_minus_one = n - 1u8;

    for _ in 0..rounds {
        let x = random_int(rng, &one, &n_minus_one)?;
        if is_jacobi_witness(&x, n)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Random prime of exactly `bit_length` bits
pub fn random_prime<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    bit_length: u64,
    search: &PrimeSearch,
) -> Result<RsaBigInt> {
    if bit_length < 2 {
        return Err(RsaError::InvalidArgument(format!(
            "a prime needs at least 2 bits, got {}",
            bit_length
        )));
    }

    let top = RsaBigInt::one() << (bit_length - 1);
    let mut attempts = 0usize;

    loop {
        if let Some(cap) = search.max_attempts {
            if attempts >= cap {
                return Err(RsaError::PrimeGenerationTimeout { attempts });
            }
        }
        attempts += 1;

        // Force the top bit for the length and the low bit for oddness
        let candidate = (read_random_int(rng, bit_length) % &top) | &top | RsaBigInt::one();

        if is_probable_prime(rng, &candidate, search.confidence)? {
            debug!(bit_length, attempts, "found probable prime");
            return Ok(candidate);
        }
    }
}
