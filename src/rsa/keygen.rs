// RSA Key Generation
// Implements RSA key pair generation (public and private keys)

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bigint::{extended_gcd, is_relatively_prime, to_bytes, RsaBigInt};
use super::decrypt::{decrypt, verify};
use super::encrypt::{block_width, encrypt, sign, CipherPayload};
use super::prime::{random_prime, PrimeSearch};
use crate::error::{Result, RsaError};

/// Smallest accepted prime size; below it the modulus cannot hold one byte
/// per block
pub const MIN_PRIME_BITS: u32 = 8;

/// RSA Public Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicKey {
    pub e: RsaBigInt, // Public exponent
    pub n: RsaBigInt, // Modulus
}

/// RSA Private Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPrivateKey {
    pub d: RsaBigInt, // Private exponent
    pub p: RsaBigInt, // First prime factor
    pub q: RsaBigInt, // Second prime factor
}

/// RSA Key Pair, built only by [`generate_keypair`]
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    public_key: RsaPublicKey,
    private_key: RsaPrivateKey,
    bit_length: u32,
}

impl RsaPublicKey {
    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }

    /// Bytes of plaintext carried by each block
    pub fn block_width(&self) -> usize {
        block_width(&self.n)
    }

    /// Short hex tag of the modulus, for logs and listings
    pub fn fingerprint(&self) -> String {
        let bytes = to_bytes(&self.n);
        hex::encode(&bytes[..bytes.len().min(8)])
    }

    /// Encrypt a message using this public key
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<CipherPayload> {
        encrypt(plaintext, self)
    }

    /// Recover the signed message bytes from a signature payload
    pub fn verify(&self, signature: &CipherPayload) -> Result<Vec<u8>> {
        verify(signature, self)
    }
}

impl RsaPrivateKey {
    /// Modulus p * q, equal to the matching public key's n
    pub fn modulus(&self) -> RsaBigInt {
        &self.p * &self.q
    }

    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.modulus().bits()
    }

    /// Decrypt a payload using this private key
    pub fn decrypt(&self, ciphertext: &CipherPayload) -> Result<Vec<u8>> {
        decrypt(ciphertext, self)
    }

    /// Sign a message using this private key
    pub fn sign(&self, message: &[u8]) -> Result<CipherPayload> {
        sign(message, self)
    }
}

impl RsaKeyPair {
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Bit length each prime was generated with
    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    pub fn into_parts(self) -> (RsaPublicKey, RsaPrivateKey) {
        (self.public_key, self.private_key)
    }
}

/// Configuration for key generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenConfig {
    /// Bits of each prime; the modulus gets roughly twice as many
    pub bit_length: u32,
    pub search: PrimeSearch,
    /// Full generation rounds to try before giving up; `None` retries forever
    pub max_rounds: Option<usize>,
}

impl KeyGenConfig {
    pub fn new(bit_length: u32) -> Self {
        Self {
            bit_length,
            search: PrimeSearch::default(),
            max_rounds: None,
        }
    }

    pub fn with_confidence(mut self, confidence: u32) -> Self {
        self.search.confidence = confidence;
        self
    }

    /// Cap both the candidates per prime and the generation rounds
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.search.max_attempts = Some(attempts);
        self.max_rounds = Some(attempts);
        self
    }
}

/// Two different primes of `bit_length` bits
pub fn find_distinct_primes<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    bit_length: u32,
    search: &PrimeSearch,
) -> Result<(RsaBigInt, RsaBigInt)> {
    let bits = u64::from(bit_length);
    let p = random_prime(rng, bits, search)?;

    loop {
        let q = random_prime(rng, bits, search)?;
        if q != p {
            return Ok((p, q));
        }
        debug!(bit_length, "q collided with p, drawing again");
    }
}

/// d = e^(-1) mod phi, checked with the extended Euclidean algorithm
pub fn derive_private_exponent(e: &RsaBigInt, phi: &RsaBigInt) -> Result<RsaBigInt> {
    let (g, i, _) = extended_gcd(e, phi);

    if !g.is_one() {
        return Err(RsaError::KeyDerivation(format!(
            "e ({}) and phi_n ({}) are not relatively prime",
            e, phi
        )));
    }

    let phi_signed = BigInt::from(phi.clone());
    if !(BigInt::from(e.clone()) * &i).mod_floor(&phi_signed).is_one() {
        return Err(RsaError::KeyDerivation(format!(
            "e ({}) and i ({}) are not mult. inv. modulo phi_n ({})",
            e, i, phi
        )));
    }

    // Floor modulus keeps d in [0, phi)
    i.mod_floor(&phi_signed)
        .to_biguint()
        .ok_or_else(|| RsaError::KeyDerivation(format!("negative exponent {}", i)))
}

/// Public and private exponents (e, d) for the primes p and q
pub fn derive_exponents<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    p: &RsaBigInt,
    q: &RsaBigInt,
    bit_length: u32,
    search: &PrimeSearch,
) -> Result<(RsaBigInt, RsaBigInt)> {
    let n = p * q;
    let phi_n = (p - 1u8) * (q - 1u8);

    // Make sure e has enough bits to wrap through modulo n
    let e_bits = u64::from(std::cmp::max(MIN_PRIME_BITS, bit_length / 2));
    let mut rejected = 0usize;

    let e = loop {
        let e = random_prime(rng, e_bits, search)?;
        if is_relatively_prime(&e, &n) && is_relatively_prime(&e, &phi_n) {
            break e;
        }

        rejected += 1;
        debug!(rejected, "e shares a factor with n or phi_n, drawing again");
        if let Some(cap) = search.max_attempts {
            if rejected >= cap {
                return Err(RsaError::PrimeGenerationTimeout { attempts: rejected });
            }
        }
    };

    let d = derive_private_exponent(&e, &phi_n)?;
    Ok((e, d))
}

/// Generate an RSA key pair whose primes have `config.bit_length` bits.
///
/// This can take a long time, depending on the key size.
pub fn generate_keypair<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    config: &KeyGenConfig,
) -> Result<RsaKeyPair> {
    if config.bit_length < MIN_PRIME_BITS {
        return Err(RsaError::InvalidArgument(format!(
            "Bit length must be at least {}, got {}",
            MIN_PRIME_BITS, config.bit_length
        )));
    }

    let mut rounds = 0usize;

    loop {
        if let Some(cap) = config.max_rounds {
            if rounds >= cap {
                return Err(RsaError::PrimeGenerationTimeout { attempts: rounds });
            }
        }
        rounds += 1;

        let (p, q) = find_distinct_primes(rng, config.bit_length, &config.search)?;
        let (e, d) = derive_exponents(rng, &p, &q, config.bit_length, &config.search)?;

        // A zero exponent cannot invert anything; start over with new primes
        if d.is_zero() {
            debug!(rounds, "derived a zero private exponent, restarting");
            continue;
        }

        let public_key = RsaPublicKey { e, n: &p * &q };
        let private_key = RsaPrivateKey { d, p, q };

        info!(
            modulus_bits = public_key.bit_length(),
            fingerprint = %public_key.fingerprint(),
            rounds,
            "generated key pair"
        );

        return Ok(RsaKeyPair {
            public_key,
            private_key,
            bit_length: config.bit_length,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::{from_u64, gcd, mod_pow};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_textbook_private_exponent() {
        // p = 61, q = 53: n = 3233, phi = 3120
        let phi = (from_u64(61) - 1u8) * (from_u64(53) - 1u8);
        assert_eq!(phi, from_u64(3120));

        let d = derive_private_exponent(&from_u64(17), &phi).unwrap();
        assert_eq!(d, from_u64(2753));

        let n = from_u64(3233);
        let c = mod_pow(&from_u64(65), &from_u64(17), &n).unwrap();
        assert_eq!(mod_pow(&c, &d, &n).unwrap(), from_u64(65));
    }

    #[test]
    fn test_private_exponent_not_coprime() {
        let result = derive_private_exponent(&from_u64(6), &from_u64(3120));
        assert!(matches!(result, Err(RsaError::KeyDerivation(_))));
    }

    #[test]
    fn test_key_generation() {
        let mut rng = StdRng::seed_from_u64(11);
        let keypair = generate_keypair(&mut rng, &KeyGenConfig::new(64)).unwrap();

        assert_eq!(keypair.bit_length(), 64);
        let modulus_bits = keypair.public_key().bit_length();
        assert!(modulus_bits == 127 || modulus_bits == 128);
        assert!(keypair.private_key().d > from_u64(0));
    }

    #[test]
    fn test_key_properties() {
        let mut rng = StdRng::seed_from_u64(12);
        let keypair = generate_keypair(&mut rng, &KeyGenConfig::new(48)).unwrap();
        let (public, private) = keypair.into_parts();

        // Verify n = p * q
        assert_eq!(public.n, private.modulus());
        assert_ne!(private.p, private.q);

        // Verify e * d ≡ 1 (mod φ(n))
        let phi_n = (&private.p - 1u8) * (&private.q - 1u8);
        assert_eq!((&public.e * &private.d) % &phi_n, from_u64(1));
        assert_eq!(gcd(&public.e, &public.n), from_u64(1));

        // e has max(8, bits / 2) bits
        assert_eq!(public.e.bits(), 24);
    }

    #[test]
    fn test_small_bit_length_rejected() {
        let mut rng = StdRng::seed_from_u64(13);
        let result = generate_keypair(&mut rng, &KeyGenConfig::new(4));
        assert!(matches!(result, Err(RsaError::InvalidArgument(_))));
    }

    #[test]
    fn test_generation_cap() {
        let mut rng = StdRng::seed_from_u64(14);
        let config = KeyGenConfig::new(64).with_max_attempts(0);
        let result = generate_keypair(&mut rng, &config);
        assert!(matches!(
            result,
            Err(RsaError::PrimeGenerationTimeout { .. })
        ));
    }

    #[test]
    fn test_distinct_primes() {
        let mut rng = StdRng::seed_from_u64(15);
        // 8-bit primes collide often enough to exercise the retry
        for _ in 0..50 {
            let (p, q) = find_distinct_primes(&mut rng, 8, &PrimeSearch::default()).unwrap();
            assert_ne!(p, q);
            assert_eq!(p.bits(), 8);
            assert_eq!(q.bits(), 8);
        }
    }

    #[test]
    fn test_fingerprint() {
        let key = RsaPublicKey {
            e: from_u64(17),
            n: from_u64(3233),
        };
        assert_eq!(key.fingerprint(), "0ca1");
    }
}
