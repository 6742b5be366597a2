// RSA Encryption Implementation
// Chops a message into blocks that fit under the modulus and exponentiates each one

use std::fmt;

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::bigint::{from_bytes, mod_pow, RsaBigInt};
use super::keygen::{RsaPrivateKey, RsaPublicKey};
use crate::error::{Result, RsaError};

/// Ordered blocks of one encrypted or signed message.
///
/// Carries no metadata; the reader must already know which key opens it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CipherPayload(Vec<RsaBigInt>);

impl CipherPayload {
    pub fn new(blocks: Vec<RsaBigInt>) -> Self {
        Self(blocks)
    }

    pub fn blocks(&self) -> &[RsaBigInt] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_blocks(self) -> Vec<RsaBigInt> {
        self.0
    }
}

impl From<Vec<RsaBigInt>> for CipherPayload {
    fn from(blocks: Vec<RsaBigInt>) -> Self {
        Self(blocks)
    }
}

/// Which direction a block transform runs in. All four are the same
/// exponentiation; the tag only shows up in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOp {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
}

impl fmt::Display for BlockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockOp::Encrypt => "encrypt",
            BlockOp::Decrypt => "decrypt",
            BlockOp::Sign => "sign",
            BlockOp::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Plaintext bytes per block: floor(log2(n)) / 8
pub fn block_width(n: &RsaBigInt) -> usize {
    if n.is_zero() {
        return 0;
    }
    ((n.bits() - 1) / 8) as usize
}

/// Split `message` into big-endian blocks of `block_width(n)` bytes; the
/// last block may be shorter
pub fn chop(message: &[u8], n: &RsaBigInt) -> Result<Vec<RsaBigInt>> {
    if message.is_empty() {
        return Ok(Vec::new());
    }

    let width = block_width(n);
    if width == 0 {
        return Err(RsaError::MessageTooLong {
            modulus_bits: n.bits(),
        });
    }

    Ok(message.chunks(width).map(from_bytes).collect())
}

/// Raise every block to `exponent` modulo `modulus`, keeping the order
pub fn transform_blocks(
    blocks: &[RsaBigInt],
    exponent: &RsaBigInt,
    modulus: &RsaBigInt,
    op: BlockOp,
) -> Result<Vec<RsaBigInt>> {
    trace!(%op, blocks = blocks.len(), modulus_bits = modulus.bits(), "transforming blocks");

    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            if block >= modulus {
                return Err(RsaError::BlockOverflow { index });
            }
            mod_pow(block, exponent, modulus)
        })
        .collect()
}

/// Encrypt bytes using RSA public key
pub fn encrypt(message: &[u8], public_key: &RsaPublicKey) -> Result<CipherPayload> {
    let blocks = chop(message, &public_key.n)?;
    let cipher = transform_blocks(&blocks, &public_key.e, &public_key.n, BlockOp::Encrypt)?;
    Ok(CipherPayload(cipher))
}

/// Textbook signature: the message blocks raised to the private exponent,
/// without any hashing
pub fn sign(message: &[u8], private_key: &RsaPrivateKey) -> Result<CipherPayload> {
    let modulus = private_key.modulus();
    let blocks = chop(message, &modulus)?;
    let signed = transform_blocks(&blocks, &private_key.d, &modulus, BlockOp::Sign)?;
    Ok(CipherPayload(signed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;

    fn textbook_public() -> RsaPublicKey {
        RsaPublicKey {
            e: from_u64(17),
            n: from_u64(3233),
        }
    }

    #[test]
    fn test_block_width() {
        // 3233 needs 12 bits: floor(log2) = 11, one byte per block
        assert_eq!(block_width(&from_u64(3233)), 1);
        assert_eq!(block_width(&from_u64(255)), 0);
        assert_eq!(block_width(&from_u64(256)), 1);
        assert_eq!(block_width(&(RsaBigInt::from(1u8) << 128u32)), 16);
        assert_eq!(block_width(&((RsaBigInt::from(1u8) << 128u32) - 1u8)), 15);
    }

    #[test]
    fn test_chop() {
        let n = RsaBigInt::from(1u8) << 24u32; // three bytes per block
        let blocks = chop(b"abcdefg", &n).unwrap();
        assert_eq!(
            blocks,
            vec![
                from_bytes(b"abc"),
                from_bytes(b"def"),
                from_bytes(b"g"),
            ]
        );
        assert!(blocks.iter().all(|b| b < &n));
    }

    #[test]
    fn test_chop_empty() {
        assert!(chop(b"", &from_u64(3233)).unwrap().is_empty());
        // Even a modulus too small for blocks accepts an empty message
        assert!(chop(b"", &from_u64(7)).unwrap().is_empty());
    }

    #[test]
    fn test_chop_modulus_too_small() {
        let result = chop(b"x", &from_u64(200));
        assert!(matches!(result, Err(RsaError::MessageTooLong { modulus_bits: 8 })));
    }

    #[test]
    fn test_encrypt_textbook() {
        // 'A' = 65 encrypts to 2790 under (17, 3233)
        let payload = encrypt(b"A", &textbook_public()).unwrap();
        assert_eq!(payload.blocks(), &[from_u64(2790)]);
    }

    #[test]
    fn test_encrypt_empty() {
        let payload = encrypt(b"", &textbook_public()).unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.len(), 0);
    }

    #[test]
    fn test_transform_overflow() {
        let blocks = vec![from_u64(5), from_u64(3233)];
        let result = transform_blocks(&blocks, &from_u64(17), &from_u64(3233), BlockOp::Decrypt);
        assert!(matches!(result, Err(RsaError::BlockOverflow { index: 1 })));
    }

    #[test]
    fn test_transform_preserves_order() {
        let blocks: Vec<RsaBigInt> = (1..10u64).map(from_u64).collect();
        let n = from_u64(3233);
        let out = transform_blocks(&blocks, &from_u64(1), &n, BlockOp::Encrypt).unwrap();
        assert_eq!(out, blocks);
    }

    #[test]
    fn test_sign_textbook() {
        let private = RsaPrivateKey {
            d: from_u64(2753),
            p: from_u64(61),
            q: from_u64(53),
        };
        let signature = sign(b"A", &private).unwrap();
        let expected = mod_pow(&from_u64(65), &from_u64(2753), &from_u64(3233)).unwrap();
        assert_eq!(signature.into_blocks(), vec![expected]);
    }
}
