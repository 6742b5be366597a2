// RSA Decryption Implementation
// Glues exponentiated blocks back into the original byte message

use super::bigint::{to_bytes, to_bytes_padded, RsaBigInt};
use super::encrypt::{block_width, transform_blocks, BlockOp, CipherPayload};
use super::keygen::{RsaPrivateKey, RsaPublicKey};
use crate::error::Result;

/// Transform `blocks` with `exponent` and concatenate their bytes.
///
/// Every block but the last is widened to the full block width, so zero
/// bytes leading an inner block survive. The last block has no recorded
/// length and keeps the minimal encoding.
pub fn glue(
    blocks: &[RsaBigInt],
    exponent: &RsaBigInt,
    modulus: &RsaBigInt,
    op: BlockOp,
) -> Result<Vec<u8>> {
    let plain = transform_blocks(blocks, exponent, modulus, op)?;
    let width = block_width(modulus);

    let mut message = Vec::with_capacity(plain.len() * width);
    if let Some((last, inner)) = plain.split_last() {
        for block in inner {
            message.extend_from_slice(&to_bytes_padded(block, width));
        }
        message.extend_from_slice(&to_bytes(last));
    }

    Ok(message)
}

/// Decrypt a payload using RSA private key
pub fn decrypt(payload: &CipherPayload, private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
    glue(
        payload.blocks(),
        &private_key.d,
        &private_key.modulus(),
        BlockOp::Decrypt,
    )
}

/// Recover the signed message from a signature payload.
/// The caller compares the result with the message it expects.
pub fn verify(signature: &CipherPayload, public_key: &RsaPublicKey) -> Result<Vec<u8>> {
    glue(signature.blocks(), &public_key.e, &public_key.n, BlockOp::Verify)
}

/// True if `signature` opens to exactly `message` under `public_key`
pub fn verify_message(
    signature: &CipherPayload,
    message: &[u8],
    public_key: &RsaPublicKey,
) -> Result<bool> {
    Ok(verify(signature, public_key)? == message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RsaError;
    use crate::rsa::bigint::from_u64;
    use crate::rsa::encrypt::{encrypt, sign};
    use crate::rsa::keygen::{generate_keypair, KeyGenConfig, RsaKeyPair};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn keypair(bits: u32, seed: u64) -> RsaKeyPair {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_keypair(&mut rng, &KeyGenConfig::new(bits)).unwrap()
    }

    fn test_roundtrip(keypair: &RsaKeyPair, message: &[u8]) {
        let ciphertext = keypair.public_key().encrypt(message).unwrap();
        let decrypted = keypair.private_key().decrypt(&ciphertext).unwrap();
        assert_eq!(message, decrypted.as_slice());
    }

    #[test]
    fn test_hello_world_256() {
        let keypair = keypair(256, 256);
        let message = b"hello world";

        let payload = encrypt(message, keypair.public_key()).unwrap();
        assert_eq!(payload.len(), 1);
        let decrypted = decrypt(&payload, keypair.private_key()).unwrap();

        assert_eq!(message.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        let keypair = keypair(64, 1);

        // Test various message sizes, several spanning many blocks
        let long = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let test_cases: Vec<&[u8]> = vec![
            &b"A"[..],
            &b"AB"[..],
            &b"Hello"[..],
            &b"Hello, World!"[..],
            long.as_bytes(),
            &[255u8; 100][..],
        ];

        for message in test_cases {
            test_roundtrip(&keypair, message);
        }
    }

    #[test]
    fn test_sign_verify() {
        let keypair = keypair(64, 2);
        let message = b"signed by the holder of the private key";

        let signature = sign(message, keypair.private_key()).unwrap();
        assert_eq!(verify(&signature, keypair.public_key()).unwrap(), message);
        assert!(verify_message(&signature, message, keypair.public_key()).unwrap());
        assert!(!verify_message(&signature, b"something else", keypair.public_key()).unwrap());
    }

    #[test]
    fn test_empty_payload() {
        let keypair = keypair(64, 3);

        let payload = encrypt(b"", keypair.public_key()).unwrap();
        assert!(payload.is_empty());
        assert!(decrypt(&payload, keypair.private_key()).unwrap().is_empty());
    }

    #[test]
    fn test_inner_zero_bytes_survive() {
        let keypair = keypair(64, 4);
        let width = keypair.public_key().block_width();

        // Two all-zero blocks, then a block that starts with a non-zero byte
        let mut message = vec![0u8; 2 * width];
        message.extend_from_slice(b"end");
        message[width + 3] = 9;

        test_roundtrip(&keypair, &message);
    }

    #[test]
    fn test_trailing_block_leading_zeros_dropped() {
        let keypair = keypair(64, 5);

        // A single block starting with zero comes back without it
        let payload = encrypt(&[0, 0, 7], keypair.public_key()).unwrap();
        let decrypted = decrypt(&payload, keypair.private_key()).unwrap();
        assert_eq!(decrypted, vec![7]);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let keypair1 = keypair(64, 6);
        let keypair2 = keypair(64, 7);

        let message = b"Test message";
        let ciphertext = keypair1.public_key().encrypt(message).unwrap();

        // Either a block overflows the other modulus or the output is garbage
        match keypair2.private_key().decrypt(&ciphertext) {
            Ok(plaintext) => assert_ne!(plaintext.as_slice(), message.as_slice()),
            Err(e) => assert!(matches!(e, RsaError::BlockOverflow { .. })),
        }
    }

    #[test]
    fn test_decrypt_overflowing_block() {
        let keypair = keypair(64, 8);
        let n = keypair.public_key().n.clone();
        let payload = CipherPayload::new(vec![from_u64(1), n]);

        let result = decrypt(&payload, keypair.private_key());
        assert!(matches!(result, Err(RsaError::BlockOverflow { index: 1 })));
    }
}
