// RSA Module - Main module file
// Exports all RSA-related functionality

pub mod bigint;
pub mod codec;
pub mod decrypt;
pub mod encrypt;
pub mod keygen;
pub mod prime;

pub use codec::{
    decode_payload, encode_payload, key_from_str, key_to_string, load_key, save_key, KeyBlock,
};
pub use decrypt::{decrypt, glue, verify, verify_message};
pub use encrypt::{chop, encrypt, sign, transform_blocks, BlockOp, CipherPayload};
pub use keygen::{generate_keypair, KeyGenConfig, RsaKeyPair, RsaPrivateKey, RsaPublicKey};
pub use prime::{is_probable_prime, random_prime, PrimeSearch, DEFAULT_CONFIDENCE};
