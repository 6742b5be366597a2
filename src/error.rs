// RSA Errors
// Every fallible operation in the crate reports one of these

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RsaError {
    /// A numeric helper or configuration received a value outside its domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The modulus is too small to hold even one byte per block
    #[error("the message is too long for a {modulus_bits}-bit modulus")]
    MessageTooLong { modulus_bits: u64 },

    /// A block value is not below the modulus it is transformed with
    #[error("block {index} is not below the modulus")]
    BlockOverflow { index: usize },

    /// Consistency check failed while deriving the exponents
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// An iteration cap was reached before a prime or key was found
    #[error("gave up after {attempts} attempts")]
    PrimeGenerationTimeout { attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RsaError>;
