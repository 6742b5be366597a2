//! Textbook RSA.
//!
//! Key generation with a Jacobi-symbol probable prime test, "chop/glue"
//! block encryption and signing without padding, and a three-line text
//! format for keys. This is a teaching implementation: it has no padding
//! scheme and no side-channel protection. Do not use it to protect real data.

pub mod error;
pub mod rsa;
pub mod util;

pub use error::{Result, RsaError};
