// File Operations for RSA Keys and Payloads
// Handles reading and writing whole files and key block files

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::rsa::codec::{load_key, save_key, KeyBlock};
use crate::rsa::RsaKeyPair;

/// Default key file names written by the key generator
pub const PUBLIC_KEY_FILE: &str = "pubkey";
pub const PRIVATE_KEY_FILE: &str = "privkey";

/// Read entire file into memory
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// Write data to file
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    Ok(())
}

/// Write one key block file, replacing any existing file
pub fn save_key_file<K: KeyBlock>(key: &K, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    save_key(key, BufWriter::new(file))?;
    debug!(path = %path.display(), label = K::LABEL, "wrote key file");
    Ok(())
}

/// Load a key block file; the header says which kind of key is expected
pub fn load_key_file<K: KeyBlock>(path: &Path) -> Result<K> {
    let file = File::open(path)?;
    load_key(BufReader::new(file))
}

/// Save both halves of a key pair
pub fn save_keypair(keypair: &RsaKeyPair, public_path: &Path, private_path: &Path) -> Result<()> {
    save_key_file(keypair.public_key(), public_path)?;
    save_key_file(keypair.private_key(), private_path)?;
    Ok(())
}
