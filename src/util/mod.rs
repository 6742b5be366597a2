// Utility Module - file helpers around the RSA core

pub mod file_ops;

pub use file_ops::{
    load_key_file, read_file, save_key_file, save_keypair, write_file, PRIVATE_KEY_FILE,
    PUBLIC_KEY_FILE,
};
