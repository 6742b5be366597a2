use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use rand::rngs::OsRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rsa_chop::rsa::{
    decode_payload, encode_payload, generate_keypair, KeyGenConfig, RsaPrivateKey, RsaPublicKey,
    DEFAULT_CONFIDENCE,
};
use rsa_chop::util::{
    load_key_file, read_file, save_keypair, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE,
};

#[derive(Parser, Debug)]
#[command(
    name = "rsa-chop",
    version,
    about = "Textbook RSA: generate keys, encrypt and decrypt files"
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["keylen", "plainfile", "cryptfile"])
))]
struct Args {
    /// Generate a public/private key pair whose primes have LEN bits
    #[arg(short = 'g', value_name = "LEN")]
    keylen: Option<u32>,

    /// Encrypt FILE with the public key given by -k
    #[arg(short = 'e', value_name = "FILE", requires = "keyfile")]
    plainfile: Option<PathBuf>,

    /// Decrypt FILE with the private key given by -k
    #[arg(short = 'd', value_name = "FILE", requires = "keyfile")]
    cryptfile: Option<PathBuf>,

    /// Public or private key file
    #[arg(short = 'k', value_name = "KEY")]
    keyfile: Option<PathBuf>,

    /// Where -g writes the public key
    #[arg(long, value_name = "PATH", default_value = PUBLIC_KEY_FILE)]
    pub_out: PathBuf,

    /// Where -g writes the private key
    #[arg(long, value_name = "PATH", default_value = PRIVATE_KEY_FILE)]
    priv_out: PathBuf,

    /// Witness rounds per primality test
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE, env = "RSA_CHOP_CONFIDENCE")]
    confidence: u32,

    /// Give up key generation after this many candidates (unbounded if unset)
    #[arg(long, env = "RSA_CHOP_MAX_ATTEMPTS")]
    max_attempts: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if let Some(bits) = args.keylen {
        return generate(args, bits);
    }

    // clap guarantees -k alongside -e or -d
    let keyfile = args.keyfile.as_deref().context("missing key file")?;

    let mut stdout = io::stdout().lock();

    if let Some(plainfile) = &args.plainfile {
        encrypt_file(plainfile, keyfile, &mut stdout)
    } else if let Some(cryptfile) = &args.cryptfile {
        decrypt_file(cryptfile, keyfile, &mut stdout)
    } else {
        bail!("one of -g, -e, -d is required")
    }
}

fn generate(args: &Args, bits: u32) -> Result<()> {
    let mut config = KeyGenConfig::new(bits).with_confidence(args.confidence);
    if let Some(attempts) = args.max_attempts {
        config = config.with_max_attempts(attempts);
    }

    eprintln!("Wait while generating keys...");
    let keypair = generate_keypair(&mut OsRng, &config).context("key generation failed")?;

    save_keypair(&keypair, &args.pub_out, &args.priv_out).with_context(|| {
        format!(
            "writing {} and {}",
            args.pub_out.display(),
            args.priv_out.display()
        )
    })?;

    info!(
        public = %args.pub_out.display(),
        private = %args.priv_out.display(),
        fingerprint = %keypair.public_key().fingerprint(),
        "saved key pair"
    );
    Ok(())
}

/// Write the text payload of `plainfile` to `out`
fn encrypt_file(plainfile: &Path, keyfile: &Path, out: &mut impl Write) -> Result<()> {
    let key: RsaPublicKey = load_key_file(keyfile)
        .with_context(|| format!("loading public key {}", keyfile.display()))?;
    let plaintext =
        read_file(plainfile).with_context(|| format!("reading {}", plainfile.display()))?;

    let payload = key.encrypt(&plaintext)?;
    info!(blocks = payload.len(), "encrypted file");

    writeln!(out, "{}", encode_payload(&payload)?)?;
    out.flush()?;
    Ok(())
}

/// Write the plaintext of the text payload in `cryptfile` to `out`
fn decrypt_file(cryptfile: &Path, keyfile: &Path, out: &mut impl Write) -> Result<()> {
    let key: RsaPrivateKey = load_key_file(keyfile)
        .with_context(|| format!("loading private key {}", keyfile.display()))?;
    let raw = read_file(cryptfile).with_context(|| format!("reading {}", cryptfile.display()))?;
    let text = String::from_utf8(raw)
        .with_context(|| format!("{} is not a text payload", cryptfile.display()))?;

    let payload = decode_payload(&text)?;
    let plaintext = key.decrypt(&payload)?;

    out.write_all(&plaintext)?;
    out.flush()?;
    Ok(())
}
