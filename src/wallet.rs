// src/wallet.rs
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::{rngs::OsRng, Rng};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;

/// In-memory wallet holding an ed25519 signing key
#[derive(Debug, Clone)]
pub struct Wallet {
    pub signing_key: SigningKey,
    pub name: String,
}

impl Wallet {
    /// Generate a new random wallet
    pub fn new(name: String) -> Self {
        let mut csprng = OsRng;
        let secret_bytes: [u8; 32] = csprng.gen();
        let signing_key = SigningKey::from_bytes(&secret_bytes);
        Self { signing_key, name }
    }

    /// Reconstruct from a raw private key (32 or 64 bytes)
    pub fn from_private_key(private_key_bytes: &[u8], name: String) -> Result<Self, String> {
        match private_key_bytes.len() {
            32 => {
                let mut key_bytes = [0u8; 32];
                key_bytes.copy_from_slice(private_key_bytes);
                let signing_key = SigningKey::from_bytes(&key_bytes);
                Ok(Self { signing_key, name })
            }
            64 => {
                let mut key_bytes = [0u8; 32];
                key_bytes.copy_from_slice(&private_key_bytes[..32]);
                let signing_key = SigningKey::from_bytes(&key_bytes);
                let verifying_key = signing_key.verifying_key();
                if verifying_key.as_bytes() != &private_key_bytes[32..] {
                    return Err("Public key does not match private key".into());
                }
                Ok(Self { signing_key, name })
            }
            len => Err(format!("Invalid key length: {} bytes", len)),
        }
    }

    /// Load a Solana CLI keypair file (JSON array of 64 bytes)
    pub fn from_keypair_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read keypair {}: {}", path.display(), e))?;
        let bytes: Vec<u8> = serde_json::from_str(&raw)
            .map_err(|e| format!("Failed to parse keypair {}: {}", path.display(), e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keypair".to_string());
        Self::from_private_key(&bytes, name)
    }

    /// Solana public key of this wallet
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message with ed25519
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}
