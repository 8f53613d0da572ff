use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key};
use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;

/// AES-256-GCM with an explicit 16-byte IV, matching the on-disk blob layout
/// `IV ‖ ciphertext ‖ auth_tag` specified for credential storage. The stock
/// `Aes256Gcm` alias fixes a 12-byte nonce; `AesGcm` is generic over nonce
/// size, so a 16-byte IV is a type parameter rather than a workaround.
pub type VaultCipher = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Encrypts `plaintext` under `key`, sampling a fresh 16-byte IV.
///
/// Returns base64(IV ‖ ciphertext ‖ auth_tag).
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<String> {
    let cipher = VaultCipher::new(Key::<VaultCipher>::from_slice(key));
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    let nonce = GenericArray::<u8, U16>::from_slice(&iv);
    let ciphertext_and_tag = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| anyhow::anyhow!("AES-256-GCM encryption failed"))?;

    let mut blob = Vec::with_capacity(IV_LEN + ciphertext_and_tag.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext_and_tag);
    Ok(BASE64.encode(blob))
}

/// Decrypts a base64(IV ‖ ciphertext ‖ auth_tag) blob produced by [`encrypt`].
///
/// Any tampering with the IV, ciphertext, or tag — or use of the wrong key —
/// causes this to fail; that failure is the canonical wrong-key signal.
pub fn decrypt(key: &[u8; 32], blob_base64: &str) -> Result<Vec<u8>> {
    let blob = BASE64
        .decode(blob_base64.trim())
        .context("credential ciphertext is not valid base64")?;
    if blob.len() < IV_LEN + TAG_LEN {
        bail!(
            "credential ciphertext too short: {} bytes (need at least {})",
            blob.len(),
            IV_LEN + TAG_LEN
        );
    }
    let (iv, ciphertext_and_tag) = blob.split_at(IV_LEN);
    let cipher = VaultCipher::new(Key::<VaultCipher>::from_slice(key));
    let nonce = GenericArray::<u8, U16>::from_slice(iv);
    cipher
        .decrypt(nonce, ciphertext_and_tag)
        .map_err(|_| anyhow::anyhow!("AES-256-GCM decryption failed (wrong key or tampered data)"))
}
