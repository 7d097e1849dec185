use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, hmac, pbkdf2};
use std::num::NonZeroU32;

/// Chave AES-256-GCM usada para selar sessões e settings secretos
#[derive(Clone)]
pub struct SecretBox {
    key: [u8; 32],
}

impl SecretBox {
    /// Deriva a chave com PBKDF2-HMAC-SHA256
    pub fn from_password(secret: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key = [0u8; 32];
        let iterations = NonZeroU32::new(iterations.max(1)).unwrap_or(NonZeroU32::MIN);
        pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, salt, secret.as_bytes(), &mut key);
        Self { key }
    }

    /// Deriva a chave com um único SHA-256 do segredo
    pub fn from_sha256(secret: &str) -> Self {
        let hash = digest::digest(&digest::SHA256, secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(hash.as_ref());
        Self { key }
    }

    fn cipher(&self) -> Result<LessSafeKey, String> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|e| format!("Failed to create encryption key: {:?}", e))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Output: base64url(nonce || ciphertext || tag)
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|e| format!("Failed to generate nonce: {:?}", e))?;

        let mut buffer = plaintext.to_vec();
        self.cipher()?
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut buffer)
            .map_err(|e| format!("Encryption failed: {:?}", e))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(buffer);
        Ok(URL_SAFE_NO_PAD.encode(combined))
    }

    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, String> {
        let combined = URL_SAFE_NO_PAD
            .decode(sealed.trim())
            .map_err(|e| format!("Failed to decode sealed data: {}", e))?;

        if combined.len() < NONCE_LEN {
            return Err("Invalid sealed data: too short".to_string());
        }

        let (nonce_bytes, encrypted) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|e| format!("Invalid nonce: {:?}", e))?;

        let mut buffer = encrypted.to_vec();
        let plaintext = self
            .cipher()?
            .open_in_place(nonce, Aad::empty(), &mut buffer)
            .map_err(|_| "Decryption failed (tampered data or wrong key)".to_string())?;
        Ok(plaintext.to_vec())
    }

    pub fn seal_str(&self, plaintext: &str) -> Result<String, String> {
        self.seal(plaintext.as_bytes())
    }

    pub fn open_str(&self, sealed: &str) -> Result<String, String> {
        String::from_utf8(self.open(sealed)?).map_err(|e| format!("Invalid UTF-8: {}", e))
    }
}

pub fn random_bytes(len: usize) -> Result<Vec<u8>, String> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|e| format!("Failed to generate random bytes: {:?}", e))?;
    Ok(bytes)
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hex_decode(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|i| input.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

pub fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex_encode(hmac::sign(&key, payload).as_ref())
}

/// Comparação em tempo constante via `hmac::verify`
pub fn verify_hmac_sha256_hex(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Some(signature) = hex_decode(signature_hex) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, payload, &signature).is_ok()
}
