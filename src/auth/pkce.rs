use crate::utils::crypto;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

/// `n` random bytes from the system CSPRNG, hex encoded
pub fn random_hex(n: usize) -> Result<String, String> {
    Ok(crypto::hex_encode(&crypto::random_bytes(n)?))
}

/// 128 hex chars (RFC 7636 allows 43..=128)
pub fn code_verifier() -> Result<String, String> {
    random_hex(64)
}

/// S256: base64url(SHA-256(verifier)) without padding
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(crypto::sha256(verifier.as_bytes()))
}

pub fn generate_pair() -> Result<PkcePair, String> {
    let code_verifier = code_verifier()?;
    let code_challenge = code_challenge(&code_verifier);
    Ok(PkcePair { code_verifier, code_challenge })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifier_shape() {
        let verifier = code_verifier().unwrap();
        assert_eq!(verifier.len(), 128);
        assert!(verifier.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_pair_matches() {
        let pair = generate_pair().unwrap();
        assert_eq!(pair.code_challenge, code_challenge(&pair.code_verifier));
        assert!(!pair.code_challenge.contains('='));
    }
}
