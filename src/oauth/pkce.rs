/// PKCE verification and opaque token generation.
///
/// `S256` is required for public clients; `plain` is permitted only for
/// confidential clients authenticated at the token endpoint (spec §4.7).
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate an opaque random token with at least 128 bits of entropy
/// (spec §3: "token... ≥128 bits entropy"). `byte_len` of 32 gives 256
/// bits, used uniformly for authorization codes, access tokens, and
/// refresh tokens.
pub fn random_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn verify(method: &str, challenge: &str, verifier: &str) -> bool {
    match method {
        "S256" => {
            let digest = Sha256::digest(verifier.as_bytes());
            let computed = URL_SAFE_NO_PAD.encode(digest);
            computed == challenge
        }
        "plain" => verifier == challenge,
        _ => false,
    }
}
