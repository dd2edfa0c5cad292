use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::address::WalletAddress;

/// Capability interface for proving control of a wallet's private key.
///
/// Implementations must be pure: no network, no storage, no shared mutable
/// state. Any internal fault (bad encoding, wrong length, library error)
/// is a failed verification, never a success.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `true` only when `signature` is a valid signature over the
    /// raw `message` bytes by the private key behind `wallet`.
    fn verify(&self, wallet: &WalletAddress, message: &str, signature: &str) -> bool;
}

/// Default verifier: the wallet address is the base58-encoded ed25519
/// public key and the signature covers the raw message bytes.
///
/// The signature is accepted in base58 (the chain convention) or standard
/// base64 (what browser wallet adapters put into JSON payloads).
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    pub fn new() -> Self {
        Self
    }

    fn decode_signature(signature: &str) -> Option<[u8; 64]> {
        let bytes = bs58::decode(signature)
            .into_vec()
            .ok()
            .or_else(|| BASE64_STANDARD.decode(signature).ok())?;
        <[u8; 64]>::try_from(bytes.as_slice()).ok()
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, wallet: &WalletAddress, message: &str, signature: &str) -> bool {
        // A well-formed base58 string can still decode to the wrong byte
        // count; that is a verification failure, not a panic.
        let key_bytes = match bs58::decode(wallet.as_str()).into_vec() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let key_bytes: [u8; 32] = match key_bytes.as_slice().try_into() {
            Ok(arr) => arr,
            Err(_) => return false,
        };
        let key = match VerifyingKey::from_bytes(&key_bytes) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let sig_bytes = match Self::decode_signature(signature) {
            Some(bytes) => bytes,
            None => return false,
        };
        let signature = Signature::from_bytes(&sig_bytes);
        key.verify(message.as_bytes(), &signature).is_ok()
    }
}

/// Fixed-outcome verifier, for driving the pipeline in tests without key
/// material.
///
/// Never wire this into a deployment: a verifier that accepts everything
/// turns the exchange into an impersonation oracle for any address.
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier(pub bool);

impl SignatureVerifier for StaticVerifier {
    fn verify(&self, _wallet: &WalletAddress, _message: &str, _signature: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, WalletAddress) {
        let signing = SigningKey::generate(&mut OsRng);
        let address = bs58::encode(signing.verifying_key().as_bytes()).into_string();
        let wallet = WalletAddress::parse(&address).unwrap();
        (signing, wallet)
    }

    #[test]
    fn accepts_base58_signature_from_key_owner() {
        let (signing, wallet) = keypair();
        let message = "sign-in: nonce-42";
        let signature = bs58::encode(signing.sign(message.as_bytes()).to_bytes()).into_string();
        assert!(Ed25519Verifier::new().verify(&wallet, message, &signature));
    }

    #[test]
    fn accepts_base64_signature_from_key_owner() {
        let (signing, wallet) = keypair();
        let message = "sign-in: nonce-42";
        let signature = BASE64_STANDARD.encode(signing.sign(message.as_bytes()).to_bytes());
        assert!(Ed25519Verifier::new().verify(&wallet, message, &signature));
    }

    #[test]
    fn rejects_signature_over_different_message() {
        let (signing, wallet) = keypair();
        let signature = bs58::encode(signing.sign(b"original message").to_bytes()).into_string();
        assert!(!Ed25519Verifier::new().verify(&wallet, "tampered message", &signature));
    }

    #[test]
    fn rejects_signature_from_different_key() {
        let (_, wallet) = keypair();
        let (other, _) = keypair();
        let message = "sign-in: nonce-42";
        let signature = bs58::encode(other.sign(message.as_bytes()).to_bytes()).into_string();
        assert!(!Ed25519Verifier::new().verify(&wallet, message, &signature));
    }

    #[test]
    fn rejects_undecodable_signature() {
        let (_, wallet) = keypair();
        assert!(!Ed25519Verifier::new().verify(&wallet, "msg", "!!not-an-encoding!!"));
    }

    #[test]
    fn rejects_signature_with_wrong_byte_count() {
        let (_, wallet) = keypair();
        let short = bs58::encode([7u8; 16]).into_string();
        assert!(!Ed25519Verifier::new().verify(&wallet, "msg", &short));
    }

    #[test]
    fn rejects_address_that_is_not_a_public_key() {
        // 32 '2' characters decode to fewer than 32 bytes; no key material
        // to check against, so the answer is a clean refusal.
        let wallet = WalletAddress::parse(&"2".repeat(32)).unwrap();
        let (signing, _) = keypair();
        let signature = bs58::encode(signing.sign(b"msg").to_bytes()).into_string();
        assert!(!Ed25519Verifier::new().verify(&wallet, "msg", &signature));
    }

    #[test]
    fn static_verifier_returns_its_outcome() {
        let (signing, wallet) = keypair();
        let signature = bs58::encode(signing.sign(b"msg").to_bytes()).into_string();
        assert!(StaticVerifier(true).verify(&wallet, "msg", &signature));
        assert!(!StaticVerifier(false).verify(&wallet, "msg", &signature));
    }
}
