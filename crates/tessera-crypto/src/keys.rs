use ed25519_dalek::Signer as _;
use ed25519_dalek::Verifier as _;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Multicodec header for an Ed25519 public key.
const ED25519_PUB_HEADER: [u8; 2] = [0xed, 0x01];
/// Multicodec header for a compressed secp256k1 public key.
const SECP256K1_PUB_HEADER: [u8; 2] = [0xe7, 0x01];

/// Supported key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    Secp256k1,
}

impl KeyType {
    /// The verification method type a DID document uses for this key.
    pub fn verification_method_type(&self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519VerificationKey2020",
            Self::Secp256k1 => "EcdsaSecp256k1VerificationKey2019",
        }
    }

    /// Reverse of [`KeyType::verification_method_type`].
    pub fn from_verification_method_type(vm_type: &str) -> Option<Self> {
        match vm_type {
            "Ed25519VerificationKey2020" => Some(Self::Ed25519),
            "EcdsaSecp256k1VerificationKey2019" => Some(Self::Secp256k1),
            _ => None,
        }
    }

    /// Length of the encoded public key.
    pub fn public_key_len(&self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::Secp256k1 => 33,
        }
    }

    fn multicodec_header(&self) -> [u8; 2] {
        match self {
            Self::Ed25519 => ED25519_PUB_HEADER,
            Self::Secp256k1 => SECP256K1_PUB_HEADER,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "ed25519"),
            Self::Secp256k1 => write!(f, "secp256k1"),
        }
    }
}

impl std::str::FromStr for KeyType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(Self::Ed25519),
            "secp256k1" => Ok(Self::Secp256k1),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Private key material. Zeroized on drop by the underlying crates.
pub enum KeyPair {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl KeyPair {
    /// Generate a new random key pair using OS-provided entropy.
    pub fn generate(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => Self::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng)),
            KeyType::Secp256k1 => Self::Secp256k1(k256::ecdsa::SigningKey::random(&mut OsRng)),
        }
    }

    /// Create a key pair from a 32-byte secret.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        match key_type {
            KeyType::Ed25519 => {
                let mut seed = Zeroizing::new([0u8; 32]);
                seed.copy_from_slice(bytes);
                Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed)))
            }
            KeyType::Secp256k1 => k256::ecdsa::SigningKey::from_slice(bytes)
                .map(Self::Secp256k1)
                .map_err(|e| CryptoError::InvalidKey(format!("invalid secp256k1 secret: {}", e))),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Ed25519(sk) => PublicKey {
                key_type: KeyType::Ed25519,
                bytes: sk.verifying_key().to_bytes().to_vec(),
            },
            Self::Secp256k1(sk) => PublicKey {
                key_type: KeyType::Secp256k1,
                bytes: sk
                    .verifying_key()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec(),
            },
        }
    }

    /// Raw secret bytes, wiped when the returned buffer drops.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Ed25519(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            Self::Secp256k1(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        }
    }

    /// Sign a message. Secp256k1 hashes with SHA-256 before signing.
    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(sk) => sk.sign(message).to_bytes().to_vec(),
            Self::Secp256k1(sk) => {
                let signature: k256::ecdsa::Signature = sk.sign(message);
                signature.to_bytes().to_vec()
            }
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_type", &self.key_type())
            .field("public_key", &self.public_key().to_multibase())
            .finish_non_exhaustive()
    }
}

/// A public key tagged with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Create from raw bytes: 32 for Ed25519, 33 (compressed SEC1) for secp256k1.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, CryptoError> {
        let expected = key_type.public_key_len();
        if bytes.len() != expected {
            return Err(CryptoError::InvalidKeyLength {
                expected,
                actual: bytes.len(),
            });
        }
        match key_type {
            KeyType::Ed25519 => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                    expected,
                    actual: bytes.len(),
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&arr)
                    .map_err(|e| CryptoError::InvalidKey(format!("invalid ed25519 key: {}", e)))?;
            }
            KeyType::Secp256k1 => {
                k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                    .map_err(|e| CryptoError::InvalidKey(format!("invalid secp256k1 key: {}", e)))?;
            }
        }
        Ok(Self {
            key_type,
            bytes: bytes.to_vec(),
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Multibase (base58btc, `z` prefix) over the multicodec-tagged key.
    pub fn to_multibase(&self) -> String {
        let mut tagged = Vec::with_capacity(2 + self.bytes.len());
        tagged.extend_from_slice(&self.key_type.multicodec_header());
        tagged.extend_from_slice(&self.bytes);
        encode_multibase(&tagged)
    }

    /// Decode a multibase key; the multicodec header selects the key type.
    pub fn from_multibase(value: &str) -> Result<Self, CryptoError> {
        let tagged = decode_multibase(value)?;
        if tagged.len() < 2 {
            return Err(CryptoError::InvalidKey("multibase key too short".into()));
        }
        let (header, key) = tagged.split_at(2);
        let key_type = if header == ED25519_PUB_HEADER {
            KeyType::Ed25519
        } else if header == SECP256K1_PUB_HEADER {
            KeyType::Secp256k1
        } else {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "unknown multicodec header {}",
                hex::encode(header)
            )));
        };
        Self::from_bytes(key_type, key)
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        match self.key_type {
            KeyType::Ed25519 => {
                let arr: [u8; 32] = self
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CryptoError::InvalidKey("ed25519 key must be 32 bytes".into()))?;
                let vk = ed25519_dalek::VerifyingKey::from_bytes(&arr)
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
                let sig = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| CryptoError::SignatureVerificationFailed)?;
                vk.verify(message, &sig)
                    .map_err(|_| CryptoError::SignatureVerificationFailed)
            }
            KeyType::Secp256k1 => {
                let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.bytes)
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
                let sig = k256::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| CryptoError::SignatureVerificationFailed)?;
                vk.verify(message, &sig)
                    .map_err(|_| CryptoError::SignatureVerificationFailed)
            }
        }
    }
}

/// Multibase encode with the base58btc (`z`) alphabet.
pub fn encode_multibase(bytes: &[u8]) -> String {
    format!("z{}", bs58::encode(bytes).into_string())
}

/// Decode a base58btc multibase string. Other bases are rejected.
pub fn decode_multibase(value: &str) -> Result<Vec<u8>, CryptoError> {
    let body = value.strip_prefix('z').ok_or_else(|| {
        CryptoError::Encoding(format!(
            "expected base58btc multibase ('z' prefix), got: {}",
            value.chars().next().map(String::from).unwrap_or_default()
        ))
    })?;
    bs58::decode(body)
        .into_vec()
        .map_err(|e| CryptoError::Encoding(format!("invalid base58: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let kp = KeyPair::generate(KeyType::Ed25519);
        assert_eq!(kp.public_key().as_bytes().len(), 32);

        let kp = KeyPair::generate(KeyType::Secp256k1);
        let pk = kp.public_key();
        assert_eq!(pk.as_bytes().len(), 33);
        assert!(pk.as_bytes()[0] == 0x02 || pk.as_bytes()[0] == 0x03);
    }

    #[test]
    fn test_from_bytes_deterministic() {
        let seed = [42u8; 32];
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
            let kp1 = KeyPair::from_bytes(key_type, &seed).unwrap();
            let kp2 = KeyPair::from_bytes(key_type, &seed).unwrap();
            assert_eq!(kp1.public_key(), kp2.public_key());
            assert_eq!(kp1.secret_bytes().as_slice(), &seed);
        }
    }

    #[test]
    fn test_from_bytes_wrong_length() {
        let result = KeyPair::from_bytes(KeyType::Ed25519, &[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_secp256k1_zero_secret_rejected() {
        let result = KeyPair::from_bytes(KeyType::Secp256k1, &[0u8; 32]);
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_multibase_roundtrip() {
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
            let pk = KeyPair::generate(key_type).public_key();
            let encoded = pk.to_multibase();
            assert!(encoded.starts_with('z'));
            let decoded = PublicKey::from_multibase(&encoded).unwrap();
            assert_eq!(decoded, pk);
            assert_eq!(decoded.key_type(), key_type);
        }
    }

    #[test]
    fn test_ed25519_multibase_prefix() {
        // Multicodec-tagged Ed25519 keys always render with this prefix.
        let pk = KeyPair::generate(KeyType::Ed25519).public_key();
        assert!(pk.to_multibase().starts_with("z6Mk"));
    }

    #[test]
    fn test_decode_multibase_rejects_other_bases() {
        assert!(matches!(
            decode_multibase("mAAAA"),
            Err(CryptoError::Encoding(_))
        ));
        assert!(decode_multibase("z0OIl").is_err());
    }

    #[test]
    fn test_sign_and_verify_both_curves() {
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
            let kp = KeyPair::generate(key_type);
            let sig = kp.sign(b"rainfall");
            assert_eq!(sig.len(), 64);
            assert!(kp.public_key().verify(b"rainfall", &sig).is_ok());
            assert!(matches!(
                kp.public_key().verify(b"snowfall", &sig),
                Err(CryptoError::SignatureVerificationFailed)
            ));
        }
    }

    #[test]
    fn test_truncated_signature_fails() {
        let kp = KeyPair::generate(KeyType::Ed25519);
        let sig = kp.sign(b"msg");
        assert!(kp.public_key().verify(b"msg", &sig[..10]).is_err());
    }

    #[test]
    fn test_key_type_strings() {
        assert_eq!(
            KeyType::Ed25519.verification_method_type(),
            "Ed25519VerificationKey2020"
        );
        assert_eq!(
            KeyType::from_verification_method_type("EcdsaSecp256k1VerificationKey2019"),
            Some(KeyType::Secp256k1)
        );
        assert_eq!("secp256k1".parse::<KeyType>().unwrap(), KeyType::Secp256k1);
        assert!("rsa".parse::<KeyType>().is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let kp = KeyPair::from_bytes(KeyType::Ed25519, &[7u8; 32]).unwrap();
        let debug = format!("{:?}", kp);
        assert!(!debug.contains(&hex::encode([7u8; 32])));
    }
}
