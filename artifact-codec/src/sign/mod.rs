mod error;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

use ct_codecs::{Base64, Decoder, Encoder};
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use ed25519_dalek::ed25519::signature::{Signer as Ed25519Signer, Verifier as Ed25519Verifier};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer as RsaSigner, Verifier as RsaVerifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Digest;

/// Collaborator the writer calls to produce a signature over manifest
/// bytes (§6, §4.8). Built-in implementations already base64-encode their
/// output; an external signer is free to return raw or base64 bytes — the
/// writer never interprets them.
pub trait Signer {
    fn sign(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Collaborator the reader calls to check a signature over manifest bytes
/// (§6). `signature` is exactly the bytes that were read from
/// `manifest.sig`.
pub trait Verifier {
    fn verify(&self, manifest_bytes: &[u8], signature: &[u8]) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub enum KeyEncoding {
    Pkcs1,
    Pkcs8,
}

/// A built-in private key, selected explicitly by the caller (there is no
/// ambiguity to resolve on the signing side — the caller already knows
/// which key they hold).
pub enum PrivateKey {
    Rsa(RsaPrivateKey),
    EcdsaP256(p256::ecdsa::SigningKey),
    EcdsaP384(p384::ecdsa::SigningKey),
    EcdsaP521(p521::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl PrivateKey {
    pub fn rsa_from_pem(pem: &str, encoding: KeyEncoding) -> Result<Self> {
        let key = match encoding {
            KeyEncoding::Pkcs1 => RsaPrivateKey::from_pkcs1_pem(pem).map_err(Error::DeserialisePkcs1)?,
            KeyEncoding::Pkcs8 => RsaPrivateKey::from_pkcs8_pem(pem).map_err(Error::DeserialisePkcs8)?,
        };
        Ok(PrivateKey::Rsa(key))
    }
}

impl Signer for PrivateKey {
    fn sign(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>> {
        let raw_signature = match self {
            PrivateKey::Rsa(key) => {
                let signing_key = pkcs1v15::SigningKey::<Sha256>::new(key.clone());
                RsaSigner::sign(&signing_key, manifest_bytes).to_vec()
            }
            PrivateKey::EcdsaP256(key) => {
                let digest = Sha256::digest(manifest_bytes);
                let signature: p256::ecdsa::Signature = key.sign_prehash(&digest).map_err(Error::EcdsaKey)?;
                signature.to_der().as_bytes().to_vec()
            }
            PrivateKey::EcdsaP384(key) => {
                let digest = Sha256::digest(manifest_bytes);
                let signature: p384::ecdsa::Signature = key.sign_prehash(&digest).map_err(Error::EcdsaKey)?;
                signature.to_der().as_bytes().to_vec()
            }
            PrivateKey::EcdsaP521(key) => {
                let digest = Sha256::digest(manifest_bytes);
                let signature: p521::ecdsa::Signature = key.sign_prehash(&digest).map_err(Error::EcdsaKey)?;
                signature.to_der().as_bytes().to_vec()
            }
            PrivateKey::Ed25519(key) => {
                let signature: ed25519_dalek::Signature = Ed25519Signer::sign(key, manifest_bytes);
                signature.to_bytes()[..].to_vec()
            }
        };

        Base64::encode_to_string(raw_signature).map(String::into_bytes).map_err(Error::Base64Decode)
    }
}

/// A built-in public key. [`PublicKey::from_pem`] infers the algorithm by
/// trying each decoder in turn and keeping the first that parses —
/// mirroring the trial-by-slot approach `update-format-crau` already uses
/// when more than one signature slot is present
/// (`delta_update::parse_signature_data`).
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
    EcdsaP384(p384::ecdsa::VerifyingKey),
    EcdsaP521(p521::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl PublicKey {
    pub fn rsa_from_pem(pem: &str, encoding: KeyEncoding) -> Result<Self> {
        let key = match encoding {
            KeyEncoding::Pkcs1 => RsaPublicKey::from_pkcs1_pem(pem).map_err(Error::DeserialisePkcs1)?,
            KeyEncoding::Pkcs8 => RsaPublicKey::from_public_key_pem(pem).map_err(Error::DecodePublicKey)?,
        };
        Ok(PublicKey::Rsa(key))
    }

    /// Infers the scheme from an SPKI PEM-encoded public key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::Rsa(key));
        }
        if let Ok(key) = ed25519_dalek::VerifyingKey::from_public_key_pem(pem) {
            return Ok(PublicKey::Ed25519(key));
        }
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_pem(pem) {
            return Ok(PublicKey::EcdsaP256(key));
        }
        if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_pem(pem) {
            return Ok(PublicKey::EcdsaP384(key));
        }
        if let Ok(key) = p521::ecdsa::VerifyingKey::from_public_key_pem(pem) {
            return Ok(PublicKey::EcdsaP521(key));
        }
        Err(Error::UnsupportedKeyAlgorithm)
    }
}

impl Verifier for PublicKey {
    fn verify(&self, manifest_bytes: &[u8], signature: &[u8]) -> Result<()> {
        let mut raw_signature = vec![0u8; signature.len()];
        let decoded_len = Base64::decode(&mut raw_signature, signature, None).map_err(Error::Base64Decode)?.len();
        raw_signature.truncate(decoded_len);

        match self {
            PublicKey::Rsa(key) => {
                let verifying_key = pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
                let signature = pkcs1v15::Signature::try_from(raw_signature.as_slice()).map_err(Error::InvalidPkcs1v15Signature)?;
                RsaVerifier::verify(&verifying_key, manifest_bytes, &signature).map_err(Error::CouldNotVerifyRsaSignature)
            }
            PublicKey::EcdsaP256(key) => {
                let digest = Sha256::digest(manifest_bytes);
                let signature = p256::ecdsa::Signature::from_der(&raw_signature).map_err(Error::InvalidEcdsaSignature)?;
                key.verify_prehash(&digest, &signature).map_err(Error::CouldNotVerifyEcdsaSignature)
            }
            PublicKey::EcdsaP384(key) => {
                let digest = Sha256::digest(manifest_bytes);
                let signature = p384::ecdsa::Signature::from_der(&raw_signature).map_err(Error::InvalidEcdsaSignature)?;
                key.verify_prehash(&digest, &signature).map_err(Error::CouldNotVerifyEcdsaSignature)
            }
            PublicKey::EcdsaP521(key) => {
                let digest = Sha256::digest(manifest_bytes);
                let signature = p521::ecdsa::Signature::from_der(&raw_signature).map_err(Error::InvalidEcdsaSignature)?;
                key.verify_prehash(&digest, &signature).map_err(Error::CouldNotVerifyEcdsaSignature)
            }
            PublicKey::Ed25519(key) => {
                let signature =
                    ed25519_dalek::Signature::from_slice(&raw_signature).map_err(Error::InvalidEd25519Signature)?;
                Ed25519Verifier::verify(key, manifest_bytes, &signature).map_err(Error::CouldNotVerifyEd25519Signature)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn ed25519_sign_and_verify_round_trip() {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        let private = PrivateKey::Ed25519(signing_key);
        let public = PublicKey::Ed25519(verifying_key);

        let manifest = b"deadbeef  version\n";
        let sig = private.sign(manifest).unwrap();
        public.verify(manifest, &sig).unwrap();

        let mut tampered = manifest.to_vec();
        tampered[0] ^= 0xff;
        assert!(public.verify(&tampered, &sig).is_err());
    }
}
