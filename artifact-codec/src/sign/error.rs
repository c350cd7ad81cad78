#[derive(Debug)]
pub enum Error {
    ReadPrivateKey(std::io::Error),
    ReadPublicKey(std::io::Error),
    DeserialisePkcs1(rsa::pkcs1::Error),
    DeserialisePkcs8(rsa::pkcs8::Error),
    DecodePublicKey(rsa::pkcs8::spki::Error),
    InvalidPkcs1v15Signature(rsa::signature::Error),
    CouldNotVerifyRsaSignature(rsa::signature::Error),
    EcdsaKey(ecdsa::Error),
    InvalidEcdsaSignature(ecdsa::Error),
    CouldNotVerifyEcdsaSignature(ecdsa::Error),
    Ed25519Key(ed25519_dalek::ed25519::Error),
    InvalidEd25519Signature(ed25519_dalek::ed25519::Error),
    CouldNotVerifyEd25519Signature(ed25519_dalek::ed25519::Error),
    Base64Decode(ct_codecs::Error),
    UnsupportedKeyAlgorithm,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ReadPrivateKey(err) => write!(f, "failed to read private key: {err}"),
            Error::ReadPublicKey(err) => write!(f, "failed to read public key: {err}"),
            Error::DeserialisePkcs1(err) => write!(f, "failed to deserialise PKCS1 PEM: {err}"),
            Error::DeserialisePkcs8(err) => write!(f, "failed to deserialise PKCS8 PEM: {err}"),
            Error::DecodePublicKey(err) => write!(f, "failed to decode public key: {err}"),
            Error::InvalidPkcs1v15Signature(err) => write!(f, "invalid PKCS1v15 signature: {err}"),
            Error::CouldNotVerifyRsaSignature(err) => write!(f, "failed to verify RSA signature: {err}"),
            Error::EcdsaKey(err) => write!(f, "invalid ECDSA key: {err}"),
            Error::InvalidEcdsaSignature(err) => write!(f, "invalid ECDSA signature: {err}"),
            Error::CouldNotVerifyEcdsaSignature(err) => write!(f, "failed to verify ECDSA signature: {err}"),
            Error::Ed25519Key(err) => write!(f, "invalid Ed25519 key: {err}"),
            Error::InvalidEd25519Signature(err) => write!(f, "invalid Ed25519 signature: {err}"),
            Error::CouldNotVerifyEd25519Signature(err) => write!(f, "failed to verify Ed25519 signature: {err}"),
            Error::Base64Decode(err) => write!(f, "failed to base64-decode signature: {err}"),
            Error::UnsupportedKeyAlgorithm => write!(f, "key does not match any supported signing algorithm"),
        }
    }
}
