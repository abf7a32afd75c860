//! Cryptographic primitives for seal and certificate verification
//!
//! SHA-2 digests plus signature verification over the algorithms the
//! VDS-NC profile permits: ECDSA on P-256/P-384/P-521 and
//! RSA-PKCS1-v1.5 with SHA-256 for RSA-signed trust anchors.
//!
//! Algorithm selection always starts from an explicit signature-algorithm
//! OID. `id-ecPublicKey` names a key type, not a signing algorithm, and is
//! deliberately absent from the OID table.

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::pkcs8::DecodePublicKey;
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use thiserror::Error;

/// Errors raised by the verification primitives
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Public key bytes could not be decoded for the selected algorithm
    #[error("failed to decode public key: {0}")]
    KeyDecoding(String),

    /// Signature bytes could not be decoded (wrong length or bad DER)
    #[error("failed to decode signature: {0}")]
    SignatureDecoding(String),

    /// The signature is well-formed but does not verify
    #[error("signature verification failed")]
    VerificationFailed,

    /// The algorithm OID is outside the supported set
    #[error("unsupported signature algorithm OID: {0}")]
    UnsupportedAlgorithm(String),

    /// Key type and signature algorithm disagree (e.g. RSA key, ECDSA OID)
    #[error("key type does not match signature algorithm")]
    KeyAlgorithmMismatch,
}

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Digest `data` in one shot
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = Hasher::new(*self);
        hasher.update(data);
        hasher.finalize()
    }

    /// Digest `data` and render lower-case hex
    pub fn hex_digest(&self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }
}

/// Streaming digest over any [`HashAlgorithm`]
pub struct Hasher {
    inner: HasherInner,
}

enum HasherInner {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    /// Start a streaming digest
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::Sha256 => HasherInner::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => HasherInner::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => HasherInner::Sha512(Sha512::new()),
        };
        Self { inner }
    }

    /// Absorb more input
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            HasherInner::Sha256(h) => h.update(data),
            HasherInner::Sha384(h) => h.update(data),
            HasherInner::Sha512(h) => h.update(data),
        }
    }

    /// Finish and return the digest bytes
    pub fn finalize(self) -> Vec<u8> {
        match self.inner {
            HasherInner::Sha256(h) => h.finalize().to_vec(),
            HasherInner::Sha384(h) => h.finalize().to_vec(),
            HasherInner::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// SHA-256 of `data` as lower-case hex; used for CSCA integrity pinning
pub fn sha256_hex(data: &[u8]) -> String {
    HashAlgorithm::Sha256.hex_digest(data)
}

/// Supported elliptic curves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256 / prime256v1
    P256,
    /// NIST P-384 / secp384r1
    P384,
    /// NIST P-521 / secp521r1
    P521,
}

impl EcCurve {
    /// Map a namedCurve OID to a curve
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.2.840.10045.3.1.7" => Some(Self::P256),
            "1.3.132.0.34" => Some(Self::P384),
            "1.3.132.0.35" => Some(Self::P521),
            _ => None,
        }
    }

    /// Byte length of one signature component (`r` or `s`) on this curve
    pub fn component_len(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

/// Signature algorithms named by certificate and CRL `signatureAlgorithm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// ecdsa-with-SHA256
    EcdsaWithSha256,
    /// ecdsa-with-SHA384
    EcdsaWithSha384,
    /// ecdsa-with-SHA512
    EcdsaWithSha512,
    /// sha256WithRSAEncryption
    Sha256WithRsa,
}

impl SignatureAlgorithm {
    /// Map a signature-algorithm OID. Key-type OIDs (`id-ecPublicKey`)
    /// intentionally do not map.
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.2.840.10045.4.3.2" => Some(Self::EcdsaWithSha256),
            "1.2.840.10045.4.3.3" => Some(Self::EcdsaWithSha384),
            "1.2.840.10045.4.3.4" => Some(Self::EcdsaWithSha512),
            "1.2.840.113549.1.1.11" => Some(Self::Sha256WithRsa),
            _ => None,
        }
    }

    /// Digest paired with this signature algorithm
    pub fn hash(&self) -> HashAlgorithm {
        match self {
            Self::EcdsaWithSha256 | Self::Sha256WithRsa => HashAlgorithm::Sha256,
            Self::EcdsaWithSha384 => HashAlgorithm::Sha384,
            Self::EcdsaWithSha512 => HashAlgorithm::Sha512,
        }
    }
}

/// How the signature bytes are framed
#[derive(Debug, Clone, Copy)]
pub enum SignatureBytes<'a> {
    /// Raw `(r ‖ s)`, each component curve-size bytes (the VDS `sigvl` form)
    Raw(&'a [u8]),
    /// ASN.1 DER `ECDSA-Sig-Value`, or the PKCS#1 octets for RSA
    Der(&'a [u8]),
}

/// A verification key extracted from a subjectPublicKeyInfo
#[derive(Debug, Clone)]
pub enum PublicKey {
    /// EC key: curve plus SEC1 point bytes
    Ec {
        /// Curve named by the SPKI parameters
        curve: EcCurve,
        /// Uncompressed or compressed SEC1 point
        point: Vec<u8>,
    },
    /// RSA key, kept as the full SPKI DER for PKCS#8 decoding
    Rsa {
        /// Raw `subjectPublicKeyInfo` SEQUENCE bytes
        spki_der: Vec<u8>,
    },
}

impl PublicKey {
    /// Verify `signature` over `message` under this key with `algorithm`.
    ///
    /// The message is hashed here with the algorithm's paired digest; ECDSA
    /// verification runs on the prehash so every curve/digest pairing in the
    /// OID table works.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: SignatureBytes<'_>,
    ) -> Result<(), CryptoError> {
        match (self, algorithm) {
            (PublicKey::Ec { curve, point }, alg) if alg != SignatureAlgorithm::Sha256WithRsa => {
                let digest = alg.hash().digest(message);
                verify_ecdsa(*curve, point, &digest, signature)
            }
            (PublicKey::Rsa { spki_der }, SignatureAlgorithm::Sha256WithRsa) => {
                let signature_bytes = match signature {
                    SignatureBytes::Raw(b) | SignatureBytes::Der(b) => b,
                };
                verify_rsa_pkcs1_sha256(spki_der, message, signature_bytes)
            }
            _ => Err(CryptoError::KeyAlgorithmMismatch),
        }
    }
}

fn verify_ecdsa(
    curve: EcCurve,
    point: &[u8],
    digest: &[u8],
    signature: SignatureBytes<'_>,
) -> Result<(), CryptoError> {
    match curve {
        EcCurve::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| CryptoError::KeyDecoding(e.to_string()))?;
            let sig = match signature {
                SignatureBytes::Raw(bytes) => p256::ecdsa::Signature::from_slice(bytes),
                SignatureBytes::Der(bytes) => p256::ecdsa::Signature::from_der(bytes),
            }
            .map_err(|e| CryptoError::SignatureDecoding(e.to_string()))?;
            key.verify_prehash(digest, &sig)
                .map_err(|_| CryptoError::VerificationFailed)
        }
        EcCurve::P384 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| CryptoError::KeyDecoding(e.to_string()))?;
            let sig = match signature {
                SignatureBytes::Raw(bytes) => p384::ecdsa::Signature::from_slice(bytes),
                SignatureBytes::Der(bytes) => p384::ecdsa::Signature::from_der(bytes),
            }
            .map_err(|e| CryptoError::SignatureDecoding(e.to_string()))?;
            key.verify_prehash(digest, &sig)
                .map_err(|_| CryptoError::VerificationFailed)
        }
        EcCurve::P521 => {
            let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| CryptoError::KeyDecoding(e.to_string()))?;
            let sig = match signature {
                SignatureBytes::Raw(bytes) => p521::ecdsa::Signature::from_slice(bytes),
                SignatureBytes::Der(bytes) => p521::ecdsa::Signature::from_der(bytes),
            }
            .map_err(|e| CryptoError::SignatureDecoding(e.to_string()))?;
            key.verify_prehash(digest, &sig)
                .map_err(|_| CryptoError::VerificationFailed)
        }
    }
}

fn verify_rsa_pkcs1_sha256(
    spki_der: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let key = rsa::RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| CryptoError::KeyDecoding(e.to_string()))?;
    let digest = Sha256::digest(message);
    key.verify(rsa::Pkcs1v15Sign::new::<rsa::sha2::Sha256>(), &digest, signature)
        .map_err(|_| CryptoError::VerificationFailed)
}
