//! Error types for VDS-NC verification

use thiserror::Error;

/// Result type alias for verification and trust-store operations
pub type Result<T> = std::result::Result<T, VdsVerifyError>;

/// Main error type for VDS-NC verification operations
///
/// The verifier surfaces at most one of these per call: the first failure
/// in the ordered check pipeline.
#[derive(Error, Debug)]
pub enum VdsVerifyError {
    /// The supplied text is not a well-formed VDS envelope
    #[error("VDS JSON decoding failed: {0}")]
    JsonDecoding(String),

    /// No trusted CSCA matches the barcode signer's issuing country
    #[error("no matching CSCA found for the barcode signing certificate")]
    NoMatchingCscaFound,

    /// Stored CSCA bytes do not hash to their declared SHA-256
    #[error("CSCA certificate bytes do not match their pinned SHA-256")]
    CscaCertHashMismatch,

    /// The CSCA has no usable CRL data (missing or unparseable)
    #[error("failed to load CRL data for the selected CSCA")]
    LoadCrlFailed,

    /// The CRL signature does not verify under the CSCA public key
    #[error("CRL signature verification failed")]
    VerifyCrlFailed,

    /// The barcode signing certificate carries no serial number
    #[error("barcode signing certificate has no serial number")]
    BscCertNoSerialNumber,

    /// The barcode signing certificate is listed in the CSCA's CRL
    #[error("barcode signing certificate has been revoked")]
    BscCertRevoked,

    /// The authorityKeyIdentifier extension is missing or malformed
    #[error("failed to extract authorityKeyIdentifier from the barcode signing certificate")]
    ExtractBscAkiFailed,

    /// The subjectKeyIdentifier extension is missing or malformed
    #[error("failed to extract subjectKeyIdentifier from the CSCA certificate")]
    ExtractCscaSkiFailed,

    /// BSC authority key id does not equal the CSCA subject key id
    #[error("barcode signer AKI does not match CSCA SKI")]
    BscAkiMismatchCscaSki,

    /// BSC issuer name does not equal the CSCA subject name
    #[error("barcode signer issuer does not match CSCA subject")]
    IssuerSubjectsDontMatch,

    /// The BSC's own signature does not verify under the CSCA public key
    #[error("barcode signing certificate signature verification failed")]
    VerifyBscSignatureFailed,

    /// The signature or key algorithm is outside the supported set
    #[error("unsupported key or signature algorithm: {0}")]
    BscKeyAlgorithmNotSupported(String),

    /// The seal signature does not verify under the BSC public key
    #[error("VDS signature verification failed")]
    VerifyVdsSignatureFailed,

    /// `sig.cer` could not be decoded into an X.509 certificate
    #[error("failed to parse barcode signing certificate from the VDS")]
    ParseBscCertFromVdsFailed,

    /// `sig.sigvl` could not be decoded into signature bytes
    #[error("failed to parse signature value from the VDS")]
    ParseSignatureFromVdsFailed,

    /// The retained VDS text could not be canonicalised for signing input
    #[error("failed to canonicalise VDS payload JSON")]
    ParseJsonFailedCanonicalization,

    /// The BSC subjectPublicKeyInfo could not be turned into a usable key
    #[error("failed to load barcode signer public key data")]
    LoadBscPublicKeyDataFailed,

    /// A checked certificate is outside its validity window (opt-in check)
    #[error("certificate is outside its validity window")]
    CertificateOutsideValidityWindow,

    /// CSCA certificate bytes could not be parsed
    #[error("failed to parse CSCA certificate: {0}")]
    CscaParseFailed(String),

    /// IO errors (persistence paths only)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable CRL store errors (refresh paths only)
    #[error("persistence error: {0}")]
    Persistence(String),

    /// CRL download errors (refresh paths only)
    #[error("HTTP error: {0}")]
    Http(String),
}
