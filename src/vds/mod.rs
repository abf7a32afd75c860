//! VDS-NC envelope model and reader
//!
//! Strongly-typed decoding of the seal JSON. The exact text that arrived is
//! retained alongside the decoded model: the signature covers a
//! canonicalisation of the original bytes, so the envelope must never be
//! re-encoded from the model.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{EcCurve, HashAlgorithm};
use crate::error::{Result, VdsVerifyError};

/// A decoded VDS-NC seal plus the original JSON text it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vds {
    /// Signed payload: header and message
    pub data: VdsData,
    /// Signature block: algorithm, signer certificate, signature value
    pub sig: VdsSignature,
    #[serde(skip)]
    original_text: String,
}

impl Vds {
    /// The unmodified JSON text this seal was decoded from
    pub fn original_text(&self) -> &str {
        &self.original_text
    }
}

/// The signed portion of the envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdsData {
    /// Header: seal type, version, issuing country
    pub hdr: Header,
    /// Typed message payload
    pub msg: Message,
}

/// Seal header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Seal type, e.g. `icao.vacc` or `icao.test`; opaque to verification
    pub t: String,
    /// Seal version
    pub v: i64,
    /// Three-letter issuing country code
    #[serde(rename = "is")]
    pub issuing_country: String,
}

/// Message payload; vaccination seals decode fully, other seal types are
/// carried as raw JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// `icao.vacc` payload
    Vaccination(VaccinationMessage),
    /// Any other seal type
    Other(serde_json::Value),
}

/// Vaccination message: certificate id, person, vaccination events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationMessage {
    /// Unique vaccination certificate identifier
    pub uvci: String,
    /// Person identification
    pub pid: PersonId,
    /// Vaccination events
    pub ve: Vec<VaccinationEvent>,
}

/// Person identification block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonId {
    /// Name
    pub n: String,
    /// Date of birth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    /// Sex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Travel document number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i: Option<String>,
    /// Additional identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<String>,
}

/// One vaccination event (a vaccine product)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationEvent {
    /// Vaccine or prophylaxis description code
    pub des: String,
    /// Vaccine brand name
    pub nam: String,
    /// Disease targeted
    pub dis: String,
    /// Individual dose records
    pub vd: Vec<VaccinationDetails>,
}

/// One administered dose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationDetails {
    /// Date of vaccination
    pub dvc: String,
    /// Dose sequence number
    pub seq: u32,
    /// Country of vaccination
    pub ctr: String,
    /// Administering centre
    pub adm: String,
    /// Vaccine lot number
    pub lot: String,
    /// Due date of next dose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvn: Option<String>,
}

/// Signature block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdsSignature {
    /// Signature algorithm
    pub alg: VdsAlgorithm,
    /// Barcode signing certificate, base64url DER
    pub cer: String,
    /// Raw `(r ‖ s)` signature, base64url
    pub sigvl: String,
}

/// Signature algorithms a seal may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VdsAlgorithm {
    /// ECDSA P-256 with SHA-256
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA P-384 with SHA-384
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA P-521 with SHA-512
    #[serde(rename = "ES512")]
    Es512,
}

impl VdsAlgorithm {
    /// Curve this algorithm runs on
    pub fn curve(&self) -> EcCurve {
        match self {
            Self::Es256 => EcCurve::P256,
            Self::Es384 => EcCurve::P384,
            Self::Es512 => EcCurve::P521,
        }
    }

    /// Digest paired with this algorithm
    pub fn hash(&self) -> HashAlgorithm {
        match self {
            Self::Es256 => HashAlgorithm::Sha256,
            Self::Es384 => HashAlgorithm::Sha384,
            Self::Es512 => HashAlgorithm::Sha512,
        }
    }
}

/// Decode a VDS-NC envelope from its JSON text.
///
/// Schema violations (missing fields, wrong types, unknown `sig.alg`)
/// yield [`VdsVerifyError::JsonDecoding`]. The original text is retained on
/// the returned value for canonicalisation.
pub fn decode_vds(json_text: &str) -> Result<Vds> {
    let mut vds: Vds = serde_json::from_str(json_text)
        .map_err(|e| VdsVerifyError::JsonDecoding(e.to_string()))?;
    let country = &vds.data.hdr.issuing_country;
    if country.len() != 3 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(VdsVerifyError::JsonDecoding(format!(
            "issuing country must be a three-letter code, got {country:?}"
        )));
    }
    vds.original_text = json_text.to_string();
    Ok(vds)
}

/// Decode base64url tolerating both padded and unpadded input.
///
/// Characters outside the base64url alphabet are rejected.
pub(crate) fn decode_base64url(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))
}
