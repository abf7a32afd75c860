//! The verification pipeline
//!
//! Runs the ordered checks that anchor a seal to a trusted CSCA:
//!
//! 1. Decode the barcode signing certificate and select CSCA candidates by
//!    issuing country
//! 2. CSCA integrity (pinned SHA-256)
//! 3. CRL signature under the CSCA key
//! 4. BSC serial not in the CRL
//! 5. BSC authorityKeyIdentifier equals CSCA subjectKeyIdentifier
//! 6. BSC issuer equals CSCA subject, and the BSC signature verifies under
//!    the CSCA key
//! 7. Seal signature over the canonicalised `data` member under the BSC key
//!
//! Verification is synchronous and pure: no I/O, no retries, and the first
//! failing check decides the returned error. Only candidate selection masks
//! failures, and only while another candidate remains.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::canonical::canonicalize;
use crate::crypto::{CryptoError, PublicKey, SignatureAlgorithm, SignatureBytes};
use crate::error::{Result, VdsVerifyError};
use crate::store::{CscaCertificate, TrustStore};
use crate::vds::{decode_base64url, Vds, VdsAlgorithm};
use crate::x509::{Certificate, CertificateList, X509Error};

/// Knobs for optional hardening checks
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Also require the BSC and CSCA to be inside their validity windows
    pub check_validity_window: bool,
    /// Clock for the validity check; defaults to the system clock
    pub now: Option<DateTime<Utc>>,
}

/// Verify a seal against the trust store with default options
pub fn verify(vds: &Vds, store: &TrustStore) -> Result<()> {
    verify_with_options(vds, store, &VerifyOptions::default())
}

/// Verify a seal against the trust store
pub fn verify_with_options(vds: &Vds, store: &TrustStore, options: &VerifyOptions) -> Result<()> {
    // Step 1: decode the BSC and select a CSCA candidate by country
    let bsc_der =
        decode_base64url(&vds.sig.cer).map_err(|_| VdsVerifyError::ParseBscCertFromVdsFailed)?;
    let bsc =
        Certificate::from_der(&bsc_der).map_err(|_| VdsVerifyError::ParseBscCertFromVdsFailed)?;
    let country = bsc
        .issuer_country()
        .ok_or(VdsVerifyError::NoMatchingCscaFound)?;

    let mut candidate_failure: Option<VdsVerifyError> = None;
    let mut selected: Option<&CscaCertificate> = None;
    for csca in store
        .cscas()
        .iter()
        .filter(|c| c.subject_country().as_deref() == Some(country.as_str()))
    {
        // Step 2: integrity gate. A failing candidate is skipped while
        // others remain; its error surfaces when no candidate survives.
        if csca.integrity_ok() {
            selected = Some(csca);
            break;
        }
        debug!(
            subject = %csca.certificate().subject_dn(),
            "skipping CSCA candidate with broken integrity pin"
        );
        candidate_failure.get_or_insert(VdsVerifyError::CscaCertHashMismatch);
    }
    let Some(csca) = selected else {
        return Err(candidate_failure.unwrap_or(VdsVerifyError::NoMatchingCscaFound));
    };

    let csca_key = csca
        .certificate()
        .public_key()
        .map_err(|_| VdsVerifyError::VerifyCrlFailed)?;

    // Step 3: CRL signature under the CSCA key
    let snapshot = csca.crl().snapshot();
    let crl_der = snapshot.data.ok_or(VdsVerifyError::LoadCrlFailed)?;
    let crl = CertificateList::from_der(&crl_der).map_err(|_| VdsVerifyError::LoadCrlFailed)?;
    let crl_alg = crl
        .signature_algorithm_oid()
        .and_then(|oid| SignatureAlgorithm::from_oid(&oid))
        .ok_or(VdsVerifyError::VerifyCrlFailed)?;
    let crl_tbs = crl.tbs_raw().map_err(|_| VdsVerifyError::LoadCrlFailed)?;
    let crl_signature = crl
        .signature_value()
        .ok_or(VdsVerifyError::VerifyCrlFailed)?;
    csca_key
        .verify(crl_alg, crl_tbs, SignatureBytes::Der(crl_signature))
        .map_err(|_| VdsVerifyError::VerifyCrlFailed)?;

    // Step 4: the BSC serial must not appear in the CRL
    let serial = bsc
        .serial_number()
        .ok_or(VdsVerifyError::BscCertNoSerialNumber)?;
    if crl.revoked_serials().iter().any(|s| *s == serial) {
        return Err(VdsVerifyError::BscCertRevoked);
    }

    // Step 5: AKI / SKI linkage
    let bsc_aki = bsc
        .authority_key_identifier()
        .ok_or(VdsVerifyError::ExtractBscAkiFailed)?;
    let csca_ski = csca
        .certificate()
        .subject_key_identifier()
        .ok_or(VdsVerifyError::ExtractCscaSkiFailed)?;
    if bsc_aki != csca_ski {
        return Err(VdsVerifyError::BscAkiMismatchCscaSki);
    }

    // Step 6: issuer/subject linkage, then the BSC's own signature
    let bsc_issuer = bsc.issuer_attributes();
    if bsc_issuer.is_empty() || bsc_issuer != csca.certificate().subject_attributes() {
        return Err(VdsVerifyError::IssuerSubjectsDontMatch);
    }
    let bsc_alg_oid = bsc
        .signature_algorithm_oid()
        .ok_or(VdsVerifyError::VerifyBscSignatureFailed)?;
    let bsc_alg = SignatureAlgorithm::from_oid(&bsc_alg_oid)
        .ok_or_else(|| VdsVerifyError::BscKeyAlgorithmNotSupported(bsc_alg_oid.clone()))?;
    let bsc_tbs = bsc
        .tbs_raw()
        .map_err(|_| VdsVerifyError::VerifyBscSignatureFailed)?;
    let bsc_signature = bsc
        .signature_value()
        .ok_or(VdsVerifyError::VerifyBscSignatureFailed)?;
    csca_key
        .verify(bsc_alg, bsc_tbs, SignatureBytes::Der(bsc_signature))
        .map_err(|_| VdsVerifyError::VerifyBscSignatureFailed)?;

    if options.check_validity_window {
        let now = options.now.unwrap_or_else(Utc::now);
        check_validity_window(&bsc, now)?;
        check_validity_window(csca.certificate(), now)?;
    }

    // Step 7: seal signature over the canonicalised payload
    let payload = canonical_payload(vds)?;
    let signature = decode_base64url(&vds.sig.sigvl)
        .map_err(|_| VdsVerifyError::ParseSignatureFromVdsFailed)?;
    let bsc_key = bsc_public_key(&bsc, vds.sig.alg)?;
    bsc_key
        .verify(
            vds_signature_algorithm(vds.sig.alg),
            &payload,
            SignatureBytes::Raw(&signature),
        )
        .map_err(|e| match e {
            CryptoError::KeyDecoding(_) => VdsVerifyError::LoadBscPublicKeyDataFailed,
            _ => VdsVerifyError::VerifyVdsSignatureFailed,
        })?;

    Ok(())
}

/// Canonicalise the `data` member of the retained original text.
///
/// The decoded model is never re-encoded; only the bytes that arrived can
/// reproduce the signing input.
fn canonical_payload(vds: &Vds) -> Result<Vec<u8>> {
    let root: serde_json::Value = serde_json::from_str(vds.original_text())
        .map_err(|_| VdsVerifyError::ParseJsonFailedCanonicalization)?;
    let data = root
        .get("data")
        .ok_or(VdsVerifyError::ParseJsonFailedCanonicalization)?;
    canonicalize(data).map_err(|_| VdsVerifyError::ParseJsonFailedCanonicalization)
}

/// Extract the BSC public key and require it to sit on the curve the seal's
/// declared algorithm runs on
fn bsc_public_key(bsc: &Certificate, alg: VdsAlgorithm) -> Result<PublicKey> {
    match bsc.public_key() {
        Ok(PublicKey::Ec { curve, point }) => {
            if curve != alg.curve() {
                return Err(VdsVerifyError::LoadBscPublicKeyDataFailed);
            }
            Ok(PublicKey::Ec { curve, point })
        }
        Ok(PublicKey::Rsa { .. }) => Err(VdsVerifyError::BscKeyAlgorithmNotSupported(
            "RSA keys cannot sign seals".to_string(),
        )),
        Err(X509Error::UnsupportedKeyAlgorithm(oid)) => {
            Err(VdsVerifyError::BscKeyAlgorithmNotSupported(oid))
        }
        Err(_) => Err(VdsVerifyError::LoadBscPublicKeyDataFailed),
    }
}

fn vds_signature_algorithm(alg: VdsAlgorithm) -> SignatureAlgorithm {
    match alg {
        VdsAlgorithm::Es256 => SignatureAlgorithm::EcdsaWithSha256,
        VdsAlgorithm::Es384 => SignatureAlgorithm::EcdsaWithSha384,
        VdsAlgorithm::Es512 => SignatureAlgorithm::EcdsaWithSha512,
    }
}

fn check_validity_window(certificate: &Certificate, now: DateTime<Utc>) -> Result<()> {
    let (Some(not_before), Some(not_after)) = (certificate.not_before(), certificate.not_after())
    else {
        return Err(VdsVerifyError::CertificateOutsideValidityWindow);
    };
    if now < not_before || now > not_after {
        return Err(VdsVerifyError::CertificateOutsideValidityWindow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_skip_validity_check() {
        let options = VerifyOptions::default();
        assert!(!options.check_validity_window);
        assert!(options.now.is_none());
    }

    #[test]
    fn test_vds_algorithm_mapping() {
        assert_eq!(
            vds_signature_algorithm(VdsAlgorithm::Es256),
            SignatureAlgorithm::EcdsaWithSha256
        );
        assert_eq!(
            vds_signature_algorithm(VdsAlgorithm::Es512),
            SignatureAlgorithm::EcdsaWithSha512
        );
    }
}
