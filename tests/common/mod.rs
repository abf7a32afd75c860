//! Shared test fixtures: a miniature PKI
//!
//! Tests need real, verifiable material: a CSCA, a barcode signing
//! certificate chained to it, CRLs with and without the BSC serial, and a
//! seal signed by the BSC key. The `der` module below is a tiny test-only
//! DER *encoder* used to mint that material; the crate under test never
//! encodes DER.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use serde_json::json;

use vds_verify::canonical::canonicalize;
use vds_verify::crypto::sha256_hex;

/// Minimal DER encoding helpers
pub mod der {
    /// Encode a length in short or long form
    fn encode_length(len: usize) -> Vec<u8> {
        if len < 0x80 {
            vec![len as u8]
        } else {
            let mut bytes = Vec::new();
            let mut value = len;
            while value > 0 {
                bytes.insert(0, (value & 0xff) as u8);
                value >>= 8;
            }
            let mut out = vec![0x80 | bytes.len() as u8];
            out.extend(bytes);
            out
        }
    }

    /// Generic TLV
    pub fn tlv(tag: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend(encode_length(body.len()));
        out.extend_from_slice(body);
        out
    }

    /// SEQUENCE of pre-encoded parts
    pub fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x30, &parts.concat())
    }

    /// SET of pre-encoded parts
    pub fn set(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x31, &parts.concat())
    }

    /// INTEGER from magnitude bytes (a zero octet is prepended when the
    /// high bit is set, keeping the value positive)
    pub fn integer(magnitude: &[u8]) -> Vec<u8> {
        let mut body = magnitude.to_vec();
        if body.is_empty() || body[0] & 0x80 != 0 {
            body.insert(0, 0x00);
        }
        tlv(0x02, &body)
    }

    /// OBJECT IDENTIFIER from dotted-decimal text
    pub fn oid(dotted: &str) -> Vec<u8> {
        let arcs: Vec<u64> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
        let mut body = Vec::new();
        body.extend(base128(arcs[0] * 40 + arcs[1]));
        for &arc in &arcs[2..] {
            body.extend(base128(arc));
        }
        tlv(0x06, &body)
    }

    fn base128(mut value: u64) -> Vec<u8> {
        let mut out = vec![(value & 0x7f) as u8];
        value >>= 7;
        while value > 0 {
            out.insert(0, 0x80 | (value & 0x7f) as u8);
            value >>= 7;
        }
        out
    }

    /// PrintableString
    pub fn printable(text: &str) -> Vec<u8> {
        tlv(0x13, text.as_bytes())
    }

    /// UTF8String
    pub fn utf8(text: &str) -> Vec<u8> {
        tlv(0x0c, text.as_bytes())
    }

    /// UTCTime from a `yyMMddHHmmssZ` string
    pub fn utc_time(text: &str) -> Vec<u8> {
        tlv(0x17, text.as_bytes())
    }

    /// BIT STRING with zero unused bits
    pub fn bit_string(bytes: &[u8]) -> Vec<u8> {
        let mut body = vec![0x00];
        body.extend_from_slice(bytes);
        tlv(0x03, &body)
    }

    /// OCTET STRING
    pub fn octet_string(bytes: &[u8]) -> Vec<u8> {
        tlv(0x04, bytes)
    }

    /// Context-specific tag, constructed
    pub fn context_constructed(number: u8, body: &[u8]) -> Vec<u8> {
        tlv(0xa0 | number, body)
    }

    /// Context-specific tag, primitive
    pub fn context_primitive(number: u8, body: &[u8]) -> Vec<u8> {
        tlv(0x80 | number, body)
    }
}

/// ecdsa-with-SHA256 AlgorithmIdentifier
fn ecdsa_sha256_algorithm() -> Vec<u8> {
    der::seq(&[der::oid("1.2.840.10045.4.3.2")])
}

/// Name with a countryName and a commonName RDN
pub fn name(country: &str, common_name: &str) -> Vec<u8> {
    der::seq(&[
        der::set(&[der::seq(&[der::oid("2.5.4.6"), der::printable(country)])]),
        der::set(&[der::seq(&[der::oid("2.5.4.3"), der::utf8(common_name)])]),
    ])
}

fn spki(key: &SigningKey) -> Vec<u8> {
    let point = key.verifying_key().to_encoded_point(false);
    der::seq(&[
        der::seq(&[
            der::oid("1.2.840.10045.2.1"),
            der::oid("1.2.840.10045.3.1.7"),
        ]),
        der::bit_string(point.as_bytes()),
    ])
}

fn ski_extension(key_id: &[u8]) -> Vec<u8> {
    der::seq(&[
        der::oid("2.5.29.14"),
        der::octet_string(&der::octet_string(key_id)),
    ])
}

fn aki_extension(key_id: &[u8]) -> Vec<u8> {
    der::seq(&[
        der::oid("2.5.29.35"),
        der::octet_string(&der::seq(&[der::context_primitive(0, key_id)])),
    ])
}

/// Everything needed to assemble one test certificate
pub struct CertSpec<'a> {
    pub serial: &'a [u8],
    pub issuer: Vec<u8>,
    pub subject: Vec<u8>,
    pub key: &'a SigningKey,
    pub ski: Option<&'a [u8]>,
    pub aki: Option<&'a [u8]>,
}

/// Build an X.509 v3 certificate signed by `signer` with ecdsa-with-SHA256
pub fn build_certificate(spec: &CertSpec<'_>, signer: &SigningKey) -> Vec<u8> {
    let mut extensions = Vec::new();
    if let Some(ski) = spec.ski {
        extensions.push(ski_extension(ski));
    }
    if let Some(aki) = spec.aki {
        extensions.push(aki_extension(aki));
    }

    let mut tbs_parts = vec![
        der::context_constructed(0, &der::integer(&[0x02])), // v3
        der::integer(spec.serial),
        ecdsa_sha256_algorithm(),
        spec.issuer.clone(),
        der::seq(&[
            der::utc_time("210101000000Z"),
            der::utc_time("391231235959Z"),
        ]),
        spec.subject.clone(),
        spki(spec.key),
    ];
    if !extensions.is_empty() {
        tbs_parts.push(der::context_constructed(3, &der::seq(&extensions)));
    }
    let tbs = der::seq(&tbs_parts);

    let signature: Signature = signer.sign(&tbs);
    der::seq(&[
        tbs,
        ecdsa_sha256_algorithm(),
        der::bit_string(signature.to_der().as_bytes()),
    ])
}

/// Build an X.509 v2 CRL signed by `signer` with ecdsa-with-SHA256
pub fn build_crl(
    issuer: Vec<u8>,
    revoked_serials: &[&[u8]],
    include_next_update: bool,
    signer: &SigningKey,
) -> Vec<u8> {
    let mut tbs_parts = vec![
        der::integer(&[0x01]), // v2
        ecdsa_sha256_algorithm(),
        issuer,
        der::utc_time("260101000000Z"),
    ];
    if include_next_update {
        tbs_parts.push(der::utc_time("270101000000Z"));
    }
    if !revoked_serials.is_empty() {
        let entries: Vec<Vec<u8>> = revoked_serials
            .iter()
            .map(|serial| der::seq(&[der::integer(serial), der::utc_time("251201000000Z")]))
            .collect();
        tbs_parts.push(der::seq(&entries));
    }
    let tbs = der::seq(&tbs_parts);

    let signature: Signature = signer.sign(&tbs);
    der::seq(&[
        tbs,
        ecdsa_sha256_algorithm(),
        der::bit_string(signature.to_der().as_bytes()),
    ])
}

/// One coherent PKI: CSCA, chained BSC, CRL variants, and a signed seal
pub struct Fixture {
    pub csca_key: SigningKey,
    pub bsc_key: SigningKey,
    pub csca_der: Vec<u8>,
    pub csca_sha256: String,
    pub bsc_der: Vec<u8>,
    pub bsc_serial: Vec<u8>,
    /// CRL signed by the CSCA, empty revocation list
    pub crl_der: Vec<u8>,
    /// CRL signed by the CSCA, listing the BSC serial
    pub crl_revoking_bsc_der: Vec<u8>,
    /// CRL over the same issuer name signed by an unrelated key
    pub crl_foreign_der: Vec<u8>,
    /// A complete, authentic seal JSON (scenario S1)
    pub vds_json: String,
}

pub const CSCA_SKI: [u8; 20] = [0x11; 20];
pub const BSC_SKI: [u8; 20] = [0x22; 20];

pub fn csca_name() -> Vec<u8> {
    name("AUS", "Passport Country Signing Authority")
}

pub fn bsc_name() -> Vec<u8> {
    name("AUS", "Document Signer 013")
}

/// Deterministic keys keep every test run on identical material
pub fn fixture() -> Fixture {
    let csca_key = SigningKey::from_bytes(&[0x01; 32].into()).unwrap();
    let bsc_key = SigningKey::from_bytes(&[0x02; 32].into()).unwrap();
    let foreign_key = SigningKey::from_bytes(&[0x03; 32].into()).unwrap();

    let csca_der = build_certificate(
        &CertSpec {
            serial: &[0x01],
            issuer: csca_name(),
            subject: csca_name(),
            key: &csca_key,
            ski: Some(&CSCA_SKI),
            aki: Some(&CSCA_SKI),
        },
        &csca_key,
    );
    let csca_sha256 = sha256_hex(&csca_der);

    let bsc_serial = vec![0x0b, 0x5c];
    let bsc_der = build_certificate(
        &CertSpec {
            serial: &bsc_serial,
            issuer: csca_name(),
            subject: bsc_name(),
            key: &bsc_key,
            ski: Some(&BSC_SKI),
            aki: Some(&CSCA_SKI),
        },
        &csca_key,
    );

    let crl_der = build_crl(csca_name(), &[], true, &csca_key);
    let crl_revoking_bsc_der = build_crl(csca_name(), &[&bsc_serial], true, &csca_key);
    let crl_foreign_der = build_crl(csca_name(), &[], true, &foreign_key);

    let vds_json = build_vds_json(&bsc_der, &bsc_key);

    Fixture {
        csca_key,
        bsc_key,
        csca_der,
        csca_sha256,
        bsc_der,
        bsc_serial,
        crl_der,
        crl_revoking_bsc_der,
        crl_foreign_der,
        vds_json,
    }
}

/// Assemble and sign a vaccination seal (scenario S1 payload)
pub fn build_vds_json(bsc_der: &[u8], bsc_key: &SigningKey) -> String {
    let data = json!({
        "hdr": { "is": "AUS", "t": "icao.vacc", "v": 1 },
        "msg": {
            "uvci": "VB0009990012",
            "pid": {
                "n": "CITIZEN  JANE CATHERINE",
                "dob": "1961-05-15",
                "sex": "F",
                "i": "PA0941262"
            },
            "ve": [{
                "des": "XM68M6",
                "nam": "Comirnaty",
                "dis": "RA01.0",
                "vd": [{
                    "dvc": "2021-09-15",
                    "seq": 1,
                    "ctr": "AUS",
                    "adm": "General Practitioner",
                    "lot": "300157P"
                }]
            }]
        }
    });

    let payload = canonicalize(&data).expect("fixture payload canonicalises");
    let signature: Signature = bsc_key.sign(&payload);

    let envelope = json!({
        "data": data,
        "sig": {
            "alg": "ES256",
            "cer": URL_SAFE_NO_PAD.encode(bsc_der),
            "sigvl": URL_SAFE_NO_PAD.encode(signature.to_bytes()),
        }
    });
    serde_json::to_string(&envelope).expect("fixture envelope serialises")
}
