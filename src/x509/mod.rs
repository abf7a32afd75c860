//! X.509 certificate and CRL views
//!
//! Typed, read-only accessors over the DER tree produced by [`crate::asn1`].
//! Fields are located by walking `tbsCertificate` / `tbsCertList` by tag
//! class and type; OPTIONAL fields (`version`, `nextUpdate`,
//! `revokedCertificates`) shift their neighbours, so positional indexing is
//! never trusted.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::asn1::{tag, Asn1Error, Asn1Tree, Node};
use crate::crypto::{EcCurve, PublicKey};

/// id-ce-subjectKeyIdentifier
pub const OID_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";
/// id-ce-authorityKeyIdentifier
pub const OID_AUTHORITY_KEY_IDENTIFIER: &str = "2.5.29.35";
/// id-at-countryName
pub const OID_COUNTRY_NAME: &str = "2.5.4.6";
/// id-ecPublicKey (a key type, never an algorithm selector)
pub const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
/// rsaEncryption
pub const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";

/// Errors raised while interpreting a certificate or CRL structure
#[derive(Error, Debug)]
pub enum X509Error {
    /// The DER stream itself failed to decode
    #[error("DER decoding failed: {0}")]
    Asn1(#[from] Asn1Error),

    /// The DER decoded but does not have the expected shape
    #[error("malformed structure: {0}")]
    Malformed(String),

    /// subjectPublicKeyInfo names a key type outside the supported set
    #[error("unsupported subject public key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),
}

/// One issuer/subject attribute: `(type OID, string value)`
pub type NameAttribute = (String, String);

/// Read-only view over an X.509 certificate
pub struct Certificate {
    tree: Asn1Tree,
}

impl Certificate {
    /// Parse certificate DER. The outer value must be the `Certificate`
    /// SEQUENCE `(tbsCertificate, signatureAlgorithm, signatureValue)`.
    pub fn from_der(der: &[u8]) -> Result<Self, X509Error> {
        let tree = Asn1Tree::parse(der.to_vec())?;
        let cert = Self { tree };
        let root = cert.root()?;
        if root.child_count() < 3 {
            return Err(X509Error::Malformed(
                "certificate SEQUENCE needs tbs, algorithm, and signature".into(),
            ));
        }
        cert.tbs()?;
        Ok(cert)
    }

    /// The full DER this certificate was parsed from
    pub fn der(&self) -> &[u8] {
        self.tree.data()
    }

    fn root(&self) -> Result<Node<'_>, X509Error> {
        let root = self
            .tree
            .root()
            .ok_or_else(|| X509Error::Malformed("empty certificate".into()))?;
        if !root.is_universal(tag::SEQUENCE) {
            return Err(X509Error::Malformed("certificate is not a SEQUENCE".into()));
        }
        Ok(root)
    }

    fn tbs(&self) -> Result<Node<'_>, X509Error> {
        let tbs = self
            .root()?
            .child(0)
            .ok_or_else(|| X509Error::Malformed("missing tbsCertificate".into()))?;
        if !tbs.is_universal(tag::SEQUENCE) {
            return Err(X509Error::Malformed("tbsCertificate is not a SEQUENCE".into()));
        }
        Ok(tbs)
    }

    /// Exact DER bytes of `tbsCertificate` (header included); this is the
    /// message the issuer signed
    pub fn tbs_raw(&self) -> Result<&[u8], X509Error> {
        Ok(self.tbs()?.raw())
    }

    /// Dotted OID of the outer `signatureAlgorithm`
    pub fn signature_algorithm_oid(&self) -> Option<String> {
        let alg = self.root().ok()?.child(1)?;
        alg.child(0)?.oid().map(str::to_string)
    }

    /// BIT STRING body of `signatureValue`
    pub fn signature_value(&self) -> Option<&[u8]> {
        self.root().ok()?.child(2)?.bit_string()
    }

    /// `serialNumber` content octets
    pub fn serial_number(&self) -> Option<&[u8]> {
        self.tbs_field(TbsField::Serial)?.integer_bytes()
    }

    /// Issuer attributes in encoding order
    pub fn issuer_attributes(&self) -> Vec<NameAttribute> {
        self.tbs_field(TbsField::Issuer)
            .map(name_attributes)
            .unwrap_or_default()
    }

    /// Subject attributes in encoding order
    pub fn subject_attributes(&self) -> Vec<NameAttribute> {
        self.tbs_field(TbsField::Subject)
            .map(name_attributes)
            .unwrap_or_default()
    }

    /// Issuer DN rendered per RFC 1779 with short aliases
    pub fn issuer_dn(&self) -> String {
        self.tbs_field(TbsField::Issuer).map(format_name).unwrap_or_default()
    }

    /// Subject DN rendered per RFC 1779 with short aliases
    pub fn subject_dn(&self) -> String {
        self.tbs_field(TbsField::Subject).map(format_name).unwrap_or_default()
    }

    /// countryName attribute of the issuer DN
    pub fn issuer_country(&self) -> Option<String> {
        find_attribute(&self.issuer_attributes(), OID_COUNTRY_NAME)
    }

    /// countryName attribute of the subject DN
    pub fn subject_country(&self) -> Option<String> {
        find_attribute(&self.subject_attributes(), OID_COUNTRY_NAME)
    }

    /// Start of the validity window
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.tbs_field(TbsField::Validity)?.child(0)?.time()
    }

    /// End of the validity window
    pub fn not_after(&self) -> Option<DateTime<Utc>> {
        self.tbs_field(TbsField::Validity)?.child(1)?.time()
    }

    /// Raw DER of the `subjectPublicKeyInfo` SEQUENCE, tag and length included
    pub fn subject_public_key_info_der(&self) -> Option<&[u8]> {
        Some(self.tbs_field(TbsField::Spki)?.raw())
    }

    /// Algorithm OID inside `subjectPublicKeyInfo`
    pub fn spki_algorithm_oid(&self) -> Option<String> {
        let spki = self.tbs_field(TbsField::Spki)?;
        spki.child(0)?.child(0)?.oid().map(str::to_string)
    }

    /// Typed public key for signature verification
    pub fn public_key(&self) -> Result<PublicKey, X509Error> {
        let spki = self
            .tbs_field(TbsField::Spki)
            .ok_or_else(|| X509Error::Malformed("missing subjectPublicKeyInfo".into()))?;
        let algorithm = spki
            .child(0)
            .ok_or_else(|| X509Error::Malformed("missing SPKI algorithm".into()))?;
        let alg_oid = algorithm
            .child(0)
            .and_then(|n| n.oid())
            .ok_or_else(|| X509Error::Malformed("missing SPKI algorithm OID".into()))?;
        match alg_oid {
            OID_EC_PUBLIC_KEY => {
                let params_oid = algorithm
                    .child(1)
                    .and_then(|n| n.oid())
                    .ok_or_else(|| X509Error::Malformed("EC key without namedCurve".into()))?;
                let curve = EcCurve::from_oid(params_oid)
                    .ok_or_else(|| X509Error::UnsupportedKeyAlgorithm(params_oid.to_string()))?;
                let point = spki
                    .child(1)
                    .and_then(|n| n.bit_string())
                    .ok_or_else(|| X509Error::Malformed("missing subjectPublicKey bits".into()))?;
                Ok(PublicKey::Ec {
                    curve,
                    point: point.to_vec(),
                })
            }
            OID_RSA_ENCRYPTION => Ok(PublicKey::Rsa {
                spki_der: spki.raw().to_vec(),
            }),
            other => Err(X509Error::UnsupportedKeyAlgorithm(other.to_string())),
        }
    }

    /// Extension value node (`extnValue` OCTET STRING) for an extension OID
    pub fn extension(&self, oid: &str) -> Option<Node<'_>> {
        let extensions = self.tbs_field(TbsField::Extensions)?;
        // [3] EXPLICIT wraps SEQUENCE OF Extension
        let list = extensions.child(0)?;
        for ext in list.children() {
            if ext.child(0).and_then(|n| n.oid()) == Some(oid) {
                // extnValue is the last child; `critical` may sit between
                return ext.child(ext.child_count().saturating_sub(1));
            }
        }
        None
    }

    /// `subjectKeyIdentifier`: the inner OCTET STRING content
    pub fn subject_key_identifier(&self) -> Option<Vec<u8>> {
        let value = self.extension(OID_SUBJECT_KEY_IDENTIFIER)?;
        let inner = value.child(0)?;
        if inner.is_universal(tag::OCTET_STRING) {
            return Some(inner.body().to_vec());
        }
        None
    }

    /// `authorityKeyIdentifier.keyIdentifier`: the `[0]` IMPLICIT content
    pub fn authority_key_identifier(&self) -> Option<Vec<u8>> {
        let value = self.extension(OID_AUTHORITY_KEY_IDENTIFIER)?;
        let aki = value.child(0)?;
        if !aki.is_universal(tag::SEQUENCE) {
            return None;
        }
        let result = aki
            .children()
            .find(|n| n.is_context(0) && !n.tag().constructed)
            .map(|n| n.body().to_vec());
        result
    }

    /// Locate a tbsCertificate field by walking the SEQUENCE by type.
    ///
    /// The optional `[0] EXPLICIT version` shifts every later field, so the
    /// walk starts after it when present.
    fn tbs_field(&self, field: TbsField) -> Option<Node<'_>> {
        let tbs = self.tbs().ok()?;
        let base = usize::from(tbs.child(0)?.is_context(0));
        let fixed = match field {
            TbsField::Serial => 0,
            TbsField::Issuer => 2,
            TbsField::Validity => 3,
            TbsField::Subject => 4,
            TbsField::Spki => 5,
            TbsField::Extensions => {
                // Extensions carry their own [3] tag; scan past the fixed part
                return (base + 6..tbs.child_count())
                    .filter_map(|i| tbs.child(i))
                    .find(|n| n.is_context(3));
            }
        };
        let node = tbs.child(base + fixed)?;
        let type_ok = match field {
            TbsField::Serial => node.is_universal(tag::INTEGER),
            TbsField::Extensions => unreachable!(),
            _ => node.is_universal(tag::SEQUENCE),
        };
        type_ok.then_some(node)
    }
}

enum TbsField {
    Serial,
    Issuer,
    Validity,
    Subject,
    Spki,
    Extensions,
}

/// Read-only view over an X.509 v2 `CertificateList` (a CRL)
pub struct CertificateList {
    tree: Asn1Tree,
}

impl CertificateList {
    /// Parse CRL DER. The outer value must be the `CertificateList`
    /// SEQUENCE `(tbsCertList, signatureAlgorithm, signatureValue)`.
    pub fn from_der(der: &[u8]) -> Result<Self, X509Error> {
        let tree = Asn1Tree::parse(der.to_vec())?;
        let crl = Self { tree };
        let root = crl.root()?;
        if root.child_count() < 3 {
            return Err(X509Error::Malformed(
                "CertificateList SEQUENCE needs tbs, algorithm, and signature".into(),
            ));
        }
        crl.fields()?;
        Ok(crl)
    }

    fn root(&self) -> Result<Node<'_>, X509Error> {
        let root = self
            .tree
            .root()
            .ok_or_else(|| X509Error::Malformed("empty CRL".into()))?;
        if !root.is_universal(tag::SEQUENCE) {
            return Err(X509Error::Malformed("CertificateList is not a SEQUENCE".into()));
        }
        Ok(root)
    }

    /// Exact DER bytes of `tbsCertList`; this is the message the CSCA signed
    pub fn tbs_raw(&self) -> Result<&[u8], X509Error> {
        let tbs = self
            .root()?
            .child(0)
            .ok_or_else(|| X509Error::Malformed("missing tbsCertList".into()))?;
        Ok(tbs.raw())
    }

    /// Dotted OID of the outer `signatureAlgorithm`
    pub fn signature_algorithm_oid(&self) -> Option<String> {
        self.root().ok()?.child(1)?.child(0)?.oid().map(str::to_string)
    }

    /// BIT STRING body of `signatureValue`
    pub fn signature_value(&self) -> Option<&[u8]> {
        self.root().ok()?.child(2)?.bit_string()
    }

    /// Issuer attributes in encoding order
    pub fn issuer_attributes(&self) -> Vec<NameAttribute> {
        self.fields()
            .ok()
            .map(|f| name_attributes(f.issuer))
            .unwrap_or_default()
    }

    /// Issuer DN rendered per RFC 1779
    pub fn issuer_dn(&self) -> String {
        self.fields().ok().map(|f| format_name(f.issuer)).unwrap_or_default()
    }

    /// `thisUpdate` timestamp
    pub fn this_update(&self) -> Option<DateTime<Utc>> {
        self.fields().ok()?.this_update.time()
    }

    /// `nextUpdate` timestamp, when present
    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.fields().ok()?.next_update?.time()
    }

    /// Serial numbers of every revoked certificate entry
    pub fn revoked_serials(&self) -> Vec<&[u8]> {
        let Ok(fields) = self.fields() else {
            return Vec::new();
        };
        let Some(revoked) = fields.revoked else {
            return Vec::new();
        };
        revoked
            .children()
            .filter_map(|entry| entry.child(0).and_then(|n| n.integer_bytes()))
            .collect()
    }

    /// Walk `tbsCertList` by type.
    ///
    /// `version`, `nextUpdate`, and `revokedCertificates` are all OPTIONAL,
    /// so a cursor advances over whatever is actually present:
    /// INTEGER? AlgorithmIdentifier, Name, Time, Time?, SEQUENCE?, [0]?
    fn fields(&self) -> Result<TbsCertListFields<'_>, X509Error> {
        let tbs = self
            .root()?
            .child(0)
            .ok_or_else(|| X509Error::Malformed("missing tbsCertList".into()))?;
        if !tbs.is_universal(tag::SEQUENCE) {
            return Err(X509Error::Malformed("tbsCertList is not a SEQUENCE".into()));
        }
        fn take<'a>(tbs: Node<'a>, cursor: &mut usize, expect: &str) -> Result<Node<'a>, X509Error> {
            let node = tbs
                .child(*cursor)
                .ok_or_else(|| X509Error::Malformed(format!("tbsCertList missing {expect}")))?;
            *cursor += 1;
            Ok(node)
        }

        let mut cursor = 0;
        let mut first = take(tbs, &mut cursor, "signature algorithm")?;
        if first.is_universal(tag::INTEGER) {
            // v2 version marker; skip to the AlgorithmIdentifier
            first = take(tbs, &mut cursor, "signature algorithm")?;
        }
        if !first.is_universal(tag::SEQUENCE) {
            return Err(X509Error::Malformed("tbsCertList signature is not a SEQUENCE".into()));
        }
        let issuer = take(tbs, &mut cursor, "issuer")?;
        if !issuer.is_universal(tag::SEQUENCE) {
            return Err(X509Error::Malformed("tbsCertList issuer is not a SEQUENCE".into()));
        }
        let this_update = take(tbs, &mut cursor, "thisUpdate")?;
        if !this_update.is_time() {
            return Err(X509Error::Malformed("tbsCertList thisUpdate is not a Time".into()));
        }

        let mut next_update = None;
        let mut revoked = None;
        while let Some(node) = tbs.child(cursor) {
            cursor += 1;
            if node.is_time() && next_update.is_none() && revoked.is_none() {
                next_update = Some(node);
            } else if node.is_universal(tag::SEQUENCE) && revoked.is_none() {
                revoked = Some(node);
            } else if node.is_context(0) {
                break; // crlExtensions terminate the walk
            } else {
                return Err(X509Error::Malformed("unexpected field in tbsCertList".into()));
            }
        }

        Ok(TbsCertListFields {
            issuer,
            this_update,
            next_update,
            revoked,
        })
    }
}

struct TbsCertListFields<'a> {
    issuer: Node<'a>,
    this_update: Node<'a>,
    next_update: Option<Node<'a>>,
    revoked: Option<Node<'a>>,
}

/// Flatten a Name (SEQUENCE OF RDN) into `(oid, value)` pairs in order
fn name_attributes(name: Node<'_>) -> Vec<NameAttribute> {
    let mut out = Vec::new();
    for rdn in name.children() {
        for atv in rdn.children() {
            let Some(oid) = atv.child(0).and_then(|n| n.oid()) else {
                continue;
            };
            let value = atv
                .child(1)
                .and_then(|n| n.as_string())
                .unwrap_or_else(|| hex::encode(atv.child(1).map(|n| n.body()).unwrap_or_default()));
            out.push((oid.to_string(), value));
        }
    }
    out
}

/// Render a Name per RFC 1779: `OID=value` pairs joined by ", ", multi-valued
/// RDNs joined by " + ", short aliases where defined
fn format_name(name: Node<'_>) -> String {
    let mut rdns = Vec::new();
    for rdn in name.children() {
        let mut parts = Vec::new();
        for atv in rdn.children() {
            let Some(oid) = atv.child(0).and_then(|n| n.oid()) else {
                continue;
            };
            let value = atv
                .child(1)
                .and_then(|n| n.as_string())
                .unwrap_or_else(|| hex::encode(atv.child(1).map(|n| n.body()).unwrap_or_default()));
            parts.push(format!("{}={}", oid_alias(oid), quote_dn_value(&value)));
        }
        if !parts.is_empty() {
            rdns.push(parts.join(" + "));
        }
    }
    rdns.join(", ")
}

fn oid_alias(oid: &str) -> &str {
    match oid {
        "2.5.4.3" => "CN",
        "2.5.4.6" => "C",
        "2.5.4.7" => "L",
        "2.5.4.8" => "ST",
        "2.5.4.9" => "STREET",
        "2.5.4.10" => "O",
        "2.5.4.11" => "OU",
        other => other,
    }
}

/// Values containing RFC 1779 special characters are double-quoted
fn quote_dn_value(value: &str) -> String {
    const SPECIALS: &[char] = &[',', '+', '=', '\n', '<', '>', '#', ';', '\\'];
    if value.contains(SPECIALS) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn find_attribute(attributes: &[NameAttribute], oid: &str) -> Option<String> {
    attributes.iter().find(|(o, _)| o == oid).map(|(_, v)| v.clone())
}
