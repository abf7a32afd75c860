//! # VDS Verify - Offline ICAO VDS-NC Verification
//!
//! This crate verifies the authenticity of ICAO Visible Digital Seals for
//! Non-Constrained environments (VDS-NC): compact JSON envelopes carrying a
//! payload, a Barcode Signing Certificate (BSC), and an ECDSA signature
//! over a canonicalised form of the payload. Trust is anchored in locally
//! stored CSCA root certificates and their revocation lists, so a seal can
//! be checked without any network round trip.
//!
//! ## Verification pipeline
//!
//! 1. **CSCA selection**: candidates whose subject country matches the
//!    BSC's issuing country
//! 2. **CSCA integrity**: certificate bytes hash to their pinned SHA-256
//! 3. **CRL signature**: the revocation list is signed by the CSCA
//! 4. **Revocation**: the BSC serial is absent from the CRL
//! 5. **Key linkage**: BSC AKI equals CSCA SKI
//! 6. **Path**: BSC issuer equals CSCA subject and its signature verifies
//! 7. **Seal signature**: over the canonical bytes of the `data` member
//!
//! ## Architecture
//!
//! The crate is organized into several modules:
//! - `asn1`: arena-based DER decoder with exact byte ranges per node
//! - `x509`: typed certificate and CRL views over the DER tree
//! - `canonical`: deterministic JSON serialisation used as signing input
//! - `vds`: the seal model and reader
//! - `crypto`: digest and signature verification primitives
//! - `verify`: the ordered verification pipeline
//! - `crl` / `store`: revocation lists, the CSCA trust store, refresh
//!   scheduling, and durable caching
//!
//! ## Example
//!
//! ```rust,ignore
//! use vds_verify::{decode_vds, verify, Crl, CscaCertificate, TrustStore};
//!
//! let mut store = TrustStore::new();
//! store.add(CscaCertificate::from_pem(
//!     &csca_pem,
//!     "9aa5…hex",
//!     Crl::static_data(crl_der),
//! )?);
//!
//! let vds = decode_vds(&scanned_json)?;
//! verify(&vds, &store)?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod asn1;
pub mod canonical;
pub mod config;
pub mod crl;
pub mod crypto;
pub mod error;
pub mod store;
pub mod vds;
pub mod verify;
pub mod x509;

// Re-export the host-facing surface
pub use config::TrustStoreConfig;
pub use crl::{Crl, CrlPersistence, CrlSnapshot};
pub use error::{Result, VdsVerifyError};
pub use store::{
    CscaCertificate, FileCrlStore, MemoryCrlStore, RefreshOutcome, TrustStore, TrustStoreDelegate,
};
pub use vds::{decode_vds, Vds, VdsAlgorithm};
pub use verify::{verify, verify_with_options, VerifyOptions};
