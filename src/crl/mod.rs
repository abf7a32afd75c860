//! Certificate revocation list model
//!
//! A [`Crl`] is either static (bytes supplied once by the host) or updating
//! (bytes downloaded from a distribution point). The stored bytes and their
//! download timestamp swap atomically, so a verification that overlaps a
//! refresh sees either the old pair or the new pair, never a mix.
//!
//! No signature check happens here; the verifier re-checks the CRL
//! signature at use time.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::error::Result;

/// Durable storage for downloaded CRLs, keyed by opaque strings.
///
/// Records survive process restarts; writes are atomic per key.
#[async_trait]
pub trait CrlPersistence: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn store(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Load the value stored under `key`, if any
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Errors raised by a CRL refresh attempt
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The CRL is static and has no distribution point
    #[error("CRL has no distribution point URL")]
    NotUpdating,

    /// The download failed
    #[error("CRL download failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl RefreshError {
    /// True when the failure looks like missing connectivity rather than a
    /// server-side problem; used to arm the reachability retry
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::NotUpdating => false,
        }
    }
}

/// An atomic view of a CRL's bytes and download time
#[derive(Debug, Clone)]
pub struct CrlSnapshot {
    /// DER-encoded `CertificateList`, when available
    pub data: Option<Vec<u8>>,
    /// When the data was last downloaded; `None` for seeds and static CRLs
    pub last_downloaded: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct CrlState {
    data: Option<Vec<u8>>,
    last_downloaded: Option<DateTime<Utc>>,
}

/// A certificate revocation list, static or refreshable
pub struct Crl {
    url: Option<Url>,
    state: RwLock<CrlState>,
}

impl Crl {
    /// A CRL whose bytes never change
    pub fn static_data(data: Vec<u8>) -> Self {
        Self {
            url: None,
            state: RwLock::new(CrlState {
                data: Some(data),
                last_downloaded: None,
            }),
        }
    }

    /// A refreshable CRL, optionally seeded with bundled bytes until the
    /// first successful download
    pub fn updating(url: Url, seed: Option<Vec<u8>>) -> Self {
        Self {
            url: Some(url),
            state: RwLock::new(CrlState {
                data: seed,
                last_downloaded: None,
            }),
        }
    }

    /// Distribution point URL; `None` for static CRLs
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Atomically read the current bytes and download timestamp
    pub fn snapshot(&self) -> CrlSnapshot {
        let state = self.state.read().unwrap();
        CrlSnapshot {
            data: state.data.clone(),
            last_downloaded: state.last_downloaded,
        }
    }

    /// A refreshable CRL is overdue when it was never downloaded or its
    /// last download is at least `overdue_after` old. Static CRLs never are.
    pub fn is_overdue(&self, overdue_after: Duration, now: DateTime<Utc>) -> bool {
        if self.url.is_none() {
            return false;
        }
        let state = self.state.read().unwrap();
        match state.last_downloaded {
            None => true,
            Some(last) => {
                let age = now.signed_duration_since(last);
                age >= chrono::Duration::from_std(overdue_after).unwrap_or(chrono::Duration::MAX)
            }
        }
    }

    /// Install bytes and timestamp in one swap (startup load path)
    pub(crate) fn adopt(&self, data: Vec<u8>, last_downloaded: Option<DateTime<Utc>>) {
        let mut state = self.state.write().unwrap();
        state.data = Some(data);
        state.last_downloaded = last_downloaded;
    }

    /// Download fresh bytes from the distribution point.
    ///
    /// On success the bytes and timestamp swap in atomically and are written
    /// through to `persistence`. On failure the prior state is untouched.
    pub async fn refresh(
        &self,
        client: &reqwest::Client,
        persistence: Option<&dyn CrlPersistence>,
    ) -> std::result::Result<(), RefreshError> {
        let url = self.url.clone().ok_or(RefreshError::NotUpdating)?;
        let response = client.get(url.clone()).send().await?.error_for_status()?;
        let bytes = response.bytes().await?.to_vec();
        let downloaded_at = Utc::now();

        {
            let mut state = self.state.write().unwrap();
            state.data = Some(bytes.clone());
            state.last_downloaded = Some(downloaded_at);
        }
        info!(url = %url, bytes = bytes.len(), "refreshed CRL");

        if let Some(persistence) = persistence {
            if let Err(e) = persistence.store(&data_key(&url), &bytes).await {
                warn!(url = %url, error = %e, "failed to persist CRL bytes");
            }
            let stamp = downloaded_at.to_rfc3339();
            if let Err(e) = persistence.store(&downloaded_key(&url), stamp.as_bytes()).await {
                warn!(url = %url, error = %e, "failed to persist CRL download time");
            }
        }
        Ok(())
    }

    /// Restore persisted bytes for this CRL, when present
    pub(crate) async fn load_persisted(&self, persistence: &dyn CrlPersistence) -> Result<()> {
        let Some(url) = self.url() else {
            return Ok(());
        };
        let Some(bytes) = persistence.load(&data_key(url)).await? else {
            return Ok(());
        };
        let downloaded = persistence
            .load(&downloaded_key(url))
            .await?
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc));
        info!(url = %url, "restored persisted CRL");
        self.adopt(bytes, downloaded);
        Ok(())
    }
}

/// Persistence key for the DER blob of a CRL URL
pub(crate) fn data_key(url: &Url) -> String {
    format!("crldata.{url}")
}

/// Persistence key for the download timestamp of a CRL URL
pub(crate) fn downloaded_key(url: &Url) -> String {
    format!("downloaded.{url}")
}
