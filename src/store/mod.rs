//! CSCA trust store
//!
//! Holds the ordered set of trusted country signing certificates with their
//! revocation lists, schedules periodic CRL refreshes, retries after
//! connectivity returns, and reports when any member CRL is overdue.
//!
//! The host constructs the store, adds members, wraps it in an [`Arc`], and
//! passes a reference into [`crate::verify`]; there is no process-wide
//! singleton.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::TrustStoreConfig;
use crate::crl::{Crl, CrlPersistence};
use crate::crypto::sha256_hex;
use crate::error::{Result, VdsVerifyError};
use crate::x509::Certificate;

/// A trusted country signing certificate, its integrity pin, and its CRL
pub struct CscaCertificate {
    der: Vec<u8>,
    sha256: String,
    crl: Arc<Crl>,
    parsed: Certificate,
}

impl CscaCertificate {
    /// Build from certificate DER and its pinned SHA-256 (lower- or
    /// upper-case hex). The pin is checked at verification time, not here.
    pub fn from_der(der: Vec<u8>, sha256_hex: &str, crl: Crl) -> Result<Self> {
        let parsed = Certificate::from_der(&der)
            .map_err(|e| VdsVerifyError::CscaParseFailed(e.to_string()))?;
        Ok(Self {
            der,
            sha256: sha256_hex.to_ascii_lowercase(),
            crl: Arc::new(crl),
            parsed,
        })
    }

    /// Build from a PEM `CERTIFICATE` block
    pub fn from_pem(pem_text: &str, sha256_hex: &str, crl: Crl) -> Result<Self> {
        let block = pem::parse(pem_text)
            .map_err(|e| VdsVerifyError::CscaParseFailed(e.to_string()))?;
        if block.tag() != "CERTIFICATE" {
            return Err(VdsVerifyError::CscaParseFailed(format!(
                "expected a CERTIFICATE block, got {}",
                block.tag()
            )));
        }
        Self::from_der(block.contents().to_vec(), sha256_hex, crl)
    }

    /// Certificate DER bytes
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Pinned SHA-256 as lower-case hex
    pub fn sha256_hex(&self) -> &str {
        &self.sha256
    }

    /// True when the DER bytes hash to the pin
    pub fn integrity_ok(&self) -> bool {
        sha256_hex(&self.der) == self.sha256
    }

    /// This CSCA's revocation list
    pub fn crl(&self) -> &Arc<Crl> {
        &self.crl
    }

    /// Parsed certificate view
    pub fn certificate(&self) -> &Certificate {
        &self.parsed
    }

    /// countryName of the subject DN, the candidate-selection key
    pub fn subject_country(&self) -> Option<String> {
        self.parsed.subject_country()
    }
}

/// Result of one CRL download within a refresh batch
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Distribution point that was fetched
    pub url: Url,
    /// Whether the download and swap succeeded
    pub success: bool,
}

/// Observer notified once per completed refresh batch.
///
/// Invoked from the refresh task; implementations hop to their own
/// dispatcher if they touch UI state.
#[async_trait]
pub trait TrustStoreDelegate: Send + Sync {
    /// Called exactly once when every download of a batch has returned
    async fn refresh_completed(&self, outcomes: &[RefreshOutcome]);
}

/// The set of trusted CSCAs plus refresh scheduling state
pub struct TrustStore {
    cscas: Vec<CscaCertificate>,
    config: RwLock<TrustStoreConfig>,
    client: reqwest::Client,
    persistence: Option<Arc<dyn CrlPersistence>>,
    delegate: RwLock<Option<Arc<dyn TrustStoreDelegate>>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    connectivity_failed: AtomicBool,
}

impl TrustStore {
    /// Empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(TrustStoreConfig::default())
    }

    /// Empty store with explicit configuration
    pub fn with_config(config: TrustStoreConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().expect("HTTP client construction");
        Self {
            cscas: Vec::new(),
            config: RwLock::new(config),
            client,
            persistence: None,
            delegate: RwLock::new(None),
            refresh_task: Mutex::new(None),
            connectivity_failed: AtomicBool::new(false),
        }
    }

    /// Attach durable CRL storage; call before the first refresh
    pub fn set_persistence(&mut self, persistence: Arc<dyn CrlPersistence>) {
        self.persistence = Some(persistence);
    }

    /// Append a trusted CSCA; order determines candidate preference
    pub fn add(&mut self, csca: CscaCertificate) {
        self.cscas.push(csca);
    }

    /// Members in insertion order
    pub fn cscas(&self) -> &[CscaCertificate] {
        &self.cscas
    }

    /// Restore any persisted CRL bytes for every refreshable member.
    ///
    /// Members without a persisted record keep their seed data.
    pub async fn load_persisted(&self) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        for csca in &self.cscas {
            csca.crl().load_persisted(persistence.as_ref()).await?;
        }
        Ok(())
    }

    /// Refresh every refreshable CRL concurrently; returns when the whole
    /// batch has completed and the delegate has been notified once.
    pub async fn refresh_now(&self) -> Vec<RefreshOutcome> {
        let mut handles = Vec::new();
        for csca in &self.cscas {
            let crl = Arc::clone(csca.crl());
            let Some(url) = crl.url().cloned() else {
                continue;
            };
            let client = self.client.clone();
            let persistence = self.persistence.clone();
            handles.push((
                url,
                tokio::spawn(async move { crl.refresh(&client, persistence.as_deref()).await }),
            ));
        }

        let mut outcomes = Vec::new();
        let mut connectivity_failure = false;
        for (url, handle) in handles {
            let success = match handle.await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    if e.is_connectivity() {
                        connectivity_failure = true;
                    }
                    warn!(url = %url, error = %e, "CRL refresh failed");
                    false
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "CRL refresh task failed");
                    false
                }
            };
            outcomes.push(RefreshOutcome { url, success });
        }
        self.connectivity_failed
            .store(connectivity_failure, Ordering::Relaxed);

        let delegate = self.delegate.read().unwrap().clone();
        if let Some(delegate) = delegate {
            delegate.refresh_completed(&outcomes).await;
        }
        outcomes
    }

    /// Arm the periodic refresh timer. The first tick fires immediately;
    /// a previous timer is torn down first.
    pub fn start_auto_refresh(self: &Arc<Self>, period: Duration) {
        self.stop_auto_refresh();
        info!(period_secs = period.as_secs(), "starting CRL auto-refresh");
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                store.refresh_now().await;
            }
        });
        *self.refresh_task.lock().unwrap() = Some(handle);
    }

    /// Tear down the refresh timer; in-flight downloads are abandoned and
    /// their results discarded
    pub fn stop_auto_refresh(&self) {
        if let Some(handle) = self.refresh_task.lock().unwrap().take() {
            handle.abort();
            debug!("stopped CRL auto-refresh");
        }
    }

    /// Host signal that the network came back. Fires one immediate refresh
    /// when the previous batch failed for lack of connectivity.
    pub fn network_became_reachable(self: &Arc<Self>) {
        if self.connectivity_failed.swap(false, Ordering::Relaxed) {
            info!("network reachable again, refreshing CRLs");
            let store = Arc::clone(self);
            tokio::spawn(async move {
                store.refresh_now().await;
            });
        }
    }

    /// True when any member CRL is overdue
    pub fn is_overdue(&self) -> bool {
        let overdue_after = self.config.read().unwrap().overdue_after;
        let now = Utc::now();
        self.cscas
            .iter()
            .any(|csca| csca.crl().is_overdue(overdue_after, now))
    }

    /// Adjust the overdue threshold
    pub fn set_overdue_after(&self, overdue_after: Duration) {
        self.config.write().unwrap().overdue_after = overdue_after;
    }

    /// Configured refresh period
    pub fn refresh_period(&self) -> Duration {
        self.config.read().unwrap().refresh_period
    }

    /// Install the batch-completion observer
    pub fn set_delegate(&self, delegate: Arc<dyn TrustStoreDelegate>) {
        *self.delegate.write().unwrap() = Some(delegate);
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrustStore {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

/// File-backed CRL persistence.
///
/// Each key maps to one file named by the SHA-256 of the key, so arbitrary
/// URLs never reach the filesystem namespace.
pub struct FileCrlStore {
    base_dir: PathBuf,
}

impl FileCrlStore {
    /// Open (creating if needed) a storage directory
    pub async fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await?;

        // Restrict to the owner
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(&base_dir).await?;
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            fs::set_permissions(&base_dir, perms).await?;
        }

        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(sha256_hex(key.as_bytes()))
    }
}

#[async_trait]
impl CrlPersistence for FileCrlStore {
    async fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(&path).await?;
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms).await?;
        }

        debug!(key, bytes = value.len(), "stored CRL record");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory CRL persistence for tests and ephemeral hosts
pub struct MemoryCrlStore {
    records: RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryCrlStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for MemoryCrlStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrlPersistence for MemoryCrlStore {
    async fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }
}
