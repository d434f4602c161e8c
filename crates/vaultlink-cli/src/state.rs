//! Application state

use crate::config::GatewayConfig;
use std::sync::Arc;
use tracing::{info, warn};
use vaultlink_core::{
    clock::system_clock, FileService, LinkIssuer, LinkResolver, MemoryMetadataStore, SharedClock,
};
use vaultlink_crypto::MemoryKeyDirectory;
use vaultlink_store::FlexibleObjectStore;

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Time source for policy validation and expiry
    pub clock: SharedClock,
    /// Object store (filesystem or memory fallback)
    pub objects: Arc<FlexibleObjectStore>,
    /// File and link records
    pub metadata: Arc<MemoryMetadataStore>,
    /// File lifecycle
    pub files: FileService<FlexibleObjectStore, MemoryMetadataStore>,
    /// Share link issuance
    pub issuer: LinkIssuer<MemoryMetadataStore>,
    /// Share link access evaluation
    pub resolver: LinkResolver<MemoryMetadataStore>,
    /// Registered public keys by principal
    pub keys: MemoryKeyDirectory,
    /// Serializes check-then-register on the key directory
    pub key_registration: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Create a new application state
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        Self::with_clock(config, system_clock()).await
    }

    /// Create state with an explicit time source
    pub async fn with_clock(config: GatewayConfig, clock: SharedClock) -> anyhow::Result<Self> {
        let objects =
            Arc::new(FlexibleObjectStore::open_or_memory(config.storage_root.as_deref()).await);

        if objects.is_persistent() {
            info!("Storage mode: filesystem (persistent)");
        } else {
            warn!("Storage mode: in-memory (NOT persistent, for development only)");
        }

        let metadata = Arc::new(MemoryMetadataStore::new());
        let base_url = config.public_base_url();
        info!(base_url = %base_url, "Share URLs will use this origin");

        Ok(Self {
            files: FileService::with_clock(
                Arc::clone(&objects),
                Arc::clone(&metadata),
                Arc::clone(&clock),
            ),
            issuer: LinkIssuer::with_clock(Arc::clone(&metadata), base_url, Arc::clone(&clock)),
            resolver: LinkResolver::with_clock(Arc::clone(&metadata), Arc::clone(&clock)),
            keys: MemoryKeyDirectory::new(),
            key_registration: tokio::sync::Mutex::new(()),
            config,
            clock,
            objects,
            metadata,
        })
    }
}

/// Authenticated principal for owner routes
#[derive(Clone, Debug)]
pub struct UserSession {
    /// Principal identifier (JWT `sub`)
    pub principal: String,
    /// Display name
    pub display_name: Option<String>,
    /// Scopes
    pub scopes: Vec<String>,
    /// Expiration time
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl UserSession {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now() > self.expires_at
    }

    /// Check if user has a scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope || s == "*")
    }

    /// Check if user can read their files and links
    pub fn can_read(&self) -> bool {
        self.has_scope("files:read") || self.has_scope("files:*")
    }

    /// Check if user can upload, share, and delete
    pub fn can_write(&self) -> bool {
        self.has_scope("files:write") || self.has_scope("files:*")
    }
}
