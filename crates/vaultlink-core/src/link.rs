//! Share link records and issuance policy

use crate::{
    metadata::{EncryptionInfo, Permission},
    CoreError, Result,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Requested access policy for a new link
///
/// Fields are private; construct with [`LinkPolicy::builder`].
#[derive(Clone)]
pub struct LinkPolicy {
    expires_at: Option<DateTime<Utc>>,
    one_time: bool,
    password: Option<Zeroizing<String>>,
    permissions: Permission,
    e2ee: bool,
}

impl LinkPolicy {
    pub fn builder() -> LinkPolicyBuilder {
        LinkPolicyBuilder::default()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().map(String::as_str)
    }

    pub fn permissions(&self) -> Permission {
        self.permissions
    }

    pub fn is_e2ee(&self) -> bool {
        self.e2ee
    }

    /// Check time-dependent constraints against `now`
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if let Some(expires_at) = self.expires_at {
            if expires_at <= now {
                return Err(CoreError::InvalidPolicy(
                    "expiration must be in the future".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LinkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkPolicy")
            .field("expires_at", &self.expires_at)
            .field("one_time", &self.one_time)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("permissions", &self.permissions)
            .field("e2ee", &self.e2ee)
            .finish()
    }
}

/// Builder for [`LinkPolicy`]
#[derive(Default)]
pub struct LinkPolicyBuilder {
    expires_at: Option<DateTime<Utc>>,
    expires_in: Option<Duration>,
    one_time: bool,
    password: Option<Zeroizing<String>>,
    permissions: Permission,
    e2ee: bool,
}

impl LinkPolicyBuilder {
    /// Absolute expiry
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self.expires_in = None;
        self
    }

    /// Expiry relative to issuance time
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = Some(duration);
        self.expires_at = None;
        self
    }

    /// Optional absolute expiry, as received from a request body
    pub fn maybe_expires_at(self, at: Option<DateTime<Utc>>) -> Self {
        match at {
            Some(at) => self.expires_at(at),
            None => self,
        }
    }

    pub fn one_time(mut self, one_time: bool) -> Self {
        self.one_time = one_time;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn maybe_password(self, password: Option<String>) -> Self {
        match password {
            Some(p) => self.password(p),
            None => self,
        }
    }

    pub fn permissions(mut self, permissions: Permission) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn e2ee(mut self, e2ee: bool) -> Self {
        self.e2ee = e2ee;
        self
    }

    /// Build the policy, resolving a relative expiry against `now`
    pub fn build_at(self, now: DateTime<Utc>) -> Result<LinkPolicy> {
        if let Some(password) = &self.password {
            if password.is_empty() {
                return Err(CoreError::InvalidPolicy(
                    "password must not be empty".to_string(),
                ));
            }
        }
        let expires_at = match self.expires_in {
            Some(d) => Some(now + d),
            None => self.expires_at,
        };
        Ok(LinkPolicy {
            expires_at,
            one_time: self.one_time,
            password: self.password,
            permissions: self.permissions,
            e2ee: self.e2ee,
        })
    }

    /// Build the policy using the wall clock for relative expiry
    pub fn build(self) -> Result<LinkPolicy> {
        self.build_at(Utc::now())
    }
}

/// A persisted share link
///
/// Only `used` and `permissions` change after creation, and only through the
/// metadata store's one-time consumption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub token: String,
    pub file_id: Uuid,
    pub owner: String,
    /// Argon2id PHC string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_one_time_download: bool,
    pub used: bool,
    pub permissions: Permission,
    #[serde(rename = "isE2EE")]
    pub is_e2ee: bool,
    /// Present iff `is_e2ee`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionInfo>,
    pub created_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_consumed(&self) -> bool {
        self.is_one_time_download && self.used
    }

    /// Lifecycle state independent of any particular request
    pub fn status(&self, now: DateTime<Utc>) -> LinkStatus {
        if self.is_expired(now) {
            LinkStatus::Expired
        } else if self.is_consumed() {
            LinkStatus::Consumed
        } else {
            LinkStatus::Active
        }
    }
}

/// Derived lifecycle state of a link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkStatus {
    Active,
    Expired,
    Consumed,
}

/// Owner-facing view of a link; never carries the password hash or key material
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub token: String,
    pub file_id: Uuid,
    pub filename: String,
    pub permissions: Permission,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_one_time_download: bool,
    pub used: bool,
    pub password_protected: bool,
    #[serde(rename = "isE2EE")]
    pub is_e2ee: bool,
    pub created_at: DateTime<Utc>,
    pub status: LinkStatus,
}

impl LinkSummary {
    pub fn from_link(link: &ShareLink, filename: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            token: link.token.clone(),
            file_id: link.file_id,
            filename: filename.into(),
            permissions: link.permissions,
            expires_at: link.expires_at,
            is_one_time_download: link.is_one_time_download,
            used: link.used,
            password_protected: link.is_password_protected(),
            is_e2ee: link.is_e2ee,
            created_at: link.created_at,
            status: link.status(now),
        }
    }
}
