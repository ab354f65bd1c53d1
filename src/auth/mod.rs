//! Authorization model: one optional administrator plus a monotonically
//! growing set of permitted Telegram user ids.
//!
//! [`AccessControl`] reads both at construction and serves repeated checks
//! from that snapshot for the lifetime of the process; the only mutation is
//! [`AccessControl::permit`], which updates the snapshot and persists the
//! full set through the store in a single atomic call. There is no revoke.
//!
//! The administrator is configured out-of-band (`vpnwarden set-admin`) and is
//! implicitly permitted without ever appearing in the stored user set.

pub mod store;

pub use store::AuthStore;

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Opaque numeric user identity supplied by the transport per message.
pub type UserId = i64;

/// Store key for the permitted user id set.
pub const KEY_USERS: &str = "users";

/// Store key for the administrator id.
pub const KEY_ADMIN: &str = "admin";

/// In-memory view over [`AuthStore`] answering permission checks.
pub struct AccessControl {
    store: AuthStore,
    admin_id: Option<UserId>,
    permitted: Mutex<HashSet<UserId>>,
}

impl AccessControl {
    /// Load the permitted set (empty if absent) and the admin id from the store.
    pub fn load(store: AuthStore) -> Result<Self> {
        let users: Vec<UserId> = store.read(KEY_USERS)?.unwrap_or_default();
        let admin_id: Option<UserId> = store.read(KEY_ADMIN)?;
        Ok(Self {
            store,
            admin_id,
            permitted: Mutex::new(users.into_iter().collect()),
        })
    }

    /// Whether `uid` is the configured administrator.
    pub fn is_admin(&self, uid: UserId) -> bool {
        self.admin_id == Some(uid)
    }

    /// Whether `uid` may use the bot at all. The administrator is always
    /// permitted.
    pub fn is_permitted(&self, uid: UserId) -> bool {
        self.is_admin(uid) || self.permitted.lock().contains(&uid)
    }

    /// Add `uid` to the permitted set and persist the full updated set.
    ///
    /// Duplicate-free in effect, but always performs the store write. The
    /// administrator id is never inserted into the stored set; it is already
    /// permitted implicitly.
    pub fn permit(&self, uid: UserId) -> Result<UserId> {
        let snapshot: Vec<UserId> = {
            let mut permitted = self.permitted.lock();
            if !self.is_admin(uid) {
                permitted.insert(uid);
            }
            let mut users: Vec<UserId> = permitted.iter().copied().collect();
            users.sort_unstable();
            users
        };
        self.store.write(KEY_USERS, &snapshot)?;
        tracing::info!(uid, "User permitted");
        Ok(uid)
    }
}
