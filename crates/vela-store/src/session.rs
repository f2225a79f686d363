//! # Session & Security Manager
//!
//! Login, lockout, two-factor, invites, recovery, and the lock screen.
//! The manager owns the `currentUser` key scope and nothing else; every
//! account mutation goes through the entity store so it is audited and
//! synced with the rest of the dataset.
//!
//! ## Login Pipeline
//! ```text
//! lookup (case-insensitive)
//!   → inactive?            Invalid
//!   → locked out?          Locked { until }
//!   → password mismatch?   count failure (5 → 15 min lockout), Invalid
//!   → 2FA enabled, no code?   TwoFactorRequired   (nothing recorded)
//!   → 2FA code wrong?         count failure, InvalidTwoFactor
//!   → success: set actor, reset counters, stamp lastLogin/lastActive,
//!              LOGIN audit entry (attributed to that user),
//!              persist session pointer
//! ```
//!
//! ## Locking
//! The lock screen is advisory UI state: the dataset stays loaded, the
//! session pointer stays persisted, and unlocking re-verifies the current
//! user's password. Idle auto-lock arms a deadline from
//! `settings.idle_lock_minutes` (0 disables it).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use vela_core::{User, UserInvite, UserRole};

use crate::error::{StoreError, StoreResult};
use crate::password;
use crate::storage::{decode_value, encode_value, keys, StorageBackend};
use crate::store::{Actor, EntityStore};

// =============================================================================
// Outcomes
// =============================================================================

/// The persisted session pointer: who is signed in on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
}

/// Result of a login attempt. Everything except `Success` leaves the
/// session signed out.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success(SessionSnapshot),
    /// Unknown user, inactive account, or wrong password. Deliberately
    /// indistinguishable to the caller.
    Invalid,
    Locked {
        until: DateTime<Utc>,
    },
    /// The account needs a two-factor code; none was supplied.
    TwoFactorRequired,
    InvalidTwoFactor,
}

/// Result of invite-based registration.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Created(User),
    InvalidCode,
    UsernameExists,
}

/// Proof accepted by account recovery.
#[derive(Debug, Clone)]
pub enum RecoveryProof {
    /// The static recovery code issued at registration.
    Code(String),
    /// The answer to the user's security question.
    SecurityAnswer(String),
}

/// New-account details for invite registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    /// Optional security-question answer, stored as a salted hash.
    pub security_answer: Option<String>,
}

// =============================================================================
// Session Manager
// =============================================================================

pub struct SessionManager {
    backend: Arc<dyn StorageBackend>,
    current: Option<SessionSnapshot>,
    locked: bool,
    idle_deadline: Option<DateTime<Utc>>,
}

impl SessionManager {
    /// Opens the manager, restoring a persisted session pointer if one
    /// survives from the previous run.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        let current: Option<SessionSnapshot> = backend
            .load(keys::CURRENT_USER)
            .and_then(|raw| decode_value(&raw));
        if let Some(session) = &current {
            info!(username = %session.username, "Restored previous session");
        }
        SessionManager {
            backend,
            current,
            locked: false,
            idle_deadline: None,
        }
    }

    pub fn current(&self) -> Option<&SessionSnapshot> {
        self.current.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // =========================================================================
    // Login / Logout
    // =========================================================================

    /// Runs the full login pipeline. See the module docs for the exact
    /// ordering of checks.
    pub fn login(
        &mut self,
        store: &mut EntityStore,
        username: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> StoreResult<LoginOutcome> {
        let Some(user) = store.find_user_by_username(username).cloned() else {
            return Ok(LoginOutcome::Invalid);
        };
        if !user.is_active {
            return Ok(LoginOutcome::Invalid);
        }

        let now = Utc::now();
        if user.is_locked_out(now) {
            return Ok(LoginOutcome::Locked {
                until: user.lockout_until.unwrap_or(now),
            });
        }

        if !password::verify_password(password, &user.salt, &user.password_hash) {
            store.record_failed_login(&user.id)?;
            return Ok(LoginOutcome::Invalid);
        }

        if user.is_two_factor_enabled {
            if let Some(secret) = user.two_factor_secret.as_deref() {
                match two_factor_code {
                    None => return Ok(LoginOutcome::TwoFactorRequired),
                    Some(code) if !password::verify_two_factor(secret, code, now) => {
                        store.record_failed_login(&user.id)?;
                        return Ok(LoginOutcome::InvalidTwoFactor);
                    }
                    Some(_) => {}
                }
            }
        }

        let session = SessionSnapshot {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        };
        // Actor first: the LOGIN audit entry belongs to the signing-in
        // user, not the system pseudo-user.
        store.set_actor(Actor {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
        });
        store.record_successful_login(&user.id)?;

        self.current = Some(session.clone());
        self.locked = false;
        self.arm_idle_deadline(store, now);
        self.persist_session();
        Ok(LoginOutcome::Success(session))
    }

    /// Signs out: audit entry, actor reset, session pointer removed.
    pub fn logout(&mut self, store: &mut EntityStore) {
        if let Some(session) = self.current.take() {
            store.log_activity("LOGOUT", format!("'{}' logged out", session.username));
            store.commit(&[]);
        }
        store.clear_actor();
        self.locked = false;
        self.idle_deadline = None;
        self.backend.remove(keys::CURRENT_USER);
    }

    // =========================================================================
    // Lock Screen
    // =========================================================================

    /// Locks the UI without ending the session.
    pub fn lock_app(&mut self) {
        if self.current.is_some() {
            self.locked = true;
        }
    }

    /// Unlocks by re-verifying the current user's password.
    pub fn unlock_app(&mut self, store: &EntityStore, password: &str) -> StoreResult<bool> {
        let session = self
            .current
            .as_ref()
            .ok_or(StoreError::PermissionDenied { action: "unlock" })?;
        let user = store
            .users()
            .iter()
            .find(|u| u.id == session.user_id)
            .ok_or_else(|| StoreError::not_found("User", &session.user_id))?;

        if password::verify_password(password, &user.salt, &user.password_hash) {
            self.locked = false;
            self.arm_idle_deadline(store, Utc::now());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Registers user activity, pushing the idle deadline forward.
    pub fn record_activity(&mut self, store: &EntityStore, now: DateTime<Utc>) {
        if self.current.is_some() && !self.locked {
            self.arm_idle_deadline(store, now);
        }
    }

    /// Locks the app if the idle deadline has passed. Returns whether a
    /// lock happened on this call.
    pub fn check_idle(&mut self, now: DateTime<Utc>) -> bool {
        match self.idle_deadline {
            Some(deadline) if !self.locked && now >= deadline => {
                info!("Idle deadline reached, locking");
                self.locked = true;
                true
            }
            _ => false,
        }
    }

    fn arm_idle_deadline(&mut self, store: &EntityStore, now: DateTime<Utc>) {
        let minutes = store.settings().idle_lock_minutes;
        self.idle_deadline = if minutes > 0 {
            Some(now + Duration::minutes(i64::from(minutes)))
        } else {
            None
        };
    }

    // =========================================================================
    // Invites & Registration
    // =========================================================================

    /// Issues a single-use invite code. Admin only.
    pub fn generate_invite(
        &self,
        store: &mut EntityStore,
        role: UserRole,
    ) -> StoreResult<UserInvite> {
        let session = self
            .current
            .as_ref()
            .filter(|s| s.role == UserRole::Admin)
            .ok_or(StoreError::PermissionDenied {
                action: "generate invite",
            })?;

        info!(issuer = %session.username, ?role, "Issuing invite");
        store.insert_invite(UserInvite {
            code: password::generate_invite_code(),
            role,
            created_at: Utc::now(),
        })
    }

    /// Redeems an invite into a new account. The invite is consumed only on
    /// success; a clashing username leaves it redeemable.
    pub fn register_with_invite(
        &mut self,
        store: &mut EntityStore,
        code: &str,
        registration: Registration,
    ) -> StoreResult<RegisterOutcome> {
        let Some(invite) = store.user_invites().iter().find(|i| i.code == code).cloned() else {
            return Ok(RegisterOutcome::InvalidCode);
        };
        if store.find_user_by_username(&registration.username).is_some() {
            return Ok(RegisterOutcome::UsernameExists);
        }

        let salt = password::generate_salt();
        let password_hash = password::hash_password(&registration.password, &salt)?;
        let security_answer_hash = match &registration.security_answer {
            Some(answer) => Some(password::hash_password(answer, &salt)?),
            None => None,
        };

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: registration.username,
            password_hash,
            salt,
            role: invite.role,
            is_active: true,
            failed_login_attempts: 0,
            lockout_until: None,
            is_two_factor_enabled: false,
            two_factor_secret: None,
            recovery_code: Some(password::generate_recovery_code()),
            security_answer_hash,
            last_login: None,
            last_active: None,
            created_at: Utc::now(),
        };

        store.take_invite(code);
        let created = store.insert_user(user)?;
        Ok(RegisterOutcome::Created(created))
    }

    // =========================================================================
    // Two-Factor Enrollment
    // =========================================================================

    /// Enables two-factor for an account and returns the new secret for
    /// enrollment display.
    pub fn enable_two_factor(
        &self,
        store: &mut EntityStore,
        user_id: &str,
    ) -> StoreResult<String> {
        let mut user = store
            .users()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        let secret = password::generate_two_factor_secret();
        user.is_two_factor_enabled = true;
        user.two_factor_secret = Some(secret.clone());
        store.update_user(user)?;
        Ok(secret)
    }

    pub fn disable_two_factor(&self, store: &mut EntityStore, user_id: &str) -> StoreResult<()> {
        let mut user = store
            .users()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        user.is_two_factor_enabled = false;
        user.two_factor_secret = None;
        store.update_user(user)?;
        Ok(())
    }

    // =========================================================================
    // Account Recovery
    // =========================================================================

    /// Checks a recovery proof without changing anything.
    pub fn verify_recovery(
        &self,
        store: &EntityStore,
        username: &str,
        proof: &RecoveryProof,
    ) -> bool {
        let Some(user) = store.find_user_by_username(username) else {
            return false;
        };
        match proof {
            RecoveryProof::Code(code) => user
                .recovery_code
                .as_deref()
                .is_some_and(|stored| stored.eq_ignore_ascii_case(code)),
            RecoveryProof::SecurityAnswer(answer) => user
                .security_answer_hash
                .as_deref()
                .is_some_and(|stored| password::verify_password(answer, &user.salt, stored)),
        }
    }

    /// Resets the password after a successful recovery proof. The new
    /// credential pair gets a fresh salt.
    pub fn recover_account(
        &mut self,
        store: &mut EntityStore,
        username: &str,
        proof: &RecoveryProof,
        new_password: &str,
    ) -> StoreResult<bool> {
        if !self.verify_recovery(store, username, proof) {
            warn!(username, "Rejected account recovery attempt");
            return Ok(false);
        }
        let user = store
            .find_user_by_username(username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", username))?;

        let salt = password::generate_salt();
        let password_hash = password::hash_password(new_password, &salt)?;
        store.reset_password(&user.id, password_hash, salt)?;
        Ok(true)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn persist_session(&self) {
        let Some(session) = &self.current else {
            return;
        };
        match encode_value(session) {
            Ok(value) => {
                if let Err(e) = self.backend.save(keys::CURRENT_USER, &value) {
                    warn!(error = %e, "Failed to persist session pointer");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode session pointer"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
