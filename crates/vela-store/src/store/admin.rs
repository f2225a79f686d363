//! User, invite, and settings mutators.
//!
//! These are the store-side halves of the session manager's flows: the
//! manager decides, the store records. Usernames are unique
//! case-insensitively; lockout state lives on the user record so it
//! survives restarts and syncs with the rest of the dataset.

use chrono::{Duration, Utc};
use tracing::{info, warn};

use vela_core::{BusinessSettings, User, UserInvite, LOCKOUT_MINUTES, MAX_FAILED_LOGINS};

use crate::error::{StoreError, StoreResult};
use crate::storage::keys;

use super::EntityStore;

impl EntityStore {
    // =========================================================================
    // Users
    // =========================================================================

    /// Case-insensitive account lookup.
    pub fn find_user_by_username(&self, username: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// Adds a fully-formed account (the session manager builds the record
    /// with hashed credentials). Rejects case-insensitive username clashes.
    pub fn insert_user(&mut self, user: User) -> StoreResult<User> {
        if self.find_user_by_username(&user.username).is_some() {
            return Err(StoreError::DuplicateUsername {
                username: user.username,
            });
        }
        self.users.push(user.clone());

        self.log_activity(
            "CREATE_USER",
            format!("Created user '{}' ({:?})", user.username, user.role),
        );
        self.commit(&[keys::USERS]);
        Ok(user)
    }

    pub fn update_user(&mut self, updated: User) -> StoreResult<User> {
        let slot = self
            .users
            .iter_mut()
            .find(|u| u.id == updated.id)
            .ok_or_else(|| StoreError::not_found("User", &updated.id))?;
        *slot = updated.clone();

        self.log_activity(
            "UPDATE_USER",
            format!("Updated user '{}'", updated.username),
        );
        self.commit(&[keys::USERS]);
        Ok(updated)
    }

    pub fn delete_user(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| StoreError::not_found("User", id))?;
        let removed = self.users.remove(index);

        self.log_activity(
            "DELETE_USER",
            format!("Deleted user '{}'", removed.username),
        );
        self.commit(&[keys::USERS]);
        Ok(())
    }

    // =========================================================================
    // Login bookkeeping
    // =========================================================================

    /// Counts a failed attempt; the account locks for a fixed window once
    /// the threshold is reached.
    pub fn record_failed_login(&mut self, user_id: &str) -> StoreResult<()> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        user.failed_login_attempts += 1;
        if user.failed_login_attempts >= MAX_FAILED_LOGINS {
            user.lockout_until = Some(Utc::now() + Duration::minutes(LOCKOUT_MINUTES));
            warn!(
                username = %user.username,
                attempts = user.failed_login_attempts,
                "Account locked after repeated failures"
            );
        }
        let username = user.username.clone();

        self.log_activity(
            "LOGIN_FAILED",
            format!("Failed login for '{username}'"),
        );
        self.commit(&[keys::USERS]);
        Ok(())
    }

    /// Clears failure counters and stamps the login times.
    pub fn record_successful_login(&mut self, user_id: &str) -> StoreResult<()> {
        let now = Utc::now();
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        user.failed_login_attempts = 0;
        user.lockout_until = None;
        user.last_login = Some(now);
        user.last_active = Some(now);
        let username = user.username.clone();

        info!(username = %username, "User logged in");
        self.log_activity("LOGIN", format!("'{username}' logged in"));
        self.commit(&[keys::USERS]);
        Ok(())
    }

    /// Installs a freshly salted credential pair (password reset/recovery).
    pub fn reset_password(
        &mut self,
        user_id: &str,
        password_hash: String,
        salt: String,
    ) -> StoreResult<()> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        user.password_hash = password_hash;
        user.salt = salt;
        user.failed_login_attempts = 0;
        user.lockout_until = None;
        let username = user.username.clone();

        self.log_activity(
            "RESET_PASSWORD",
            format!("Password reset for '{username}'"),
        );
        self.commit(&[keys::USERS]);
        Ok(())
    }

    // =========================================================================
    // Invites
    // =========================================================================

    pub fn insert_invite(&mut self, invite: UserInvite) -> StoreResult<UserInvite> {
        self.user_invites.push(invite.clone());
        self.log_activity(
            "CREATE_INVITE",
            format!("Invite issued for role {:?}", invite.role),
        );
        self.commit(&[keys::USER_INVITES]);
        Ok(invite)
    }

    /// Consumes an invite by code, removing it from the collection.
    pub fn take_invite(&mut self, code: &str) -> Option<UserInvite> {
        let index = self.user_invites.iter().position(|i| i.code == code)?;
        let invite = self.user_invites.remove(index);
        self.commit(&[keys::USER_INVITES]);
        Some(invite)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Replaces the settings singleton wholesale.
    pub fn update_settings(&mut self, settings: BusinessSettings) {
        self.settings = settings;
        self.log_activity("UPDATE_SETTINGS", "Business settings updated");
        self.commit(&[keys::SETTINGS]);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::memory_store;
    use super::*;
    use vela_core::UserRole;

    pub(crate) fn test_user(username: &str) -> User {
        User {
            id: format!("u-{username}"),
            username: username.into(),
            password_hash: String::new(),
            salt: String::new(),
            role: UserRole::Cashier,
            is_active: true,
            failed_login_attempts: 0,
            lockout_until: None,
            is_two_factor_enabled: false,
            two_factor_secret: None,
            recovery_code: None,
            security_answer_hash: None,
            last_login: None,
            last_active: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn usernames_are_unique_case_insensitively() {
        let mut store = memory_store();
        store.insert_user(test_user("Ana")).unwrap();

        let err = store.insert_user(test_user("ANA")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername { .. }));
        assert!(store.find_user_by_username("aNa").is_some());
    }

    #[test]
    fn fifth_failure_locks_the_account() {
        let mut store = memory_store();
        let user = store.insert_user(test_user("ana")).unwrap();

        for _ in 0..MAX_FAILED_LOGINS - 1 {
            store.record_failed_login(&user.id).unwrap();
        }
        assert!(!store.users()[0].is_locked_out(Utc::now()));

        store.record_failed_login(&user.id).unwrap();
        let locked = &store.users()[0];
        assert!(locked.is_locked_out(Utc::now()));
        // Lockout expires on its own after the window.
        let after_window = Utc::now() + Duration::minutes(LOCKOUT_MINUTES + 1);
        assert!(!locked.is_locked_out(after_window));
    }

    #[test]
    fn successful_login_resets_the_counters() {
        let mut store = memory_store();
        let user = store.insert_user(test_user("ana")).unwrap();
        for _ in 0..MAX_FAILED_LOGINS {
            store.record_failed_login(&user.id).unwrap();
        }

        store.record_successful_login(&user.id).unwrap();
        let refreshed = &store.users()[0];
        assert_eq!(refreshed.failed_login_attempts, 0);
        assert_eq!(refreshed.lockout_until, None);
        assert!(refreshed.last_login.is_some());
    }

    #[test]
    fn invites_are_single_use() {
        let mut store = memory_store();
        store
            .insert_invite(UserInvite {
                code: "ABCD1234".into(),
                role: UserRole::Manager,
                created_at: Utc::now(),
            })
            .unwrap();

        let invite = store.take_invite("ABCD1234").unwrap();
        assert_eq!(invite.role, UserRole::Manager);
        assert!(store.take_invite("ABCD1234").is_none());
    }
}
