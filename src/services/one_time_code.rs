use std::time::{Duration, Instant};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use rand::RngCore;

use crate::error::AppError;
use crate::models::UserProfile;

/// Bytes of entropy per code; URL-safe encoded for use in a callback URL.
const CODE_BYTES: usize = 32;

struct CodeEntry {
    profile: UserProfile,
    expires_at: Instant,
}

/// Single-use, time-limited codes bridging the SSO redirect round trip.
///
/// Process-lifetime and memory-only by design: codes live for about a
/// minute and the store is expected to be empty after a restart. Redemption
/// is destructive — the remove is the atomic step, so two concurrent
/// redeems of one code yield exactly one success. Expired entries are
/// reclaimed lazily on the next issue; there is no background sweeper.
pub struct CodeStore {
    codes: DashMap<String, CodeEntry>,
    ttl: Duration,
}

impl CodeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: DashMap::new(),
            ttl,
        }
    }

    /// Generate a fresh code bound to the profile.
    pub fn issue(&self, profile: UserProfile) -> String {
        let now = Instant::now();
        self.codes.retain(|_, entry| now <= entry.expires_at);

        let mut bytes = [0u8; CODE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let code = URL_SAFE_NO_PAD.encode(bytes);

        self.codes.insert(
            code.clone(),
            CodeEntry {
                profile,
                expires_at: now + self.ttl,
            },
        );
        code
    }

    /// Redeem a code for its bound profile, consuming it.
    ///
    /// Never issued, already redeemed, and expired all collapse to the same
    /// error kind. An expired entry is removed here and not resurrected.
    pub fn redeem(&self, code: &str) -> Result<UserProfile, AppError> {
        let (_, entry) = self
            .codes
            .remove(code)
            .ok_or(AppError::InvalidOrExpiredCode)?;

        if Instant::now() > entry.expires_at {
            return Err(AppError::InvalidOrExpiredCode);
        }

        Ok(entry.profile)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.codes.len()
    }
}
