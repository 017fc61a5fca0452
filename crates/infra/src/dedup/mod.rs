//! Content-addressed duplicate suppression.
//!
//! A [`DedupCache`] remembers the fingerprints of recently published events for a
//! bounded window. The publisher consults it only when the caller asks for
//! deduplication.
//!
//! ## Time Semantics
//!
//! - **Sliding window**: a fingerprint is visible for `window` after its most recent insert
//! - **Passive expiry**: lookups treat expired entries as absent
//! - **Active expiry**: a sweeper removes expired entries every `cleanup_interval`, so
//!   one-shot fingerprints don't accumulate
//!
//! Entries are never deleted explicitly; only time removes them.
//!
//! ## Concurrency
//!
//! Implementations must be safe to share across producer threads without external
//! locking. A lookup racing an insert of the same key may observe either outcome.

pub mod ttl;

pub use ttl::TtlDedupCache;

use std::sync::Arc;

use eventgate_core::Fingerprint;

/// Time-bounded set of fingerprints.
pub trait DedupCache: Send + Sync {
    /// Is `fingerprint` currently within its window?
    fn lookup(&self, fingerprint: &Fingerprint) -> bool;

    /// Record `fingerprint`, restarting its window.
    fn insert(&self, fingerprint: Fingerprint);

    /// Record `fingerprint` unless it is already present.
    ///
    /// Returns `true` when the fingerprint was newly recorded. The default is a
    /// plain lookup followed by an insert; implementations that can do both under
    /// one lock should override it so concurrent identical events can't both pass.
    fn insert_if_absent(&self, fingerprint: Fingerprint) -> bool {
        if self.lookup(&fingerprint) {
            return false;
        }
        self.insert(fingerprint);
        true
    }
}

impl<C> DedupCache for Arc<C>
where
    C: DedupCache + ?Sized,
{
    fn lookup(&self, fingerprint: &Fingerprint) -> bool {
        (**self).lookup(fingerprint)
    }

    fn insert(&self, fingerprint: Fingerprint) {
        (**self).insert(fingerprint)
    }

    fn insert_if_absent(&self, fingerprint: Fingerprint) -> bool {
        (**self).insert_if_absent(fingerprint)
    }
}
