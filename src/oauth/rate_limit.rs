/// Minimal per-key token bucket.
///
/// Guards the OAuth token endpoint against brute-force code/verifier
/// guessing, since that endpoint is reachable pre-authentication. Spec §1's
/// Non-goals exclude general rate limiting "beyond a simple per-token
/// bucket" — this is exactly that, and it is NOT applied to tool calls.
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct TokenBucket {
    buckets: DashMap<String, Mutex<Bucket>>,
    capacity: f64,
    refill_per_second: f64,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_second: f64) -> Self {
        Self { buckets: DashMap::new(), capacity, refill_per_second }
    }

    /// Returns `true` if the call is allowed (a token was available and
    /// consumed), `false` if the key is currently exhausted.
    pub fn try_acquire(&self, key: &str) -> bool {
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Bucket { tokens: self.capacity, last_refill: Instant::now() }));
        let mut bucket = entry.lock();
        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.last_refill = Instant::now();
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
