//! Process-wide token allocation.
//!
//! Object handles and event registrations share one counter so a token is
//! unique across both spaces and is never handed out twice.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Next token value; zero is the "no object" sentinel and is never issued
static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_token() -> NonZeroUsize {
    loop {
        let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        if let Some(token) = NonZeroUsize::new(raw) {
            return token;
        }
    }
}
