//! Pool of idle browser sessions, leased one per in-flight resolution.

use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Hands out exclusive sessions. A session is either idle in the pool or held
/// by exactly one [`SessionLease`]; it is never used by two resolutions at once.
pub struct SessionPool<S> {
    idle: Mutex<Vec<S>>,
    max_idle: usize,
}

impl<S> SessionPool<S> {
    /// `max_idle` caps how many sessions stay open between leases
    /// (0 = every session is closed when its lease ends).
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Most recently returned idle session, if any.
    pub fn take_idle(&self) -> Option<S> {
        self.lock_idle().pop()
    }

    /// Wraps `session` in a lease that gives it back to this pool on drop.
    pub fn lease(&self, session: S) -> SessionLease<'_, S> {
        SessionLease {
            pool: self,
            session: Some(session),
            healthy: true,
        }
    }

    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    /// Removes every idle session. Leased sessions are unaffected.
    pub fn drain(&self) -> Vec<S> {
        self.lock_idle().drain(..).collect()
    }

    fn give_back(&self, session: S) {
        let mut idle = self.lock_idle();
        if idle.len() < self.max_idle {
            idle.push(session);
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<S>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive use of one session. Returned to the pool on drop, or dropped
/// (closing the browser) if it was marked broken or the pool is full.
pub struct SessionLease<'a, S> {
    pool: &'a SessionPool<S>,
    session: Option<S>,
    healthy: bool,
}

impl<S> SessionLease<'_, S> {
    /// The session hit a protocol or transport error; do not reuse it.
    pub fn mark_broken(&mut self) {
        self.healthy = false;
    }
}

impl<S> Deref for SessionLease<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        // Only taken in Drop.
        self.session.as_ref().unwrap_or_else(|| unreachable!("session taken before drop"))
    }
}

impl<S> Drop for SessionLease<'_, S> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if self.healthy {
            self.pool.give_back(session);
        } else {
            tracing::debug!("dropping broken browser session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counted(Arc<AtomicUsize>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn healthy_lease_returns_to_pool() {
        let pool = SessionPool::new(2);
        {
            let lease = pool.lease(7u32);
            assert_eq!(*lease, 7);
            assert_eq!(pool.idle_count(), 0);
        }
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.take_idle(), Some(7));
        assert_eq!(pool.take_idle(), None);
    }

    #[test]
    fn broken_session_is_dropped_not_reused() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(2);
        let mut lease = pool.lease(Counted(closed.clone()));
        lease.mark_broken();
        drop(lease);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sessions_over_the_idle_cap_are_closed() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(1);
        let a = pool.lease(Counted(closed.clone()));
        let b = pool.lease(Counted(closed.clone()));
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        drop(pool.drain());
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }
}
