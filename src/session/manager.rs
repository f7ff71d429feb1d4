//! Session table: session identifier → cookie store.
//!
//! # Responsibilities
//! - Recognize the session cookie on inbound requests, or issue a new one
//! - Bind at most one cookie store to each session identifier
//! - Evict idle sessions and enforce an optional capacity bound
//!
//! # Design Decisions
//! - `DashMap` shards are reader/writer locks: lookups take a shard read
//!   lock, creation takes the shard write lock and re-checks under it
//! - No lock is held across I/O; callers get an `Arc` to the store
//! - Last use is an atomic timestamp so the lookup path stays read-only
//! - A capped table keeps recency in an `LruCache`; its lock serializes
//!   admission, so the table never holds more than `max_sessions`
//! - Lock order is recency, then shard

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lru::LruCache;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::SessionConfig;
use crate::observability::metrics;
use crate::session::store::{CookieStoreFactory, JarFactory, SharedCookieStore};
use crate::session::{SessionError, SessionId};

/// Result of resolving the session for an inbound request.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub id: SessionId,
    /// `Set-Cookie` value to return when the identifier was just issued.
    pub set_cookie: Option<HeaderValue>,
}

impl ResolvedSession {
    pub fn is_new(&self) -> bool {
        self.set_cookie.is_some()
    }
}

struct SessionEntry {
    cookies: SharedCookieStore,
    /// Milliseconds since `SessionManager::epoch`.
    last_seen: AtomicU64,
}

impl SessionEntry {
    fn last_seen(&self) -> u64 {
        self.last_seen.load(Ordering::Relaxed)
    }

    fn touch(&self, now: u64) {
        self.last_seen.fetch_max(now, Ordering::Relaxed);
    }
}

/// Owns every session's cookie store for the lifetime of the process.
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionEntry>,
    factory: Arc<dyn CookieStoreFactory>,
    /// Present when `max_sessions` caps the table.
    recency: Option<Mutex<LruCache<SessionId, ()>>>,
    config: SessionConfig,
    epoch: Instant,
}

impl SessionManager {
    /// Create a manager that gives each session an in-memory cookie jar.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_factory(config, Arc::new(JarFactory))
    }

    pub fn with_factory(config: SessionConfig, factory: Arc<dyn CookieStoreFactory>) -> Self {
        Self {
            sessions: DashMap::new(),
            factory,
            recency: NonZeroUsize::new(config.max_sessions)
                .map(|cap| Mutex::new(LruCache::new(cap))),
            config,
            epoch: Instant::now(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Find the session a request belongs to, issuing a new identifier when
    /// the request carries no recognizable session cookie.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, SessionError> {
        if let Some(id) = presented_session(headers, &self.config.cookie_name) {
            return Ok(ResolvedSession {
                id,
                set_cookie: None,
            });
        }

        let id = SessionId::generate();
        let set_cookie = self.session_cookie(&id)?;
        tracing::debug!("Issued new session identifier");
        Ok(ResolvedSession {
            id,
            set_cookie: Some(set_cookie),
        })
    }

    /// Render the `Set-Cookie` value that hands `id` to the client.
    pub fn session_cookie(&self, id: &SessionId) -> Result<HeaderValue, SessionError> {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly",
            self.config.cookie_name, id, self.config.cookie_path, self.config.max_age_secs
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=Strict");
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// Return the cookie store bound to `id`, creating it on first use.
    ///
    /// Concurrent callers for the same new identifier all receive the same
    /// store; only one of them runs the factory.
    pub fn cookie_store(&self, id: &SessionId) -> Result<SharedCookieStore, SessionError> {
        let now = self.now_ms();

        if let Some(entry) = self.sessions.get(id) {
            entry.touch(now);
            let cookies = entry.cookies.clone();
            // Release the shard lock before taking the recency lock.
            drop(entry);
            if let Some(mut recency) = self.recency() {
                recency.promote(id);
            }
            return Ok(cookies);
        }

        let (cookies, created) = match self.recency() {
            Some(recency) => self.admit_bounded(recency, id, now)?,
            None => self.admit(id, now)?,
        };

        if created {
            metrics::record_session_created();
            metrics::record_active_sessions(self.sessions.len());
            tracing::debug!(active_sessions = self.sessions.len(), "Session cookie store created");
        }

        Ok(cookies)
    }

    fn admit(&self, id: &SessionId, now: u64) -> Result<(SharedCookieStore, bool), SessionError> {
        match self.sessions.entry(id.clone()) {
            // Another request created it between our read and write lock.
            Entry::Occupied(occupied) => {
                let entry = occupied.get();
                entry.touch(now);
                Ok((entry.cookies.clone(), false))
            }
            Entry::Vacant(vacant) => {
                let cookies = self.factory.create()?;
                vacant.insert(SessionEntry {
                    cookies: cookies.clone(),
                    last_seen: AtomicU64::new(now),
                });
                Ok((cookies, true))
            }
        }
    }

    /// Insert under the recency lock so the capacity check, the eviction and
    /// the insert are one step. Every membership change of a capped table
    /// happens with this lock held.
    fn admit_bounded(
        &self,
        mut recency: MutexGuard<'_, LruCache<SessionId, ()>>,
        id: &SessionId,
        now: u64,
    ) -> Result<(SharedCookieStore, bool), SessionError> {
        if let Some(entry) = self.sessions.get(id) {
            entry.touch(now);
            recency.promote(id);
            return Ok((entry.cookies.clone(), false));
        }

        let cookies = self.factory.create()?;

        let mut evicted = 0;
        while recency.len() >= recency.cap().get() {
            let Some((oldest, ())) = recency.pop_lru() else {
                break;
            };
            if self.sessions.remove(&oldest).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            metrics::record_sessions_evicted("capacity", evicted);
            tracing::debug!(
                evicted,
                max_sessions = self.config.max_sessions,
                "Evicted least recently used sessions"
            );
        }

        self.sessions.insert(
            id.clone(),
            SessionEntry {
                cookies: cookies.clone(),
                last_seen: AtomicU64::new(now),
            },
        );
        recency.put(id.clone(), ());
        Ok((cookies, true))
    }

    /// Number of sessions currently holding a cookie store.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Remove sessions idle for longer than the configured TTL.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_longer_than(self.config.idle_ttl())
    }

    /// Remove sessions whose last use is at least `ttl` ago.
    pub fn evict_idle_longer_than(&self, ttl: Duration) -> usize {
        let mut recency = self.recency();
        let now = self.now_ms();
        let ttl_ms = ttl.as_millis() as u64;
        let mut evicted = 0;

        self.sessions.retain(|id, entry| {
            let keep = now.saturating_sub(entry.last_seen()) < ttl_ms;
            if !keep {
                evicted += 1;
                if let Some(recency) = recency.as_mut() {
                    recency.pop(id);
                }
            }
            keep
        });
        drop(recency);

        if evicted > 0 {
            metrics::record_sessions_evicted("idle", evicted);
            metrics::record_active_sessions(self.sessions.len());
        }
        evicted
    }

    /// Run `evict_idle` periodically until shutdown is signalled.
    pub fn spawn_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.config.sweep_interval());
            // The first tick completes immediately.
            ticker.tick().await;

            tracing::info!(
                interval_secs = self.config.sweep_interval_secs,
                idle_ttl_secs = self.config.idle_ttl_secs,
                "Session sweeper starting"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.evict_idle();
                        if evicted > 0 {
                            tracing::info!(
                                evicted,
                                active_sessions = self.len(),
                                "Evicted idle sessions"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Session sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }

    /// Recency order of a capped table; `None` when unbounded.
    fn recency(&self) -> Option<MutexGuard<'_, LruCache<SessionId, ()>>> {
        self.recency
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Extract a well-formed session identifier from the `Cookie` headers.
fn presented_session(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| *name == cookie_name)
        .find_map(|(_, value)| SessionId::parse(value.trim()))
}
