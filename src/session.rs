//! Client sessions: signed-in user, mirrored profile and cart.
//!
//! Each [`Session`] runs a mirror task that listens for sign-in and
//! sign-out events and keeps a live subscription to the signed-in user's
//! profile. The resulting [`SessionState`] is published on a watch channel.

use crate::cart::CartSession;
use crate::error::{Error, Result};
use crate::profile::{ProfileStore, UserProfile};
use crate::storage::MemorySessionStorage;

use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;

/// How long sign-in and sign-out wait for the mirror to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated identity from the sign-in provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(AuthUser),
    SignedOut,
}

/// What the client knows about who is signed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    /// True until the first profile snapshot after sign-in arrives.
    pub loading: bool,
}

impl SessionState {
    pub fn is_artisan(&self) -> bool {
        self.profile.as_ref().is_some_and(UserProfile::is_artisan)
    }

    /// Signed in, profile loaded and not yet set up.
    pub fn needs_profile_setup(&self) -> bool {
        !self.loading
            && self.user.is_some()
            && self.profile.as_ref().is_some_and(|profile| !profile.profile_complete)
    }

    fn settled_for(&self, uid: Option<&str>) -> bool {
        !self.loading && self.user.as_ref().map(|user| user.uid.as_str()) == uid
    }
}

/// Wait for the next profile snapshot, or forever when there is no
/// subscription.
async fn next_profile(
    stream: &mut Option<BoxStream<'static, Result<Option<UserProfile>>>>,
) -> Option<Result<Option<UserProfile>>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Mirror auth events and the signed-in user's profile into `state`.
/// Runs until the event sender is dropped.
pub async fn mirror_profile(
    profiles: ProfileStore,
    mut events: mpsc::Receiver<SessionEvent>,
    state: watch::Sender<SessionState>,
) {
    let mut subscription: Option<BoxStream<'static, Result<Option<UserProfile>>>> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                // Replacing the subscription drops the previous one.
                match event {
                    SessionEvent::SignedIn(user) => {
                        subscription = Some(profiles.watch(&user.uid));
                        state.send_replace(SessionState {
                            user: Some(user),
                            profile: None,
                            loading: true,
                        });
                    }
                    SessionEvent::SignedOut => {
                        subscription = None;
                        state.send_replace(SessionState::default());
                    }
                }
            }
            snapshot = next_profile(&mut subscription) => {
                match snapshot {
                    Some(Ok(profile)) => {
                        state.send_modify(|current| {
                            current.profile = profile;
                            current.loading = false;
                        });
                    }
                    Some(Err(error)) => {
                        tracing::warn!(%error, "profile subscription failed, clearing session");
                        subscription = None;
                        state.send_replace(SessionState::default());
                    }
                    None => {
                        subscription = None;
                        state.send_modify(|current| current.loading = false);
                    }
                }
            }
        }
    }
}

/// One client's session.
pub struct Session {
    id: String,
    last_seen: std::sync::Mutex<Instant>,
    cart: Mutex<CartSession>,
    events: mpsc::Sender<SessionEvent>,
    state: watch::Receiver<SessionState>,
    mirror: JoinHandle<()>,
}

impl Session {
    fn start(id: String, profiles: ProfileStore) -> Self {
        let (events, event_rx) = mpsc::channel(16);
        let (state_tx, state) = watch::channel(SessionState::default());
        let mirror = tokio::spawn(mirror_profile(profiles, event_rx, state_tx));
        let cart = CartSession::load(Arc::new(MemorySessionStorage::new()));

        Self {
            id,
            last_seen: std::sync::Mutex::new(Instant::now()),
            cart: Mutex::new(cart),
            events,
            state,
            mirror,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|last_seen| last_seen.elapsed())
            .unwrap_or_default()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn cart(&self) -> &Mutex<CartSession> {
        &self.cart
    }

    /// Sign `user` in and wait until their profile has been mirrored.
    pub async fn sign_in(&self, user: AuthUser) -> Result<SessionState> {
        let uid = user.uid.clone();
        self.send(SessionEvent::SignedIn(user)).await?;
        self.settle(Some(&uid)).await
    }

    pub async fn sign_out(&self) -> Result<SessionState> {
        self.send(SessionEvent::SignedOut).await?;
        self.settle(None).await
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| Error::Other(anyhow::anyhow!("session {} is closed", self.id)))
    }

    async fn settle(&self, uid: Option<&str>) -> Result<SessionState> {
        let mut state = self.state.clone();
        let settled = tokio::time::timeout(SETTLE_TIMEOUT, state.wait_for(|s| s.settled_for(uid)))
            .await
            .map_err(|_| Error::Other(anyhow::anyhow!("timed out waiting for session {}", self.id)))?
            .map_err(|_| Error::Other(anyhow::anyhow!("session {} is closed", self.id)))?;
        Ok(settled.clone())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.mirror.abort();
    }
}

/// All live sessions, keyed by session id. Sessions untouched for longer
/// than the idle TTL are evicted by [`SessionRegistry::spawn_sweeper`].
pub struct SessionRegistry {
    profiles: ProfileStore,
    idle_ttl: Duration,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(profiles: ProfileStore, idle_ttl: Duration) -> Self {
        Self {
            profiles,
            idle_ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> Arc<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::start(id.clone(), self.profiles.clone()));
        self.sessions.write().await.insert(id.clone(), session.clone());
        tracing::debug!(session_id = %id, "session created");
        session
    }

    /// Look up a session, marking it as used.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Drop a session, stopping its mirror. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            tracing::debug!(session_id = %id, "session closed");
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session idle for at least the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for() < self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Evict idle sessions every `interval`. The task ends once the
    /// registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else { break };
                registry.evict_idle().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentStore;
    use crate::profile::{ProfileSetup, Role, VerificationStatus};

    async fn registry() -> (SessionRegistry, ProfileStore) {
        let profiles = ProfileStore::new(DocumentStore::new(crate::db::connect_in_memory().await));
        (SessionRegistry::new(profiles.clone(), Duration::from_secs(3600)), profiles)
    }

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: uid.into(),
            email: Some(format!("{uid}@example.com")),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn new_sessions_are_signed_out() {
        let (registry, _) = registry().await;
        let session = registry.create().await;

        let state = session.state();
        assert_eq!(state, SessionState::default());
        assert!(!state.is_artisan());
        assert!(!state.needs_profile_setup());
    }

    #[tokio::test]
    async fn sign_in_mirrors_the_profile() {
        let (registry, profiles) = registry().await;
        profiles.create_initial(&user("u1")).await.unwrap();
        let session = registry.create().await;

        let state = session.sign_in(user("u1")).await.unwrap();
        assert!(!state.loading);
        assert_eq!(state.profile.as_ref().map(|p| p.role), Some(Role::Buyer));
        assert!(state.needs_profile_setup());
    }

    #[tokio::test]
    async fn profile_writes_reach_the_session() {
        let (registry, profiles) = registry().await;
        profiles.create_initial(&user("u1")).await.unwrap();
        let session = registry.create().await;
        session.sign_in(user("u1")).await.unwrap();

        let mut updates = session.subscribe();
        profiles
            .complete_setup(
                "u1",
                &ProfileSetup {
                    name: "Ravi Kumar".into(),
                    city: "Kutch".into(),
                    phone: "9123456780".into(),
                },
            )
            .await
            .unwrap();

        let state = updates
            .wait_for(|state| state.profile.as_ref().is_some_and(|p| p.profile_complete))
            .await
            .unwrap()
            .clone();
        assert!(!state.needs_profile_setup());
        assert_eq!(state.profile.unwrap().city.as_deref(), Some("Kutch"));
    }

    #[tokio::test]
    async fn missing_profile_settles_as_none() {
        let (registry, _) = registry().await;
        let session = registry.create().await;

        let state = session.sign_in(user("ghost")).await.unwrap();
        assert_eq!(state.user.as_ref().map(|u| u.uid.as_str()), Some("ghost"));
        assert_eq!(state.profile, None);
        assert!(!state.needs_profile_setup());
    }

    #[tokio::test]
    async fn sign_out_clears_user_and_profile() {
        let (registry, profiles) = registry().await;
        profiles.create_initial(&user("u1")).await.unwrap();
        profiles
            .set_verification_status("u1", VerificationStatus::Pending)
            .await
            .unwrap();
        let session = registry.create().await;
        session.sign_in(user("u1")).await.unwrap();

        let state = session.sign_out().await.unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[tokio::test]
    async fn switching_users_follows_the_new_profile() {
        let (registry, profiles) = registry().await;
        profiles.create_initial(&user("u1")).await.unwrap();
        profiles.create_initial(&user("u2")).await.unwrap();
        let session = registry.create().await;

        session.sign_in(user("u1")).await.unwrap();
        let state = session.sign_in(user("u2")).await.unwrap();
        assert_eq!(state.profile.map(|p| p.uid), Some("u2".to_string()));
    }

    #[tokio::test]
    async fn registry_tracks_sessions() {
        let (registry, _) = registry().await;
        let session = registry.create().await;
        let id = session.id().to_string();

        assert!(registry.get(&id).await.is_some());
        assert_eq!(registry.len().await, 1);
        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_and_stopped() {
        let profiles = ProfileStore::new(DocumentStore::new(crate::db::connect_in_memory().await));
        let registry = SessionRegistry::new(profiles, Duration::ZERO);
        let session = registry.create().await;
        let id = session.id().to_string();
        let mut updates = session.subscribe();
        drop(session);

        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.get(&id).await.is_none());

        // The mirror owned the state sender; aborting it closes the channel.
        let closed = tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("mirror stopped");
        assert!(closed.is_err());
    }

    #[tokio::test]
    async fn active_sessions_survive_eviction() {
        let (registry, _) = registry().await;
        let session = registry.create().await;

        assert_eq!(registry.evict_idle().await, 0);
        assert!(registry.get(session.id()).await.is_some());
    }

    #[tokio::test]
    async fn sweeper_evicts_in_the_background() {
        let profiles = ProfileStore::new(DocumentStore::new(crate::db::connect_in_memory().await));
        let registry = Arc::new(SessionRegistry::new(profiles, Duration::from_millis(20)));
        let sweeper = registry.spawn_sweeper(Duration::from_millis(10));
        registry.create().await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.len().await > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session evicted");

        drop(registry);
        tokio::time::timeout(Duration::from_secs(5), sweeper)
            .await
            .expect("sweeper exits with the registry")
            .unwrap();
    }
}
