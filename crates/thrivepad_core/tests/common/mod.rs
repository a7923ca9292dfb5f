#![allow(dead_code)]

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use thrivepad_core::backend::{AuthProvider, DocumentStore, Identity};
use thrivepad_core::{LocalBackend, SessionStore, SharedClock};

pub const PASSWORD: &str = "correct-horse";

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        *self.lock() += delta;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

pub fn start_of_2025() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
}

pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub struct Harness {
    pub backend: LocalBackend,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_of_2025()));
        let shared: SharedClock = clock.clone();
        let backend = LocalBackend::in_memory(shared).unwrap();
        Self { backend, clock }
    }

    pub fn shared_clock(&self) -> SharedClock {
        self.clock.clone()
    }

    pub fn auth(&self) -> Arc<dyn AuthProvider> {
        Arc::new(self.backend.clone())
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::new(self.backend.clone())
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::start(self.auth(), self.store())
    }

    /// Creates a verified identity and leaves it signed in.
    pub async fn verified_user(&self, email: &str) -> Identity {
        self.backend.create_identity(email, PASSWORD).await.unwrap();
        self.backend.verify_email(email).unwrap();
        self.backend.authenticate(email, PASSWORD).await.unwrap()
    }
}

/// Fails the test instead of hanging when an awaited view never arrives.
pub async fn within<F: Future>(future: F) -> F::Output {
    match tokio::time::timeout(std::time::Duration::from_secs(5), future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out waiting for live view"),
    }
}

/// Yields to spawned tasks until `condition` holds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await;
}

/// Lets spawned tasks run until they are idle.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
