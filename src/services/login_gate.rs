//! Exclusive login gate
//!
//! When enabled, one user holds the session at a time. Others are queued in
//! arrival order and refused until the holder logs out or stays idle past the
//! configured limit, at which point the slot passes to the head of the queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Default)]
struct GateState {
    active: Option<String>,
    queue: VecDeque<String>,
    last_activity: HashMap<String, Instant>,
}

impl GateState {
    fn release(&mut self, username: &str) {
        if self.active.as_deref() != Some(username) {
            return;
        }
        self.active = None;
        self.last_activity.remove(username);
        if let Some(next) = self.queue.pop_front() {
            info!("User {} takes the login slot from the queue", next);
            self.last_activity.insert(next.clone(), Instant::now());
            self.active = Some(next);
        }
    }
}

pub struct LoginGate {
    idle_limit: Duration,
    state: Mutex<GateState>,
}

impl LoginGate {
    pub fn new(idle_limit: Duration) -> Self {
        Self {
            idle_limit,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Grant the slot if free or already held by `username`; otherwise queue
    /// the user and return `false`.
    pub async fn try_login(&self, username: &str) -> bool {
        let mut state = self.state.lock().await;
        match state.active.as_deref() {
            None => {
                info!("User {} logged in (no other active user)", username);
                state.active = Some(username.to_string());
                state
                    .last_activity
                    .insert(username.to_string(), Instant::now());
                true
            }
            Some(active) if active == username => {
                state
                    .last_activity
                    .insert(username.to_string(), Instant::now());
                true
            }
            Some(_) => {
                if !state.queue.iter().any(|u| u == username) {
                    info!("User {} joined the login queue", username);
                    state.queue.push_back(username.to_string());
                }
                false
            }
        }
    }

    pub async fn notify_logout(&self, username: &str) {
        let mut state = self.state.lock().await;
        if state.active.as_deref() == Some(username) {
            info!("User {} logged out, releasing the login slot", username);
        }
        state.release(username);
    }

    /// Refresh the activity time of the active user
    pub async fn touch(&self, username: &str) {
        let mut state = self.state.lock().await;
        if state.active.as_deref() == Some(username) {
            state
                .last_activity
                .insert(username.to_string(), Instant::now());
        }
    }

    /// Log out the active user if idle past the limit. Returns whether the
    /// slot was released.
    pub async fn check_inactivity(&self) -> bool {
        let mut state = self.state.lock().await;
        let Some(active) = state.active.clone() else {
            return false;
        };
        let idle = state
            .last_activity
            .get(&active)
            .map(|t| t.elapsed() > self.idle_limit)
            .unwrap_or(false);
        if idle {
            info!(
                "User {} idle for more than {}s, logged out",
                active,
                self.idle_limit.as_secs()
            );
            state.release(&active);
        }
        idle
    }

    pub async fn active_user(&self) -> Option<String> {
        self.state.lock().await.active.clone()
    }

    /// Sweep inactivity on a fixed interval until the process exits
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                gate.check_inactivity().await;
            }
        })
    }
}
