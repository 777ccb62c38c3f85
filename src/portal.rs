//! Account portal
//!
//! The portal lists the known accounts as cards, hides card shortcuts behind
//! a developer mode toggled with Ctrl+X, and routes a typed username to its
//! landing page. None of this is a security boundary: there is no password
//! check, the server still authenticates every API call.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stockroom_types::{PortalAccount, PortalRole};
use thiserror::Error;
use tracing::warn;

const DEPARTMENTS: [&str; 9] = [
    "商經科", "會事科", "國貿科", "觀光科", "資處科", "機械科", "電圖科", "室設科", "家設科",
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role filter: {0}")]
pub struct UnknownRole(pub String);

/// Accounts shown on the portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    accounts: Vec<PortalAccount>,
}

impl Default for Roster {
    fn default() -> Self {
        let mut accounts = vec![
            account("admin", PortalRole::Admin, "admin-login.html", "系統管理員", None),
            account("dep-admin", PortalRole::Admin, "dep-admin.html", "部門管理員", None),
        ];
        for (i, label) in DEPARTMENTS.iter().enumerate() {
            let n = i + 1;
            accounts.push(account(
                &format!("dep{}", n),
                PortalRole::User,
                &format!("Department{}-login.html", n),
                label,
                None,
            ));
        }
        for (i, label) in DEPARTMENTS.iter().enumerate() {
            let n = i + 1;
            accounts.push(account(
                &format!("dep{}T", n),
                PortalRole::Query,
                &format!("Department{}-report-management.html", n),
                &format!("{}(查詢)", label),
                Some(format!("dep{}", n)),
            ));
        }
        Self { accounts }
    }
}

fn account(
    username: &str,
    role: PortalRole,
    page: &str,
    label: &str,
    linked_user: Option<String>,
) -> PortalAccount {
    PortalAccount {
        username: username.to_string(),
        role,
        page: page.to_string(),
        label: label.to_string(),
        linked_user,
    }
}

impl Roster {
    pub fn new(accounts: Vec<PortalAccount>) -> Self {
        Self { accounts }
    }

    /// Load a roster from a JSON array of accounts
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading roster {}", path.display()))?;
        let accounts: Vec<PortalAccount> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing roster {}", path.display()))?;
        Ok(Self { accounts })
    }

    /// The roster at `path` if given, otherwise the built-in one
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn accounts(&self) -> &[PortalAccount] {
        &self.accounts
    }

    pub fn find(&self, username: &str) -> Option<&PortalAccount> {
        self.accounts.iter().find(|a| a.username == username)
    }

    /// Accounts matching `filter`: `all` (or none), `admin`, `user`, `query`
    pub fn filter(&self, filter: Option<&str>) -> Result<Vec<&PortalAccount>, UnknownRole> {
        let role = match filter.map(str::trim) {
            None | Some("") | Some("all") => None,
            Some("admin") => Some(PortalRole::Admin),
            Some("user") => Some(PortalRole::User),
            Some("query") => Some(PortalRole::Query),
            Some(other) => return Err(UnknownRole(other.to_string())),
        };
        Ok(self
            .accounts
            .iter()
            .filter(|a| role.map_or(true, |r| a.role == r))
            .collect())
    }
}

// ============================================
// Developer mode
// ============================================

/// A key press as seen by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub ctrl: bool,
    pub key: char,
}

impl KeyPress {
    pub fn ctrl(key: char) -> Self {
        Self { ctrl: true, key }
    }

    fn is_toggle(&self) -> bool {
        self.ctrl && self.key.eq_ignore_ascii_case(&'x')
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeveloperMode {
    enabled: bool,
}

impl DeveloperMode {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle on Ctrl+X. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: KeyPress) -> bool {
        if key.is_toggle() {
            self.enabled = !self.enabled;
            true
        } else {
            false
        }
    }
}

/// What clicking an account card does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    /// Developer mode is off
    Rejected,
    /// Admin cards prefill the login form
    FillUsername(String),
    Navigate(String),
}

pub fn select_card(mode: DeveloperMode, account: &PortalAccount) -> CardAction {
    if !mode.is_enabled() {
        return CardAction::Rejected;
    }
    match account.role {
        PortalRole::Admin => CardAction::FillUsername(account.username.clone()),
        PortalRole::User | PortalRole::Query => CardAction::Navigate(account.page.clone()),
    }
}

/// Result of submitting the portal login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    UnknownUser,
    /// Admins land on the password management section
    AdminSection(PortalAccount),
    Navigate(String),
}

/// Route a typed username. The password is not checked here.
pub fn route_login(roster: &Roster, username: &str) -> LoginOutcome {
    match roster.find(username.trim()) {
        None => LoginOutcome::UnknownUser,
        Some(account) if account.role == PortalRole::Admin => {
            LoginOutcome::AdminSection(account.clone())
        }
        Some(account) => LoginOutcome::Navigate(account.page.clone()),
    }
}

// ============================================
// Page view counter
// ============================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct PortalState {
    #[serde(default)]
    page_views: u64,
}

/// Persistent portal view count
pub struct PageViewCounter {
    path: PathBuf,
}

impl PageViewCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> PortalState {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Portal state {} unreadable, resetting: {}", self.path.display(), e);
                PortalState::default()
            }),
            Err(_) => PortalState::default(),
        }
    }

    pub fn current(&self) -> u64 {
        self.read().page_views
    }

    /// Count one more view and return the new total
    pub fn record_view(&self) -> anyhow::Result<u64> {
        let mut state = self.read();
        state.page_views += 1;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(&state)?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(state.page_views)
    }
}
