//! # Vestibule (Console Bootstrap)
//!
//! `vestibule` decides what an administrative console shows right after a user
//! authenticates: where they land, which capabilities are switched on, and
//! whether the protected shell may render at all.
//!
//! ## Decision Pipeline
//!
//! 1. **Destination:** After sign-in, the decoded ID token and the stored
//!    callback URL pick one of `Home`, `StoredCallback`, `CreateTenant` or
//!    `Unauthorized`. Callbacks pointing at the login page or at another tenant
//!    are never honoured.
//! 2. **Feature gates:** Remote feature descriptors are merged into a static
//!    default gate tree. A failed fetch falls back to the defaults.
//! 3. **Render gate:** The console renders a placeholder until routes are
//!    filtered and deployment plus endpoint configuration are present, and
//!    again while the session is timed out.
//!
//! ## Collaborators
//!
//! The auth SDK, navigation history, browser storage, localizer and remote
//! APIs are traits in [`console`] injected into [`console::Console`]. The
//! `vestibule` binary serves the pure parts of the pipeline over HTTP for
//! frontends that delegate these decisions.
//!
//! Decisions made here are UX only; the APIs behind the console still enforce
//! access control.

pub mod api;
pub mod cli;
pub mod console;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
