//! Browser automation interface for web-login credentials.
//!
//! Defines the [`BrowserAdapter`] trait the tool surface programs against,
//! plus a thin Chrome DevTools Protocol adapter. Full page-interaction
//! recipes are intentionally out of scope here — see [`cdp::CdpBrowserAdapter`].

pub mod cdp;
pub mod contract;

pub use cdp::CdpBrowserAdapter;
pub use contract::{BrowserAdapter, BrowserLoginResult};
