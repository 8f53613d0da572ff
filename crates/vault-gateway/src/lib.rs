//! Loopback gateway for out-of-process credential entry.
//!
//! A tool call that needs a new secret registers a [`pending::PendingEntryRegistry`]
//! token, hands the human a `/add?token=...` URL, and awaits
//! [`pending::await_entry`] against a timeout. The human fills in the form
//! served from here; submitting it POSTs to `/api/credentials`, which
//! persists the credential through the store, fires the audit entry, and
//! resolves the waiting call with the new credential's metadata — the secret
//! itself is never logged or echoed back to the caller that requested the
//! add. `/api/credentials`, `/api/credentials/{site}`, and `/api/audit` also
//! serve as the admin surface for listing, toggling, removing, and auditing
//! credentials directly.

pub mod entry_form;
pub mod pending;
pub mod routes;
pub mod server;
pub mod state;

pub use pending::{
    await_entry, PendingEntryRegistry, PendingEntryView, PendingRegistration, DEFAULT_ENTRY_TIMEOUT,
};
pub use server::{build_router, run_entry_gateway};
pub use state::GatewayState;
