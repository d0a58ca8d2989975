//! Client side session handling and role based routing of the job portal
//!
//! - [`storage`] - per-origin key-value storage with cross-context change notifications
//! - [`session`] - the session store, single source of truth for authentication state
//! - [`router`] - the route guard and navigation history
//! - [`shell`] - session store and navigation of one context wired together
//! - [`claims`] - optimistic credential token payload decoding

pub mod claims;
pub mod profile;
pub mod role;
pub mod router;
pub mod session;
pub mod shell;
pub mod storage;

pub use claims::{Claims, user_id_from_token};
pub use profile::{Profile, ProfileStore};
pub use role::Role;
pub use router::{Navigator, Outcome, Resolution, Route, View, guard};
pub use session::{Session, SessionState, SessionStore};
pub use shell::Shell;
pub use storage::{LocalStorage, Origin, StorageEvent, Subscription};
