// src/interception/mod.rs
//! Request interception layer
//!
//! This module turns redirect verdicts into actual HTTP behavior:
//!
//! - **Watch List**: the monitored host patterns that gate evaluation
//! - **Redirect Proxy**: forward proxy answering watched requests with a
//!   307 to the rewritten target and relaying everything else
//!
//! # Architecture
//!
//! ```text
//! Client (proxy-configured)
//!     │
//!     ├─ http://reddit.com/...  → engine → 307 Location: <target>
//!     ├─ http://other.host/...  → forwarded upstream untouched
//!     └─ CONNECT host:443       → opaque tunnel
//! ```

pub mod proxy;
pub mod watch_list;

// Re-export commonly used types
pub use proxy::{ProxyStats, RedirectProxy};
pub use watch_list::WatchList;
