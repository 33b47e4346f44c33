//! AWS SSO device-flow login with AWS CLI compatible caching.
//!
//! The token cache reads and writes the same `~/.aws/sso/cache` files as the
//! AWS CLI. Role credentials are cached separately, in memory by default.
//! [`session::SessionManager`] ties login, account listing and credential
//! vending together for one SSO instance.

pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod credentials;
pub mod env;
pub mod error;
pub mod models;
pub mod profile;
pub mod session;
pub mod validation;

pub use context::OperationContext;
pub use error::{Result, SsoError};
pub use session::{SdkConfigRequest, SessionManager};
