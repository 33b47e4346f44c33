// Role credential retrieval
mod fetcher;
mod provider;

pub use fetcher::{CredentialFetcher, SsoApi};
pub use provider::{RoleTarget, SsoCredentialProvider, DEFAULT_RETRIEVE_TIMEOUT};

#[cfg(test)]
pub use fetcher::MockSsoApi;
