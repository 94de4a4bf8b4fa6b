/// Default prefix that routes GitHub release assets through a CORS-friendly proxy.
pub const DEFAULT_PROXY_PREFIX: &str = "https://github-asset-proxy.adamraichu.workers.dev/?url=";

/// Configuration for the fetch client
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Prepended verbatim to every outbound URL. Empty disables the proxy.
    pub proxy_prefix: String,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
