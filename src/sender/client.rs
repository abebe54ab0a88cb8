use crate::config::{ConfigError, TransportOptions};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};

/// Builds the HTTP client for the push endpoint from the filtered transport options.
///
/// Redirects are not followed: a redirected POST would be replayed as a GET,
/// and the request method is not the user's to change.
pub fn build_http_client(transport: &TransportOptions) -> Result<Client, ConfigError> {
    let mut builder = ClientBuilder::new()
        .user_agent(&transport.user_agent)
        .pool_max_idle_per_host(transport.max_idle_connections)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(transport.accept_invalid_certs);

    if let Some(timeout) = transport.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(connect_timeout) = transport.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }

    if let Some(proxy) = &transport.proxy {
        let proxy = Proxy::all(proxy.as_str())
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ConfigError::InvalidConfig(format!("Failed to build HTTP client: {e}")))
}
