use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use super::constants::{
    DEFAULT_API_PORT, DEFAULT_EVENT_PAGE, DEFAULT_MAX_TX_BODY, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_STREAM_KEEP_ALIVE_SECS, MAX_EVENT_PAGE, MAX_NODE_PAGE,
};

/// HTTP surface of the ledger: read views, the event stream and `POST /tx`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: IpAddr,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// Upper bound on a submitted transaction body.
    pub max_body_size: usize,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    /// Accept `POST /tx`. Read-only deployments switch this off.
    pub submit_enabled: bool,
    pub default_event_page: usize,
    pub max_event_page: usize,
    pub max_node_page: usize,
    /// SSE comment interval on `/events/stream`.
    pub stream_keep_alive_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_API_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_size: DEFAULT_MAX_TX_BODY,
            cors_enabled: false,
            cors_origins: vec![],
            submit_enabled: true,
            default_event_page: DEFAULT_EVENT_PAGE,
            max_event_page: MAX_EVENT_PAGE,
            max_node_page: MAX_NODE_PAGE,
            stream_keep_alive_secs: DEFAULT_STREAM_KEEP_ALIVE_SECS,
        }
    }
}

impl ApiConfig {
    /// Clamps a requested event page to the configured bounds.
    pub fn event_page(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_event_page).clamp(1, self.max_event_page)
    }

    pub fn node_page(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.max_node_page).min(self.max_node_page)
    }
}
