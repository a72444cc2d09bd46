//! Notice delivery over HTTP
//!
//! A single POST per notice, bounded by the configured open and read
//! timeouts, optionally through a proxy. No retries. The `reqwest` client is
//! kept between notices and rebuilt only when its settings change.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use faultline_core::environment::VERSION;
use faultline_core::{Configuration, Notice, ProxyConfig};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::encoding::encode_notice;
use crate::error::NotifierError;

/// A notice the collector accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
}

/// Sends an already filtered notice somewhere.
///
/// The notifier holds one of these; tests substitute a double to observe
/// what would have been sent.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, config: &Configuration, notice: &Notice)
        -> Result<Delivery, NotifierError>;
}

/// Settings baked into a built client.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientKey {
    open_timeout: Duration,
    read_timeout: Duration,
    proxy: Option<ProxyConfig>,
}

impl ClientKey {
    fn of(config: &Configuration) -> Self {
        Self {
            open_timeout: config.open_timeout(),
            read_timeout: config.read_timeout(),
            proxy: config.proxy().cloned(),
        }
    }
}

/// Delivers notices to the configured collector with `reqwest`.
#[derive(Debug, Default)]
pub struct HttpTransport {
    cached: Mutex<Option<(ClientKey, Client)>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached client, rebuilt first if the timeouts or proxy in
    /// `config` differ from the ones it was built with.
    fn client_for(&self, config: &Configuration) -> Result<Client, NotifierError> {
        let key = ClientKey::of(config);
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some((built_with, client)) = cached.as_ref() {
            if *built_with == key {
                return Ok(client.clone());
            }
        }

        debug!(
            open_timeout = ?key.open_timeout,
            read_timeout = ?key.read_timeout,
            proxy = key.proxy.is_some(),
            "Building HTTP client"
        );
        let client = Self::client(config)?;
        *cached = Some((key, client.clone()));
        Ok(client)
    }

    /// Builds a client honoring the timeouts and proxy in `config`.
    ///
    /// `connect_timeout` bounds opening the connection; the overall timeout
    /// is the open and read timeouts combined.
    pub fn client(config: &Configuration) -> Result<Client, NotifierError> {
        let mut builder = Client::builder()
            .connect_timeout(config.open_timeout())
            .timeout(config.open_timeout() + config.read_timeout())
            .user_agent(format!("faultline/{VERSION}"));

        builder = match config.proxy() {
            Some(proxy) => {
                let mut p = Proxy::all(proxy.url())?;
                if let Some(user) = &proxy.user {
                    p = p.basic_auth(user, proxy.pass.as_deref().unwrap_or_default());
                }
                builder.proxy(p)
            }
            None => builder.no_proxy(),
        };

        Ok(builder.build()?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        config: &Configuration,
        notice: &Notice,
    ) -> Result<Delivery, NotifierError> {
        let format = config.wire_format();
        let body = encode_notice(notice, format)?;
        let url = config.url();
        let client = self.client_for(config)?;

        debug!(url = %url, bytes = body.len(), "Posting notice");

        let response = client
            .post(&url)
            .header(CONTENT_TYPE, format.content_type())
            .header(ACCEPT, format.accept())
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, &url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(Delivery {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.ok().filter(|b| !b.is_empty());
        Err(NotifierError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(err: reqwest::Error, url: &str) -> NotifierError {
    if err.is_timeout() {
        NotifierError::Timeout {
            url: url.to_string(),
        }
    } else {
        NotifierError::Network(err)
    }
}
