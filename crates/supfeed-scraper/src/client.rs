//! HTTP client for supplier catalog feeds.

use std::sync::LazyLock;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex as BytesRegex;
use reqwest::Client;
use supfeed_core::{AppConfig, SupplierConfig};

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

static DECLARED_ENCODING: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r#"^(?-u:\xEF\xBB\xBF)?\s*<\?xml[^>]*\bencoding\s*=\s*["']([A-Za-z0-9_.:-]+)["']"#)
        .expect("valid regex")
});

/// Login and password for a supplier feed behind basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolves the supplier's credentials through `lookup`, which maps an
    /// env var name to its value.
    ///
    /// Returns `Ok(None)` when the supplier names no credential variables.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::MissingCredential`] when a named variable has
    /// no value, or when only one of the two variables is configured.
    pub fn resolve<F>(supplier: &SupplierConfig, lookup: F) -> Result<Option<Self>, ScraperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |var: &str| {
            lookup(var).ok_or_else(|| ScraperError::MissingCredential {
                var: var.to_owned(),
            })
        };

        match (&supplier.login_env, &supplier.password_env) {
            (None, None) => Ok(None),
            (Some(login_var), Some(password_var)) => Ok(Some(Self {
                login: fetch(login_var)?,
                password: fetch(password_var)?,
            })),
            (Some(_), None) => Err(ScraperError::MissingCredential {
                var: format!("password_env for supplier '{}'", supplier.name),
            }),
            (None, Some(_)) => Err(ScraperError::MissingCredential {
                var: format!("login_env for supplier '{}'", supplier.name),
            }),
        }
    }

    /// [`Credentials::resolve`] against the process environment.
    ///
    /// # Errors
    ///
    /// See [`Credentials::resolve`].
    pub fn from_env(supplier: &SupplierConfig) -> Result<Option<Self>, ScraperError> {
        Self::resolve(supplier, |var| std::env::var(var).ok())
    }
}

/// Decodes a downloaded catalog body.
///
/// The encoding named in the XML declaration wins, then the `charset` of the
/// `Content-Type` header, then UTF-8. A byte order mark overrides all three.
#[must_use]
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = DECLARED_ENCODING
        .captures(bytes)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()));
    let from_header = content_type
        .and_then(|ct| {
            ct.split(';')
                .filter_map(|part| part.trim().split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
                .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()));

    let encoding = declared.or(from_header).unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "catalog body contained undecodable bytes");
    }
    text.into_owned()
}

fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Downloads supplier catalogs.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx responses
/// as typed errors. Transient errors are retried with exponential backoff up
/// to `max_retries` additional attempts.
pub struct FeedClient {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl FeedClient {
    /// Creates a `FeedClient` with configured timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.http_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_delay_secs,
        )
    }

    /// Downloads and decodes one catalog, with automatic retry on transient errors.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`]: `url` does not parse.
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries exhausted.
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status (5xx retried, 4xx not).
    /// - [`ScraperError::Http`]: network or TLS failure after all retries exhausted.
    pub async fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<String, ScraperError> {
        reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.to_owned();
            async move {
                let mut request = self
                    .client
                    .get(&url)
                    .header(
                        reqwest::header::ACCEPT,
                        "application/xml,text/xml;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::CACHE_CONTROL, "no-cache");

                if let Some(creds) = credentials {
                    request = request.basic_auth(&creds.login, Some(&creds.password));
                }

                let response = request.send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);

                    return Err(ScraperError::RateLimited {
                        domain: domain_of(&url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);

                let bytes = response.bytes().await?;
                tracing::debug!(url = %url, bytes = bytes.len(), "catalog downloaded");
                Ok(decode_body(&bytes, content_type.as_deref()))
            }
        })
        .await
    }

    /// Downloads a supplier's catalog, authenticating with the credentials
    /// its config points at.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::MissingCredential`] before any request is made
    /// when a credential variable is unset, otherwise see [`FeedClient::fetch`].
    pub async fn fetch_supplier(&self, supplier: &SupplierConfig) -> Result<String, ScraperError> {
        let credentials = Credentials::from_env(supplier)?;
        self.fetch(&supplier.url, credentials.as_ref()).await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
