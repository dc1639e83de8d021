//! HTTP client implementation with connection pooling and retry logic

use std::time::Duration;

use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, warn};

use crate::api::PackageMetadataResponse;
use crate::RegistryResult;
use peerbump_core::error::BumpError;

/// Public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

/// Everything needed to build a client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base registry URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Optional credentials
    pub auth: Option<AuthConfig>,
    /// Retry behaviour
    pub retry: RetryConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY.to_string(),
            timeout: Duration::from_secs(30),
            auth: None,
            retry: RetryConfig::default(),
        }
    }
}

/// HTTP client for npm registry metadata
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Base registry URL
    base_url: String,
}

impl RegistryClient {
    /// Create new registry client against the public registry
    pub fn new() -> RegistryResult<Self> {
        Self::with_options(ClientOptions::default())
    }

    /// Create registry client with authentication
    pub fn with_auth(auth: AuthConfig) -> RegistryResult<Self> {
        Self::with_options(ClientOptions {
            auth: Some(auth),
            ..ClientOptions::default()
        })
    }

    /// Create registry client with custom configuration
    pub fn with_options(options: ClientOptions) -> RegistryResult<Self> {
        let base_url = url::Url::parse(&options.base_url)
            .map_err(|e| BumpError::ConfigValidation {
                field: "registry.url".to_string(),
                reason: format!("Invalid registry URL '{}': {}", options.base_url, e),
            })?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(options.timeout)
            .gzip(true)
            .user_agent(concat!("peerbump/", env!("CARGO_PKG_VERSION")));

        if let Some(auth) = options.auth {
            if let Some(header) = Self::authorization_header(&auth)? {
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(reqwest::header::AUTHORIZATION, header);
                builder = builder.default_headers(headers);
            }
        }

        let client = builder
            .build()
            .map_err(|e| BumpError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config: options.retry,
            base_url,
        })
    }

    fn authorization_header(auth: &AuthConfig) -> RegistryResult<Option<reqwest::header::HeaderValue>> {
        let value = if let Some(token) = &auth.token {
            format!("Bearer {}", token)
        } else if let (Some(username), Some(password)) = (&auth.username, &auth.password) {
            use base64::{engine::general_purpose, Engine as _};
            format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{}:{}", username, password))
            )
        } else {
            return Ok(None);
        };

        value
            .parse()
            .map(Some)
            .map_err(|e| BumpError::network("Invalid registry credentials".to_string(), e))
    }

    /// Registry URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            // Don't retry on final attempt or on answers that will not change
            let permanent = matches!(
                error,
                BumpError::PackageNotFound { .. } | BumpError::PermissionDenied { .. }
            );
            if permanent || attempt >= self.retry_config.max_retries {
                return Err(error);
            }

            attempt += 1;
            warn!("Registry request failed (attempt {}): {}", attempt, error);
            tokio::time::sleep(delay).await;

            delay = std::cmp::min(
                Duration::from_millis((delay.as_millis() as f64 * self.retry_config.multiplier) as u64),
                self.retry_config.max_delay,
            );
        }
    }

    /// Fetch package metadata with retry logic
    pub async fn fetch_metadata(&self, package_name: &str) -> RegistryResult<PackageMetadataResponse> {
        let url = format!("{}/{}", self.base_url, self.encode_package_name(package_name));
        debug!("GET {}", url);

        self.with_retry(|| async {
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.npm.install-v1+json")
                .send()
                .await
                .map_err(|e| BumpError::network(format!("Failed to fetch metadata: {}", e), e))?;

            match response.status() {
                StatusCode::OK => response
                    .json::<PackageMetadataResponse>()
                    .await
                    .map_err(|e| BumpError::network(format!("Failed to parse metadata: {}", e), e)),
                StatusCode::NOT_FOUND => Err(BumpError::PackageNotFound {
                    name: package_name.to_string(),
                }),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BumpError::PermissionDenied {
                    message: format!("registry refused access to {}", package_name),
                }),
                status => Err(BumpError::Network {
                    message: format!("Registry returned status {}: {}", status, package_name),
                    source: None,
                }),
            }
        })
        .await
    }

    /// Encode package name for URL (handle scoped packages)
    fn encode_package_name(&self, name: &str) -> String {
        if name.starts_with('@') {
            // Scoped package: @org/pkg -> @org%2fpkg
            name.replace('/', "%2f")
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests;
