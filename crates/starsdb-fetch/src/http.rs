use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::TransportError;

/// Raw result of a single GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Single-attempt GET. All retry, rate and admission policy lives above this.
#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed [`HttpGet`].
#[derive(Clone)]
pub struct ReqwestGet {
    client: Client,
}

impl ReqwestGet {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpGet for ReqwestGet {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// How one attempt ended, and what the retry loop should do about it.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Vec<u8>),
    Retryable { status: u16, backoff: Duration },
    Fatal(String),
}

impl AttemptOutcome {
    /// Map a response onto an outcome.
    ///
    /// 429 backs off for `too_many_requests`; 403, 500, 501 and 503 back off for
    /// `server_error`. The source answers 403 when it is shedding load, so it
    /// is treated as transient. Every other non-2xx status is fatal.
    pub fn classify(
        response: HttpResponse,
        too_many_requests: Duration,
        server_error: Duration,
    ) -> Self {
        match response.status {
            200..=299 => AttemptOutcome::Success(response.body),
            429 => AttemptOutcome::Retryable {
                status: 429,
                backoff: too_many_requests,
            },
            status @ (403 | 500 | 501 | 503) => AttemptOutcome::Retryable {
                status,
                backoff: server_error,
            },
            status => AttemptOutcome::Fatal(format!("HTTP {}", status)),
        }
    }
}
