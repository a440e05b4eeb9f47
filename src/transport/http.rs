//! A `reqwest`-backed implementation of the [`Transport`][super::Transport] trait.
use crate::error::Error;
use crate::transport::{Request, Response, Transport};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    scheme: &'static str,
}

impl HttpTransport {
    /// An HTTPS transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TLS backend can't be initialized.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Self::build("https", timeout)
    }

    /// A plain HTTP transport, for talking to local test servers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the client can't be built.
    pub fn plaintext(timeout: Duration) -> Result<Self, Error> {
        Self::build("http", timeout)
    }

    fn build(scheme: &'static str, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| Error::Transport(err.to_string()))?;
        Ok(Self { client, scheme })
    }

    fn url(&self, request: &Request) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme, request.host, request.port, request.path
        )
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> Result<Response, Error> {
        let url = self.url(request);
        tracing::debug!("GET {url}");

        let mut builder = self.client.get(&url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .send()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;
        Ok(Response {
            status,
            location,
            body,
        })
    }
}
