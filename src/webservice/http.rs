use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use super::{SoapAction, Transport, TransportError};
use crate::core::Settings;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Blocking SOAP 1.1 transport over HTTPS.
///
/// Every call is bounded by the client timeout; expiry surfaces as
/// [`TransportError::Timeout`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        Self::new(settings.endpoint.clone(), settings.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout.as_secs())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn post(&self, action: SoapAction, envelope: &str) -> Result<String, TransportError> {
        tracing::debug!(action = action.name(), bytes = envelope.len(), endpoint = %self.endpoint, "posting SOAP request");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", action.uri())
            .body(envelope.to_string())
            .send()
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| self.classify(e))?;
        if !status.is_success() {
            tracing::warn!(action = action.name(), %status, "service answered with an HTTP error");
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_settings() {
        let settings = Settings::default();
        let t = HttpTransport::from_settings(&settings).unwrap();
        assert_eq!(t.endpoint(), crate::core::DEFAULT_ENDPOINT);
        assert!(t.endpoint().starts_with("https://"));
    }

    #[test]
    fn unreachable_endpoint_is_a_network_error() {
        let t = HttpTransport::new("http://127.0.0.1:9/nfsews.asmx", Duration::from_secs(2)).unwrap();
        let err = t.post(SoapAction::ConsultarLoteRps, "<x/>").unwrap_err();
        assert!(matches!(
            err,
            TransportError::Network(_) | TransportError::Timeout(_)
        ));
    }
}
