//! SOAP transport and the two service operations.
//!
//! Everything above the wire talks to a [`Transport`]; the blocking
//! [`HttpTransport`] (feature `client`) is the production implementation.

#[cfg(feature = "client")]
mod http;
mod submit;
mod verify;

#[cfg(feature = "client")]
pub use http::HttpTransport;
pub use submit::{BatchSubmitter, SubmissionOutcome};
pub use verify::VerificationClient;

use thiserror::Error;

use crate::rps::NFSE_NS;

/// Operation invoked on the service, sent as the `SOAPAction` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapAction {
    RecepcionarLoteRps,
    ConsultarLoteRps,
}

impl SoapAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecepcionarLoteRps => "RecepcionarLoteRps",
            Self::ConsultarLoteRps => "ConsultarLoteRps",
        }
    }

    /// Full action URI (`<namespace><operation>`).
    pub fn uri(&self) -> String {
        format!("{NFSE_NS}{}", self.name())
    }
}

/// Failure to obtain a response body at all.
///
/// HTTP error statuses are not transport errors: their body is handed to
/// the response parser like any other.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// No answer within the configured timeout.
    #[error("request timed out after {0} s")]
    Timeout(u64),

    /// Connection, TLS or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// The transport could not be set up.
    #[error("transport setup error: {0}")]
    Setup(String),
}

impl TransportError {
    /// The call may succeed if simply repeated.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Posts a SOAP envelope and returns the raw response body.
pub trait Transport {
    fn post(&self, action: SoapAction, envelope: &str) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, action: SoapAction, envelope: &str) -> Result<String, TransportError> {
        (**self).post(action, envelope)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<String, TransportError>>>,
        pub requests: Mutex<Vec<(SoapAction, String)>>,
    }

    impl ScriptedTransport {
        pub fn new(replies: impl IntoIterator<Item = Result<String, TransportError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::default(),
            }
        }

        pub fn actions(&self) -> Vec<SoapAction> {
            self.requests.lock().iter().map(|(a, _)| *a).collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn post(&self, action: SoapAction, envelope: &str) -> Result<String, TransportError> {
            self.requests.lock().push((action, envelope.to_string()));
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
        }
    }
}
