use crate::core::{NfseError, PROTOCOLO_NA, SubmissionStatus};
use crate::rps::{LoteRps, LoteResponse, MensagemRetorno, parse_lote_response};

use super::{SoapAction, Transport, TransportError};

/// What happened to one submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The service issued a protocol number.
    Accepted {
        protocolo: String,
        response: LoteResponse,
    },
    /// The service answered without a protocol (or not with XML at all).
    Rejected {
        raw: String,
        mensagens: Vec<MensagemRetorno>,
    },
    /// No answer was obtained.
    Failed(TransportError),
}

impl SubmissionOutcome {
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Self::Accepted { .. } => SubmissionStatus::Success,
            Self::Rejected { .. } | Self::Failed(_) => SubmissionStatus::Error,
        }
    }

    /// Protocol number, or `"N/A"` when not accepted.
    pub fn protocolo(&self) -> &str {
        match self {
            Self::Accepted { protocolo, .. } => protocolo,
            _ => PROTOCOLO_NA,
        }
    }

    /// Raw response body or transport error, for failed submissions.
    pub fn error_text(&self) -> Option<String> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { raw, .. } => Some(raw.clone()),
            Self::Failed(e) => Some(e.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(e) if e.is_timeout())
    }
}

/// Sends `RecepcionarLoteRps` requests. One call per batch, no retries.
pub struct BatchSubmitter<'a> {
    transport: &'a dyn Transport,
}

impl<'a> BatchSubmitter<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Render and submit a batch.
    pub fn submit(&self, lote: &LoteRps) -> Result<SubmissionOutcome, NfseError> {
        let envelope = lote.to_envelope()?;
        Ok(self.submit_envelope(lote.numero(), &envelope))
    }

    /// Submit an already rendered envelope.
    pub fn submit_envelope(&self, numero_lote: u64, envelope: &str) -> SubmissionOutcome {
        let body = match self.transport.post(SoapAction::RecepcionarLoteRps, envelope) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(numero_lote, error = %e, "batch submission failed");
                return SubmissionOutcome::Failed(e);
            }
        };

        match parse_lote_response(&body) {
            Ok(response) => match response.protocolo.clone() {
                Some(protocolo) => {
                    tracing::info!(numero_lote, %protocolo, "batch accepted");
                    SubmissionOutcome::Accepted { protocolo, response }
                }
                None => {
                    for m in &response.mensagens {
                        tracing::warn!(numero_lote, mensagem = %m, "batch rejected");
                    }
                    SubmissionOutcome::Rejected {
                        raw: body,
                        mensagens: response.mensagens,
                    }
                }
            },
            Err(e) => {
                tracing::warn!(numero_lote, error = %e, "unparseable submission response");
                SubmissionOutcome::Rejected {
                    raw: body,
                    mensagens: Vec::new(),
                }
            }
        }
    }
}
