use crate::core::{NfseError, Prestador};
use crate::rps::{ConsultaLote, VerificationStatus, parse_verification_response};

use super::{SoapAction, Transport};

/// Queries `ConsultarLoteRps` for an accepted protocol.
pub struct VerificationClient<'a> {
    transport: &'a dyn Transport,
}

impl<'a> VerificationClient<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// One verification call. Transport failures are reported as
    /// [`VerificationStatus::Unreachable`], never as errors.
    pub fn verify(
        &self,
        prestador: &Prestador,
        protocolo: &str,
    ) -> Result<VerificationStatus, NfseError> {
        let envelope = ConsultaLote::new(prestador.clone(), protocolo).to_envelope()?;
        let status = match self.transport.post(SoapAction::ConsultarLoteRps, &envelope) {
            Ok(body) => parse_verification_response(&body),
            Err(e) => VerificationStatus::Unreachable(e.to_string()),
        };
        tracing::info!(%protocolo, status = %status, "batch verified");
        Ok(status)
    }
}
