//! Sheet-by-sheet processing: build, submit and verify every row.
//!
//! Processing is sequential. A row that cannot be built or whose batch is
//! rejected becomes a failed [`OutcomeRecord`]; only configuration and
//! numbering problems abort the run.

use chrono::{Local, NaiveDateTime};
use std::path::Path;

use crate::core::{
    CategoryProfile, InputRow, NfseError, OutcomeRecord, SubmissionMode, SubmissionStatus,
    Settings,
};
use crate::rps::{DocumentGenerator, RpsDocument};
use crate::webservice::{BatchSubmitter, SubmissionOutcome, Transport, VerificationClient};
use crate::workbook::{Sheet, Workbook};

/// Prefix of the verification text recorded for failed submissions.
pub const FAILURE_PREFIX: &str = "Erro ao processar a NFS-e: ";

/// Process every sheet with a category profile, issuing RPS dated now.
pub fn process_workbook(
    workbook: &Workbook,
    settings: &Settings,
    transport: &dyn Transport,
) -> Result<Vec<OutcomeRecord>, NfseError> {
    process_workbook_at(workbook, settings, transport, Local::now().naive_local())
}

/// Same as [`process_workbook`] with an explicit issue timestamp.
pub fn process_workbook_at(
    workbook: &Workbook,
    settings: &Settings,
    transport: &dyn Transport,
    issued_at: NaiveDateTime,
) -> Result<Vec<OutcomeRecord>, NfseError> {
    let processor = Processor {
        settings,
        submitter: BatchSubmitter::new(transport),
        verifier: VerificationClient::new(transport),
        issued_at,
    };

    let mut outcomes = Vec::with_capacity(workbook.row_count());
    for sheet in workbook.sheets() {
        let Some(profile) = settings.profile(sheet.name()) else {
            tracing::debug!(sheet = sheet.name(), "no category profile, sheet skipped");
            continue;
        };
        if sheet.is_empty() {
            continue;
        }
        tracing::info!(sheet = sheet.name(), rows = sheet.len(), mode = ?settings.mode, "processing sheet");
        let records = match settings.mode {
            SubmissionMode::PerRow => processor.per_row(sheet, profile)?,
            SubmissionMode::PerSheet => processor.per_sheet(sheet, profile)?,
        };
        outcomes.extend(records);
    }
    tracing::info!(
        rows = outcomes.len(),
        accepted = outcomes
            .iter()
            .filter(|o| o.status == SubmissionStatus::Success)
            .count(),
        "workbook processed"
    );
    Ok(outcomes)
}

/// Fill municipality codes into an uploaded file, then process it.
#[cfg(feature = "xlsx")]
pub fn process_file(
    path: impl AsRef<Path>,
    settings: &Settings,
    transport: &dyn Transport,
) -> Result<Vec<OutcomeRecord>, NfseError> {
    let workbook = crate::municipio::resolve_file(path, &settings.reference_path)?;
    process_workbook(&workbook, settings, transport)
}

struct Processor<'a> {
    settings: &'a Settings,
    submitter: BatchSubmitter<'a>,
    verifier: VerificationClient<'a>,
    issued_at: NaiveDateTime,
}

impl Processor<'_> {
    fn generator(
        &self,
        profile: &CategoryProfile,
        rows: &[InputRow],
        batch_size: usize,
    ) -> Result<DocumentGenerator, NfseError> {
        let first = rows.first().and_then(|r| r.rps);
        Ok(DocumentGenerator::new(profile.clone(), first, batch_size)?
            .with_service_municipio(self.settings.service_municipio.clone())
            .with_contact_email(self.settings.contact_email.clone()))
    }

    /// One batch per row, each verified when accepted.
    fn per_row(
        &self,
        sheet: &Sheet,
        profile: &CategoryProfile,
    ) -> Result<Vec<OutcomeRecord>, NfseError> {
        let rows = sheet.input_rows();
        let mut generator = self.generator(profile, &rows, 1)?;
        let mut records = Vec::with_capacity(rows.len());

        for row in &rows {
            let mut record = OutcomeRecord::for_row(sheet.name(), row, generator.peek());
            let doc = match build(&mut generator, row, self.issued_at)? {
                Ok(doc) => doc,
                Err(reason) => {
                    mark_failed(&mut record, &reason, false);
                    records.push(record);
                    continue;
                }
            };
            let lote = generator.lote(vec![doc], self.issued_at.date())?;
            let envelope = lote.to_envelope()?;
            self.dump(&format!("{}_rps_{}.xml", sheet.name(), record.rps), &envelope)?;

            if self.settings.dry_run {
                mark_not_sent(&mut record);
            } else {
                let outcome = self.submitter.submit_envelope(lote.numero(), &envelope);
                let verification = self.verification(profile, &outcome)?;
                apply(&mut record, &outcome, verification.as_deref());
            }
            tracing::info!(sheet = sheet.name(), rps = record.rps, status = %record.status, "row processed");
            records.push(record);
        }
        Ok(records)
    }

    /// One batch holding every row of the sheet; all rows share its outcome.
    fn per_sheet(
        &self,
        sheet: &Sheet,
        profile: &CategoryProfile,
    ) -> Result<Vec<OutcomeRecord>, NfseError> {
        let rows = sheet.input_rows();
        let mut generator = self.generator(profile, &rows, rows.len())?;
        let mut records = Vec::with_capacity(rows.len());
        let mut documents = Vec::with_capacity(rows.len());
        let mut failures = Vec::new();

        for row in &rows {
            records.push(OutcomeRecord::for_row(sheet.name(), row, generator.peek()));
            match build(&mut generator, row, self.issued_at)? {
                Ok(doc) => documents.push(doc),
                Err(reason) => failures.push(reason),
            }
        }

        if !failures.is_empty() {
            let reason = failures.join("; ");
            tracing::warn!(sheet = sheet.name(), %reason, "sheet batch not built");
            for record in &mut records {
                mark_failed(record, &reason, false);
            }
            return Ok(records);
        }

        let lote = generator.lote(documents, self.issued_at.date())?;
        let envelope = lote.to_envelope()?;
        self.dump(&format!("{}_lote_request.xml", sheet.name()), &envelope)?;

        if self.settings.dry_run {
            records.iter_mut().for_each(mark_not_sent);
        } else {
            let outcome = self.submitter.submit_envelope(lote.numero(), &envelope);
            let verification = self.verification(profile, &outcome)?;
            for record in &mut records {
                apply(record, &outcome, verification.as_deref());
            }
        }
        Ok(records)
    }

    fn verification(
        &self,
        profile: &CategoryProfile,
        outcome: &SubmissionOutcome,
    ) -> Result<Option<String>, NfseError> {
        match outcome {
            SubmissionOutcome::Accepted { protocolo, .. } => Ok(Some(
                self.verifier.verify(&profile.prestador, protocolo)?.label(),
            )),
            _ => Ok(None),
        }
    }

    fn dump(&self, file_name: &str, envelope: &str) -> Result<(), NfseError> {
        let Some(dir) = &self.settings.dump_dir else {
            return Ok(());
        };
        write_dump(dir, file_name, envelope)
    }
}

fn write_dump(dir: &Path, file_name: &str, envelope: &str) -> Result<(), NfseError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, envelope)?;
    tracing::debug!(path = %path.display(), bytes = envelope.len(), "envelope written");
    Ok(())
}

/// Build one document; row-level problems come back as `Ok(Err(reason))`.
fn build(
    generator: &mut DocumentGenerator,
    row: &InputRow,
    issued_at: NaiveDateTime,
) -> Result<Result<RpsDocument, String>, NfseError> {
    match generator.document(row, issued_at) {
        Ok(doc) => Ok(Ok(doc)),
        Err(e @ NfseError::InvalidRow { .. }) => {
            tracing::warn!(row = row.row_index + 1, error = %e, "row skipped");
            Ok(Err(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

fn apply(record: &mut OutcomeRecord, outcome: &SubmissionOutcome, verification: Option<&str>) {
    match outcome {
        SubmissionOutcome::Accepted { protocolo, .. } => {
            record.status = SubmissionStatus::Success;
            record.protocolo.clone_from(protocolo);
            record.status_verificacao = verification.unwrap_or_default().to_string();
        }
        _ => {
            let text = outcome.error_text().unwrap_or_default();
            mark_failed(record, &text, outcome.is_retryable());
        }
    }
}

fn mark_failed(record: &mut OutcomeRecord, text: &str, retryable: bool) {
    record.status = SubmissionStatus::Error;
    record.protocolo = crate::core::PROTOCOLO_NA.to_string();
    record.status_verificacao = format!("{FAILURE_PREFIX}{text}");
    record.retryable = retryable;
}

fn mark_not_sent(record: &mut OutcomeRecord) {
    record.status = SubmissionStatus::NotSent;
    record.status_verificacao = SubmissionStatus::NotSent.label().to_string();
}
