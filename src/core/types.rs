use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tables;

/// One service line read from an uploaded sheet, after municipality resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRow {
    /// 0-based data row position within its sheet (header excluded).
    pub row_index: usize,
    /// Declared RPS number (`rps` column), if any.
    pub rps: Option<u64>,
    /// Counterpart CPF/CNPJ as typed (`cnpj` column).
    pub cnpj: String,
    /// Counterpart name (`razao` column).
    pub razao: String,
    pub logradouro: String,
    pub numero: String,
    pub bairro: String,
    pub cep: String,
    /// Upper-cased UF split off the `cidade/uf` column.
    pub uf: String,
    /// IBGE municipality code attached by the resolver.
    pub municipio: String,
    /// Service amount; `None` when the cell is empty or unparseable.
    pub valor: Option<Decimal>,
    /// Service description (`descricao` column).
    pub descricao: String,
}

/// Issuer identity sent in every batch and RPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prestador {
    /// Issuer CNPJ.
    pub cnpj: String,
    /// Issuer municipal registration (Inscrição Municipal).
    pub inscricao_municipal: String,
}

/// Static per-sheet tax profile. Sheets without a profile are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    /// Sheet/category name this profile applies to.
    pub name: String,
    pub prestador: Prestador,
    /// Service list item (LC 116 item, e.g. "0000").
    pub item_lista_servico: String,
    /// CNAE code, `"0"` when none applies.
    pub codigo_cnae: String,
    /// ISS rate as a fraction (0.05 = 5%).
    pub aliquota: Decimal,
    /// Municipal tax code (`CodigoTributacaoMunicipio`), omitted when unset.
    #[serde(default)]
    pub codigo_tributacao_municipio: Option<String>,
}

impl CategoryProfile {
    /// Profile with the rate and CNAE taken from the fixed category tables.
    pub fn new(
        name: impl Into<String>,
        cnpj: impl Into<String>,
        inscricao_municipal: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            aliquota: tables::aliquota_for(&name),
            codigo_cnae: tables::codigo_cnae_for(&name).to_string(),
            item_lista_servico: DEFAULT_ITEM_LISTA_SERVICO.to_string(),
            codigo_tributacao_municipio: None,
            prestador: Prestador {
                cnpj: cnpj.into(),
                inscricao_municipal: inscricao_municipal.into(),
            },
            name,
        }
    }

    pub fn item_lista_servico(mut self, item: impl Into<String>) -> Self {
        self.item_lista_servico = item.into();
        self
    }

    pub fn codigo_tributacao_municipio(mut self, code: impl Into<String>) -> Self {
        self.codigo_tributacao_municipio = Some(code.into());
        self
    }
}

/// Service list item used when a category does not configure one.
pub const DEFAULT_ITEM_LISTA_SERVICO: &str = "0000";

/// Protocol placeholder for batches that were not accepted.
pub const PROTOCOLO_NA: &str = "N/A";

/// Submission result of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// The service returned a protocol number.
    #[serde(rename = "Sucesso")]
    Success,
    /// Rejected, unreachable, or the RPS could not be built.
    #[serde(rename = "Erro")]
    Error,
    /// Generated but deliberately not sent (dry run).
    #[serde(rename = "Não enviado")]
    NotSent,
}

impl SubmissionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Sucesso",
            Self::Error => "Erro",
            Self::NotSent => "Não enviado",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything reported back for one processed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Sheet the row came from.
    pub sheet: String,
    /// 0-based data row position within the sheet.
    pub row_index: usize,
    /// RPS number assigned to the row.
    pub rps: u64,
    pub tomador_documento: String,
    pub razao_social: String,
    pub endereco: String,
    pub numero: String,
    pub codigo_municipio: String,
    pub uf: String,
    pub cep: String,
    pub bairro: String,
    pub valor: Option<Decimal>,
    pub descricao: String,
    pub status: SubmissionStatus,
    /// Protocol number, or [`PROTOCOLO_NA`].
    pub protocolo: String,
    /// Verification result, or the error text of a failed submission.
    pub status_verificacao: String,
    /// The failure was a timeout and the row may be resubmitted as is.
    pub retryable: bool,
}

impl OutcomeRecord {
    /// Outcome skeleton for a row; status fields are filled in by the caller.
    pub fn for_row(sheet: &str, row: &InputRow, rps: u64) -> Self {
        Self {
            sheet: sheet.to_string(),
            row_index: row.row_index,
            rps,
            tomador_documento: row.cnpj.clone(),
            razao_social: row.razao.clone(),
            endereco: row.logradouro.clone(),
            numero: row.numero.clone(),
            codigo_municipio: row.municipio.clone(),
            uf: row.uf.clone(),
            cep: row.cep.clone(),
            bairro: row.bairro.clone(),
            valor: row.valor,
            descricao: row.descricao.clone(),
            status: SubmissionStatus::NotSent,
            protocolo: PROTOCOLO_NA.to_string(),
            status_verificacao: String::new(),
            retryable: false,
        }
    }
}
