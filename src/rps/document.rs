use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Prestador, normalize_tax_id};

/// Counterpart tax identifier, classified by digit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TomadorId {
    /// Individual (CPF, 11 digits).
    Cpf(String),
    /// Organization (CNPJ), any other length.
    Cnpj(String),
}

impl TomadorId {
    /// Strip punctuation and classify: exactly 11 digits is a CPF.
    pub fn classify(raw: &str) -> Self {
        let digits = normalize_tax_id(raw);
        if digits.len() == 11 {
            Self::Cpf(digits)
        } else {
            Self::Cnpj(digits)
        }
    }

    /// Wire element wrapping the number.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cpf(_) => "Cpf",
            Self::Cnpj(_) => "Cnpj",
        }
    }

    pub fn digits(&self) -> &str {
        match self {
            Self::Cpf(d) | Self::Cnpj(d) => d,
        }
    }
}

/// `IdentificacaoRps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpsIdentificacao {
    pub numero: u64,
    pub serie: String,
    pub tipo: u8,
}

/// `Servico/Valores`. Withholdings and discounts are always zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valores {
    pub valor_servicos: Decimal,
    pub base_calculo: Decimal,
    /// ISS rate as a fraction.
    pub aliquota: Decimal,
    pub valor_liquido_nfse: Decimal,
    /// 1 = withheld, 2 = not withheld.
    pub iss_retido: u8,
}

/// `Servico`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Servico {
    pub valores: Valores,
    pub item_lista_servico: String,
    pub codigo_cnae: String,
    pub codigo_tributacao_municipio: Option<String>,
    pub discriminacao: String,
    /// Municipality where the service is rendered.
    pub codigo_municipio: String,
}

/// `Tomador/Endereco`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endereco {
    pub endereco: String,
    pub numero: String,
    pub bairro: String,
    pub codigo_municipio: String,
    pub uf: String,
    pub cep: String,
}

/// `Tomador`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tomador {
    pub identificacao: TomadorId,
    pub razao_social: String,
    pub endereco: Endereco,
    pub email: Option<String>,
}

/// One RPS (`InfRps`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpsDocument {
    pub identificacao: RpsIdentificacao,
    pub data_emissao: NaiveDateTime,
    /// 1 = taxation in the municipality.
    pub natureza_operacao: u8,
    /// 1 = yes, 2 = no.
    pub optante_simples_nacional: u8,
    /// 1 = yes, 2 = no.
    pub incentivador_cultural: u8,
    /// 1 = normal, 2 = cancelled.
    pub status: u8,
    pub servico: Servico,
    pub prestador: Prestador,
    pub tomador: Tomador,
}

impl RpsDocument {
    pub fn numero(&self) -> u64 {
        self.identificacao.numero
    }
}
