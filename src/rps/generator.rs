use chrono::{NaiveDate, NaiveDateTime};

use crate::core::{
    CategoryProfile, DEFAULT_SERVICE_MUNICIPIO, InputRow, NfseError, RpsSequence, numero_lote,
};

use super::document::{
    Endereco, RpsDocument, RpsIdentificacao, Servico, Tomador, TomadorId, Valores,
};
use super::lote::LoteRps;

/// Turns the rows of one sheet into RPS documents and batches.
///
/// Owns the sheet's RPS sequence: every call to [`document`](Self::document)
/// consumes exactly one number, so numbers stay aligned with rows even when
/// a row is rejected.
#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    profile: CategoryProfile,
    sequence: RpsSequence,
    batch_size: usize,
    service_municipio: String,
    contact_email: Option<String>,
}

impl DocumentGenerator {
    /// `first_rps` is the first row's declared number (`None` starts at 1).
    /// `batch_size` is the number of RPS every batch built here carries.
    pub fn new(
        profile: CategoryProfile,
        first_rps: Option<u64>,
        batch_size: usize,
    ) -> Result<Self, NfseError> {
        if batch_size == 0 {
            return Err(NfseError::Numbering("batch size must be at least 1".into()));
        }
        Ok(Self {
            profile,
            sequence: RpsSequence::from_declared(first_rps),
            batch_size,
            service_municipio: DEFAULT_SERVICE_MUNICIPIO.to_string(),
            contact_email: None,
        })
    }

    pub fn with_service_municipio(mut self, code: impl Into<String>) -> Self {
        self.service_municipio = code.into();
        self
    }

    pub fn with_contact_email(mut self, email: Option<String>) -> Self {
        self.contact_email = email;
        self
    }

    pub fn profile(&self) -> &CategoryProfile {
        &self.profile
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number the next row will receive.
    pub fn peek(&self) -> u64 {
        self.sequence.peek()
    }

    /// Build the RPS for one row.
    ///
    /// # Errors
    ///
    /// [`NfseError::InvalidRow`] when the row has no service amount (the RPS
    /// number is consumed anyway), [`NfseError::Numbering`] when the
    /// sequence is exhausted.
    pub fn document(
        &mut self,
        row: &InputRow,
        issued_at: NaiveDateTime,
    ) -> Result<RpsDocument, NfseError> {
        let numero = self.sequence.next_number()?;
        let valor = row.valor.ok_or_else(|| NfseError::InvalidRow {
            row: row.row_index + 1,
            reason: "missing or unparseable 'valor'".into(),
        })?;

        Ok(RpsDocument {
            identificacao: RpsIdentificacao {
                numero,
                serie: "1".into(),
                tipo: 1,
            },
            data_emissao: issued_at,
            natureza_operacao: 1,
            optante_simples_nacional: 1,
            incentivador_cultural: 2,
            status: 1,
            servico: Servico {
                valores: Valores {
                    valor_servicos: valor,
                    base_calculo: valor,
                    aliquota: self.profile.aliquota,
                    valor_liquido_nfse: valor,
                    iss_retido: 2,
                },
                item_lista_servico: self.profile.item_lista_servico.clone(),
                codigo_cnae: self.profile.codigo_cnae.clone(),
                codigo_tributacao_municipio: self.profile.codigo_tributacao_municipio.clone(),
                discriminacao: row.descricao.clone(),
                codigo_municipio: self.service_municipio.clone(),
            },
            prestador: self.profile.prestador.clone(),
            tomador: Tomador {
                identificacao: TomadorId::classify(&row.cnpj),
                razao_social: row.razao.clone(),
                endereco: Endereco {
                    endereco: row.logradouro.clone(),
                    numero: row.numero.clone(),
                    bairro: row.bairro.clone(),
                    codigo_municipio: row.municipio.clone(),
                    uf: row.uf.clone(),
                    cep: row.cep.clone(),
                },
                email: self.contact_email.clone(),
            },
        })
    }

    /// Wrap documents into a batch numbered after the last RPS.
    pub fn lote(&self, documents: Vec<RpsDocument>, date: NaiveDate) -> Result<LoteRps, NfseError> {
        let last = documents
            .last()
            .ok_or_else(|| NfseError::Numbering("cannot build an empty batch".into()))?;
        let numero = numero_lote(date, last.numero())?;
        let mut lote = LoteRps::new(numero, self.profile.prestador.clone(), self.batch_size)?;
        for doc in documents {
            lote.push(doc)?;
        }
        Ok(lote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(index: usize, cnpj: &str, valor: Option<rust_decimal::Decimal>) -> InputRow {
        InputRow {
            row_index: index,
            rps: None,
            cnpj: cnpj.into(),
            razao: "ACME".into(),
            logradouro: "Rua A".into(),
            numero: "1".into(),
            bairro: "Centro".into(),
            cep: "80000000".into(),
            uf: "PR".into(),
            municipio: "4106902".into(),
            valor,
            descricao: "Servico".into(),
        }
    }

    fn issued() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn profile(name: &str) -> CategoryProfile {
        CategoryProfile::new(name, "11222333000181", "0101")
    }

    #[test]
    fn numbers_increase_from_declared_start() {
        let mut g = DocumentGenerator::new(profile("simply"), Some(41), 1).unwrap();
        let a = g.document(&row(0, "1", Some(dec!(10))), issued()).unwrap();
        let b = g.document(&row(1, "1", Some(dec!(20))), issued()).unwrap();
        assert_eq!((a.numero(), b.numero()), (41, 42));
        assert_eq!(g.peek(), 43);
    }

    #[test]
    fn missing_declared_number_starts_at_one() {
        let mut g = DocumentGenerator::new(profile("dm"), None, 1).unwrap();
        assert_eq!(g.document(&row(0, "1", Some(dec!(1))), issued()).unwrap().numero(), 1);
    }

    #[test]
    fn declared_zero_is_kept() {
        let mut g = DocumentGenerator::new(profile("dm"), Some(0), 1).unwrap();
        assert_eq!(g.document(&row(0, "1", Some(dec!(1))), issued()).unwrap().numero(), 0);
        assert_eq!(g.peek(), 1);
    }

    #[test]
    fn rate_and_cnae_follow_the_sheet() {
        let mut g = DocumentGenerator::new(profile("dm"), None, 1).unwrap();
        let doc = g.document(&row(0, "1", Some(dec!(1))), issued()).unwrap();
        assert_eq!(doc.servico.valores.aliquota, dec!(0.0414));
        assert_eq!(doc.servico.codigo_cnae, "0");

        let mut g = DocumentGenerator::new(profile("consultoria"), None, 1).unwrap();
        let doc = g.document(&row(0, "1", Some(dec!(1))), issued()).unwrap();
        assert_eq!(doc.servico.valores.aliquota, dec!(0.05));
        assert_eq!(doc.servico.codigo_cnae, "8219999");
        assert_eq!(doc.servico.codigo_tributacao_municipio, None);
    }

    #[test]
    fn municipal_tax_code_comes_from_the_profile() {
        let profile = profile("simply").codigo_tributacao_municipio("170100101");
        let mut g = DocumentGenerator::new(profile, None, 1).unwrap();
        let doc = g.document(&row(0, "1", Some(dec!(1))), issued()).unwrap();
        assert_eq!(doc.servico.codigo_tributacao_municipio.as_deref(), Some("170100101"));

        let lote = g.lote(vec![doc], issued().date()).unwrap();
        let xml = lote.to_envelope().unwrap();
        assert!(xml.contains("<CodigoTributacaoMunicipio>170100101</CodigoTributacaoMunicipio>"));
    }

    #[test]
    fn amount_fills_every_value_field() {
        let mut g = DocumentGenerator::new(profile("simply"), None, 1).unwrap();
        let doc = g.document(&row(0, "12345678909", Some(dec!(1500.50))), issued()).unwrap();
        let v = &doc.servico.valores;
        assert_eq!(v.valor_servicos, dec!(1500.50));
        assert_eq!(v.base_calculo, dec!(1500.50));
        assert_eq!(v.valor_liquido_nfse, dec!(1500.50));
        assert_eq!(doc.tomador.identificacao, TomadorId::Cpf("12345678909".into()));
        assert_eq!(doc.servico.codigo_municipio, "4106902");
    }

    #[test]
    fn missing_amount_consumes_a_number() {
        let mut g = DocumentGenerator::new(profile("simply"), Some(5), 1).unwrap();
        let err = g.document(&row(2, "1", None), issued()).unwrap_err();
        assert!(matches!(err, NfseError::InvalidRow { row: 3, .. }));
        assert_eq!(g.peek(), 6);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(DocumentGenerator::new(profile("simply"), None, 0).is_err());
    }

    #[test]
    fn lote_is_numbered_after_the_last_rps() {
        let mut g = DocumentGenerator::new(profile("simply"), Some(9), 2).unwrap();
        let docs = vec![
            g.document(&row(0, "1", Some(dec!(1))), issued()).unwrap(),
            g.document(&row(1, "1", Some(dec!(2))), issued()).unwrap(),
        ];
        let lote = g.lote(docs, issued().date()).unwrap();
        assert_eq!(lote.numero(), 2024013110);
        assert_eq!(lote.quantidade(), 2);
        assert!(g.lote(Vec::new(), issued().date()).is_err());
    }
}
