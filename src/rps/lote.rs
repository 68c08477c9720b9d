use crate::core::{NfseError, Prestador};

use super::NFSE_NS;
use super::document::RpsDocument;
use super::xml::{XmlWriter, format_aliquota};

const DATA_EMISSAO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const ZERO: &str = "0";

/// A batch of RPS documents under one `NumeroLote`.
///
/// The declared quantity is fixed at construction; the envelope can only be
/// rendered once exactly that many documents were pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoteRps {
    numero: u64,
    prestador: Prestador,
    quantidade: usize,
    documents: Vec<RpsDocument>,
}

impl LoteRps {
    pub fn new(numero: u64, prestador: Prestador, batch_size: usize) -> Result<Self, NfseError> {
        if batch_size == 0 {
            return Err(NfseError::Numbering("batch size must be at least 1".into()));
        }
        Ok(Self {
            numero,
            prestador,
            quantidade: batch_size,
            documents: Vec::with_capacity(batch_size),
        })
    }

    /// Add a document. Fails once the batch is full.
    pub fn push(&mut self, document: RpsDocument) -> Result<(), NfseError> {
        if self.documents.len() >= self.quantidade {
            return Err(NfseError::Numbering(format!(
                "batch {} already holds {} RPS",
                self.numero, self.quantidade
            )));
        }
        self.documents.push(document);
        Ok(())
    }

    pub fn numero(&self) -> u64 {
        self.numero
    }

    /// Declared `QuantidadeRps`.
    pub fn quantidade(&self) -> usize {
        self.quantidade
    }

    pub fn prestador(&self) -> &Prestador {
        &self.prestador
    }

    pub fn documents(&self) -> &[RpsDocument] {
        &self.documents
    }

    /// Render the `RecepcionarLoteRps` SOAP envelope.
    pub fn to_envelope(&self) -> Result<String, NfseError> {
        if self.documents.len() != self.quantidade {
            return Err(NfseError::Numbering(format!(
                "batch {} declares {} RPS but holds {}",
                self.numero,
                self.quantidade,
                self.documents.len()
            )));
        }

        let mut w = XmlWriter::new()?;
        w.start_soap_body("RecepcionarLoteRps", NFSE_NS)?;
        w.start_element("EnviarLoteRpsEnvio")?;
        w.start_element("LoteRps")?;
        w.text_element("NumeroLote", &self.numero.to_string())?;
        w.text_element("Cnpj", &self.prestador.cnpj)?;
        w.text_element("InscricaoMunicipal", &self.prestador.inscricao_municipal)?;
        w.text_element("QuantidadeRps", &self.quantidade.to_string())?;
        w.start_element("ListaRps")?;
        for doc in &self.documents {
            w.start_element("Rps")?;
            write_inf_rps(&mut w, doc)?;
            w.end_element("Rps")?;
        }
        w.end_element("ListaRps")?;
        w.end_element("LoteRps")?;
        w.end_element("EnviarLoteRpsEnvio")?;
        w.end_soap_body("RecepcionarLoteRps")?;
        w.into_string()
    }
}

fn write_inf_rps(w: &mut XmlWriter, doc: &RpsDocument) -> Result<(), NfseError> {
    w.start_element("InfRps")?;

    w.start_element("IdentificacaoRps")?;
    w.text_element("Numero", &doc.identificacao.numero.to_string())?;
    w.text_element("Serie", &doc.identificacao.serie)?;
    w.text_element("Tipo", &doc.identificacao.tipo.to_string())?;
    w.end_element("IdentificacaoRps")?;

    w.text_element(
        "DataEmissao",
        &doc.data_emissao.format(DATA_EMISSAO_FORMAT).to_string(),
    )?;
    w.text_element("NaturezaOperacao", &doc.natureza_operacao.to_string())?;
    w.text_element(
        "OptanteSimplesNacional",
        &doc.optante_simples_nacional.to_string(),
    )?;
    w.text_element("IncentivadorCultural", &doc.incentivador_cultural.to_string())?;
    w.text_element("Status", &doc.status.to_string())?;

    let servico = &doc.servico;
    let v = &servico.valores;
    w.start_element("Servico")?;
    w.start_element("Valores")?;
    w.amount_element("ValorServicos", v.valor_servicos)?;
    for zero in [
        "ValorDeducoes",
        "ValorPis",
        "ValorCofins",
        "ValorInss",
        "ValorIr",
        "ValorCsll",
    ] {
        w.text_element(zero, ZERO)?;
    }
    w.text_element("IssRetido", &v.iss_retido.to_string())?;
    w.text_element("ValorIss", ZERO)?;
    w.text_element("ValorIssRetido", ZERO)?;
    w.text_element("OutrasRetencoes", ZERO)?;
    w.amount_element("BaseCalculo", v.base_calculo)?;
    w.text_element("Aliquota", &format_aliquota(v.aliquota))?;
    w.amount_element("ValorLiquidoNfse", v.valor_liquido_nfse)?;
    w.text_element("DescontoIncondicionado", ZERO)?;
    w.text_element("DescontoCondicionado", ZERO)?;
    w.end_element("Valores")?;
    w.text_element("ItemListaServico", &servico.item_lista_servico)?;
    w.text_element("CodigoCnae", &servico.codigo_cnae)?;
    w.optional_element(
        "CodigoTributacaoMunicipio",
        servico.codigo_tributacao_municipio.as_deref(),
    )?;
    w.text_element("Discriminacao", &servico.discriminacao)?;
    w.text_element("CodigoMunicipio", &servico.codigo_municipio)?;
    w.end_element("Servico")?;

    w.start_element("Prestador")?;
    w.text_element("Cnpj", &doc.prestador.cnpj)?;
    w.text_element("InscricaoMunicipal", &doc.prestador.inscricao_municipal)?;
    w.end_element("Prestador")?;

    let tomador = &doc.tomador;
    w.start_element("Tomador")?;
    w.start_element("IdentificacaoTomador")?;
    w.start_element("CpfCnpj")?;
    w.text_element(tomador.identificacao.tag(), tomador.identificacao.digits())?;
    w.end_element("CpfCnpj")?;
    w.end_element("IdentificacaoTomador")?;
    w.text_element("RazaoSocial", &tomador.razao_social)?;
    let e = &tomador.endereco;
    w.start_element("Endereco")?;
    w.text_element("Endereco", &e.endereco)?;
    w.text_element("Numero", &e.numero)?;
    w.text_element("Bairro", &e.bairro)?;
    w.text_element("CodigoMunicipio", &e.codigo_municipio)?;
    w.text_element("Uf", &e.uf)?;
    w.text_element("Cep", &e.cep)?;
    w.end_element("Endereco")?;
    if let Some(email) = &tomador.email {
        w.start_element("Contato")?;
        w.text_element("Email", email)?;
        w.end_element("Contato")?;
    }
    w.end_element("Tomador")?;

    w.end_element("InfRps")?;
    Ok(())
}

/// `ConsultarLoteRps` request for one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultaLote {
    pub prestador: Prestador,
    pub protocolo: String,
}

impl ConsultaLote {
    pub fn new(prestador: Prestador, protocolo: impl Into<String>) -> Self {
        Self {
            prestador,
            protocolo: protocolo.into(),
        }
    }

    pub fn to_envelope(&self) -> Result<String, NfseError> {
        let mut w = XmlWriter::new()?;
        w.start_soap_body("ConsultarLoteRps", NFSE_NS)?;
        w.start_element("ConsultarLoteRpsEnvio")?;
        w.start_element("Prestador")?;
        w.text_element("Cnpj", &self.prestador.cnpj)?;
        w.text_element("InscricaoMunicipal", &self.prestador.inscricao_municipal)?;
        w.end_element("Prestador")?;
        w.text_element("Protocolo", &self.protocolo)?;
        w.end_element("ConsultarLoteRpsEnvio")?;
        w.end_soap_body("ConsultarLoteRps")?;
        w.into_string()
    }
}
