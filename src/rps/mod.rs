//! RPS documents, batch envelopes and service responses.
//!
//! Implements the wire format of the Curitiba ISS web service
//! (ABRASF-style `RecepcionarLoteRps` / `ConsultarLoteRps` over SOAP 1.1).
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use nfse_lote::core::{CategoryProfile, InputRow};
//! use nfse_lote::rps::DocumentGenerator;
//! use rust_decimal_macros::dec;
//!
//! let profile = CategoryProfile::new("simply", "11222333000181", "0101");
//! let mut generator = DocumentGenerator::new(profile, Some(7), 1).unwrap();
//! let row = InputRow {
//!     row_index: 0,
//!     rps: Some(7),
//!     cnpj: "123.456.789-09".into(),
//!     razao: "Fulano & Cia".into(),
//!     logradouro: "Rua XV".into(),
//!     numero: "100".into(),
//!     bairro: "Centro".into(),
//!     cep: "80020000".into(),
//!     uf: "PR".into(),
//!     municipio: "4106902".into(),
//!     valor: Some(dec!(1500)),
//!     descricao: "Consultoria".into(),
//! };
//! let issued = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(9, 30, 0).unwrap();
//! let doc = generator.document(&row, issued).unwrap();
//! let lote = generator.lote(vec![doc], issued.date()).unwrap();
//!
//! assert_eq!(lote.numero(), 202403057);
//! let xml = lote.to_envelope().unwrap();
//! assert!(xml.contains("<Cpf>12345678909</Cpf>"));
//! assert!(xml.contains("Fulano &amp; Cia"));
//! ```

mod document;
mod generator;
mod lote;
mod response;
mod xml;

pub use document::*;
pub use generator::DocumentGenerator;
pub use lote::{ConsultaLote, LoteRps};
pub use response::*;
pub use xml::{XmlWriter, format_aliquota, format_decimal};

/// Target namespace of the service operations.
pub const NFSE_NS: &str = "https://www.e-governeapps2.com.br/";

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

pub(crate) const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub(crate) const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
