//! # nfse-lote
//!
//! Service-invoice batches for the Curitiba ISS web service, built from
//! spreadsheets: municipality codes are resolved from the IBGE territorial
//! table, every row becomes an RPS, batches are submitted over SOAP and
//! verified, and the outcomes are merged back into the workbook.
//!
//! All monetary values use [`rust_decimal::Decimal`]; XML is written and
//! read with `quick-xml`.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use nfse_lote::core::{CategoryProfile, Settings, SubmissionStatus};
//! use nfse_lote::pipeline::process_workbook_at;
//! use nfse_lote::webservice::{SoapAction, Transport, TransportError};
//! use nfse_lote::workbook::{Cell, Sheet, Workbook};
//!
//! struct Offline;
//!
//! impl Transport for Offline {
//!     fn post(&self, _: SoapAction, _: &str) -> Result<String, TransportError> {
//!         Err(TransportError::Timeout(60))
//!     }
//! }
//!
//! let mut sheet = Sheet::new(
//!     "simply",
//!     ["rps", "cnpj", "razao", "valor", "uf", "municipio"].map(String::from).to_vec(),
//! );
//! sheet.push_row(vec![
//!     Cell::Number(1.0),
//!     Cell::from("11.222.333/0001-81"),
//!     Cell::from("ACME Ltda"),
//!     Cell::from("1.500,00"),
//!     Cell::from("PR"),
//!     Cell::from("4106902"),
//! ]);
//!
//! let settings = Settings::default()
//!     .with_profile(CategoryProfile::new("simply", "44555666000199", "0101"));
//! let issued = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let outcomes = process_workbook_at(&Workbook::new(vec![sheet]), &settings, &Offline, issued).unwrap();
//!
//! assert_eq!(outcomes[0].status, SubmissionStatus::Error);
//! assert!(outcomes[0].retryable);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `xlsx` (default) | Read `.xls`/`.xlsx` (calamine), write `.xlsx` (rust_xlsxwriter) |
//! | `client` (default) | Blocking HTTPS transport (reqwest) |
//! | `server` | axum upload service and the `nfse-lote` binary |
//! | `all` | Everything |

pub mod core;
pub mod municipio;
pub mod pipeline;
pub mod rps;
pub mod session;
pub mod webservice;
pub mod workbook;

#[cfg(feature = "server")]
pub mod server;

pub use crate::core::{NfseError, OutcomeRecord, Settings};
