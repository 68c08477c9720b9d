//! Municipality code resolution against the IBGE territorial table.
//!
//! Every uploaded row carries a `cidade/uf` composite such as
//! `"Curitiba/PR"`. The resolver normalizes it into a lookup key, finds the
//! IBGE code in the [`ReferenceTable`] and writes it to the `municipio`
//! column. A single unmatched row fails the whole upload.

mod reference;
mod resolver;

pub use reference::{ReferenceTable, municipality_key};
pub use resolver::{CITY_UF_COLUMN, MUNICIPIO_COLUMN, UF_COLUMN, resolve_sheet, resolve_workbook};

#[cfg(feature = "xlsx")]
pub use resolver::resolve_file;
