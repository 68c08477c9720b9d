//! Municipality resolution on real `.xlsx` files.

#![cfg(feature = "xlsx")]

use nfse_lote::core::NfseError;
use nfse_lote::municipio::{ReferenceTable, resolve_file};
use nfse_lote::workbook::{Cell, Sheet, Workbook};
use std::path::PathBuf;

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("nfse-resolver-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.0).ok();
    }
}

fn reference_workbook() -> Workbook {
    let mut sheet = Sheet::new(
        "relatorio",
        vec!["UF".into(), "Cidade".into(), "Código Município".into()],
    );
    for (uf, city, code) in [
        (41.0, "Curitiba", 4106902.0),
        (41.0, "São José dos Pinhais", 4125506.0),
        (35.0, "São Paulo", 3550308.0),
    ] {
        sheet.push_row(vec![Cell::Number(uf), Cell::from(city), Cell::Number(code)]);
    }
    Workbook::new(vec![sheet])
}

fn upload_sheet(name: &str, cities: &[&str]) -> Sheet {
    let mut sheet = Sheet::new(
        name,
        ["rps", "CNPJ_tomador", "razao", "Cidade/UF", "valor"]
            .map(String::from)
            .to_vec(),
    );
    for (i, city) in cities.iter().enumerate() {
        sheet.push_row(vec![
            Cell::Number(i as f64 + 1.0),
            Cell::from("12345678909"),
            Cell::from("Cliente"),
            Cell::from(*city),
            Cell::Number(100.0),
        ]);
    }
    sheet
}

#[test]
fn fills_codes_and_rewrites_every_sheet() {
    let dir = TempDir::new();
    let reference = dir.path("relatorio_municipio.xlsx");
    let upload = dir.path("notas.xlsx");
    reference_workbook().save(&reference).unwrap();
    Workbook::new(vec![
        upload_sheet("simply", &["curitiba/PR", "SAO JOSE DOS PINHAIS/pr"]),
        upload_sheet("dm", &["São Paulo/SP"]),
    ])
    .save(&upload)
    .unwrap();

    let resolved = resolve_file(&upload, &reference).unwrap();
    assert_eq!(resolved.sheet_names(), vec!["simply", "dm"]);

    let reread = Workbook::open(&upload).unwrap();
    assert_eq!(reread.sheet_names(), vec!["simply", "dm"]);
    let simply = reread.sheet("simply").unwrap();
    assert_eq!(
        simply.columns(),
        ["rps", "cnpj", "razao", "valor", "uf", "municipio"].map(String::from).as_slice()
    );
    assert_eq!(simply.text(0, "municipio"), "4106902");
    assert_eq!(simply.text(1, "municipio"), "4125506");
    assert_eq!(simply.text(1, "uf"), "PR");
    assert_eq!(reread.sheet("dm").unwrap().text(0, "municipio"), "3550308");

    let rows = simply.input_rows();
    assert_eq!(rows[0].rps, Some(1));
    assert_eq!(rows[1].cnpj, "12345678909");
}

#[test]
fn unmatched_row_leaves_the_file_untouched() {
    let dir = TempDir::new();
    let reference = dir.path("ref.xlsx");
    let upload = dir.path("notas.xlsx");
    reference_workbook().save(&reference).unwrap();
    Workbook::new(vec![upload_sheet("simply", &["Curitiba/PR", "Atlantis/PR"])])
        .save(&upload)
        .unwrap();
    let before = std::fs::read(&upload).unwrap();

    let err = resolve_file(&upload, &reference).unwrap_err();
    match err {
        NfseError::UnresolvedRows { sheet, rows } => {
            assert_eq!(sheet, "simply");
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].row, 2);
            assert_eq!(rows[0].value, "Atlantis/PR");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read(&upload).unwrap(), before);
}

#[test]
fn reference_table_loads_from_file() {
    let dir = TempDir::new();
    let reference = dir.path("ref.xlsx");
    reference_workbook().save(&reference).unwrap();
    let table = ReferenceTable::load(&reference).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.lookup("sao jose dos pinhais/pr"), Some("4125506"));
}

#[test]
fn missing_file_is_a_workbook_error() {
    let dir = TempDir::new();
    assert!(matches!(
        Workbook::open(dir.path("absent.xlsx")),
        Err(NfseError::Workbook(_))
    ));
}
