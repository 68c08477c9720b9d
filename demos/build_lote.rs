use chrono::NaiveDate;
use nfse_lote::core::{CategoryProfile, InputRow};
use nfse_lote::rps::{ConsultaLote, DocumentGenerator};
use rust_decimal_macros::dec;

fn main() {
    let profile = CategoryProfile::new("simply", "11222333000181", "0101234567")
        .item_lista_servico("1701");
    let mut generator = DocumentGenerator::new(profile, Some(42), 2)
        .expect("valid batch size")
        .with_contact_email(Some("financeiro@example.com".into()));

    let issued_at = NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();

    let rows = [
        row(0, "123.456.789-09", "Maria da Silva", dec!(1500)),
        row(1, "12.345.678/0001-95", "Comércio & Serviços Ltda", dec!(249.9)),
    ];
    let documents: Vec<_> = rows
        .iter()
        .map(|r| generator.document(r, issued_at).expect("row has an amount"))
        .collect();

    let lote = generator
        .lote(documents, issued_at.date())
        .expect("batch fits");
    println!("Lote {} with {} RPS", lote.numero(), lote.quantidade());
    println!("{}", lote.to_envelope().expect("envelope"));

    let consulta = ConsultaLote::new(lote.prestador().clone(), "123456789");
    println!();
    println!("{}", consulta.to_envelope().expect("envelope"));
}

fn row(row_index: usize, cnpj: &str, razao: &str, valor: rust_decimal::Decimal) -> InputRow {
    InputRow {
        row_index,
        rps: None,
        cnpj: cnpj.into(),
        razao: razao.into(),
        logradouro: "Rua XV de Novembro".into(),
        numero: "1000".into(),
        bairro: "Centro".into(),
        cep: "80020-310".into(),
        uf: "PR".into(),
        municipio: "4106902".into(),
        valor: Some(valor),
        descricao: "Consultoria contábil".into(),
    }
}
