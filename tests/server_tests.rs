//! HTTP surface driven through the router: upload, status and export.

#![cfg(feature = "server")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use nfse_lote::core::{CategoryProfile, Settings};
use nfse_lote::server::{AppState, router};
use nfse_lote::session::SessionId;
use nfse_lote::webservice::{SoapAction, Transport, TransportError};
use nfse_lote::workbook::{Cell, Sheet, Workbook};

const NS: &str = "https://www.e-governeapps2.com.br/";
const BOUNDARY: &str = "nfse-lote-boundary";

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("nfse-server-{}", uuid::Uuid::new_v4()));
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

/// Accepts every batch with the next scripted protocol; every lookup finds NFS-e.
struct FakeService {
    protocols: Mutex<VecDeque<String>>,
}

impl FakeService {
    fn new(protocols: &[&str]) -> Self {
        Self {
            protocols: Mutex::new(protocols.iter().map(|p| p.to_string()).collect()),
        }
    }
}

impl Transport for FakeService {
    fn post(&self, action: SoapAction, _envelope: &str) -> Result<String, TransportError> {
        match action {
            SoapAction::RecepcionarLoteRps => {
                let protocolo = self
                    .protocols
                    .lock()
                    .pop_front()
                    .ok_or_else(|| TransportError::Network("no protocol scripted".into()))?;
                Ok(format!(
                    r#"<r xmlns="{NS}"><NumeroLote>1</NumeroLote><Protocolo>{protocolo}</Protocolo></r>"#
                ))
            }
            SoapAction::ConsultarLoteRps => {
                Ok(format!(r#"<r xmlns="{NS}"><ListaNfse><CompNfse/></ListaNfse></r>"#))
            }
        }
    }
}

fn reference_workbook() -> Workbook {
    let mut sheet = Sheet::new(
        "relatorio",
        vec!["UF".into(), "Cidade".into(), "Código Município".into()],
    );
    sheet.push_row(vec![
        Cell::Number(41.0),
        Cell::from("Curitiba"),
        Cell::Number(4106902.0),
    ]);
    Workbook::new(vec![sheet])
}

fn upload_bytes(razao: &str, cidade_uf: &str) -> Vec<u8> {
    let mut sheet = Sheet::new(
        "simply",
        ["rps", "cnpj", "razao", "cidade/uf", "valor", "descricao"]
            .map(String::from)
            .to_vec(),
    );
    sheet.push_row(vec![
        Cell::Number(7.0),
        Cell::from("12345678909"),
        Cell::from(razao),
        Cell::from(cidade_uf),
        Cell::Number(250.0),
        Cell::from("Consultoria"),
    ]);
    Workbook::new(vec![sheet]).to_xlsx_bytes().unwrap()
}

fn app(dir: &TempDir, service: FakeService) -> axum::Router {
    let reference = dir.path("relatorio_municipio.xlsx");
    reference_workbook().save(&reference).unwrap();
    let mut settings = Settings::default()
        .with_profile(CategoryProfile::new("simply", "11222333000181", "0101"));
    settings.upload_dir = dir.path("uploads");
    settings.reference_path = reference;
    router(AppState::new(settings, Arc::new(service)))
}

fn upload_request(session: SessionId, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("/upload?session={session}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: String) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_then_status_then_export() {
    let dir = TempDir::new();
    let app = app(&dir, FakeService::new(&["P-7"]));
    let session = SessionId::new();

    let response = app
        .clone()
        .oneshot(upload_request(session, "notas.xlsx", &upload_bytes("ACME", "curitiba/PR")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["session"], session.to_string());
    assert_eq!(body["outcomes"][0]["protocolo"], "P-7");
    assert_eq!(body["outcomes"][0]["status"], "Sucesso");

    let response = app
        .clone()
        .oneshot(get(format!("/status_data?session={session}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rows = json(response).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["status_verificacao"], "Sucesso: NFS-e encontradas");

    let response = app
        .clone()
        .oneshot(get(format!("/export?session={session}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notas_processada.xlsx\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let exported_path = dir.path("exported.xlsx");
    std::fs::write(&exported_path, &bytes).unwrap();

    let exported = Workbook::open(&exported_path).unwrap();
    let sheet = exported.sheet("simply").unwrap();
    assert_eq!(sheet.columns().len(), 16);
    assert_eq!(sheet.len(), 1);
    assert_eq!(sheet.text(0, "razao"), "ACME");
    assert_eq!(sheet.text(0, "municipio"), "4106902");
    assert_eq!(sheet.text(0, "Protocolo"), "P-7");
    assert_eq!(sheet.text(0, "Status Verificação"), "Sucesso: NFS-e encontradas");
}

#[tokio::test]
async fn failed_reupload_clears_the_session() {
    let dir = TempDir::new();
    let app = app(&dir, FakeService::new(&["OLD-P"]));
    let session = SessionId::new();

    let response = app
        .clone()
        .oneshot(upload_request(session, "notas.xlsx", &upload_bytes("OLD CLIENT", "Curitiba/PR")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored = dir.path("uploads").join(format!("{session}_notas.xlsx"));
    let first_upload = std::fs::read(&stored).unwrap();

    let response = app
        .clone()
        .oneshot(upload_request(session, "notas.xlsx", &upload_bytes("NEW CLIENT", "Atlantis/PR")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "INVALID_WORKBOOK");

    let response = app
        .clone()
        .oneshot(get(format!("/status_data?session={session}")))
        .await
        .unwrap();
    assert_eq!(json(response).await, Value::Array(Vec::new()));

    let response = app
        .clone()
        .oneshot(get(format!("/export?session={session}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "NO_UPLOAD");

    // The rejected file never replaces the stored one and leaves nothing staged.
    assert_eq!(std::fs::read(&stored).unwrap(), first_upload);
    let names: Vec<String> = std::fs::read_dir(dir.path("uploads"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{session}_notas.xlsx")]);
}

#[tokio::test]
async fn reupload_replaces_previous_outcomes() {
    let dir = TempDir::new();
    let app = app(&dir, FakeService::new(&["P-1", "P-2"]));
    let session = SessionId::new();

    for razao in ["Primeiro", "Segundo"] {
        let response = app
            .clone()
            .oneshot(upload_request(session, "notas.xlsx", &upload_bytes(razao, "Curitiba/PR")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get(format!("/status_data?session={session}")))
        .await
        .unwrap();
    let rows = json(response).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["protocolo"], "P-2");
    assert_eq!(rows[0]["razao_social"], "Segundo");
}

#[tokio::test]
async fn export_without_session_is_rejected() {
    let dir = TempDir::new();
    let app = app(&dir, FakeService::new(&[]));

    let response = app.clone().oneshot(get("/export".into())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "NO_UPLOAD");

    let response = app
        .oneshot(get(format!("/export?session={}", SessionId::new())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_xlsx_upload_is_rejected() {
    let dir = TempDir::new();
    let app = app(&dir, FakeService::new(&[]));

    let response = app
        .oneshot(upload_request(SessionId::new(), "notas.csv", b"a;b"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "UPLOAD_REJECTED");
}
