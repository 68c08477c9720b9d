//! Runtime settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::NfseError;
use super::types::{CategoryProfile, DEFAULT_ITEM_LISTA_SERVICO};

/// Curitiba ISS web service endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://isscuritiba.curitiba.pr.gov.br/Iss.NfseWebService/nfsews.asmx";

/// IBGE code of the municipality where services are rendered (Curitiba).
pub const DEFAULT_SERVICE_MUNICIPIO: &str = "4106902";

const DEFAULT_CATEGORIES: [&str; 4] = ["categoria_1", "categoria_2", "categoria_3", "categoria_4"];

/// How rows are grouped into batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionMode {
    /// One batch per row, each verified on success.
    #[default]
    PerRow,
    /// One batch holding every row of a sheet.
    PerSheet,
}

/// Settings for processing and submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SOAP endpoint URL.
    pub endpoint: String,
    /// Timeout for each outbound call, in seconds.
    pub timeout_secs: u64,
    /// Directory where uploaded workbooks are stored.
    pub upload_dir: PathBuf,
    /// Reference territorial table (IBGE municipality report).
    pub reference_path: PathBuf,
    /// Category profiles keyed by sheet name.
    pub profiles: BTreeMap<String, CategoryProfile>,
    /// Counterpart contact e-mail written in every RPS, if any.
    pub contact_email: Option<String>,
    /// Municipality where the service is rendered.
    pub service_municipio: String,
    /// Batch grouping.
    pub mode: SubmissionMode,
    /// Directory where generated envelopes are written, if any.
    pub dump_dir: Option<PathBuf>,
    /// Generate envelopes without contacting the service.
    pub dry_run: bool,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            timeout_secs: 60,
            upload_dir: PathBuf::from("uploads"),
            reference_path: PathBuf::from("referencia/relatorio_municipio.xls"),
            profiles: BTreeMap::new(),
            contact_email: None,
            service_municipio: DEFAULT_SERVICE_MUNICIPIO.into(),
            mode: SubmissionMode::PerRow,
            dump_dir: None,
            dry_run: false,
            bind_addr: "127.0.0.1:5000".into(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, NfseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    ///
    /// Categories come from `NFSE_CATEGORIAS` (comma separated, default
    /// `categoria_1..categoria_4`); each needs `CNPJ_<NAME>` and `IM_<NAME>`
    /// and may set `ITEM_LISTA_<NAME>` and `CODIGO_TRIBUTACAO_<NAME>`.
    /// Categories without an issuer are skipped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NfseError> {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get("NFSE_ENDPOINT") {
            settings.endpoint = endpoint;
        }
        if let Some(secs) = get("NFSE_TIMEOUT_SECS") {
            settings.timeout_secs = secs.trim().parse().map_err(|e| {
                NfseError::Config(format!("NFSE_TIMEOUT_SECS must be an integer: {e}"))
            })?;
        }
        if let Some(dir) = get("UPLOAD_FOLDER") {
            settings.upload_dir = dir.into();
        }
        if let Some(path) = get("BANCO_TERRITORIAL") {
            settings.reference_path = path.into();
        }
        settings.contact_email = get("NFSE_CONTACT_EMAIL");
        if let Some(code) = get("NFSE_SERVICE_MUNICIPIO") {
            settings.service_municipio = code;
        }
        if let Some(addr) = get("BIND_ADDR") {
            settings.bind_addr = addr;
        }
        if let Some(mode) = get("NFSE_MODE") {
            settings.mode = match mode.trim() {
                "per-row" => SubmissionMode::PerRow,
                "per-sheet" => SubmissionMode::PerSheet,
                other => {
                    return Err(NfseError::Config(format!(
                        "NFSE_MODE must be 'per-row' or 'per-sheet', got '{other}'"
                    )));
                }
            };
        }

        let categories: Vec<String> = match get("NFSE_CATEGORIAS") {
            Some(list) => list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            None => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        };

        for name in categories {
            let suffix = name.to_uppercase();
            let (Some(cnpj), Some(im)) = (get(&format!("CNPJ_{suffix}")), get(&format!("IM_{suffix}")))
            else {
                tracing::warn!(category = %name, "no issuer CNPJ/IM configured, sheets will be skipped");
                continue;
            };
            let item = get(&format!("ITEM_LISTA_{suffix}"))
                .unwrap_or_else(|| DEFAULT_ITEM_LISTA_SERVICO.to_string());
            let mut profile = CategoryProfile::new(name.clone(), cnpj, im).item_lista_servico(item);
            if let Some(code) = get(&format!("CODIGO_TRIBUTACAO_{suffix}")) {
                profile = profile.codigo_tributacao_municipio(code.trim());
            }
            settings.profiles.insert(name, profile);
        }

        Ok(settings)
    }

    /// Register a category profile.
    pub fn with_profile(mut self, profile: CategoryProfile) -> Self {
        self.profiles.insert(profile.name.clone(), profile);
        self
    }

    pub fn with_mode(mut self, mode: SubmissionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// Outbound call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Profile for a sheet, if the sheet is a known category.
    pub fn profile(&self, sheet: &str) -> Option<&CategoryProfile> {
        self.profiles.get(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let s = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(s.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(s.timeout(), Duration::from_secs(60));
        assert_eq!(s.upload_dir, PathBuf::from("uploads"));
        assert!(s.profiles.is_empty());
        assert_eq!(s.mode, SubmissionMode::PerRow);
    }

    #[test]
    fn default_category_names() {
        let s = Settings::from_lookup(lookup(&[
            ("CNPJ_CATEGORIA_1", "11222333000181"),
            ("IM_CATEGORIA_1", "0101"),
            ("CNPJ_CATEGORIA_3", "44555666000199"),
        ]))
        .unwrap();
        assert_eq!(s.profiles.len(), 1);
        let p = s.profile("categoria_1").unwrap();
        assert_eq!(p.prestador.cnpj, "11222333000181");
        assert_eq!(p.prestador.inscricao_municipal, "0101");
        assert_eq!(p.item_lista_servico, "0000");
        assert!(s.profile("categoria_3").is_none());
    }

    #[test]
    fn named_categories() {
        let s = Settings::from_lookup(lookup(&[
            ("NFSE_CATEGORIAS", "simply, dm ,consultoria"),
            ("CNPJ_SIMPLY", "1"),
            ("IM_SIMPLY", "2"),
            ("ITEM_LISTA_SIMPLY", "1705"),
            ("CODIGO_TRIBUTACAO_SIMPLY", "170500101"),
            ("CNPJ_DM", "3"),
            ("IM_DM", "4"),
            ("CNPJ_CONSULTORIA", "5"),
            ("IM_CONSULTORIA", "6"),
            ("NFSE_TIMEOUT_SECS", "15"),
            ("NFSE_MODE", "per-sheet"),
        ]))
        .unwrap();
        assert_eq!(s.profiles.len(), 3);
        assert_eq!(s.profile("simply").unwrap().aliquota, dec!(0.0253));
        assert_eq!(s.profile("simply").unwrap().item_lista_servico, "1705");
        assert_eq!(
            s.profile("simply").unwrap().codigo_tributacao_municipio.as_deref(),
            Some("170500101")
        );
        assert_eq!(s.profile("dm").unwrap().codigo_tributacao_municipio, None);
        assert_eq!(s.profile("dm").unwrap().aliquota, dec!(0.0414));
        assert_eq!(s.profile("consultoria").unwrap().codigo_cnae, "8219999");
        assert_eq!(s.timeout(), Duration::from_secs(15));
        assert_eq!(s.mode, SubmissionMode::PerSheet);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[("NFSE_TIMEOUT_SECS", "soon")])),
            Err(NfseError::Config(_))
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("NFSE_MODE", "bulk")])),
            Err(NfseError::Config(_))
        ));
    }
}
