//! Parsing of service responses.
//!
//! Responses are read into a small element tree with resolved namespaces.
//! ASMX services often return the actual payload as escaped XML text inside
//! a `*Result` element; such text is parsed as well and grafted under its
//! host element, inheriting the host namespace when it declares none.

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use serde::{Deserialize, Serialize};

use crate::core::NfseError;

use super::{NFSE_NS, SOAP_ENV_NS};

const MAX_NESTING: usize = 4;

#[derive(Debug, Clone)]
struct Node {
    local: String,
    ns: Option<String>,
    parent: Option<usize>,
    text: String,
}

#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<Node>,
}

fn parse_err(e: impl std::fmt::Display) -> NfseError {
    NfseError::Xml(format!("malformed response: {e}"))
}

impl Tree {
    fn parse(xml: &str) -> Result<Self, NfseError> {
        Self::parse_nested(xml, 0)
    }

    fn parse_nested(xml: &str, depth: usize) -> Result<Self, NfseError> {
        let mut tree = Self::parse_flat(xml)?;
        if depth < MAX_NESTING {
            let hosts: Vec<usize> = tree
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.text.trim_start().starts_with('<'))
                .map(|(i, _)| i)
                .collect();
            for host in hosts {
                // Text that merely looks like markup stays text.
                if let Ok(inner) = Self::parse_nested(tree.nodes[host].text.trim(), depth + 1) {
                    tree.graft(host, inner);
                }
            }
        }
        Ok(tree)
    }

    fn parse_flat(xml: &str) -> Result<Self, NfseError> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(parse_err)?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    if stack.is_empty() && !nodes.is_empty() {
                        return Err(parse_err("more than one root element"));
                    }
                    let ns = match resolved {
                        ResolveResult::Bound(Namespace(ns)) => {
                            Some(String::from_utf8_lossy(ns).into_owned())
                        }
                        _ => None,
                    };
                    nodes.push(Node {
                        local: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                        ns,
                        parent: stack.last().copied(),
                        text: String::new(),
                    });
                    if matches!(event, Event::Start(_)) {
                        stack.push(nodes.len() - 1);
                    }
                }
                Event::End(_) => {
                    if stack.pop().is_none() {
                        return Err(parse_err("unmatched end tag"));
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(parse_err)?;
                    append_text(&mut nodes, &stack, &text)?;
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    append_text(&mut nodes, &stack, &text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if nodes.is_empty() {
            return Err(parse_err("no root element"));
        }
        if let Some(&open) = stack.last() {
            return Err(parse_err(format!("element <{}> is not closed", nodes[open].local)));
        }
        Ok(Self { nodes })
    }

    fn graft(&mut self, host: usize, inner: Tree) {
        let offset = self.nodes.len();
        let host_ns = self.nodes[host].ns.clone();
        for mut node in inner.nodes {
            node.parent = Some(node.parent.map_or(host, |p| p + offset));
            if node.ns.is_none() {
                node.ns.clone_from(&host_ns);
            }
            self.nodes.push(node);
        }
    }

    /// Elements with a given local name, in document order.
    fn find<'a>(&'a self, local: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.local == local)
            .map(|(i, _)| i)
    }

    fn contains_in_ns(&self, local: &str, ns: &str) -> bool {
        self.find(local)
            .any(|i| self.nodes[i].ns.as_deref() == Some(ns))
    }

    fn child_text(&self, parent: usize, local: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.parent == Some(parent) && n.local == local)
            .map(|n| n.text.trim())
    }
}

fn append_text(nodes: &mut [Node], stack: &[usize], text: &str) -> Result<(), NfseError> {
    match stack.last() {
        Some(&id) => {
            nodes[id].text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(parse_err("text outside the root element")),
    }
}

/// One `MensagemRetorno` (or SOAP fault) reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MensagemRetorno {
    pub codigo: String,
    pub mensagem: String,
    pub correcao: Option<String>,
}

impl std::fmt::Display for MensagemRetorno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.codigo.is_empty() {
            write!(f, "{}", self.mensagem)?;
        } else {
            write!(f, "{} - {}", self.codigo, self.mensagem)?;
        }
        if let Some(c) = &self.correcao {
            write!(f, " ({c})")?;
        }
        Ok(())
    }
}

/// Parsed `RecepcionarLoteRps` answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoteResponse {
    /// Protocol number; present only when the batch was accepted.
    pub protocolo: Option<String>,
    pub numero_lote: Option<String>,
    pub data_recebimento: Option<String>,
    pub mensagens: Vec<MensagemRetorno>,
}

impl LoteResponse {
    pub fn is_accepted(&self) -> bool {
        self.protocolo.is_some()
    }
}

/// Parse a batch submission response.
///
/// A non-empty `Protocolo` element anywhere in the document (any namespace)
/// marks the batch as accepted.
///
/// # Errors
///
/// [`NfseError::Xml`] when the body is not a well-formed document.
pub fn parse_lote_response(body: &str) -> Result<LoteResponse, NfseError> {
    let tree = Tree::parse(body)?;
    let first_text = |local: &str| {
        tree.find(local)
            .map(|i| tree.nodes[i].text.trim())
            .find(|t| !t.is_empty())
            .map(str::to_string)
    };

    let mut mensagens: Vec<MensagemRetorno> = tree
        .find("MensagemRetorno")
        .map(|i| MensagemRetorno {
            codigo: tree.child_text(i, "Codigo").unwrap_or_default().to_string(),
            mensagem: tree.child_text(i, "Mensagem").unwrap_or_default().to_string(),
            correcao: tree
                .child_text(i, "Correcao")
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
        .collect();

    for fault in tree
        .find("Fault")
        .filter(|&i| tree.nodes[i].ns.as_deref() == Some(SOAP_ENV_NS))
    {
        mensagens.push(MensagemRetorno {
            codigo: tree.child_text(fault, "faultcode").unwrap_or_default().to_string(),
            mensagem: tree.child_text(fault, "faultstring").unwrap_or_default().to_string(),
            correcao: None,
        });
    }

    Ok(LoteResponse {
        protocolo: first_text("Protocolo"),
        numero_lote: first_text("NumeroLote"),
        data_recebimento: first_text("DataRecebimento"),
        mensagens,
    })
}

/// Result of a `ConsultarLoteRps` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// `ListaNfse` present: the invoices were issued.
    NfseFound,
    /// `ListaMensagemRetorno` present and no `ListaNfse`.
    ReturnMessages,
    /// Neither marker present.
    NotFound,
    /// The body is not well-formed XML.
    Unparseable,
    /// The verification call itself failed.
    Unreachable(String),
}

impl VerificationStatus {
    /// Status text reported for the row.
    pub fn label(&self) -> String {
        match self {
            Self::NfseFound => "Sucesso: NFS-e encontradas".into(),
            Self::ReturnMessages => "Erro: Mensagens de retorno encontradas".into(),
            Self::NotFound => "Status não encontrado".into(),
            Self::Unparseable => "Erro ao analisar a resposta".into(),
            Self::Unreachable(e) => format!("Erro ao consultar o lote: {e}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::NfseFound)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Classify a verification response body. Never fails: a malformed body
/// maps to [`VerificationStatus::Unparseable`].
pub fn parse_verification_response(body: &str) -> VerificationStatus {
    let Ok(tree) = Tree::parse(body) else {
        return VerificationStatus::Unparseable;
    };
    if tree.contains_in_ns("ListaNfse", NFSE_NS) {
        VerificationStatus::NfseFound
    } else if tree.contains_in_ns("ListaMensagemRetorno", NFSE_NS) {
        VerificationStatus::ReturnMessages
    } else {
        VerificationStatus::NotFound
    }
}
