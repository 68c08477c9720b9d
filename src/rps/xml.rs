use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use crate::core::NfseError;

use super::{SOAP_ENV_NS, XSD_NS, XSI_NS};

fn xml_io(e: std::io::Error) -> NfseError {
    NfseError::Xml(format!("write error: {e}"))
}

/// Indented XML writer. Text and attribute values are escaped once, here.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, NfseError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, NfseError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| NfseError::Xml(format!("UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, NfseError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, NfseError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, NfseError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, NfseError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write `name` only when a value is present.
    pub fn optional_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, NfseError> {
        match text {
            Some(text) => self.text_element(name, text),
            None => Ok(self),
        }
    }

    pub fn amount_element(&mut self, name: &str, amount: Decimal) -> Result<&mut Self, NfseError> {
        self.text_element(name, &format_decimal(amount))
    }

    /// Open `soap:Envelope` / `soap:Body` and the operation element.
    pub fn start_soap_body(&mut self, operation: &str, ns: &str) -> Result<&mut Self, NfseError> {
        self.start_element_with_attrs(
            "soap:Envelope",
            &[
                ("xmlns:xsi", XSI_NS),
                ("xmlns:xsd", XSD_NS),
                ("xmlns:soap", SOAP_ENV_NS),
            ],
        )?;
        self.start_element("soap:Body")?;
        self.start_element_with_attrs(operation, &[("xmlns", ns)])
    }

    pub fn end_soap_body(&mut self, operation: &str) -> Result<&mut Self, NfseError> {
        self.end_element(operation)?;
        self.end_element("soap:Body")?;
        self.end_element("soap:Envelope")
    }
}

/// Monetary amount with at least two decimal places.
pub fn format_decimal(d: Decimal) -> String {
    let s = d.normalize().to_string();
    if let Some(dot_pos) = s.find('.') {
        let decimals = s.len() - dot_pos - 1;
        if decimals < 2 {
            format!("{s}{}", "0".repeat(2 - decimals))
        } else {
            s
        }
    } else {
        format!("{s}.00")
    }
}

/// Tax rate as a plain fraction, trailing zeros stripped (`0.0253`, `0.05`).
pub fn format_aliquota(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_decimal_cases() {
        assert_eq!(format_decimal(dec!(100)), "100.00");
        assert_eq!(format_decimal(dec!(1500.0)), "1500.00");
        assert_eq!(format_decimal(dec!(49.90)), "49.90");
        assert_eq!(format_decimal(dec!(0.005)), "0.005");
        assert_eq!(format_decimal(dec!(0)), "0.00");
    }

    #[test]
    fn format_aliquota_cases() {
        assert_eq!(format_aliquota(dec!(0.0253)), "0.0253");
        assert_eq!(format_aliquota(dec!(0.0500)), "0.05");
    }

    #[test]
    fn text_is_escaped_once() {
        let mut w = XmlWriter::new().unwrap();
        w.text_element("RazaoSocial", "A & B <Ltda>").unwrap();
        let xml = w.into_string().unwrap();
        assert!(xml.contains("<RazaoSocial>A &amp; B &lt;Ltda&gt;</RazaoSocial>"));
        assert!(!xml.contains("&amp;amp;"));
    }

    #[test]
    fn optional_element_is_skipped_when_absent() {
        let mut w = XmlWriter::new().unwrap();
        w.start_element("Servico").unwrap();
        w.optional_element("CodigoTributacaoMunicipio", None).unwrap();
        w.optional_element("CodigoCnae", Some("0")).unwrap();
        w.end_element("Servico").unwrap();
        let xml = w.into_string().unwrap();
        assert!(!xml.contains("CodigoTributacaoMunicipio"));
        assert!(xml.contains("<CodigoCnae>0</CodigoCnae>"));
    }
}
