use nfse_lote::rps::{parse_lote_response, parse_verification_response};

const SOAP: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const NFSE: &str = "https://www.e-governeapps2.com.br/";

fn main() {
    let accepted = format!(
        r#"<soap:Envelope xmlns:soap="{SOAP}"><soap:Body>
        <RecepcionarLoteRpsResponse xmlns="{NFSE}"><RecepcionarLoteRpsResult>
        <NumeroLote>2024061542</NumeroLote><DataRecebimento>2024-06-15T10:00:02</DataRecebimento>
        <Protocolo>8d1f6c</Protocolo>
        </RecepcionarLoteRpsResult></RecepcionarLoteRpsResponse></soap:Body></soap:Envelope>"#
    );
    let rejected = format!(
        r#"<soap:Envelope xmlns:soap="{SOAP}"><soap:Body>
        <RecepcionarLoteRpsResponse xmlns="{NFSE}"><RecepcionarLoteRpsResult>
        &lt;ListaMensagemRetorno&gt;&lt;MensagemRetorno&gt;&lt;Codigo&gt;E160&lt;/Codigo&gt;
        &lt;Mensagem&gt;CNPJ do tomador inválido&lt;/Mensagem&gt;
        &lt;Correcao&gt;Informe um CNPJ válido&lt;/Correcao&gt;&lt;/MensagemRetorno&gt;&lt;/ListaMensagemRetorno&gt;
        </RecepcionarLoteRpsResult></RecepcionarLoteRpsResponse></soap:Body></soap:Envelope>"#
    );
    let fault = format!(
        r#"<soap:Envelope xmlns:soap="{SOAP}"><soap:Body><soap:Fault>
        <faultcode>soap:Server</faultcode><faultstring>Server was unable to process request.</faultstring>
        </soap:Fault></soap:Body></soap:Envelope>"#
    );

    for (name, body) in [("accepted", &accepted), ("rejected", &rejected), ("fault", &fault)] {
        match parse_lote_response(body) {
            Ok(r) if r.is_accepted() => {
                println!("{name}: protocolo {}", r.protocolo.unwrap_or_default())
            }
            Ok(r) => {
                println!("{name}: not accepted");
                for m in &r.mensagens {
                    println!("  {m}");
                }
            }
            Err(e) => println!("{name}: {e}"),
        }
    }

    let lista_nfse = format!(r#"<r xmlns="{NFSE}"><ListaNfse><CompNfse/></ListaNfse></r>"#);
    let em_processamento = format!(r#"<r xmlns="{NFSE}"><Situacao>2</Situacao></r>"#);
    for body in [lista_nfse.as_str(), &rejected, &em_processamento, "not xml"] {
        println!("{}", parse_verification_response(body));
    }
}
