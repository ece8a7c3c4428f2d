//! Banco do Brasil PIX API client

use crate::config::BbConfig;
use async_trait::async_trait;
use invader_payment::{
    Payable, PaymentError, PaymentResult, PaymentTransaction, PixCollection, ProviderClient,
    StatusUpdate, TransactionState, TransactionStatusProvider,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Provider tag of BB payment modes
pub const PROVIDER: &str = "bacenpix";

const OAUTH_SCOPE: &str = "cob.write cob.read";

/// Shape of a PIX txid accepted by `PUT /cob/{txid}`
pub static TXID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]{26,35}$").unwrap());

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    600
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Collection request body of `PUT /cob/{txid}`
#[derive(Debug, Serialize)]
struct CollectionRequest<'a> {
    calendario: Calendar,
    #[serde(skip_serializing_if = "Option::is_none")]
    devedor: Option<Debtor<'a>>,
    valor: Amount,
    chave: &'a str,
    #[serde(rename = "solicitacaoPagador")]
    payer_request: String,
}

#[derive(Debug, Serialize)]
struct Calendar {
    expiracao: u32,
}

#[derive(Debug, Serialize)]
struct Debtor<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cnpj: Option<String>,
    nome: &'a str,
}

#[derive(Debug, Serialize)]
struct Amount {
    original: String,
}

/// Collection as returned by `PUT` and `GET /cob/{txid}`
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub txid: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub chave: Option<String>,
    #[serde(default)]
    pub calendario: Option<CollectionCalendar>,
    #[serde(rename = "textoImagemQRcode", default)]
    pub qr_code_image_text: Option<String>,
    /// Same payload under the name of the v2 API
    #[serde(rename = "pixCopiaECola", default)]
    pub pix_copy_paste: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionCalendar {
    pub criacao: Option<String>,
    pub expiracao: Option<serde_json::Value>,
}

impl Collection {
    /// QR code payload, whichever key the gateway filled
    pub fn qr_code_text(&self) -> Option<&str> {
        self.pix_copy_paste
            .as_deref()
            .or(self.qr_code_image_text.as_deref())
    }

    pub fn to_pix(&self) -> PixCollection {
        let calendar = self.calendario.as_ref();
        PixCollection {
            created_at: calendar.and_then(|c| c.criacao.clone()),
            expiration: calendar.and_then(|c| match &c.expiracao {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            }),
            location: self.location.clone(),
            qr_code_text: self.qr_code_text().map(str::to_string),
            txid: self.txid.clone(),
            key: self.chave.clone(),
        }
    }
}

/// Map a BB collection status to a transaction state
pub fn collection_state(status: &str) -> TransactionState {
    match status {
        "CONCLUIDA" => TransactionState::Done,
        s if s.starts_with("REMOVIDA") => TransactionState::Cancel,
        _ => TransactionState::Pending,
    }
}

/// BB error bodies come in two shapes depending on the gateway layer
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    violacoes: Vec<Violation>,
    #[serde(default)]
    erros: Vec<LegacyError>,
}

#[derive(Debug, Deserialize)]
struct Violation {
    razao: String,
    #[serde(default)]
    propriedade: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyError {
    mensagem: String,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        if let Some(violation) = self.violacoes.first() {
            return Some(match &violation.propriedade {
                Some(property) => format!("{} ({})", violation.razao, property),
                None => violation.razao.clone(),
            });
        }
        if let Some(error) = self.erros.first() {
            return Some(error.mensagem.clone());
        }
        self.detail.clone().or_else(|| self.title.clone())
    }
}

/// Client of the BB PIX collections API
pub struct BbPixClient {
    client: ProviderClient,
    config: BbConfig,
    token: Mutex<Option<CachedToken>>,
}

impl BbPixClient {
    pub fn new(config: BbConfig) -> PaymentResult<Self> {
        Ok(Self {
            client: ProviderClient::new(&config.base_url, config.timeout())?,
            config,
            token: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &BbConfig {
        &self.config
    }

    /// OAuth2 client-credentials token, cached until shortly before expiry
    async fn access_token(&self) -> PaymentResult<SecretString> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.token.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let response = self
            .client
            .http()
            .post(&self.config.oauth_url)
            .basic_auth(
                self.config.client_id.expose_secret(),
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials"), ("scope", OAUTH_SCOPE)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            invader_log::error!("BB OAuth rejected the credentials"; "status" => status.as_u16());
            return Err(PaymentError::Configuration(format!(
                "BB OAuth failed with status {}",
                status
            )));
        }

        let token: AccessToken = response.json().await?;
        let secret = SecretString::from(token.access_token);
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(30));
        *self.token.lock() = Some(CachedToken {
            token: secret.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(secret)
    }

    fn cob_path(&self, txid: &str) -> String {
        format!(
            "cob/{}?gw-dev-app-key={}",
            txid,
            self.config.developer_application_key.expose_secret()
        )
    }

    /// Create the PIX collection `txid` for `payable`
    pub async fn create_collection(
        &self,
        txid: &str,
        payable: &Payable,
    ) -> PaymentResult<Collection> {
        if !TXID_REGEX.is_match(txid) {
            return Err(PaymentError::Validation(format!("invalid PIX txid {}", txid)));
        }

        let body = CollectionRequest {
            calendario: Calendar {
                expiracao: self.config.expiration_secs,
            },
            devedor: debtor(payable),
            valor: Amount {
                original: payable.amount.to_amount_string(),
            },
            chave: &self.config.pix_key,
            payer_request: format!("Pedido {}", payable.reference),
        };

        let token = self.access_token().await?;
        let response = self
            .client
            .request(reqwest::Method::PUT, &self.cob_path(txid))?
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let collection: Collection = read(response).await?;
        invader_log::info!("BB collection created for {}", payable.reference; "txid" => txid);
        Ok(collection)
    }

    pub async fn get_collection(&self, txid: &str) -> PaymentResult<Collection> {
        let token = self.access_token().await?;
        let response = self
            .client
            .request(reqwest::Method::GET, &self.cob_path(txid))?
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        read(response).await
    }
}

/// Debtor block, sent only when the partner has a CPF or CNPJ
fn debtor(payable: &Payable) -> Option<Debtor<'_>> {
    let digits: String = payable
        .partner
        .vat
        .as_deref()?
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let (cpf, cnpj) = match digits.len() {
        11 => (Some(digits), None),
        14 => (None, Some(digits)),
        _ => return None,
    };
    Some(Debtor {
        cpf,
        cnpj,
        nome: &payable.partner.name,
    })
}

async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> PaymentResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body.message();
    if status.is_client_error() && status.as_u16() != 401 && status.as_u16() != 403 {
        return Err(PaymentError::Acquirer(
            message.unwrap_or_else(|| format!("BB rejected the request ({})", status)),
        ));
    }
    Err(PaymentError::Unhandled(format!(
        "BB answered {}: {}",
        status,
        message.unwrap_or_default()
    )))
}

#[async_trait]
impl TransactionStatusProvider for BbPixClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn check_transaction(
        &self,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<StatusUpdate> {
        let txid = transaction.tx_id.as_deref().ok_or_else(|| {
            PaymentError::NotFound(format!("transaction {} has no txid", transaction.id))
        })?;
        let collection = self.get_collection(txid).await?;
        let status = collection.status.unwrap_or_default();
        Ok(StatusUpdate::new(collection_state(&status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invader_payment::{Money, Partner};

    #[test]
    fn test_txid_shape() {
        assert!(TXID_REGEX.is_match("abcdefghijklmnopqrstuvwxyz"));
        assert!(TXID_REGEX.is_match("7978c0c97ea847e78e8849634473c1f1"));
        assert!(!TXID_REGEX.is_match("short"));
        assert!(!TXID_REGEX.is_match("abcdefghijklmnopqrstuvwxy-z"));
    }

    #[test]
    fn test_collection_state() {
        assert_eq!(collection_state("ATIVA"), TransactionState::Pending);
        assert_eq!(collection_state("CONCLUIDA"), TransactionState::Done);
        assert_eq!(collection_state("REMOVIDA_PELO_PSP"), TransactionState::Cancel);
        assert_eq!(collection_state("REMOVIDA_PELO_USUARIO_RECEBEDOR"), TransactionState::Cancel);
    }

    #[test]
    fn test_debtor_from_vat() {
        let mut payable = Payable::new(1, "SO001", Partner::new(1, "Maria"), Money::brl(100));
        assert!(debtor(&payable).is_none());

        payable.partner.vat = Some("123.456.789-09".into());
        let person = debtor(&payable).unwrap();
        assert_eq!(person.cpf.as_deref(), Some("12345678909"));
        assert!(person.cnpj.is_none());

        payable.partner.vat = Some("12.345.678/0001-95".into());
        assert_eq!(debtor(&payable).unwrap().cnpj.as_deref(), Some("12345678000195"));
    }

    #[test]
    fn test_collection_expiration_number_or_string() {
        let collection: Collection = serde_json::from_value(serde_json::json!({
            "txid": "abc",
            "calendario": {"criacao": "2024-01-01T10:00:00Z", "expiracao": 3600},
            "pixCopiaECola": "000201...",
        }))
        .unwrap();
        let pix = collection.to_pix();
        assert_eq!(pix.expiration.as_deref(), Some("3600"));
        assert_eq!(pix.qr_code_text.as_deref(), Some("000201..."));
    }

    #[test]
    fn test_collection_with_both_qr_code_keys() {
        let collection: Collection = serde_json::from_value(serde_json::json!({
            "txid": "abc",
            "textoImagemQRcode": "000201-legacy",
            "pixCopiaECola": "000201-v2",
        }))
        .unwrap();
        assert_eq!(collection.qr_code_text(), Some("000201-v2"));

        let legacy: Collection =
            serde_json::from_value(serde_json::json!({"textoImagemQRcode": "000201-legacy"})).unwrap();
        assert_eq!(legacy.to_pix().qr_code_text.as_deref(), Some("000201-legacy"));
    }

    #[test]
    fn test_error_messages() {
        let body: ErrorBody = serde_json::from_value(serde_json::json!({
            "title": "Cobrança inválida.",
            "violacoes": [{"razao": "CPF inválido", "propriedade": "cob.devedor.cpf"}],
        }))
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("CPF inválido (cob.devedor.cpf)"));

        let legacy: ErrorBody = serde_json::from_value(serde_json::json!({
            "erros": [{"codigo": "4769515", "mensagem": "Chave não cadastrada"}],
        }))
        .unwrap();
        assert_eq!(legacy.message().as_deref(), Some("Chave não cadastrada"));
    }
}
