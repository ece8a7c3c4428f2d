//! PagSeguro orders and charges API client

use crate::config::PagseguroConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use invader_payment::{
    CardDetails, Payable, PaymentError, PaymentMethod, PaymentResult, PaymentTransaction,
    PixCollection, ProviderClient, StatusUpdate, TransactionState, TransactionStatusProvider,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Provider tag of PagSeguro payment modes
pub const PROVIDER: &str = "pagseguro";

const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Map a PagSeguro charge status to a transaction state
pub fn charge_state(status: &str) -> TransactionState {
    match status {
        "PAID" => TransactionState::Done,
        "AUTHORIZED" => TransactionState::Authorized,
        "DECLINED" => TransactionState::Error,
        "CANCELED" => TransactionState::Cancel,
        // WAITING, IN_ANALYSIS
        _ => TransactionState::Pending,
    }
}

#[derive(Debug, Serialize)]
struct AmountBody {
    value: i64,
    currency: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    pub href: String,
    #[serde(default)]
    pub media: Option<String>,
}

/// Charge as returned by `POST /charges` and `GET /charges/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub payment_response: Option<PaymentResponse>,
    #[serde(default)]
    pub payment_method: Option<Value>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Charge {
    pub fn state(&self) -> TransactionState {
        charge_state(&self.status)
    }

    /// Acquirer message explaining the status, if any
    pub fn message(&self) -> Option<String> {
        self.payment_response
            .as_ref()
            .and_then(|response| response.message.clone())
    }

    /// Boleto data handed to the storefront: barcode, due date and the
    /// printable document links
    pub fn boleto_document(&self) -> Value {
        let boleto = self
            .payment_method
            .as_ref()
            .and_then(|method| method.get("boleto"))
            .cloned()
            .unwrap_or(Value::Null);
        let links: Vec<Value> = self
            .links
            .iter()
            .map(|link| json!({"rel": link.rel, "href": link.href, "media": link.media}))
            .collect();
        json!({
            "id": self.id,
            "status": self.status,
            "boleto": boleto,
            "links": links,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QrCode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderCharge {
    pub id: String,
    pub status: String,
}

/// Order as returned by `POST /orders` and `GET /orders/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub qr_codes: Vec<QrCode>,
    #[serde(default)]
    pub charges: Vec<OrderCharge>,
}

impl Order {
    /// Collection data of the first QR code
    pub fn to_pix(&self) -> PixCollection {
        let qr_code = self.qr_codes.first();
        PixCollection {
            created_at: self.created_at.clone(),
            expiration: qr_code.and_then(|qr| qr.expiration_date.clone()),
            location: qr_code.and_then(|qr| {
                qr.links
                    .iter()
                    .find(|link| link.rel.as_deref() == Some("QRCODE.PNG"))
                    .or_else(|| qr.links.first())
                    .map(|link| link.href.clone())
            }),
            qr_code_text: qr_code.and_then(|qr| qr.text.clone()),
            txid: None,
            key: None,
        }
    }

    /// An order is paid once one of its charges is; until then it waits
    pub fn state(&self) -> TransactionState {
        let states: Vec<TransactionState> = self
            .charges
            .iter()
            .map(|charge| charge_state(&charge.status))
            .collect();
        if states.contains(&TransactionState::Done) {
            TransactionState::Done
        } else if states.contains(&TransactionState::Authorized) {
            TransactionState::Authorized
        } else {
            states.last().copied().unwrap_or(TransactionState::Pending)
        }
    }
}

#[derive(Debug, Deserialize)]
struct PublicKey {
    #[serde(default)]
    public_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameter_name: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        let messages: Vec<String> = self
            .error_messages
            .iter()
            .filter_map(|error| {
                let description = error.description.as_deref().or(error.code.as_deref())?;
                Some(match &error.parameter_name {
                    Some(parameter) => format!("{}: {}", parameter, description),
                    None => description.to_string(),
                })
            })
            .collect();
        (!messages.is_empty()).then(|| messages.join("; "))
    }
}

/// Client of the PagSeguro API
pub struct PagseguroClient {
    client: ProviderClient,
    config: PagseguroConfig,
}

impl PagseguroClient {
    pub fn new(config: PagseguroConfig) -> PaymentResult<Self> {
        let client = ProviderClient::new(&config.base_url, config.timeout())?
            .with_bearer(config.token.clone());
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PagseguroConfig {
        &self.config
    }

    fn notification_urls(&self) -> Vec<&str> {
        self.config.notification_url.as_deref().into_iter().collect()
    }

    fn amount(transaction: &PaymentTransaction) -> AmountBody {
        AmountBody {
            value: transaction.amount.amount,
            currency: transaction.amount.currency.code(),
        }
    }

    async fn create<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> PaymentResult<T> {
        let response = self
            .client
            .request(reqwest::Method::POST, path)?
            .header(IDEMPOTENCY_HEADER, uuid::Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?;
        read(response).await
    }

    /// Charge an encrypted card, capturing immediately
    pub async fn charge_card(
        &self,
        transaction: &PaymentTransaction,
        card: &CardDetails,
    ) -> PaymentResult<Charge> {
        let mut payment_method = json!({
            "type": PaymentMethod::CreditCard.as_str(),
            "installments": card.installments,
            "capture": true,
            "card": {
                "encrypted": card.token,
                "holder": {"name": card.holder_name},
                "store": false,
            },
        });
        if let Some(descriptor) = &self.config.soft_descriptor {
            payment_method["soft_descriptor"] = json!(descriptor);
        }

        let body = json!({
            "reference_id": transaction.reference,
            "description": format!("Pedido {}", transaction.reference),
            "amount": Self::amount(transaction),
            "payment_method": payment_method,
            "notification_urls": self.notification_urls(),
        });

        let charge: Charge = self.create("charges", &body).await?;
        invader_log::info!(
            "PagSeguro card charge {} is {}", charge.id, charge.status;
            "transaction_id" => transaction.id
        );
        Ok(charge)
    }

    /// Issue a boleto due `boleto_due_days` from today
    pub async fn charge_boleto(
        &self,
        transaction: &PaymentTransaction,
        payable: &Payable,
    ) -> PaymentResult<Charge> {
        let due_date = (Utc::now() + Duration::days(i64::from(self.config.boleto_due_days)))
            .date_naive()
            .to_string();
        let body = json!({
            "reference_id": transaction.reference,
            "description": format!("Pedido {}", transaction.reference),
            "amount": Self::amount(transaction),
            "payment_method": {
                "type": PaymentMethod::Boleto.as_str(),
                "boleto": {
                    "due_date": due_date,
                    "instruction_lines": {
                        "line_1": format!("Pedido {}", transaction.reference),
                        "line_2": "Não receber após o vencimento",
                    },
                    "holder": holder(payable),
                },
            },
            "notification_urls": self.notification_urls(),
        });

        let charge: Charge = self.create("charges", &body).await?;
        invader_log::info!(
            "PagSeguro boleto {} issued", charge.id;
            "transaction_id" => transaction.id
        );
        Ok(charge)
    }

    /// Order with one PIX QR code for the transaction amount
    pub async fn create_pix_order(
        &self,
        transaction: &PaymentTransaction,
        payable: &Payable,
    ) -> PaymentResult<Order> {
        let expiration: DateTime<Utc> =
            Utc::now() + Duration::seconds(i64::from(self.config.pix_expiration_secs));
        let body = json!({
            "reference_id": transaction.reference,
            "customer": holder(payable),
            "items": [{
                "reference_id": transaction.reference,
                "name": format!("Pedido {}", transaction.reference),
                "quantity": 1,
                "unit_amount": transaction.amount.amount,
            }],
            "qr_codes": [{
                "amount": {"value": transaction.amount.amount},
                "expiration_date": expiration.to_rfc3339_opts(SecondsFormat::Secs, false),
            }],
            "notification_urls": self.notification_urls(),
        });

        let order: Order = self.create("orders", &body).await?;
        invader_log::info!(
            "PagSeguro PIX order {} created", order.id;
            "transaction_id" => transaction.id
        );
        Ok(order)
    }

    pub async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
        read(self.client.get(&format!("charges/{}", id)).await?).await
    }

    pub async fn get_order(&self, id: &str) -> PaymentResult<Order> {
        read(self.client.get(&format!("orders/{}", id)).await?).await
    }

    /// Public key the storefront uses to encrypt card data
    pub async fn public_key(&self) -> PaymentResult<String> {
        let response = self.client.post("public-keys", &json!({"type": "card"})).await?;
        let key: PublicKey = read(response).await?;
        key.public_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PaymentError::Acquirer(String::new()))
    }
}

/// Customer block shared by boleto holders and order customers
fn holder(payable: &Payable) -> Value {
    let tax_id: Option<String> = payable
        .partner
        .vat
        .as_deref()
        .map(|vat| vat.chars().filter(char::is_ascii_digit).collect());
    json!({
        "name": payable.partner.name,
        "email": payable.partner.email,
        "tax_id": tax_id,
    })
}

async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> PaymentResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body.message();
    match status.as_u16() {
        401 | 403 => Err(PaymentError::Configuration(format!(
            "PagSeguro refused the credentials ({})",
            status
        ))),
        400..=499 => Err(PaymentError::Acquirer(
            message.unwrap_or_else(|| format!("PagSeguro rejected the request ({})", status)),
        )),
        _ => Err(PaymentError::Unhandled(format!(
            "PagSeguro answered {}: {}",
            status,
            message.unwrap_or_default()
        ))),
    }
}

#[async_trait]
impl TransactionStatusProvider for PagseguroClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    /// PIX transactions reference an order, the others a charge
    async fn check_transaction(
        &self,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<StatusUpdate> {
        let reference = transaction.acquirer_reference.as_deref().ok_or_else(|| {
            PaymentError::NotFound(format!(
                "transaction {} has no PagSeguro reference",
                transaction.id
            ))
        })?;

        if transaction.payment_method == Some(PaymentMethod::Pix) {
            let order = self.get_order(reference).await?;
            return Ok(StatusUpdate::new(order.state()));
        }

        let charge = self.get_charge(reference).await?;
        let update = StatusUpdate::new(charge.state());
        Ok(match charge.message() {
            Some(message) if charge.state().is_failure() => update.message(message),
            _ => update,
        })
    }
}
