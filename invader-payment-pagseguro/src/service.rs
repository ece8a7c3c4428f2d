//! `payment_pagseguro` REST service and the PagSeguro webhook

use crate::client::{PROVIDER, PagseguroClient};
use invader_core::{RestMethod, RestRequest, RestService};
use invader_payment::{
    CardDetails, InvaderPaymentService, NotificationReceiver, PaymentError, PaymentMethod,
    PaymentResult, PaymentToken, TransactionLookup,
};
use invader_validation::{Coerce, FieldRule, Schema};
use serde_json::{Value, json};
use std::sync::Arc;

/// Card, boleto and PIX payments through PagSeguro
pub struct PagseguroService {
    payment: InvaderPaymentService,
    client: Arc<PagseguroClient>,
}

impl PagseguroService {
    pub fn new(payment: InvaderPaymentService, client: Arc<PagseguroClient>) -> Self {
        Self { payment, client }
    }

    pub fn confirm_payment_schema(&self) -> Schema {
        let card = Schema::new()
            .field("name", FieldRule::string().required())
            .field("token", FieldRule::string().required())
            .field(
                "payment_method",
                FieldRule::string()
                    .required()
                    .allowed([PaymentMethod::CreditCard.as_str()]),
            )
            .field(
                "installments",
                FieldRule::integer().required().coerce(Coerce::Int).min(1),
            );
        self.payment
            .target_validator()
            .extend(Schema::new().field("card", FieldRule::dict(card).required()))
    }

    pub fn confirm_payment_output_schema() -> Schema {
        Schema::new()
            .field("result", FieldRule::boolean().required())
            .field("res", FieldRule::string().required())
            .field("transaction_status", FieldRule::string())
            .field("error", FieldRule::string())
            .allow_unknown(true)
    }

    pub fn confirm_payment_pix_schema(&self) -> Schema {
        self.payment
            .target_validator()
            .field("tx_id", FieldRule::string().required())
    }

    pub fn confirm_payment_pix_output_schema() -> Schema {
        let optional_text = || FieldRule::string().nullable();
        Schema::new()
            .field(
                "calendario",
                FieldRule::dict(
                    Schema::new()
                        .field("criacao", optional_text())
                        .field("expiracao", optional_text()),
                ),
            )
            .field("location", optional_text())
            .field("textoImagemQRcode", optional_text())
            .field("txid", optional_text())
            .field("chave", optional_text())
            .field("result", FieldRule::boolean())
            .field("error", FieldRule::string())
            .allow_unknown(true)
    }

    pub fn public_key_output_schema() -> Schema {
        Schema::new()
            .field("public_key", FieldRule::string().required())
            .field("success", FieldRule::boolean().required())
            .field("error", FieldRule::string())
    }

    /// Charge the card posted by the storefront. A declined card is an
    /// answer, not an error: `result` is false and `error` carries the
    /// acquirer message.
    pub async fn confirm_payment(&self, request: &RestRequest) -> PaymentResult<Value> {
        let card = card_details(request)?;

        let attempt = self
            .payment
            .start_payment(
                request,
                PROVIDER,
                |payable, mode| {
                    PaymentToken::new(&mode.acquirer, payable, PaymentMethod::CreditCard)
                        .with_card(card.clone())
                },
                |draft| draft.payment_method(PaymentMethod::CreditCard),
            )
            .await?;
        let mut transaction = attempt.transaction;

        let charge = match self.client.charge_card(&transaction, &card).await {
            Ok(charge) => charge,
            Err(err) => {
                let mut response = self.payment.report_failure(&mut transaction, err).await?;
                if let Value::Object(map) = &mut response {
                    map.insert("res".to_string(), json!(transaction.id.to_string()));
                    map.insert(
                        "transaction_status".to_string(),
                        json!(transaction.state.as_str()),
                    );
                }
                return Ok(response);
            }
        };

        transaction.acquirer_reference = Some(charge.id.clone());
        let state = charge.state();
        let message = charge.message().filter(|_| state.is_failure());
        transaction.set_state(state, message.clone());
        self.payment.save_transaction(&transaction).await?;

        let mut response = json!({
            "result": !state.is_failure(),
            "res": transaction.id.to_string(),
            "transaction_status": state.as_str(),
        });
        if state.is_failure() {
            invader_log::warn!(
                "card payment of {} refused", transaction.reference;
                "charge_id" => charge.id,
                "status" => charge.status
            );
            response["error"] = json!(message.unwrap_or_else(|| format!("Payment {}", charge.status.to_lowercase())));
            return Ok(response);
        }
        Ok(self
            .payment
            .success_response(&attempt.payable, request, response))
    }

    /// PIX QR code through a PagSeguro order. The transaction stays
    /// pending until the webhook reports the order paid.
    pub async fn confirm_payment_pix(&self, request: &RestRequest) -> PaymentResult<Value> {
        let tx_id = request
            .str_param("tx_id")
            .ok_or_else(|| PaymentError::Validation("tx_id is required".to_string()))?
            .to_string();

        let attempt = self
            .payment
            .start_payment(
                request,
                PROVIDER,
                |payable, mode| PaymentToken::new(&mode.acquirer, payable, PaymentMethod::Pix),
                |draft| draft.tx_id(tx_id.clone()).payment_method(PaymentMethod::Pix),
            )
            .await?;
        let mut transaction = attempt.transaction;

        let order = match self
            .client
            .create_pix_order(&transaction, &attempt.payable)
            .await
        {
            Ok(order) => order,
            Err(err) => return self.payment.report_failure(&mut transaction, err).await,
        };

        let mut pix = order.to_pix();
        pix.txid = transaction.tx_id.clone();
        transaction.acquirer_reference = Some(order.id);
        transaction.pix = Some(pix.clone());
        transaction.set_pending();
        self.payment.save_transaction(&transaction).await?;

        Ok(self
            .payment
            .success_response(&attempt.payable, request, pix.to_response()))
    }

    /// Issue a boleto and pass its document through as `res`
    pub async fn confirm_payment_boleto(&self, request: &RestRequest) -> PaymentResult<Value> {
        let attempt = self
            .payment
            .start_payment(
                request,
                PROVIDER,
                |payable, mode| PaymentToken::new(&mode.acquirer, payable, PaymentMethod::Boleto),
                |draft| draft.payment_method(PaymentMethod::Boleto),
            )
            .await?;
        let mut transaction = attempt.transaction;

        let charge = match self
            .client
            .charge_boleto(&transaction, &attempt.payable)
            .await
        {
            Ok(charge) => charge,
            Err(err) => return self.payment.report_failure(&mut transaction, err).await,
        };

        transaction.acquirer_reference = Some(charge.id.clone());
        transaction.set_state(charge.state(), None);
        self.payment.save_transaction(&transaction).await?;

        Ok(self.payment.success_response(
            &attempt.payable,
            request,
            json!({"res": charge.boleto_document()}),
        ))
    }

    /// Card encryption key for the storefront checkout
    pub async fn public_key(&self, request: &RestRequest) -> PaymentResult<Value> {
        self.payment.resolve_payment_mode(request, PROVIDER).await?;

        match self.client.public_key().await {
            Ok(key) => Ok(json!({"public_key": key, "success": true})),
            Err(err) if err.is_recoverable() => {
                let message = err.to_string();
                let error = if message.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    message
                };
                invader_log::warn!("PagSeguro public key unavailable: {}", error);
                Ok(json!({"public_key": "", "success": false, "error": error}))
            }
            Err(err) => Err(err),
        }
    }
}

/// Card block of a validated confirmation request
fn card_details(request: &RestRequest) -> PaymentResult<CardDetails> {
    let card = request
        .params
        .get("card")
        .ok_or_else(|| PaymentError::Validation("card is required".to_string()))?;
    let text = |name: &str| {
        card.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PaymentError::Validation(format!("card.{} is required", name)))
    };
    let installments = card
        .get("installments")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| PaymentError::Validation("card.installments is required".to_string()))?;

    Ok(CardDetails {
        holder_name: text("name")?,
        token: text("token")?,
        installments,
    })
}

impl RestService for PagseguroService {
    fn usage(&self) -> &str {
        "payment_pagseguro"
    }

    fn methods(self: Arc<Self>) -> Vec<RestMethod> {
        let card = self.clone();
        let pix = self.clone();
        let boleto = self.clone();
        let key = self.clone();
        vec![
            RestMethod::post("confirm-payment", move |req: RestRequest| {
                let service = card.clone();
                async move {
                    service
                        .confirm_payment(&req)
                        .await
                        .map_err(invader_core::Error::from)
                }
            })
            .input(self.confirm_payment_schema())
            .output(Self::confirm_payment_output_schema()),
            RestMethod::post("confirm-payment-pix", move |req: RestRequest| {
                let service = pix.clone();
                async move {
                    service
                        .confirm_payment_pix(&req)
                        .await
                        .map_err(invader_core::Error::from)
                }
            })
            .input(self.confirm_payment_pix_schema())
            .output(Self::confirm_payment_pix_output_schema()),
            RestMethod::post("confirm-payment-boleto", move |req: RestRequest| {
                let service = boleto.clone();
                async move {
                    service
                        .confirm_payment_boleto(&req)
                        .await
                        .map_err(invader_core::Error::from)
                }
            })
            .input(self.payment.target_validator()),
            RestMethod::get("public-key", move |req: RestRequest| {
                let service = key.clone();
                async move {
                    service
                        .public_key(&req)
                        .await
                        .map_err(invader_core::Error::from)
                }
            })
            .input(self.payment.target_validator())
            .output(Self::public_key_output_schema()),
        ]
    }
}

/// `POST /notification-url`, called by PagSeguro with the id of the
/// charge or order that changed
pub struct PagseguroNotifications {
    receiver: NotificationReceiver,
}

impl PagseguroNotifications {
    pub fn new(payment: &InvaderPaymentService, client: Arc<PagseguroClient>) -> Self {
        Self {
            receiver: NotificationReceiver::new(
                payment.store().clone(),
                payment.resolver().clone(),
                client,
            ),
        }
    }

    pub async fn notification(&self, request: &RestRequest) -> bool {
        match request.str_param("id") {
            Some(id) => {
                self.receiver
                    .receive(TransactionLookup::AcquirerReference(id.to_string()))
                    .await
            }
            None => false,
        }
    }
}

impl RestService for PagseguroNotifications {
    fn usage(&self) -> &str {
        ""
    }

    fn methods(self: Arc<Self>) -> Vec<RestMethod> {
        let service = self.clone();
        vec![
            RestMethod::post("notification-url", move |req: RestRequest| {
                let service = service.clone();
                async move { Ok(json!(service.notification(&req).await)) }
            })
            .input(
                Schema::new()
                    .field("id", FieldRule::string().required())
                    .allow_unknown(true),
            ),
        ]
    }
}
