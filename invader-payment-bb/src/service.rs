//! `payment_bacen_pix` REST service

use crate::client::{BbPixClient, PROVIDER, TXID_REGEX};
use invader_core::{RestMethod, RestRequest, RestService};
use invader_payment::{
    InvaderPaymentService, NotificationReceiver, PaymentError, PaymentMethod, PaymentResult,
    PaymentToken, TransactionLookup,
};
use invader_validation::{FieldRule, Schema};
use serde_json::{Value, json};
use std::sync::Arc;

/// PIX collections through Banco do Brasil
pub struct BbPixService {
    payment: InvaderPaymentService,
    client: Arc<BbPixClient>,
    receiver: NotificationReceiver,
}

impl BbPixService {
    pub fn new(payment: InvaderPaymentService, client: Arc<BbPixClient>) -> Self {
        let receiver = NotificationReceiver::new(
            payment.store().clone(),
            payment.resolver().clone(),
            client.clone(),
        );
        Self {
            payment,
            client,
            receiver,
        }
    }

    pub fn confirm_payment_pix_schema(&self) -> Schema {
        self.payment.target_validator().field(
            "tx_id",
            FieldRule::string().required().regex(TXID_REGEX.clone()),
        )
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

    /// Create the transaction and the BB collection for the request's
    /// payable. The transaction is authorized as soon as the collection
    /// exists; settlement arrives through the notification route.
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

        let collection = match self.client.create_collection(&tx_id, &attempt.payable).await {
            Ok(collection) => collection,
            Err(err) => return self.payment.report_failure(&mut transaction, err).await,
        };

        let mut pix = collection.to_pix();
        pix.txid = transaction.tx_id.clone();
        transaction.acquirer_reference = transaction.tx_id.clone();
        transaction.pix = Some(pix.clone());
        transaction.set_authorized();
        self.payment.save_transaction(&transaction).await?;

        Ok(self
            .payment
            .success_response(&attempt.payable, request, pix.to_response()))
    }

    /// Apply a BB webhook call: `{"pix": [{"txid": ...}, ...]}`. True only
    /// when every listed collection was processed.
    pub async fn notification(&self, request: &RestRequest) -> bool {
        let txids: Vec<String> = request
            .params
            .get("pix")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("txid").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if txids.is_empty() {
            invader_log::warn!("BB notification without txid");
            return false;
        }

        let mut processed = true;
        for txid in txids {
            processed &= self.receiver.receive(TransactionLookup::TxId(txid)).await;
        }
        processed
    }
}

impl RestService for BbPixService {
    fn usage(&self) -> &str {
        "payment_bacen_pix"
    }

    fn methods(self: Arc<Self>) -> Vec<RestMethod> {
        let confirm = self.clone();
        let notify = self.clone();
        vec![
            RestMethod::post("confirm-payment-pix", move |req: RestRequest| {
                let service = confirm.clone();
                async move {
                    service
                        .confirm_payment_pix(&req)
                        .await
                        .map_err(invader_core::Error::from)
                }
            })
            .input(self.confirm_payment_pix_schema())
            .output(Self::confirm_payment_pix_output_schema())
            .cors("*"),
            RestMethod::post("notification", move |req: RestRequest| {
                let service = notify.clone();
                async move { Ok(json!(service.notification(&req).await)) }
            })
            .input(
                Schema::new()
                    .field("pix", FieldRule::list().required())
                    .allow_unknown(true),
            ),
        ]
    }
}
