//! Generic payment workflow shared by every acquirer service

use crate::error::{PaymentError, PaymentResult};
use crate::factory::{self, TransactionDraft};
use crate::resolver::PayableResolver;
use crate::store::PaymentStore;
use crate::types::{Payable, PaymentMode, PaymentToken, PaymentTransaction};
use invader_core::RestRequest;
use invader_validation::{Coerce, FieldRule, Schema};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Records created by [`InvaderPaymentService::start_payment`]
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub payment_mode: PaymentMode,
    pub payable: Payable,
    pub token: PaymentToken,
    pub transaction: PaymentTransaction,
}

/// Mode resolution, payable lookup and transaction creation, composed by
/// each acquirer service around its own acquirer call
#[derive(Clone)]
pub struct InvaderPaymentService {
    resolver: Arc<dyn PayableResolver>,
    store: Arc<dyn PaymentStore>,
}

impl InvaderPaymentService {
    pub fn new(resolver: Arc<dyn PayableResolver>, store: Arc<dyn PaymentStore>) -> Self {
        Self { resolver, store }
    }

    pub fn resolver(&self) -> &Arc<dyn PayableResolver> {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.store
    }

    /// Schema of the fields designating what is paid and how: `target`
    /// among the resolver's allowed targets, `payment_mode_id` (coerced to
    /// an integer) among the restricted modes when there are any.
    pub fn target_validator(&self) -> Schema {
        let mut payment_mode = FieldRule::integer().required().coerce(Coerce::Int);
        let restricted = self.resolver.restricted_payment_mode_ids();
        if !restricted.is_empty() {
            payment_mode = payment_mode.allowed(restricted);
        }

        let schema = Schema::new()
            .field(
                "target",
                FieldRule::string()
                    .required()
                    .allowed(self.resolver.allowed_targets()),
            )
            .field("payment_mode_id", payment_mode);

        self.resolver.extend_target_validator(schema)
    }

    /// Fail unless `mode` belongs to an acquirer of `provider`
    pub fn check_provider(&self, mode: &PaymentMode, provider: &str) -> PaymentResult<()> {
        if mode.provider() != provider {
            return Err(PaymentError::Configuration(format!(
                "payment mode {} uses provider {}, expected {}",
                mode.id,
                mode.provider(),
                provider
            )));
        }
        Ok(())
    }

    /// Payment mode of the request, checked against `provider`
    pub async fn resolve_payment_mode(
        &self,
        request: &RestRequest,
        provider: &str,
    ) -> PaymentResult<PaymentMode> {
        let id = request
            .i64_param("payment_mode_id")
            .ok_or_else(|| PaymentError::Validation("payment_mode_id is required".to_string()))?;
        let mode = self.store.payment_mode(id).await?;
        self.check_provider(&mode, provider)?;
        Ok(mode)
    }

    pub async fn find_payable(&self, request: &RestRequest) -> PaymentResult<Payable> {
        let target = request
            .str_param("target")
            .ok_or_else(|| PaymentError::Validation("target is required".to_string()))?;
        let payable = self.resolver.find_payable(target, request).await?;
        invader_log::debug!("target {} resolved to {}", target, payable.reference; "payable_id" => payable.id);
        Ok(payable)
    }

    pub async fn create_token(&self, token: PaymentToken) -> PaymentResult<PaymentToken> {
        self.store.create_token(token).await
    }

    pub async fn create_transaction(
        &self,
        draft: TransactionDraft,
    ) -> PaymentResult<PaymentTransaction> {
        draft.ensure_complete()?;
        let transaction = self.store.create_transaction(draft).await?;
        invader_log::info!(
            "transaction created for {}", transaction.reference;
            "transaction_id" => transaction.id,
            "amount" => transaction.amount
        );
        Ok(transaction)
    }

    /// Resolve the mode and the payable, then create the token and the
    /// transaction and record the mode on the payable. Nothing is created
    /// when the mode or the payable cannot be resolved.
    ///
    /// `token` builds the acquirer token for the payable and the mode;
    /// `draft` merges acquirer fields into the transaction draft.
    pub async fn start_payment<T, D>(
        &self,
        request: &RestRequest,
        provider: &str,
        token: T,
        draft: D,
    ) -> PaymentResult<PaymentAttempt>
    where
        T: FnOnce(&Payable, &PaymentMode) -> PaymentToken,
        D: FnOnce(TransactionDraft) -> TransactionDraft,
    {
        let payment_mode = self.resolve_payment_mode(request, provider).await?;
        let payable = self.find_payable(request).await?;

        let token = self.create_token(token(&payable, &payment_mode)).await?;
        let transaction = self
            .create_transaction(draft(factory::prepare(&payable, &payment_mode).token(&token)))
            .await?;
        self.resolver.set_payment_mode(&payable, &payment_mode).await?;

        Ok(PaymentAttempt {
            payment_mode,
            payable,
            token,
            transaction,
        })
    }

    pub async fn save_transaction(&self, transaction: &PaymentTransaction) -> PaymentResult<()> {
        self.store.update_transaction(transaction).await
    }

    /// Turn an acquirer failure into the `{result: false, error}` answer,
    /// moving the transaction to `Error`. Non-recoverable errors are
    /// returned unchanged.
    pub async fn report_failure(
        &self,
        transaction: &mut PaymentTransaction,
        err: PaymentError,
    ) -> PaymentResult<Value> {
        if !err.is_recoverable() {
            invader_log::error!("payment of {} failed: {}", transaction.reference, err; "transaction_id" => transaction.id);
            return Err(err);
        }

        let message = err.to_string();
        invader_log::warn!("acquirer refused {}: {}", transaction.reference, message; "transaction_id" => transaction.id);
        if transaction.set_error(message.clone()) {
            self.save_transaction(transaction).await?;
        }
        Ok(json!({"result": false, "error": message}))
    }

    /// Merge the resolver's success data into `response`
    pub fn success_response(
        &self,
        payable: &Payable,
        request: &RestRequest,
        response: Value,
    ) -> Value {
        let target = request.str_param("target").unwrap_or_default();
        let extra = self
            .resolver
            .payment_success_response_data(payable, target, request);
        match response {
            Value::Object(mut map) => {
                map.extend(extra);
                Value::Object(map)
            }
            other if extra.is_empty() => other,
            other => {
                let mut map = Map::new();
                map.insert("res".to_string(), other);
                map.extend(extra);
                Value::Object(map)
            }
        }
    }
}
