//! In-memory store and resolver, used by the sandbox server and tests

use crate::error::{PaymentError, PaymentResult};
use crate::factory::TransactionDraft;
use crate::resolver::PayableResolver;
use crate::store::{PaymentStore, TransactionLookup};
use crate::types::{
    Payable, PaymentMode, PaymentToken, PaymentTransaction, TransactionState,
};
use async_trait::async_trait;
use chrono::Utc;
use invader_core::RestRequest;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

/// Target resolved from the session cart
pub const CURRENT_CART: &str = "current_cart";

/// Session header carrying the cart id
pub const CART_HEADER: &str = "sess-cart-id";

/// Process-local [`PaymentStore`]
#[derive(Default)]
pub struct MemoryStore {
    modes: RwLock<HashMap<i64, PaymentMode>>,
    tokens: RwLock<BTreeMap<i64, PaymentToken>>,
    transactions: RwLock<BTreeMap<i64, PaymentTransaction>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_payment_mode(&self, mode: PaymentMode) {
        self.modes.write().insert(mode.id, mode);
    }

    pub fn tokens(&self) -> Vec<PaymentToken> {
        self.tokens.read().values().cloned().collect()
    }

    pub fn transactions(&self) -> Vec<PaymentTransaction> {
        self.transactions.read().values().cloned().collect()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn payment_mode(&self, id: i64) -> PaymentResult<PaymentMode> {
        self.modes
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(format!("payment mode {}", id)))
    }

    async fn create_token(&self, mut token: PaymentToken) -> PaymentResult<PaymentToken> {
        token.id = self.next_id();
        self.tokens.write().insert(token.id, token.clone());
        Ok(token)
    }

    async fn create_transaction(&self, draft: TransactionDraft) -> PaymentResult<PaymentTransaction> {
        let payment_token_id = draft.ensure_complete()?;
        if !self.tokens.read().contains_key(&payment_token_id) {
            return Err(PaymentError::Store(format!(
                "unknown payment token {}",
                payment_token_id
            )));
        }

        let now = Utc::now();
        let transaction = PaymentTransaction {
            id: self.next_id(),
            reference: draft.reference,
            payable_id: draft.payable_id,
            partner_id: draft.partner_id,
            amount: draft.amount,
            payment_mode_id: draft.payment_mode_id,
            acquirer_id: draft.acquirer_id,
            payment_token_id,
            tx_id: draft.tx_id,
            acquirer_reference: None,
            payment_method: draft.payment_method,
            state: TransactionState::Draft,
            state_message: None,
            pix: None,
            accepted_notified: false,
            created_at: now,
            updated_at: now,
        };
        self.transactions
            .write()
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update_transaction(&self, transaction: &PaymentTransaction) -> PaymentResult<()> {
        match self.transactions.write().get_mut(&transaction.id) {
            Some(stored) => {
                *stored = transaction.clone();
                Ok(())
            }
            None => Err(PaymentError::NotFound(format!(
                "transaction {}",
                transaction.id
            ))),
        }
    }

    async fn transaction(&self, id: i64) -> PaymentResult<PaymentTransaction> {
        self.transactions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {}", id)))
    }

    async fn search_transactions(
        &self,
        lookup: &TransactionLookup,
    ) -> PaymentResult<Vec<PaymentTransaction>> {
        let matches = |tx: &PaymentTransaction| match lookup {
            TransactionLookup::AcquirerReference(reference) => {
                tx.acquirer_reference.as_deref() == Some(reference.as_str())
            }
            TransactionLookup::TxId(tx_id) => tx.tx_id.as_deref() == Some(tx_id.as_str()),
        };
        Ok(self
            .transactions
            .read()
            .values()
            .filter(|tx| matches(tx))
            .cloned()
            .collect())
    }
}

/// Payables kept in memory, resolved from the session cart header
#[derive(Default)]
pub struct MemoryPayables {
    payables: RwLock<HashMap<i64, Payable>>,
    restricted_modes: Vec<i64>,
    success_data: Map<String, Value>,
    accepted: RwLock<Vec<i64>>,
}

impl MemoryPayables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only these payment modes
    pub fn restrict_payment_modes(mut self, ids: Vec<i64>) -> Self {
        self.restricted_modes = ids;
        self
    }

    /// Keys merged into successful confirmation responses
    pub fn with_success_data(mut self, data: Map<String, Value>) -> Self {
        self.success_data = data;
        self
    }

    pub fn insert(&self, payable: Payable) {
        self.payables.write().insert(payable.id, payable);
    }

    pub fn get(&self, id: i64) -> Option<Payable> {
        self.payables.read().get(&id).cloned()
    }

    /// Ids of the payables reported as paid, in order
    pub fn accepted(&self) -> Vec<i64> {
        self.accepted.read().clone()
    }

    fn lookup(&self, id: i64) -> PaymentResult<Payable> {
        self.get(id)
            .ok_or_else(|| PaymentError::NotFound(format!("payable {}", id)))
    }
}

#[async_trait]
impl PayableResolver for MemoryPayables {
    fn allowed_targets(&self) -> Vec<String> {
        vec![CURRENT_CART.to_string()]
    }

    async fn find_payable(&self, target: &str, request: &RestRequest) -> PaymentResult<Payable> {
        if target != CURRENT_CART {
            return Err(PaymentError::NotFound(format!("unknown target {}", target)));
        }
        let cart_id = request
            .header(CART_HEADER)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .ok_or_else(|| PaymentError::NotFound("no cart in session".to_string()))?;
        self.lookup(cart_id)
    }

    async fn find_payable_from_transaction(
        &self,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<Payable> {
        self.lookup(transaction.payable_id)
    }

    async fn set_payment_mode(&self, payable: &Payable, mode: &PaymentMode) -> PaymentResult<()> {
        let mut payables = self.payables.write();
        let stored = payables
            .get_mut(&payable.id)
            .ok_or_else(|| PaymentError::NotFound(format!("payable {}", payable.id)))?;
        stored.payment_mode_id = Some(mode.id);
        Ok(())
    }

    fn restricted_payment_mode_ids(&self) -> Vec<i64> {
        self.restricted_modes.clone()
    }

    fn payment_success_response_data(
        &self,
        _payable: &Payable,
        _target: &str,
        _request: &RestRequest,
    ) -> Map<String, Value> {
        self.success_data.clone()
    }

    async fn payment_accepted(
        &self,
        payable: &Payable,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<()> {
        invader_log::info!("payable {} paid", payable.reference; "transaction_id" => transaction.id);
        self.accepted.write().push(payable.id);
        Ok(())
    }
}
