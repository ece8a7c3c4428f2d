//! Integration tests for invader-payment: the generic workflow against the
//! in-memory deployment

use async_trait::async_trait;
use invader_core::RestRequest;
use invader_payment::memory::{CART_HEADER, MemoryPayables, MemoryStore};
use invader_payment::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

fn deployment() -> (Arc<MemoryStore>, Arc<MemoryPayables>, InvaderPaymentService) {
    let store = Arc::new(MemoryStore::new());
    store.add_payment_mode(PaymentMode::new(
        1,
        "PIX BB",
        Acquirer::new(10, "Banco do Brasil", "bacenpix"),
    ));
    store.add_payment_mode(PaymentMode::new(
        2,
        "Cartão",
        Acquirer::new(20, "PagSeguro", "pagseguro"),
    ));

    let payables = Arc::new(MemoryPayables::new());
    payables.insert(Payable::new(
        42,
        "SO042",
        Partner::new(7, "Maria Silva").vat("12345678909"),
        Money::brl(15990),
    ));

    let service = InvaderPaymentService::new(payables.clone(), store.clone());
    (store, payables, service)
}

fn request(mode: i64) -> RestRequest {
    RestRequest::new(json!({"target": "current_cart", "payment_mode_id": mode}))
        .with_header(CART_HEADER, "42")
}

async fn start(service: &InvaderPaymentService, mode: i64, provider: &str) -> PaymentResult<PaymentAttempt> {
    service
        .start_payment(
            &request(mode),
            provider,
            |payable, mode| PaymentToken::new(&mode.acquirer, payable, PaymentMethod::Pix),
            |draft| draft.tx_id("txid0123456789abcdefghijklmn").payment_method(PaymentMethod::Pix),
        )
        .await
}

#[tokio::test]
async fn test_start_payment_creates_one_linked_transaction() {
    let (store, payables, service) = deployment();

    let attempt = start(&service, 1, "bacenpix").await.unwrap();

    let transactions = store.transactions();
    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!(tx.payable_id, 42);
    assert_eq!(tx.reference, "SO042");
    assert_eq!(tx.amount, Money::brl(15990));
    assert_eq!(tx.payment_token_id, attempt.token.id);
    assert_eq!(tx.acquirer_id, 10);
    assert_eq!(tx.state, TransactionState::Draft);

    assert_eq!(attempt.token.partner_id, 7);
    assert_eq!(payables.get(42).unwrap().payment_mode_id, Some(1));
}

#[tokio::test]
async fn test_provider_mismatch_creates_nothing() {
    let (store, payables, service) = deployment();

    let err = start(&service, 2, "bacenpix").await.unwrap_err();
    assert!(matches!(err, PaymentError::Configuration(_)));
    assert!(store.tokens().is_empty());
    assert!(store.transactions().is_empty());
    assert_eq!(payables.get(42).unwrap().payment_mode_id, None);
}

#[tokio::test]
async fn test_unknown_cart_is_not_found() {
    let (store, _, service) = deployment();
    let request = RestRequest::new(json!({"target": "current_cart", "payment_mode_id": 1}))
        .with_header(CART_HEADER, "99");

    let err = service
        .start_payment(
            &request,
            "bacenpix",
            |payable, mode| PaymentToken::new(&mode.acquirer, payable, PaymentMethod::Pix),
            |draft| draft,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(_)));
    assert!(store.tokens().is_empty());
}

#[tokio::test]
async fn test_target_validator() {
    let (_, _, service) = deployment();
    let schema = service.target_validator();

    let normalized = schema
        .validate(&json!({"target": "current_cart", "payment_mode_id": "2"}))
        .unwrap();
    assert_eq!(normalized["payment_mode_id"], 2);

    let errors = schema
        .validate(&json!({"target": "last_sale", "payment_mode_id": 2}))
        .unwrap_err();
    assert!(errors.has("target", "allowed"));
}

#[tokio::test]
async fn test_restricted_payment_modes() {
    let store = Arc::new(MemoryStore::new());
    let payables = Arc::new(MemoryPayables::new().restrict_payment_modes(vec![1]));
    let service = InvaderPaymentService::new(payables, store);

    let errors = service
        .target_validator()
        .validate(&json!({"target": "current_cart", "payment_mode_id": 2}))
        .unwrap_err();
    assert!(errors.has("payment_mode_id", "allowed"));
}

#[tokio::test]
async fn test_report_failure_only_swallows_acquirer_errors() {
    let (store, _, service) = deployment();
    let mut attempt = start(&service, 1, "bacenpix").await.unwrap();

    let body = service
        .report_failure(&mut attempt.transaction, PaymentError::Acquirer("CPF inválido".into()))
        .await
        .unwrap();
    assert_eq!(body, json!({"result": false, "error": "CPF inválido"}));
    assert_eq!(store.transactions()[0].state, TransactionState::Error);

    let err = service
        .report_failure(&mut attempt.transaction, PaymentError::Network("reset".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Network(_)));
}

#[tokio::test]
async fn test_success_response_merges_resolver_data() {
    let store = Arc::new(MemoryStore::new());
    let mut data = serde_json::Map::new();
    data.insert("store_cache".into(), json!({"cart": {}}));
    let payables = Arc::new(MemoryPayables::new().with_success_data(data));
    let service = InvaderPaymentService::new(payables, store);

    let payable = Payable::new(1, "SO001", Partner::new(1, "A"), Money::brl(100));
    let body = service.success_response(&payable, &request(1), json!({"result": true}));
    assert_eq!(body, json!({"result": true, "store_cache": {"cart": {}}}));
}

/// Acquirer double answering a fixed state and counting queries
struct FixedStatus {
    state: Mutex<TransactionState>,
    calls: Mutex<usize>,
    fail: bool,
}

impl FixedStatus {
    fn new(state: TransactionState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(0),
            fail: false,
        }
    }
}

#[async_trait]
impl TransactionStatusProvider for FixedStatus {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn check_transaction(&self, _transaction: &PaymentTransaction) -> PaymentResult<StatusUpdate> {
        *self.calls.lock() += 1;
        if self.fail {
            return Err(PaymentError::Network("connection refused".into()));
        }
        Ok(StatusUpdate::new(*self.state.lock()))
    }
}

async fn with_charge(store: &MemoryStore, service: &InvaderPaymentService) -> PaymentTransaction {
    let mut attempt = start(service, 1, "bacenpix").await.unwrap();
    attempt.transaction.acquirer_reference = Some("CHAR_1".into());
    attempt.transaction.set_pending();
    store.update_transaction(&attempt.transaction).await.unwrap();
    attempt.transaction
}

#[tokio::test]
async fn test_notification_without_match_changes_nothing() {
    let (store, payables, service) = deployment();
    let tx = with_charge(&store, &service).await;
    let status = Arc::new(FixedStatus::new(TransactionState::Done));
    let receiver = NotificationReceiver::new(store.clone(), payables, status.clone());

    assert!(!receiver.receive(TransactionLookup::AcquirerReference("CHAR_X".into())).await);
    assert_eq!(*status.calls.lock(), 0);
    assert_eq!(store.transaction(tx.id).await.unwrap().state, TransactionState::Pending);
}

#[tokio::test]
async fn test_notification_requeries_and_is_idempotent() {
    let (store, payables, service) = deployment();
    let tx = with_charge(&store, &service).await;
    let status = Arc::new(FixedStatus::new(TransactionState::Done));
    let receiver = NotificationReceiver::new(store.clone(), payables.clone(), status.clone());
    let lookup = TransactionLookup::AcquirerReference("CHAR_1".into());

    assert!(receiver.receive(lookup.clone()).await);
    assert!(receiver.receive(lookup).await);

    assert_eq!(*status.calls.lock(), 2);
    let stored = store.transaction(tx.id).await.unwrap();
    assert_eq!(stored.state, TransactionState::Done);
    assert_eq!(payables.accepted(), vec![42]);
}

#[tokio::test]
async fn test_notification_by_tx_id() {
    let (store, payables, service) = deployment();
    let tx = with_charge(&store, &service).await;
    let status = Arc::new(FixedStatus::new(TransactionState::Cancel));
    let receiver = NotificationReceiver::new(store.clone(), payables.clone(), status);

    assert!(
        receiver
            .receive(TransactionLookup::TxId("txid0123456789abcdefghijklmn".into()))
            .await
    );
    assert_eq!(store.transaction(tx.id).await.unwrap().state, TransactionState::Cancel);
    assert!(payables.accepted().is_empty());
}

#[tokio::test]
async fn test_notification_requery_failure_is_false() {
    let (store, payables, service) = deployment();
    let tx = with_charge(&store, &service).await;
    let status = Arc::new(FixedStatus {
        fail: true,
        ..FixedStatus::new(TransactionState::Done)
    });
    let receiver = NotificationReceiver::new(store.clone(), payables, status);

    assert!(!receiver.receive(TransactionLookup::AcquirerReference("CHAR_1".into())).await);
    assert_eq!(store.transaction(tx.id).await.unwrap().state, TransactionState::Pending);
}

#[tokio::test]
async fn test_notification_with_several_matches_changes_nothing() {
    let (store, payables, service) = deployment();
    let first = with_charge(&store, &service).await;
    let second = with_charge(&store, &service).await;
    let status = Arc::new(FixedStatus::new(TransactionState::Done));
    let receiver = NotificationReceiver::new(store.clone(), payables.clone(), status.clone());

    assert!(!receiver.receive(TransactionLookup::AcquirerReference("CHAR_1".into())).await);

    assert_eq!(*status.calls.lock(), 0);
    for tx in [first, second] {
        assert_eq!(store.transaction(tx.id).await.unwrap().state, TransactionState::Pending);
    }
    assert!(payables.accepted().is_empty());
}

#[tokio::test]
async fn test_done_transaction_ignores_later_pending_status() {
    let (store, payables, service) = deployment();
    let tx = with_charge(&store, &service).await;
    let status = Arc::new(FixedStatus::new(TransactionState::Done));
    let receiver = NotificationReceiver::new(store.clone(), payables.clone(), status.clone());
    let lookup = TransactionLookup::AcquirerReference("CHAR_1".into());

    assert!(receiver.receive(lookup.clone()).await);
    *status.state.lock() = TransactionState::Pending;
    assert!(receiver.receive(lookup).await);

    assert_eq!(store.transaction(tx.id).await.unwrap().state, TransactionState::Done);
    assert_eq!(payables.accepted(), vec![42]);
}

/// Resolver whose transaction lookup fails a given number of times
struct FlakyResolver {
    inner: Arc<MemoryPayables>,
    failures: Mutex<usize>,
}

#[async_trait]
impl PayableResolver for FlakyResolver {
    fn allowed_targets(&self) -> Vec<String> {
        self.inner.allowed_targets()
    }

    async fn find_payable(&self, target: &str, request: &RestRequest) -> PaymentResult<Payable> {
        self.inner.find_payable(target, request).await
    }

    async fn find_payable_from_transaction(
        &self,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<Payable> {
        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(PaymentError::Unhandled("payable storage offline".into()));
            }
        }
        self.inner.find_payable_from_transaction(transaction).await
    }

    async fn set_payment_mode(&self, payable: &Payable, mode: &PaymentMode) -> PaymentResult<()> {
        self.inner.set_payment_mode(payable, mode).await
    }

    async fn payment_accepted(
        &self,
        payable: &Payable,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<()> {
        self.inner.payment_accepted(payable, transaction).await
    }
}

#[tokio::test]
async fn test_payment_accepted_is_retried_on_next_notification() {
    let (store, payables, service) = deployment();
    let tx = with_charge(&store, &service).await;
    let resolver = Arc::new(FlakyResolver {
        inner: payables.clone(),
        failures: Mutex::new(1),
    });
    let status = Arc::new(FixedStatus::new(TransactionState::Done));
    let receiver = NotificationReceiver::new(store.clone(), resolver, status);
    let lookup = TransactionLookup::AcquirerReference("CHAR_1".into());

    assert!(!receiver.receive(lookup.clone()).await);
    let stored = store.transaction(tx.id).await.unwrap();
    assert_eq!(stored.state, TransactionState::Done);
    assert!(!stored.accepted_notified);
    assert!(payables.accepted().is_empty());

    assert!(receiver.receive(lookup.clone()).await);
    assert!(receiver.receive(lookup).await);
    assert!(store.transaction(tx.id).await.unwrap().accepted_notified);
    assert_eq!(payables.accepted(), vec![42]);
}
