//! Sandbox deployment: in-memory store and cart, acquirers mounted from
//! the `bb` and `pagseguro` configuration sections

use invader_config::{ConfigError, ConfigManager};
use invader_core::Router;
use invader_payment::memory::{MemoryPayables, MemoryStore};
use invader_payment::{
    Acquirer, InvaderPaymentService, Money, Partner, Payable, PaymentError, PaymentMode,
};
use invader_payment_bb::{BbConfig, BbPixClient, BbPixService};
use invader_payment_pagseguro::{
    PagseguroClient, PagseguroConfig, PagseguroNotifications, PagseguroService,
};
use std::sync::Arc;

/// Payment mode served by Banco do Brasil
pub const BB_PIX_MODE: i64 = 1;

/// Payment mode served by PagSeguro
pub const PAGSEGURO_MODE: i64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("payment setup error: {0}")]
    Payment(#[from] PaymentError),
}

/// Store holding one payment mode per acquirer
pub fn demo_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_payment_mode(PaymentMode::new(
        BB_PIX_MODE,
        "PIX",
        Acquirer::new(1, "Banco do Brasil", invader_payment_bb::PROVIDER),
    ));
    store.add_payment_mode(PaymentMode::new(
        PAGSEGURO_MODE,
        "PagSeguro",
        Acquirer::new(2, "PagSeguro", invader_payment_pagseguro::PROVIDER),
    ));
    store
}

/// One open cart, id 1, for a customer with a CPF
pub fn demo_payables() -> MemoryPayables {
    let payables = MemoryPayables::new();
    payables.insert(Payable::new(
        1,
        "SO001",
        Partner::new(1, "Cliente Sandbox")
            .email("sandbox@example.com")
            .vat("529.982.247-25"),
        Money::brl(10_000),
    ));
    payables
}

/// Mount every acquirer whose section is present in `config`
pub fn router(
    config: &ConfigManager,
    payment: InvaderPaymentService,
) -> Result<Router, SandboxError> {
    let mut router = Router::new();

    if config.has("bb") {
        let bb: BbConfig = config.section("bb")?;
        let client = Arc::new(BbPixClient::new(bb)?);
        router.mount(Arc::new(BbPixService::new(payment.clone(), client)));
        invader_log::info!("Banco do Brasil PIX mounted"; "usage" => "payment_bacen_pix");
    }

    if config.has("pagseguro") {
        let pagseguro: PagseguroConfig = config.section("pagseguro")?;
        let client = Arc::new(PagseguroClient::new(pagseguro)?);
        router.mount(Arc::new(PagseguroNotifications::new(&payment, client.clone())));
        router.mount(Arc::new(PagseguroService::new(payment, client)));
        invader_log::info!("PagSeguro mounted"; "usage" => "payment_pagseguro");
    }

    if router.route_count() == 0 {
        invader_log::warn!("no acquirer configured, every payment route will answer 404");
    }
    Ok(router)
}
