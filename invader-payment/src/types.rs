//! Payment types and data structures

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of a payable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    /// Tax id (CPF / CNPJ)
    pub vat: Option<String>,
}

impl Partner {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            vat: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn vat(mut self, vat: impl Into<String>) -> Self {
        self.vat = Some(vat.into());
        self
    }
}

/// The thing being paid for: a cart, an order, an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payable {
    pub id: i64,
    /// Display reference (`SO042`)
    pub reference: String,
    pub partner: Partner,
    pub amount: Money,
    pub payment_mode_id: Option<i64>,
}

impl Payable {
    pub fn new(id: i64, reference: impl Into<String>, partner: Partner, amount: Money) -> Self {
        Self {
            id,
            reference: reference.into(),
            partner,
            amount,
            payment_mode_id: None,
        }
    }
}

/// Payment acquirer account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquirer {
    pub id: i64,
    pub name: String,
    /// Provider tag (`bacenpix`, `pagseguro`)
    pub provider: String,
}

impl Acquirer {
    pub fn new(id: i64, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            provider: provider.into(),
        }
    }
}

/// Checkout-selectable payment mode bound to one acquirer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMode {
    pub id: i64,
    pub name: String,
    pub acquirer: Acquirer,
}

impl PaymentMode {
    pub fn new(id: i64, name: impl Into<String>, acquirer: Acquirer) -> Self {
        Self {
            id,
            name: name.into(),
            acquirer,
        }
    }

    pub fn provider(&self) -> &str {
        &self.acquirer.provider
    }
}

/// Payment method tag sent to acquirers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    Pix,
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "CREDIT_CARD",
            Self::Pix => "PIX",
            Self::Boleto => "BOLETO",
        }
    }

}

/// Card data posted by the storefront; the number itself arrives
/// encrypted with the acquirer's public key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    pub holder_name: String,
    /// Encrypted card
    pub token: String,
    pub installments: u32,
}

/// Acquirer credential created for one payment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentToken {
    pub id: i64,
    pub acquirer_id: i64,
    pub partner_id: i64,
    pub acquirer_ref: String,
    pub payment_method: PaymentMethod,
    pub card: Option<CardDetails>,
    pub created_at: DateTime<Utc>,
}

impl PaymentToken {
    /// Unsaved token; the store assigns the id
    pub fn new(acquirer: &Acquirer, payable: &Payable, payment_method: PaymentMethod) -> Self {
        Self {
            id: 0,
            acquirer_id: acquirer.id,
            partner_id: payable.partner.id,
            acquirer_ref: payable.partner.id.to_string(),
            payment_method,
            card: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_card(mut self, card: CardDetails) -> Self {
        self.card = Some(card);
        self
    }
}

/// Transaction lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Draft,
    Pending,
    Authorized,
    Done,
    Cancel,
    Error,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Done => "done",
            Self::Cancel => "cancel",
            Self::Error => "error",
        }
    }

    /// Payment accepted by the acquirer
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Authorized | Self::Done)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Cancel | Self::Error)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancel | Self::Error)
    }

    /// Whether the lifecycle allows moving from `self` to `next`. A
    /// terminal state only accepts a new message for itself.
    pub fn can_move_to(&self, next: TransactionState) -> bool {
        match self {
            _ if *self == next => true,
            Self::Done | Self::Cancel | Self::Error => false,
            Self::Authorized => matches!(next, Self::Done | Self::Cancel),
            Self::Draft | Self::Pending => true,
        }
    }
}

/// PIX collection ("cobrança") returned by the acquirer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixCollection {
    /// Creation timestamp as reported by the acquirer
    pub created_at: Option<String>,
    /// Lifetime in seconds
    pub expiration: Option<String>,
    pub location: Option<String>,
    /// "Copia e cola" payload rendered as QR code
    pub qr_code_text: Option<String>,
    pub txid: Option<String>,
    /// Receiving PIX key
    pub key: Option<String>,
}

impl PixCollection {
    /// Storefront response shape
    pub fn to_response(&self) -> serde_json::Value {
        serde_json::json!({
            "calendario": {
                "criacao": self.created_at.clone().unwrap_or_default(),
                "expiracao": self.expiration.clone().unwrap_or_default(),
            },
            "location": self.location.clone().unwrap_or_default(),
            "textoImagemQRcode": self.qr_code_text.clone().unwrap_or_default(),
            "txid": self.txid.clone().unwrap_or_default(),
            "chave": self.key.clone().unwrap_or_default(),
        })
    }
}

/// Record of one payment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub reference: String,
    pub payable_id: i64,
    pub partner_id: i64,
    pub amount: Money,
    pub payment_mode_id: i64,
    pub acquirer_id: i64,
    pub payment_token_id: i64,
    /// Correlation id chosen by the storefront (PIX txid)
    pub tx_id: Option<String>,
    /// Id assigned by the acquirer
    pub acquirer_reference: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub state: TransactionState,
    pub state_message: Option<String>,
    pub pix: Option<PixCollection>,
    /// Set once the payable has been told about the payment
    #[serde(default)]
    pub accepted_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    /// Move to `state`, returning whether anything changed. Re-applying
    /// the current state and message is a no-op, and so is any move the
    /// lifecycle forbids: nothing leaves `done`, `cancel` or `error`, and
    /// an authorized payment can only be captured or cancelled.
    pub fn set_state(&mut self, state: TransactionState, message: Option<String>) -> bool {
        if self.state == state && (message.is_none() || self.state_message == message) {
            return false;
        }
        if !self.state.can_move_to(state) {
            invader_log::debug!(
                "ignoring {} -> {} on {}", self.state.as_str(), state.as_str(), self.reference
            );
            return false;
        }
        self.state = state;
        if message.is_some() {
            self.state_message = message;
        } else if state.is_success() {
            self.state_message = None;
        }
        self.updated_at = Utc::now();
        true
    }

    /// Accepted by the acquirer but not yet reported to the payable
    pub fn awaits_acceptance(&self) -> bool {
        self.state.is_success() && !self.accepted_notified
    }

    pub fn set_pending(&mut self) -> bool {
        self.set_state(TransactionState::Pending, None)
    }

    pub fn set_authorized(&mut self) -> bool {
        self.set_state(TransactionState::Authorized, None)
    }

    pub fn set_done(&mut self) -> bool {
        self.set_state(TransactionState::Done, None)
    }

    pub fn set_error(&mut self, message: impl Into<String>) -> bool {
        self.set_state(TransactionState::Error, Some(message.into()))
    }
}
