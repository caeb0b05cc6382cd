//! Payment methods and how an order is submitted for each.
//!
//! Every placement attempt runs exactly one [`SubmissionStrategy`]:
//! a provider flow for the three providers with their own checkout handshake,
//! a multipart upload when a receipt must be attached, or a plain form POST
//! to the backend for everything else.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Payment methods a store can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "cod")]
    CashOnDelivery,
    #[serde(rename = "bank_transfer")]
    BankTransfer,
    #[serde(rename = "stripe")]
    Stripe,
    #[serde(rename = "paypal")]
    Paypal,
    #[serde(rename = "razorpay")]
    Razorpay,
    #[serde(rename = "paystack")]
    Paystack,
    #[serde(rename = "flutterwave")]
    Flutterwave,
    #[serde(rename = "mercadopago")]
    MercadoPago,
    #[serde(rename = "skrill")]
    Skrill,
    #[serde(rename = "coingate")]
    CoinGate,
}

/// Providers whose checkout is driven through a dedicated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostedProvider {
    Razorpay,
    Paystack,
    Flutterwave,
}

/// How an order is handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStrategy {
    /// Provider handshake; ends in an order number or a provider redirect.
    Provider(HostedProvider),
    /// Hidden-form POST navigation to the backend order endpoint.
    FormPost,
    /// Multipart POST carrying an attachment (bank-transfer receipt).
    Multipart,
}

impl PaymentMethod {
    pub const ALL: [Self; 10] = [
        Self::CashOnDelivery,
        Self::BankTransfer,
        Self::Stripe,
        Self::Paypal,
        Self::Razorpay,
        Self::Paystack,
        Self::Flutterwave,
        Self::MercadoPago,
        Self::Skrill,
        Self::CoinGate,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cod",
            Self::BankTransfer => "bank_transfer",
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
            Self::Razorpay => "razorpay",
            Self::Paystack => "paystack",
            Self::Flutterwave => "flutterwave",
            Self::MercadoPago => "mercadopago",
            Self::Skrill => "skrill",
            Self::CoinGate => "coingate",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on delivery",
            Self::BankTransfer => "Bank transfer",
            Self::Stripe => "Credit / debit card (Stripe)",
            Self::Paypal => "PayPal",
            Self::Razorpay => "Razorpay",
            Self::Paystack => "Paystack",
            Self::Flutterwave => "Flutterwave",
            Self::MercadoPago => "Mercado Pago",
            Self::Skrill => "Skrill",
            Self::CoinGate => "CoinGate (crypto)",
        }
    }

    /// Whether the buyer must attach a payment receipt.
    #[must_use]
    pub const fn requires_receipt(self) -> bool {
        matches!(self, Self::BankTransfer)
    }

    #[must_use]
    pub const fn strategy(self) -> SubmissionStrategy {
        match self {
            Self::Razorpay => SubmissionStrategy::Provider(HostedProvider::Razorpay),
            Self::Paystack => SubmissionStrategy::Provider(HostedProvider::Paystack),
            Self::Flutterwave => SubmissionStrategy::Provider(HostedProvider::Flutterwave),
            Self::BankTransfer => SubmissionStrategy::Multipart,
            Self::CashOnDelivery
            | Self::Stripe
            | Self::Paypal
            | Self::MercadoPago
            | Self::Skrill
            | Self::CoinGate => SubmissionStrategy::FormPost,
        }
    }
}

impl HostedProvider {
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Razorpay => "razorpay",
            Self::Paystack => "paystack",
            Self::Flutterwave => "flutterwave",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl fmt::Display for HostedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.slug() == wanted)
            .ok_or_else(|| format!("unknown payment method: {s}"))
    }
}

/// The payment methods a store has switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnabledPaymentMethods(BTreeSet<PaymentMethod>);

impl EnabledPaymentMethods {
    /// Build from the backend's `{"stripe": true, "cod": false, ...}` map.
    /// Unknown keys are ignored.
    #[must_use]
    pub fn from_flags(flags: &BTreeMap<String, bool>) -> Self {
        Self(
            flags
                .iter()
                .filter(|(_, enabled)| **enabled)
                .filter_map(|(key, _)| key.parse().ok())
                .collect(),
        )
    }

    #[must_use]
    pub fn is_enabled(&self, method: PaymentMethod) -> bool {
        self.0.contains(&method)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enabled methods in display order.
    pub fn iter(&self) -> impl Iterator<Item = PaymentMethod> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PaymentMethod> for EnabledPaymentMethods {
    fn from_iter<I: IntoIterator<Item = PaymentMethod>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
