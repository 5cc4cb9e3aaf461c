use std::fmt;

use maud::{html, Markup};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{
    cart::{self, CartItem},
    config::SquareConfig,
};

pub const WEB_SDK_URL: &str = "https://web.squarecdn.com/v1/square.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkError {
    /// Credentials are missing or the SDK cannot run here.
    Unavailable,
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Square payments SDK is not available"),
        }
    }
}

/// Initialized payments client handle. Existence of a handle means the SDK
/// script has been emitted for this page lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkHandle {
    pub application_id: String,
    pub location_id: String,
}

impl SdkHandle {
    pub fn script_tag(&self) -> Markup {
        html! { script src=(WEB_SDK_URL) {} }
    }
}

/// Loads the payments SDK at most once per page lifetime. Concurrent
/// callers await the same initialization instead of injecting the script
/// twice, and a remounted widget reuses the existing handle.
#[derive(Default)]
pub struct SdkLoader {
    handle: OnceCell<SdkHandle>,
}

impl SdkLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure_loaded(&self, config: &SquareConfig) -> Result<&SdkHandle, SdkError> {
        self.handle
            .get_or_try_init(|| async {
                let application_id = config.application_id.clone().ok_or(SdkError::Unavailable)?;
                let location_id = config.location_id.clone().ok_or(SdkError::Unavailable)?;
                info!(%application_id, "square payments SDK initialized");
                Ok(SdkHandle {
                    application_id,
                    location_id,
                })
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }
}

/// Line shown in the Apple Pay sheet. Amounts are decimal strings with
/// two digits, per the Web Payments SDK contract.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentLine {
    pub label: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub country_code: String,
    pub currency_code: String,
    pub total: PaymentLine,
    pub line_items: Vec<PaymentLine>,
}

pub fn payment_request(items: &[CartItem]) -> PaymentRequest {
    PaymentRequest {
        country_code: "US".to_string(),
        currency_code: "USD".to_string(),
        total: PaymentLine {
            label: "Total".to_string(),
            amount: cart::two_dp(cart::order_total(items)),
        },
        line_items: items
            .iter()
            .map(|item| PaymentLine {
                label: item.name.clone(),
                amount: cart::two_dp(item.line_total()),
            })
            .collect(),
    }
}
