use std::fmt;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use maud::{html, Markup, PreEscaped};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    api::{self, ApiClient},
    cart::{self, CartItem},
    components, content, debug,
    err_responses::ErrorResponse,
    icons,
    session::Storage as _,
    square::{self, SdkError},
    AppState,
};

pub const PAYMENT_ENDPOINT: &str = "/api/payments/apple-pay";

pub const UNSUPPORTED_MESSAGE: &str = "Apple Pay is not available on this device or browser.";
pub const TOKENIZATION_MESSAGE: &str =
    "Your card could not be processed. Please try a different payment method.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Payment failed. Please try again.";

/// Display time for the success panel before the caller's success
/// continuation runs, in milliseconds.
pub const SUCCESS_DISPLAY_MS: u32 = 2000;

#[derive(Debug)]
pub enum PaymentError {
    /// The device or browser cannot present Apple Pay.
    Unsupported,
    /// The SDK failed to produce a token; the backend was never called.
    Tokenization,
    /// The backend rejected the payment, with its detail text when sent.
    Rejected(String),
    /// The request never completed.
    Transport(reqwest::Error),
}

impl PaymentError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Unsupported => UNSUPPORTED_MESSAGE.to_string(),
            Self::Tokenization => TOKENIZATION_MESSAGE.to_string(),
            Self::Rejected(detail) => detail.clone(),
            Self::Transport(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    Idle,
    SdkLoading,
    SdkReady { supported: bool },
    Processing,
    Success,
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerDetails {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
struct PaymentSubmission<'a> {
    token: &'a str,
    amount: i64,
    currency: &'static str,
    items: &'a [CartItem],
    buyer_details: Option<&'a BuyerDetails>,
    user_email: Option<&'a str>,
}

#[derive(Deserialize)]
struct PaymentAccepted {
    payment_id: String,
    payment_code: Option<String>,
}

/// Handed to the caller exactly once, after a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResult {
    pub payment_method: &'static str,
    pub transaction_id: String,
    pub amount: Decimal,
    pub payment_code: Option<String>,
}

/// Checkout widget state. SDK setup, button attachment, and token handling
/// run in program order; every exit from `Processing` clears the flag.
pub struct Checkout {
    items: Vec<CartItem>,
    phase: CheckoutPhase,
}

impl Checkout {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self {
            items,
            phase: CheckoutPhase::Idle,
        }
    }

    pub fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> Decimal {
        cart::order_total(&self.items)
    }

    pub fn is_processing(&self) -> bool {
        self.phase == CheckoutPhase::Processing
    }

    pub fn begin_sdk_load(&mut self) {
        if self.phase == CheckoutPhase::Idle {
            self.phase = CheckoutPhase::SdkLoading;
        }
    }

    /// SDK finished loading and reported whether the payment method can be
    /// presented here. Unsupported devices land in the error state while
    /// the order summary stays on screen.
    pub fn sdk_ready(&mut self, supported: bool) {
        self.phase = if supported {
            CheckoutPhase::SdkReady { supported }
        } else {
            CheckoutPhase::Error(UNSUPPORTED_MESSAGE.to_string())
        };
    }

    pub fn sdk_failed(&mut self, err: SdkError) {
        warn!(%err, "payments SDK unavailable");
        self.phase = CheckoutPhase::Error(UNSUPPORTED_MESSAGE.to_string());
    }

    /// The SDK reported a tokenization error. No backend call is made.
    pub fn tokenization_failed(&mut self) {
        self.phase = CheckoutPhase::Error(TOKENIZATION_MESSAGE.to_string());
    }

    /// Cancellation is available from every state except success, and
    /// never reaches the backend.
    pub fn cancel(&mut self) -> bool {
        if self.phase == CheckoutPhase::Success {
            return false;
        }
        self.phase = CheckoutPhase::Idle;
        true
    }

    /// Submit a tokenized payment to the backend. Retrying from the error
    /// state re-enters `Processing` with the same order.
    pub async fn submit_token(
        &mut self,
        api: &ApiClient,
        token: &str,
        buyer: Option<&BuyerDetails>,
    ) -> Result<PaymentResult, PaymentError> {
        self.phase = CheckoutPhase::Processing;

        let total = self.total();
        let user_email = api.session().user().and_then(|u| u.email);
        let submission = PaymentSubmission {
            token,
            amount: cart::minor_units(total),
            currency: "USD",
            items: &self.items,
            buyer_details: buyer,
            user_email: user_email.as_deref(),
        };

        let response = match api.post_json(PAYMENT_ENDPOINT, &submission).await {
            Ok(response) => response,
            Err(err) => {
                self.phase = CheckoutPhase::Error(GENERIC_FAILURE_MESSAGE.to_string());
                return Err(PaymentError::Transport(err));
            }
        };

        if !response.status().is_success() {
            let detail = api::error_detail(response)
                .await
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            self.phase = CheckoutPhase::Error(detail.clone());
            return Err(PaymentError::Rejected(detail));
        }

        let accepted: PaymentAccepted = match response.json().await {
            Ok(accepted) => accepted,
            Err(err) => {
                self.phase = CheckoutPhase::Error(GENERIC_FAILURE_MESSAGE.to_string());
                return Err(PaymentError::Transport(err));
            }
        };

        self.phase = CheckoutPhase::Success;
        info!(payment_id = %accepted.payment_id, "payment accepted");
        Ok(PaymentResult {
            payment_method: "apple_pay",
            transaction_id: accepted.payment_id,
            amount: total,
            payment_code: accepted.payment_code,
        })
    }
}

// ---- handlers ----

fn order_summary(items: &[CartItem]) -> Markup {
    html! {
        ."card"."bg-base-200"."w-full" { ."card-body" {
            ."card-title" {"Order Summary"}
            @if items.is_empty() {
                p {"Your cart is empty."}
            } @else {
                table ."table" {
                    tbody {
                        @for item in items {
                            tr {
                                td {(item.name)}
                                td {"×"(item.quantity)}
                                td ."text-right" {(cart::fmt_usd(item.line_total()))}
                            }
                        }
                        tr ."border-t-2"."font-bold" {
                            td {"Total"}
                            td {}
                            td ."text-right" {(cart::fmt_usd(cart::order_total(items)))}
                        }
                    }
                }
            }
        }}
    }
}

fn apple_pay_script(handle: &square::SdkHandle, items: &[CartItem]) -> Markup {
    let request = square::payment_request(items);
    html! {
        script {(PreEscaped(format!(
            r#"
            async function attachApplePay() {{
                const status = $('#checkout-status');
                if (!window.Square) {{ status.text({unsupported:?}); return; }}
                try {{
                    const payments = window.Square.payments({app_id:?}, {location_id:?});
                    const request = payments.paymentRequest({request});
                    const applePay = await payments.applePay(request);
                    $('#apple-pay-button').on('click', async () => {{
                        status.text('');
                        const result = await applePay.tokenize();
                        if (result.status !== 'OK') {{ status.text({tokenization:?}); return; }}
                        const response = await fetch('/checkout/pay', {{
                            method: 'POST',
                            headers: {{'Content-Type': 'application/json'}},
                            body: JSON.stringify({{token: result.token}}),
                        }});
                        $('#checkout-result').html(await response.text());
                    }});
                    $('#apple-pay-button').prop('disabled', false);
                }} catch (err) {{
                    status.text({unsupported:?});
                }}
            }}
            attachApplePay();
            "#,
            app_id = handle.application_id,
            location_id = handle.location_id,
            request = serde_json::to_string(&request).unwrap(),
            unsupported = UNSUPPORTED_MESSAGE,
            tokenization = TOKENIZATION_MESSAGE,
        )))}
    }
}

fn session_cart(state: &AppState) -> Vec<CartItem> {
    state
        .session()
        .storage()
        .get(cart::CART_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub async fn checkout_page(State(state): State<AppState>, headers: HeaderMap) -> Markup {
    let items = session_cart(&state);
    let user = state.session().user();
    let sdk = state.sdk.ensure_loaded(&state.config.square).await;

    components::layout(
        html! {
            span ."navbar-start"."text-xl"."font-bold" {"Canopy"}
            a ."btn"."btn-ghost"."navbar-end" href="/checkout/cancel" {"Back to Cart"}
        },
        Some(html! {
            ."max-w-xl"."mx-auto"."grid"."gap-4" {
                (order_summary(&items))
                (content::membership_panel(user.as_ref()))
                #"checkout-result" {}
                @match &sdk {
                    Ok(handle) => {
                        button #"apple-pay-button" ."btn"."btn-primary"."btn-block" disabled {
                            "Pay with Apple Pay"
                        }
                        p #"checkout-status" ."text-error" {}
                        (handle.script_tag())
                        (apple_pay_script(handle, &items))
                    }
                    Err(_) => {
                        ."alert"."alert-warning" {(icons::error()) span {(UNSUPPORTED_MESSAGE)}}
                    }
                }
                @if state.config.is_development() {
                    (debug::overlay(&state, crate::page_location(&headers).as_ref()))
                }
            }
        }),
    )
}

#[derive(Deserialize)]
pub struct PayRequest {
    pub token: String,
    #[serde(default)]
    pub buyer_details: Option<BuyerDetails>,
}

/// Success panel shown for two seconds before navigating on with the
/// payment result, mirroring the widget's success callback delay.
fn success_panel(result: &PaymentResult) -> Markup {
    // Ids come from the backend verbatim; encode them before they land in
    // a query string.
    let continue_url = format!(
        "/?payment_method={}&transaction_id={}&amount={}{}",
        result.payment_method,
        urlencoding::encode(&result.transaction_id),
        cart::two_dp(result.amount),
        result
            .payment_code
            .as_deref()
            .map(|code| format!("&payment_code={}", urlencoding::encode(code)))
            .unwrap_or_default(),
    );
    html! {
        ."alert"."alert-success" {
            (icons::success())
            span {"Payment complete. "(cart::fmt_usd(result.amount))" charged."}
            @if let Some(code) = &result.payment_code {
                span ."font-mono" {"Pickup code: "(code)}
            }
        }
        script {(PreEscaped(format!(
            "setTimeout(() => {{ window.location = {continue_url:?}; }}, {SUCCESS_DISPLAY_MS});"
        )))}
    }
}

pub async fn pay(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PayRequest>,
) -> Response {
    let items = session_cart(&state);
    if items.is_empty() {
        return ErrorResponse::StatusCode(StatusCode::BAD_REQUEST).transform("Cart is empty");
    }

    let api = state.api(crate::page_location(&headers).as_ref());
    let mut checkout = Checkout::new(items);
    match checkout
        .submit_token(&api, &request.token, request.buyer_details.as_ref())
        .await
    {
        Ok(result) => success_panel(&result).into_response(),
        Err(err) => html! {
            ."alert"."alert-error" {(icons::error()) span {(err.user_message())}}
        }
        .into_response(),
    }
}

pub async fn cancel() -> Redirect {
    Redirect::to("/")
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(checkout_page))
        .route("/checkout/pay", post(pay))
        .route("/checkout/cancel", get(cancel))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{routing::post as axum_post, Json as AxumJson, Router as TestRouter};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::session::{MemoryStorage, Session};

    fn items() -> Vec<CartItem> {
        vec![CartItem {
            id: 1,
            name: "Item".to_string(),
            price: dec!(10.00),
            quantity: 2,
        }]
    }

    fn api(base_url: String) -> ApiClient {
        ApiClient::new(
            reqwest::Client::new(),
            base_url,
            Session::new(Arc::new(MemoryStorage::default())),
        )
    }

    async fn spawn(app: TestRouter) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn mounts_idle_then_loads_sdk() {
        let mut checkout = Checkout::new(items());
        assert_eq!(*checkout.phase(), CheckoutPhase::Idle);
        checkout.begin_sdk_load();
        assert_eq!(*checkout.phase(), CheckoutPhase::SdkLoading);
        checkout.sdk_ready(true);
        assert_eq!(*checkout.phase(), CheckoutPhase::SdkReady { supported: true });
    }

    #[test]
    fn unsupported_device_is_an_error_state() {
        let mut checkout = Checkout::new(items());
        checkout.begin_sdk_load();
        checkout.sdk_ready(false);
        assert_eq!(
            *checkout.phase(),
            CheckoutPhase::Error(UNSUPPORTED_MESSAGE.to_string())
        );
    }

    #[test]
    fn sdk_load_failure_degrades_widget_only() {
        let mut checkout = Checkout::new(items());
        checkout.begin_sdk_load();
        checkout.sdk_failed(SdkError::Unavailable);
        assert_eq!(
            *checkout.phase(),
            CheckoutPhase::Error(UNSUPPORTED_MESSAGE.to_string())
        );
        // The order itself is untouched.
        assert_eq!(checkout.total(), dec!(20.00));
    }

    #[test]
    fn tokenization_error_has_fixed_message_and_no_backend_call() {
        let mut checkout = Checkout::new(items());
        checkout.begin_sdk_load();
        checkout.sdk_ready(true);
        checkout.tokenization_failed();
        assert_eq!(
            *checkout.phase(),
            CheckoutPhase::Error(TOKENIZATION_MESSAGE.to_string())
        );
        assert!(!checkout.is_processing());
    }

    #[test]
    fn cancel_allowed_everywhere_but_success() {
        let mut checkout = Checkout::new(items());
        assert!(checkout.cancel());

        checkout.begin_sdk_load();
        checkout.sdk_ready(true);
        assert!(checkout.cancel());

        checkout.tokenization_failed();
        assert!(checkout.cancel());

        checkout.phase = CheckoutPhase::Success;
        assert!(!checkout.cancel());
    }

    #[test]
    fn success_redirect_encodes_backend_ids() {
        let result = PaymentResult {
            payment_method: "apple_pay",
            transaction_id: "pay 1&x=#y".to_string(),
            amount: dec!(20.00),
            payment_code: Some("PU 42&z".to_string()),
        };
        let markup = success_panel(&result).into_string();
        assert!(markup.contains("transaction_id=pay%201%26x%3D%23y"));
        assert!(markup.contains("payment_code=PU%2042%26z"));
        assert!(!markup.contains("transaction_id=pay 1"));
    }

    #[tokio::test]
    async fn successful_submission_produces_payment_result() {
        let base = spawn(TestRouter::new().route(
            PAYMENT_ENDPOINT,
            axum_post(|AxumJson(body): AxumJson<serde_json::Value>| async move {
                assert_eq!(body["amount"], 2000);
                assert_eq!(body["currency"], "USD");
                assert_eq!(body["token"], "cnon:ok");
                AxumJson(json!({"payment_id": "pay_1", "payment_code": "PU-42"}))
            }),
        ))
        .await;

        let mut checkout = Checkout::new(items());
        let result = checkout
            .submit_token(&api(base), "cnon:ok", None)
            .await
            .unwrap();

        assert_eq!(*checkout.phase(), CheckoutPhase::Success);
        assert_eq!(result.payment_method, "apple_pay");
        assert_eq!(result.transaction_id, "pay_1");
        assert_eq!(result.amount, dec!(20.00));
        assert_eq!(result.payment_code.as_deref(), Some("PU-42"));
    }

    #[tokio::test]
    async fn backend_rejection_surfaces_detail_text() {
        let base = spawn(TestRouter::new().route(
            PAYMENT_ENDPOINT,
            axum_post(|| async {
                (
                    StatusCode::PAYMENT_REQUIRED,
                    AxumJson(json!({"detail": "Card declined by issuer"})),
                )
            }),
        ))
        .await;

        let mut checkout = Checkout::new(items());
        let err = checkout
            .submit_token(&api(base), "cnon:bad", None)
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Card declined by issuer");
        assert_eq!(
            *checkout.phase(),
            CheckoutPhase::Error("Card declined by issuer".to_string())
        );
        assert!(!checkout.is_processing());
    }

    #[tokio::test]
    async fn rejection_without_detail_falls_back_to_generic() {
        let base = spawn(TestRouter::new().route(
            PAYMENT_ENDPOINT,
            axum_post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let mut checkout = Checkout::new(items());
        let err = checkout
            .submit_token(&api(base), "cnon:bad", None)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn transport_failure_clears_processing_and_allows_retry() {
        let mut checkout = Checkout::new(items());
        let err = checkout
            .submit_token(&api("http://127.0.0.1:1".to_string()), "cnon:x", None)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(!checkout.is_processing());

        // User-initiated retry from the error state.
        let base = spawn(TestRouter::new().route(
            PAYMENT_ENDPOINT,
            axum_post(|| async { AxumJson(json!({"payment_id": "pay_2"})) }),
        ))
        .await;
        let result = checkout.submit_token(&api(base), "cnon:x", None).await.unwrap();
        assert_eq!(result.transaction_id, "pay_2");
        assert!(result.payment_code.is_none());
    }
}
