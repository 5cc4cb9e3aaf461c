use axum::{
    extract::{NestedPath, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use maud::{html, Markup};
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use tracing::warn;

use crate::{
    cart,
    components::{self, ToastAlert},
    err_responses::{ErrorResponse, MapErrorResponse},
    icons, AppState,
};

pub mod client;
pub mod dashboard;
pub mod export;

use self::client::{QuickStats, Report, ReportSummary, RECENT_LIMIT};
use self::dashboard::GenerateGuard;

const LOAD_FAILURE_MESSAGE: &str = "Failed to load report. Please try again.";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/recent", get(recent_reports))
        .route("/quick-stats", get(quick_stats))
        .route("/generate", post(generate))
        .route("/{id}", get(view_report))
        .route("/{id}/export", get(export_report))
        .with_state(state)
}

fn generate_form(nest: &NestedPath, generating: bool) -> Markup {
    html! {
        ."card"."bg-base-200"."w-full" { form hx-post={(nest.as_str())"/generate"}
            hx-target="#report-detail" hx-disabled-elt="find button" ."card-body" {
            ."card-title" {"Generate Daily Report"}
            label ."input"."input-bordered"."flex"."items-center"."gap-2" {
                input type="date" name="report_date" ."grow"."bg-inherit";
            }
            ."card-actions"."justify-center" {
                button ."btn"."btn-primary"."w-1/2" disabled[generating] {"GENERATE"}
            }
        }}
    }
}

fn quick_stats_card(stats: Option<&QuickStats>) -> Markup {
    html! { ."stats"."shadow"."w-full" {
        @match stats {
            Some(stats) => {
                ."stat" {
                    ."stat-title" {"Today's Square Sales"}
                    ."stat-value" {(cart::fmt_usd(stats.total_square_sales))}
                }
                ."stat" {
                    ."stat-title" {"Transactions"}
                    ."stat-value" {(stats.total_transactions)}
                }
                ."stat" {
                    ."stat-title" {"Average"}
                    ."stat-value" {(cart::fmt_usd(stats.average_transaction))}
                }
            }
            None => {
                ."stat" { ."stat-title" {"Today's Square Sales"} ."stat-value" {"—"} }
            }
        }
    }}
}

fn summaries_table(nest: &NestedPath, summaries: &[ReportSummary]) -> Markup {
    html! {
        ."overflow-x-auto" { table ."table"."table-zebra"."table-auto" {
            thead { tr {
                th {"Report Date"}
                th {"Total"}
                th {"Transactions"}
                th {"Actions"}
            }}
            tbody {
                @for summary in summaries {
                    tr {
                        td {(summary.report_date)}
                        td {(cart::fmt_usd(summary.total_amount))}
                        td {(summary.total_transactions)}
                        td ."[&>*]:mx-1" {
                            button ."btn"."btn-outline"."btn-sm"
                                hx-get={(nest.as_str())"/"(summary.report_id)}
                                hx-target="#report-detail" {"View"}
                            a ."btn"."btn-circle"."btn-outline"."btn-sm"
                                href={(nest.as_str())"/"(summary.report_id)"/export"}
                                { (icons::download()) }
                        }
                    }
                }
            }
        }}
    }
}

fn report_detail(report: &Report) -> Markup {
    html! {
        ."divider" {"Report for "(report.report_date)}
        ."stats"."shadow"."w-full" {
            ."stat" { ."stat-title" {"Total Sales"} ."stat-value" {(cart::fmt_usd(report.total_amount))} }
            ."stat" { ."stat-title" {"Transactions"} ."stat-value" {(report.total_transactions)} }
            ."stat" { ."stat-title" {"Successful"} ."stat-value" {(report.successful_payments)} }
            ."stat" { ."stat-title" {"Failed"} ."stat-value" {(report.failed_payments)} }
        }
        @if report.transactions.is_empty() {
            p ."text-center"."my-4" {"No transactions found for this date"}
        } @else {
            ."overflow-x-auto" { table ."table"."table-zebra" {
                thead { tr {
                    th {"Transaction ID"}
                    th {"Order"}
                    th {"Amount"}
                    th {"Status"}
                    th {"Customer"}
                    th {"Pickup Code"}
                }}
                tbody { @for tx in &report.transactions {
                    tr {
                        td ."font-mono" {(tx.transaction_id)}
                        td {(tx.order_id)}
                        td {(cart::fmt_usd(tx.amount))}
                        td {(tx.status.as_str())}
                        td { a href={"mailto:"(tx.user_email)} ."btn"."btn-link" {(tx.user_email)} }
                        td {(tx.pickup_code.as_deref().unwrap_or("N/A"))}
                    }
                }}
            }}
        }
    }
}

pub async fn dashboard_page(nest: NestedPath, State(state): State<AppState>) -> Markup {
    let (current, generating) = {
        let dashboard = state.dashboard.lock().unwrap();
        (dashboard.current().cloned(), dashboard.is_generating())
    };

    components::layout(
        html! {
            span ."navbar-start"."text-xl"."font-bold" {"Canopy Admin"}
            a ."btn"."btn-ghost"."navbar-end" href="/" {"Storefront"}
        },
        Some(html! {
            ."max-w-4xl"."mx-auto"."grid"."gap-4" {
                #"quick-stats" hx-get={(nest.as_str())"/quick-stats"} hx-trigger="load" {
                    (quick_stats_card(None))
                }
                (generate_form(&nest, generating))
                #"report-detail" { @if let Some(report) = &current {(report_detail(report))} }
                ."divider" {"Recent Reports"}
                #"recent-reports" hx-get={(nest.as_str())"/recent"}
                    hx-trigger="load, reports-refreshed from:body" {}
            }
        }),
    )
}

#[serde_inline_default]
#[derive(Deserialize)]
pub struct RecentQuery {
    #[serde_inline_default(RECENT_LIMIT)]
    limit: usize,
}

/// Refresh the recent-report list. A failed fetch is logged and the prior
/// list is rendered unchanged; this call never shows an error banner.
pub async fn recent_reports(
    nest: NestedPath,
    Query(params): Query<RecentQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Markup {
    let api = state.api(crate::page_location(&headers).as_ref());
    match client::recent(&api, params.limit).await {
        Ok(summaries) => state.dashboard.lock().unwrap().apply_summaries(summaries),
        Err(err) => warn!(%err, "failed to refresh report list"),
    }
    summaries_table(&nest, state.dashboard.lock().unwrap().summaries())
}

/// Same failure policy as the list: keep whatever was shown before.
pub async fn quick_stats(State(state): State<AppState>, headers: HeaderMap) -> Markup {
    let api = state.api(crate::page_location(&headers).as_ref());
    match client::quick_stats_today(&api).await {
        Ok(stats) => state.dashboard.lock().unwrap().apply_today(stats),
        Err(err) => warn!(%err, "failed to refresh today's quick stats"),
    }
    quick_stats_card(state.dashboard.lock().unwrap().today())
}

#[derive(Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    report_date: String,
}

pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Result<Response, Response> {
    if form.report_date.trim().is_empty() {
        return Err(ErrorResponse::Alert.transform("Please select a report date"));
    }
    // Claim held for the whole request; released on drop even when the
    // client disconnects and the future is dropped mid-flight.
    let Some(_claim) = GenerateGuard::claim(&state.dashboard) else {
        return Err(ToastAlert::Error("A report is already being generated").into_response());
    };

    let api = state.api(crate::page_location(&headers).as_ref());
    let result = client::generate(&api, form.report_date.trim()).await;

    let report = result.map_err(|err| {
        ErrorResponse::Alert.transform(
            err.detail()
                .unwrap_or("Failed to generate report. Please try again."),
        )
    })?;

    let notice = format!(
        "Report generated for {}: {} across {} transactions",
        report.report_date,
        cart::fmt_usd(report.total_amount),
        report.total_transactions,
    );
    let markup = html! {
        (ToastAlert::Success(&notice))
        (report_detail(&report))
    };
    state.dashboard.lock().unwrap().show_report(report);

    let mut response = markup.into_response();
    response.headers_mut().insert(
        HeaderName::from_static("hx-trigger"),
        HeaderValue::from_static("reports-refreshed"),
    );
    Ok(response)
}

pub async fn view_report(
    Path(report_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Markup, Response> {
    let api = state.api(crate::page_location(&headers).as_ref());
    // Backend detail and transport errors stay in the log; the user only
    // ever sees the fixed notification.
    let report = client::fetch(&api, &report_id).await.map_err(|err| {
        warn!(%err, %report_id, "failed to load report");
        ErrorResponse::Toast.transform(LOAD_FAILURE_MESSAGE)
    })?;

    let markup = report_detail(&report);
    state.dashboard.lock().unwrap().show_report(report);
    Ok(markup)
}

pub async fn export_report(
    Path(report_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    // Export what is already on screen when it matches; otherwise fetch.
    let cached = {
        let dashboard = state.dashboard.lock().unwrap();
        dashboard
            .current()
            .filter(|report| report.report_id == report_id)
            .cloned()
    };
    let report = match cached {
        Some(report) => report,
        None => {
            let api = state.api(crate::page_location(&headers).as_ref());
            client::fetch(&api, &report_id).await.map_err(|err| {
                warn!(%err, %report_id, "failed to load report for export");
                ErrorResponse::Toast.transform(LOAD_FAILURE_MESSAGE)
            })?
        }
    };

    let disposition = format!("attachment; filename=\"{}\"", export::filename(&report));
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (
                CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .map_err_response(ErrorResponse::InternalServerError)?,
            ),
        ],
        export::to_csv(&report),
    )
        .into_response())
}
