use axum::extract::{Form, State};
use axum::response::Html;
use minijinja::context;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::app::QueryRequest;

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub question: String,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    state.render("index.html", context! {})
}

pub async fn health() -> &'static str {
    "ok"
}

/// The single form action: run the whole pipeline and render either the
/// table or the error message on the result page.
pub async fn run_query(
    State(state): State<AppState>,
    Form(form): Form<QueryForm>,
) -> Html<String> {
    let request_id = Uuid::new_v4();
    info!("request {} received", request_id);

    let request = QueryRequest {
        api_key: form.api_key,
        token: form.token,
        question: form.question,
    };

    match state.tool().run(&request).await {
        Ok(outcome) => {
            info!(
                "request {} answered ({} rows, {} ms)",
                request_id,
                outcome.table.row_count(),
                outcome.elapsed_ms
            );
            let empty = outcome.table.is_empty();
            state.render(
                "result.html",
                context! {
                    question => outcome.question,
                    sparql => outcome.sparql,
                    columns => outcome.table.columns,
                    rows => outcome.table.rows,
                    empty => empty,
                    cached => outcome.cached,
                    provider => outcome.metadata.provider,
                    model => outcome.metadata.model,
                    fallback_used => outcome.metadata.fallback_used,
                    elapsed_ms => outcome.elapsed_ms,
                },
            )
        }
        Err(e) => {
            warn!("request {} failed: {}", request_id, e);
            state.render(
                "result.html",
                context! {
                    question => request.question,
                    error => e.to_string(),
                },
            )
        }
    }
}
