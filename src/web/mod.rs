pub mod routes;
pub mod templates;

use std::sync::Arc;

use axum::Router;
use axum::response::Html;
use axum::routing::{get, post};
use minijinja::Environment;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::app::QueryTool;
use crate::core::config::PathquillConfig;
use crate::core::error::Result;

/// Shared server state: one pipeline (config, translation cache, lazily
/// opened store) plus the compiled templates.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    tool: QueryTool,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(config: PathquillConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(AppInner {
                tool: QueryTool::new(config),
                templates: templates::environment()?,
            }),
        })
    }

    pub(crate) fn tool(&self) -> &QueryTool {
        &self.inner.tool
    }

    pub(crate) fn render(&self, name: &str, ctx: minijinja::Value) -> Html<String> {
        match self
            .inner
            .templates
            .get_template(name)
            .and_then(|template| template.render(ctx))
        {
            Ok(html) => Html(html),
            Err(e) => {
                error!("rendering '{}' failed: {}", name, e);
                Html("<h1>Internal error</h1><p>Template rendering failed.</p>".to_string())
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/query", post(routes::run_query))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves the form until shutdown.
pub async fn serve(config: PathquillConfig) -> Result<()> {
    let addr = config.server_addr();
    let state = AppState::new(config)?;
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
