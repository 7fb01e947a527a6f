//! Web form over the research loop.
//!
//! `GET /` shows the form, `POST /` runs a research request and saves the
//! report, `GET /download/{filename}` serves a saved report.

use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use rq_core::{ResearchResult, Researcher};
use rq_report::save_new_docx;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const INDEX_TEMPLATE: &str = "index.html";
const EMPTY_QUERY_MESSAGE: &str = "Please enter a research query.";
const NOT_FOUND_MESSAGE: &str = "Report not found.";
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub struct ServerState {
    researcher: Researcher,
    reports_dir: PathBuf,
    templates: Tera,
}

impl ServerState {
    pub fn new(researcher: Researcher, reports_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))
            .context("Failed to load page template")?;

        Ok(Self {
            researcher,
            reports_dir: reports_dir.into(),
            templates,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    query: String,
}

/// Report fields as shown on the page.
#[derive(Debug, Serialize)]
struct ReportView {
    topic: String,
    report: String,
    sources: Vec<String>,
    tools_used: Vec<String>,
}

impl ReportView {
    fn new(result: &ResearchResult, query: &str) -> Self {
        match result {
            ResearchResult::Structured(response) => Self {
                topic: response.topic.clone(),
                report: response.report.clone(),
                sources: response.sources.clone(),
                tools_used: response.tools_used.clone(),
            },
            ResearchResult::Unstructured(text) => Self {
                topic: query.to_string(),
                report: text.clone(),
                sources: Vec::new(),
                tools_used: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct PageView {
    query: String,
    error: Option<String>,
    data: Option<ReportView>,
    validated: bool,
    filename: Option<String>,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/download/{filename}", get(download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(bind: &str, state: Arc<ServerState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!(bind_address = %bind, reports_dir = %state.reports_dir.display(), "Research form listening");
    println!("Serving research form on http://{}", bind);

    axum::serve(listener, router(state))
        .await
        .context("HTTP server terminated unexpectedly")
}

fn render(state: &ServerState, view: &PageView) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let context = Context::from_serialize(view).map_err(template_error)?;
    state
        .templates
        .render(INDEX_TEMPLATE, &context)
        .map(Html)
        .map_err(template_error)
}

fn template_error(e: tera::Error) -> (StatusCode, Html<String>) {
    error!(error = ?e, "Failed to render page");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("<h1>Template Error</h1><pre>{}</pre>", e)),
    )
}

async fn index(State(state): State<Arc<ServerState>>) -> Response {
    render(&state, &PageView::default()).into_response()
}

async fn submit(State(state): State<Arc<ServerState>>, Form(form): Form<QueryForm>) -> Response {
    let query = form.query.trim().to_string();
    if query.is_empty() {
        let view = PageView {
            error: Some(EMPTY_QUERY_MESSAGE.to_string()),
            ..Default::default()
        };
        return render(&state, &view).into_response();
    }

    let run = match state.researcher.run(&query).await {
        Ok(run) => run,
        Err(e) => {
            error!(error = %e, "Research request failed");
            let view = PageView {
                query,
                error: Some(format!("Research failed: {}", e)),
                ..Default::default()
            };
            return match render(&state, &view) {
                Ok(page) => (StatusCode::BAD_GATEWAY, page).into_response(),
                Err(failure) => failure.into_response(),
            };
        }
    };

    let mut view = PageView {
        data: Some(ReportView::new(&run.result, &query)),
        validated: run.validated,
        query,
        ..Default::default()
    };

    let result = run.result;
    let reports_dir = state.reports_dir.clone();
    match tokio::task::spawn_blocking(move || save_new_docx(&result, reports_dir)).await {
        Ok(Ok(path)) => {
            view.filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Failed to save report");
            view.error = Some("The report could not be saved.".to_string());
        }
        Err(e) => {
            error!(error = %e, "Report writer panicked");
            view.error = Some("The report could not be saved.".to_string());
        }
    }

    render(&state, &view).into_response()
}

async fn download(State(state): State<Arc<ServerState>>, Path(filename): Path<String>) -> Response {
    if !is_plain_filename(&filename) {
        warn!(filename = %filename, "Rejected report download");
        return (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response();
    }

    match tokio::fs::read(state.reports_dir.join(&filename)).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response(),
    }
}

fn is_plain_filename(name: &str) -> bool {
    let mut components = FsPath::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('"')
}
