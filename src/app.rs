#![cfg(feature = "web")]
use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::downloader::{CSV_FILE_NAME, TableView, XLSX_FILE_NAME};
use crate::error::LabError;
use crate::graph::{GraphOptions, LineChart};
use crate::page::{PageView, Templates};
use crate::pipeline::{self, Filtered, Outcome, Upload, UploadForm};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Listener and upload settings, from flags or `LAB_*` environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "website", about = "Filter lab results from an uploaded spreadsheet")]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "LAB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "LAB_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory served under /static (app icons)
    #[arg(long, env = "LAB_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "LAB_MAX_UPLOAD_MB", default_value_t = 16)]
    pub max_upload_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: PathBuf::from("static"),
            max_upload_mb: 16,
        }
    }
}

/// Read-only state shared by all requests.
pub struct AppState {
    templates: Templates,
    graph: GraphOptions,
}

#[derive(Serialize)]
struct ApiResponse {
    options: Vec<String>,
    #[serde(flatten)]
    table: TableView,
    chart: Option<LineChart>,
}

/// Builds the application router.
pub fn router(config: &Config) -> Result<Router, handlebars::TemplateError> {
    let state = Arc::new(AppState {
        templates: Templates::new()?,
        graph: GraphOptions::default(),
    });

    Ok(Router::new()
        .route("/", get(serve_form).post(handle_submit))
        .route("/download", post(download_csv))
        .route("/download/xlsx", post(download_xlsx))
        .route("/api/filter", post(api_filter))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_mb * 1024 * 1024))
        .with_state(state))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let app = router(&config)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for LabError {
    fn into_response(self) -> Response {
        let status = match self {
            LabError::MissingFile
            | LabError::Parse(_)
            | LabError::InvalidDate(_)
            | LabError::Multipart(_) => StatusCode::BAD_REQUEST,
            LabError::Csv(_) | LabError::Xlsx(_) | LabError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.user_message()).into_response()
    }
}

async fn serve_form(State(state): State<Arc<AppState>>) -> Response {
    render(&state, &PageView::empty())
}

async fn handle_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            log::warn!("unreadable form submission: {}", e);
            let view = PageView {
                error_message: Some(e.user_message()),
                ..PageView::empty()
            };
            return render(&state, &view);
        }
    };

    let worker = state.clone();
    let view = tokio::task::spawn_blocking(move || {
        let outcome = pipeline::process(&form);
        PageView::from_outcome(&form.params, &outcome, &worker.graph)
    })
    .await;

    match view {
        Ok(view) => render(&state, &view),
        Err(e) => {
            log::error!("filter task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn download_csv(multipart: Multipart) -> Result<Response, LabError> {
    let filtered = filter_form(multipart).await?;
    let csv = filtered.csv()?;
    Ok(attachment("text/csv; charset=utf-8", CSV_FILE_NAME, csv))
}

async fn download_xlsx(multipart: Multipart) -> Result<Response, LabError> {
    let filtered = filter_form(multipart).await?;
    let xlsx = filtered.xlsx()?;
    Ok(attachment(XLSX_CONTENT_TYPE, XLSX_FILE_NAME, xlsx))
}

async fn api_filter(multipart: Multipart) -> Response {
    let outcome = match read_form(multipart).await {
        Ok(form) => run_pipeline(form).await,
        Err(e) => Outcome {
            options: Vec::new(),
            result: Err(e),
        },
    };

    match outcome.result {
        Ok(filtered) => {
            Json(ApiResponse {
                options: outcome.options,
                table: TableView::from_rows(&filtered.rows),
                chart: filtered.chart(),
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": e.user_message(),
                "options": outcome.options,
            })),
        )
            .into_response(),
    }
}

fn render(state: &AppState, view: &PageView) -> Response {
    match state.templates.render_page(view) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("template rendering failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn attachment(content_type: &str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        Body::from(body),
    )
        .into_response()
}

async fn filter_form(multipart: Multipart) -> Result<Filtered, LabError> {
    let form = read_form(multipart).await?;
    run_pipeline(form).await.result
}

async fn run_pipeline(form: UploadForm) -> Outcome {
    tokio::task::spawn_blocking(move || pipeline::process(&form))
        .await
        .unwrap_or_else(|e| Outcome {
            options: Vec::new(),
            result: Err(LabError::Io(std::io::Error::other(e.to_string()))),
        })
}

/// Collects the multipart fields; unknown fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, LabError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LabError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| LabError::Multipart(e.to_string()))?;
                log::info!("received upload {:?} ({} bytes)", file_name, bytes.len());
                if !bytes.is_empty() {
                    form.file = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "test_type" | "start_date" | "end_date" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| LabError::Multipart(e.to_string()))?;
                match name.as_str() {
                    "test_type" => form.params.test_type = text,
                    "start_date" => form.params.start_date = text,
                    _ => form.params.end_date = text,
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
