//! 上传扫描服务：`POST /scan`，multipart 字段 `malware`
//!
//! 每个上传落到 upload_dir 下独立的临时文件，请求结束即删除，
//! 并发请求互不干扰。扫描本身在阻塞线程池中执行。
use anyhow::{anyhow, bail, Context, Result};
use fprot_core::{render_json, PluginConfig, Scanner};
use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

const UPLOAD_FIELD: &str = "malware";

struct AppState {
    scanner: Scanner,
    upload_dir: PathBuf,
    max_upload_bytes: u64,
}

/// 阻塞运行 Web 服务直到 Ctrl-C
pub fn serve(cfg: &PluginConfig, listen: &str) -> Result<()> {
    let addr = parse_listen(listen)?;
    let scanner = Scanner::from_config(cfg, Duration::from_secs(cfg.web.scan_timeout_secs))?;
    let state = Arc::new(AppState {
        scanner,
        upload_dir: cfg.web.upload_dir.clone(),
        max_upload_bytes: cfg.web.max_upload_bytes,
    });

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().context("build tokio runtime")?;
    rt.block_on(async move {
        let make_svc = make_service_fn(move |_conn| {
            let state = Arc::clone(&state);
            async move { Ok::<_, Infallible>(service_fn(move |req| route(Arc::clone(&state), req))) }
        });
        let server = Server::try_bind(&addr).with_context(|| format!("bind {addr}"))?.serve(make_svc);
        info!(%addr, "web service listening");
        server
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutting down web service");
            })
            .await
            .context("web service failed")
    })
}

/// 支持 ":3993" 简写（监听所有地址）
fn parse_listen(listen: &str) -> Result<SocketAddr> {
    let full = if listen.starts_with(':') { format!("0.0.0.0{listen}") } else { listen.to_string() };
    full.parse().with_context(|| format!("invalid listen address {listen:?}"))
}

async fn route(state: Arc<AppState>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/scan") => Ok(scan_upload(state, req).await),
        _ => Ok(text(StatusCode::NOT_FOUND, "not found\n")),
    }
}

async fn scan_upload(state: Arc<AppState>, req: Request<Body>) -> Response<Body> {
    let upload = match receive_upload(&state, req).await {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "rejecting upload");
            return text(StatusCode::BAD_REQUEST, "Please supply a valid file to scan.\n");
        }
    };

    let worker = Arc::clone(&state);
    let scanned = tokio::task::spawn_blocking(move || {
        let record = worker.scanner.scan(upload.path());
        // 临时文件在此删除
        drop(upload);
        record
    })
    .await;

    match scanned {
        Ok(Ok(record)) => match render_json(&record) {
            Ok(body) => json(StatusCode::OK, body),
            Err(e) => failure(e),
        },
        Ok(Err(e)) => failure(e.into()),
        Err(e) => failure(anyhow!("scan task failed: {e}")),
    }
}

/// 把 `malware` 字段写入 upload_dir 下的独立临时文件
async fn receive_upload(state: &AppState, req: Request<Body>) -> Result<NamedTempFile> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .context("expected a multipart/form-data request")?;
    let constraints = multer::Constraints::new()
        .size_limit(multer::SizeLimit::new().whole_stream(state.max_upload_bytes));
    let mut multipart = multer::Multipart::with_constraints(req.into_body(), boundary, constraints);

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        debug!(file_name = ?field.file_name(), "receiving upload");
        let mut tmp = tempfile::Builder::new()
            .prefix("web_")
            .tempfile_in(&state.upload_dir)
            .with_context(|| format!("create temp file in {}", state.upload_dir.display()))?;
        while let Some(chunk) = field.chunk().await? {
            tmp.write_all(&chunk)?;
        }
        tmp.flush()?;
        return Ok(tmp);
    }
    bail!("no `{UPLOAD_FIELD}` field in upload")
}

fn failure(e: anyhow::Error) -> Response<Body> {
    error!(error = %format!("{e:#}"), "scan failed");
    let body = serde_json::json!({ "error": format!("{e:#}") }).to_string();
    json(StatusCode::INTERNAL_SERVER_ERROR, body)
}

fn json(status: StatusCode, body: String) -> Response<Body> {
    response(status, "application/json; charset=UTF-8", body)
}

fn text(status: StatusCode, body: &'static str) -> Response<Body> {
    response(status, "text/plain; charset=UTF-8", body.to_string())
}

fn response(status: StatusCode, content_type: &'static str, body: String) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static(content_type));
    resp
}
