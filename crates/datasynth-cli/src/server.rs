//! HTTP boundary: a thin hyper server in front of schema suggestion and row
//! synthesis. Both pipelines block on outbound HTTP, so they run on the
//! blocking pool.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use datasynth_core::{Field, GenerationRequest, Settings};
use datasynth_generate::{BackendError, SynthesisEngine};
use datasynth_suggest::suggest_schema;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use url::form_urlencoded;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(std::io::Error),
}

struct ServerState {
    settings: Settings,
}

/// Body of `POST /generate`.
#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    description: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    rows: Option<usize>,
    fields: Vec<Field>,
}

pub async fn serve(settings: Settings) -> Result<(), ServerError> {
    let bind_error = |source| ServerError::Bind {
        addr: settings.listen.clone(),
        source,
    };
    let listener = TcpListener::bind(settings.listen.as_str())
        .await
        .map_err(bind_error)?;
    let bound = listener.local_addr().map_err(bind_error)?;
    info!(addr = %bound, origin = %settings.allowed_origin, "listening");

    serve_on(listener, settings).await
}

/// Accept connections on `listener` until accepting fails.
pub async fn serve_on(listener: TcpListener, settings: Settings) -> Result<(), ServerError> {
    let state = Arc::new(ServerState { settings });
    loop {
        let (stream, _peer) = listener.accept().await.map_err(ServerError::Accept)?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = %err, "connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut resp = match (method, path.as_str()) {
        (Method::OPTIONS, _) => empty_response(StatusCode::NO_CONTENT),
        (Method::GET, "/healthz") => text_response(StatusCode::OK, "ok\n"),
        (Method::POST, "/suggest-schema") => {
            let params = parse_query_params(req.uri().query());
            handle_suggest(&state, params).await
        }
        (Method::POST, "/generate") => {
            let body = req.into_body().collect().await?.to_bytes();
            handle_generate(&state, &body).await
        }
        _ => json_error(StatusCode::NOT_FOUND, "not found"),
    };

    apply_cors(&mut resp, &state.settings.allowed_origin);
    Ok(resp)
}

async fn handle_suggest(
    state: &Arc<ServerState>,
    params: HashMap<String, String>,
) -> Response<Full<Bytes>> {
    let Some(description) = params.get("description").cloned() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "missing query parameter: description",
        );
    };

    let state = Arc::clone(state);
    let task = tokio::task::spawn_blocking(move || {
        suggest_schema(&state.settings, &description, state.settings.max_columns)
    });
    match task.await {
        Ok(suggestion) => json_response(StatusCode::OK, &suggestion),
        Err(err) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("suggestion task failed: {err}"),
        ),
    }
}

async fn handle_generate(state: &Arc<ServerState>, body: &[u8]) -> Response<Full<Bytes>> {
    let request = match generation_request(body, &state.settings) {
        Ok(request) => request,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, &message),
    };

    let state = Arc::clone(state);
    let task = tokio::task::spawn_blocking(move || {
        let backend = crate::backend_for(&state.settings, &request)?;
        Ok::<_, BackendError>(SynthesisEngine::new(backend).run(&request))
    });
    match task.await {
        Ok(Ok(result)) => json_response(StatusCode::OK, &result.dataset),
        Ok(Err(err)) => {
            warn!(error = %err, "generation rejected");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
        Err(err) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("generation task failed: {err}"),
        ),
    }
}

/// Decode and validate a generation body. Row counts above `max_rows` are
/// clamped; a blank or absent country falls back to `default_country`.
fn generation_request(body: &[u8], settings: &Settings) -> Result<GenerationRequest, String> {
    let body: GenerateBody =
        serde_json::from_slice(body).map_err(|err| format!("invalid request body: {err}"))?;

    let request = GenerationRequest {
        fields: body.fields,
        count: body.rows.unwrap_or(settings.max_rows).min(settings.max_rows),
        description: body.description,
        locale: body
            .country
            .filter(|country| !country.trim().is_empty())
            .unwrap_or_else(|| settings.default_country.clone()),
    };
    request
        .validate(settings.max_rows)
        .map_err(|err| err.to_string())?;
    Ok(request)
}

fn parse_query_params(query: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(query) = query else {
        return out;
    };
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        out.insert(key.into_owned(), value.into_owned());
    }
    out
}

fn apply_cors(resp: &mut Response<Full<Bytes>>, origin: &str) {
    let headers = resp.headers_mut();
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body =
        serde_json::to_vec(value).unwrap_or_else(|_| b"{\"detail\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::new(Full::new(Bytes::from_static(b"{\"detail\":\"internal\"}")))
        })
}

fn json_error(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "detail": detail }))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn settings() -> Settings {
        Settings {
            max_rows: 3,
            ..Settings::default()
        }
    }

    async fn spawn_server(settings: Settings) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(serve_on(listener, settings));
        format!("http://{addr}")
    }

    #[test]
    fn generation_request_clamps_rows_and_defaults_country() {
        let settings = settings();
        let body = json!({"description": "cities", "rows": 50, "fields": [{"name": "city"}]});

        let request =
            generation_request(body.to_string().as_bytes(), &settings).expect("valid body");

        assert_eq!(request.count, 3);
        assert_eq!(request.locale, "hi_IN");
        assert!(request.fields[0].use_ai);
    }

    #[test]
    fn generation_request_keeps_explicit_country_and_rows() {
        let body = json!({"country": "en_US", "rows": 2, "fields": [{"name": "city"}]});
        let request =
            generation_request(body.to_string().as_bytes(), &settings()).expect("valid body");
        assert_eq!(request.count, 2);
        assert_eq!(request.locale, "en_US");
    }

    #[test]
    fn generation_request_rejects_bad_input() {
        let settings = settings();
        assert!(generation_request(b"not json", &settings).is_err());
        let zero = json!({"rows": 0, "fields": [{"name": "city"}]}).to_string();
        assert!(generation_request(zero.as_bytes(), &settings).is_err());
        let empty = json!({"rows": 1, "fields": []}).to_string();
        assert!(generation_request(empty.as_bytes(), &settings).is_err());
    }

    #[test]
    fn query_params_are_percent_decoded() {
        let params = parse_query_params(Some("description=weather%20in+Pune&x=1"));
        assert_eq!(params.get("description").map(String::as_str), Some("weather in Pune"));
        assert!(parse_query_params(None).is_empty());
    }

    #[tokio::test]
    async fn healthz_and_preflight_carry_cors_headers() {
        let base = spawn_server(settings()).await;
        let client = reqwest::Client::new();

        let health = client
            .get(format!("{base}/healthz"))
            .send()
            .await
            .expect("healthz");
        assert_eq!(health.status(), 200);
        assert_eq!(
            health.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
        assert_eq!(health.text().await.expect("body"), "ok\n");

        let preflight = client
            .request(reqwest::Method::OPTIONS, format!("{base}/generate"))
            .send()
            .await
            .expect("preflight");
        assert_eq!(preflight.status(), 204);
        assert_eq!(
            preflight.headers()["access-control-allow-methods"],
            "GET, POST, OPTIONS"
        );
    }

    #[tokio::test]
    async fn suggest_with_empty_description_returns_generic_template() {
        let base = spawn_server(settings()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/suggest-schema?description="))
            .send()
            .await
            .expect("suggest");
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("json");
        let names: Vec<&str> = body["fields"]
            .as_array()
            .expect("fields")
            .iter()
            .filter_map(|field| field["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec!["id", "name", "category", "description", "created_at", "value"]
        );
        assert_eq!(body["fields"][0]["useAI"], true);

        let missing = client
            .post(format!("{base}/suggest-schema"))
            .send()
            .await
            .expect("suggest");
        assert_eq!(missing.status(), 400);
    }

    #[tokio::test]
    async fn generate_identifier_rows_without_credential() {
        let base = spawn_server(settings()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/generate"))
            .json(&json!({"description": "ids", "rows": 10, "fields": [{"name": "id"}]}))
            .send()
            .await
            .expect("generate");
        assert_eq!(resp.status(), 200);
        let rows: Vec<Value> = resp.json().await.expect("json");
        assert_eq!(rows.len(), 3);
        for row in rows {
            let id = row["id"].as_str().expect("id");
            assert_eq!(id.len(), 6);
            assert!(id.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn generate_maps_errors_to_detail() {
        let base = spawn_server(settings()).await;
        let client = reqwest::Client::new();

        let missing_key = client
            .post(format!("{base}/generate"))
            .json(&json!({"rows": 1, "fields": [{"name": "city"}]}))
            .send()
            .await
            .expect("generate");
        assert_eq!(missing_key.status(), 500);
        let body: Value = missing_key.json().await.expect("json");
        assert!(body["detail"].as_str().is_some_and(|d| d.contains("credential")));

        let malformed = client
            .post(format!("{base}/generate"))
            .body("{")
            .send()
            .await
            .expect("generate");
        assert_eq!(malformed.status(), 400);

        let unknown = client
            .get(format!("{base}/nope"))
            .send()
            .await
            .expect("unknown");
        assert_eq!(unknown.status(), 404);
    }
}
