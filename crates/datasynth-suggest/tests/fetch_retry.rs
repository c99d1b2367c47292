use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use datasynth_suggest::{FetchClient, FetchError};
use httpmock::prelude::*;

const USER_AGENT: &str = "datasynth-tests/1.0 (mailto:tests@example.com)";

/// Serves one connection per scripted status, in order, then stops.
fn scripted_server(statuses: Vec<u16>) -> (String, thread::JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind scripted server");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let mut served = 0;
        for status in statuses {
            let (mut stream, _) = listener.accept().expect("accept connection");
            read_request_head(&mut stream);
            let body = if status == 200 { r#"{"ok":true}"# } else { "{}" };
            let response = format!(
                "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("write response");
            served += 1;
        }
        served
    });
    (format!("http://{addr}/search"), handle)
}

fn read_request_head(stream: &mut impl Read) {
    let mut head = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut chunk).expect("read request");
        if read == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..read]);
    }
}

fn recording_client() -> (FetchClient, Arc<Mutex<Vec<Duration>>>) {
    let delays = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&delays);
    let client = FetchClient::new(USER_AGENT)
        .expect("build client")
        .with_sleeper(move |delay| recorded.lock().expect("lock delays").push(delay));
    (client, delays)
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|ms| Duration::from_millis(*ms)).collect()
}

#[test]
fn rate_limited_request_succeeds_after_three_retries() {
    let (url, server) = scripted_server(vec![429, 429, 429, 200]);
    let (client, delays) = recording_client();

    let body = client.get_json(&url, &[]).expect("eventual success");

    assert_eq!(body["ok"], true);
    assert_eq!(server.join().expect("server thread"), 4);
    assert_eq!(
        *delays.lock().expect("lock delays"),
        millis(&[600, 1200, 2400])
    );
}

#[test]
fn server_errors_surface_as_transient_after_retries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api");
        then.status(503);
    });
    let (client, delays) = recording_client();

    let err = client
        .get_json(&server.url("/api"), &[])
        .expect_err("should exhaust retries");

    mock.assert_calls(4);
    assert!(matches!(
        err,
        FetchError::Transient {
            status: 503,
            attempts: 4,
            ..
        }
    ));
    assert_eq!(delays.lock().expect("lock delays").len(), 3);
}

#[test]
fn not_found_fails_immediately() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });
    let (client, delays) = recording_client();

    let err = client
        .get_json(&server.url("/missing"), &[])
        .expect_err("404 is permanent");

    mock.assert_calls(1);
    assert!(matches!(err, FetchError::Permanent { status: 404, .. }));
    assert!(delays.lock().expect("lock delays").is_empty());
}

#[test]
fn requests_carry_user_agent_and_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .header("user-agent", USER_AGENT)
            .query_param("srsearch", "planets");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(serde_json::json!({"query": {"search": []}}));
    });
    let (client, _) = recording_client();

    let body = client
        .get_json(&server.url("/w/api.php"), &[("srsearch", "planets")])
        .expect("success");

    mock.assert();
    assert!(body["query"]["search"].as_array().is_some());
}

#[test]
fn non_json_body_is_a_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/html");
        then.status(200).body("<html>not json</html>");
    });
    let (client, _) = recording_client();

    let err = client
        .get_json(&server.url("/html"), &[])
        .expect_err("body is not json");
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[test]
fn unreachable_host_fails_without_backoff() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr")
    };
    let (client, delays) = recording_client();

    let err = client
        .get_json(&format!("http://{addr}/closed"), &[])
        .expect_err("nothing is listening");

    assert!(matches!(err, FetchError::Transport { .. }));
    assert!(!err.is_transient());
    assert!(delays.lock().expect("lock delays").is_empty());
}
