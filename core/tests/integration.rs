//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port with its own state, then
//! drives `RestClient` over real HTTP through `UreqTransport`. Redirect hop
//! counts are read back from the server's hit counter.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mock_server::{blob_bytes, AppState};
use rest_core::{ClientConfig, Decoded, HttpMethod, RestClient, RestError};
use serde_json::json;

struct Server {
    base: String,
    state: AppState,
}

impl Server {
    fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

/// Start the mock server on a random port in a background runtime.
fn start_server() -> Server {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = AppState::default();
    let served = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, served).await
        })
        .unwrap();
    });

    Server {
        base: format!("http://{addr}"),
        state,
    }
}

/// One step of a hand-written HTTP exchange.
enum Step {
    Write(&'static [u8]),
    Pause(Duration),
}

/// Serve a single connection by playing `steps` after the request arrives.
fn scripted_server(steps: Vec<Step>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        for step in steps {
            match step {
                Step::Write(bytes) => {
                    if stream.write_all(bytes).and_then(|_| stream.flush()).is_err() {
                        return;
                    }
                }
                Step::Pause(delay) => thread::sleep(delay),
            }
        }
    });
    format!("http://{addr}")
}

fn one_second(base: &str) -> RestClient {
    let config = ClientConfig::builder().request_timeout_seconds(1).build();
    RestClient::with_config(base, config).unwrap()
}

const TEXT_HEADERS: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 5\r\n\r\n";

fn api(server: &Server) -> RestClient {
    RestClient::new(&format!("{}/api", server.base)).unwrap()
}

fn root(server: &Server) -> RestClient {
    let config = ClientConfig::builder().request_timeout_seconds(10).build();
    RestClient::with_config(&server.base, config).unwrap()
}

#[test]
fn widget_lifecycle() {
    let server = start_server();
    let client = api(&server);

    // Step 1: list, empty.
    let listed = client.get("widgets").unwrap();
    assert_eq!(listed.as_json(), Some(&json!([])));

    // Step 2: create.
    let created = client.post("widgets", &json!({ "name": "gear" })).unwrap();
    let created = created.as_json().unwrap().clone();
    assert_eq!(created["name"], "gear");
    let id = created["id"].as_str().unwrap().to_string();

    // Step 3: fetch it back.
    let fetched = client.get(&format!("widgets/{id}")).unwrap();
    assert_eq!(fetched.as_json(), Some(&created));

    // Step 4: rename.
    let updated = client
        .put(&format!("widgets/{id}"), &json!({ "name": "cog" }))
        .unwrap();
    assert_eq!(updated.as_json().unwrap()["name"], "cog");

    // Step 5: delete.
    client.delete(&format!("widgets/{id}")).unwrap();

    // Step 6: fetch after delete, 404 with the server's message.
    let err = client.get(&format!("widgets/{id}")).unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.body(), Some(format!("widget {id} not found").as_str()));
}

#[test]
fn post_sends_json_headers() {
    let server = start_server();
    let echoed = root(&server).post("echo", &json!({ "name": "gear" })).unwrap();
    let echoed = echoed.as_json().unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["accept"], "application/json");
    assert_eq!(echoed["content_type"], "application/json");
    assert_eq!(echoed["body"], r#"{"name":"gear"}"#);
}

#[test]
fn raw_request_leaves_accept_to_transport_default() {
    let server = start_server();
    let client = root(&server);
    let url = client.url_for("echo").unwrap();
    let sink = client
        .request(HttpMethod::Get, url, None::<&()>, 10, true)
        .unwrap()
        .into_raw()
        .unwrap();

    let echoed: serde_json::Value = serde_json::from_slice(&sink.read_to_vec().unwrap()).unwrap();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["accept"], "*/*");
}

#[test]
fn redirect_chain_within_budget() {
    let server = start_server();
    let client = root(&server);
    let url = client.url_for("redirect/3").unwrap();

    let decoded = client
        .request(HttpMethod::Get, url, None::<&()>, 3, false)
        .unwrap();
    assert_eq!(decoded.as_json(), Some(&json!({ "redirects": "done" })));
    assert_eq!(server.hits(), 4);
}

#[test]
fn redirect_chain_over_budget() {
    let server = start_server();
    let client = root(&server);
    let url = client.url_for("redirect/5").unwrap();

    let err = client
        .request(HttpMethod::Get, url, None::<&()>, 2, false)
        .unwrap_err();
    assert!(matches!(err, RestError::RedirectLimitExceeded { limit: 2 }));
    assert_eq!(server.hits(), 3);
}

#[test]
fn zero_redirect_limit_never_connects() {
    let server = start_server();
    let client = root(&server);
    let url = client.url_for("redirect/1").unwrap();

    let err = client
        .request(HttpMethod::Get, url, None::<&()>, 0, false)
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(server.hits(), 0);
}

#[test]
fn temporary_redirect_preserves_method_and_body() {
    let server = start_server();
    let echoed = root(&server)
        .put("moved/echo", &json!({ "name": "gear" }))
        .unwrap();
    let echoed = echoed.as_json().unwrap();

    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["body"], r#"{"name":"gear"}"#);
}

#[test]
fn relative_location_is_followed() {
    let server = start_server();
    let decoded = root(&server).get("relative").unwrap();
    assert_eq!(decoded.as_json(), Some(&json!([])));
}

#[test]
fn redirect_without_location_is_a_protocol_error() {
    let server = start_server();
    let err = root(&server).get("bare-redirect").unwrap_err();
    assert_eq!(err.status(), Some(301));
    assert_eq!(err.body(), Some("moved somewhere"));
}

#[test]
fn plain_text_is_returned_verbatim() {
    let server = start_server();
    let decoded = root(&server).get("text").unwrap();
    assert!(matches!(decoded, Decoded::Text(ref body) if body == "ninja"));
}

#[test]
fn malformed_json_is_a_decode_error() {
    let server = start_server();
    let err = root(&server).get("malformed").unwrap_err();
    assert!(matches!(err, RestError::Decode { .. }), "{err:?}");
}

#[test]
fn raw_download_matches_body_bytes() {
    let server = start_server();
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig::builder().raw_sink_dir(dir.path()).build();
    let client = RestClient::with_config(&server.base, config).unwrap();

    let sink = client.get_raw("blob").unwrap();
    assert_eq!(sink.len(), 256);
    assert_eq!(sink.read_to_vec().unwrap(), blob_bytes());
    assert!(sink.path().starts_with(dir.path()));

    // `keep` hands the path over; the file outlives the sink.
    let path = sink.keep().unwrap();
    assert!(path.exists());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn raw_download_of_json_is_not_decoded() {
    let server = start_server();
    let sink = root(&server).get_raw("malformed").unwrap();
    assert_eq!(sink.read_to_vec().unwrap(), b"{\"name\": ");
}

#[test]
fn server_errors_carry_status_and_body() {
    let server = start_server();
    for code in [400u16, 403, 404, 500, 503] {
        let err = root(&server).delete(&format!("status/{code}")).unwrap_err();
        assert_eq!(err.status(), Some(code));
        assert_eq!(err.body(), Some(format!("status {code}").as_str()));
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = RestClient::new(&format!("http://127.0.0.1:{port}")).unwrap();
    let err = client.get("anything").unwrap_err();
    assert!(matches!(err, RestError::Transport { .. }), "{err:?}");
}

#[test]
fn slow_response_headers_time_out() {
    let base = scripted_server(vec![Step::Pause(Duration::from_secs(3)), Step::Write(TEXT_HEADERS)]);
    let started = Instant::now();
    let err = one_second(&base).get("slow").unwrap_err();
    assert!(matches!(err, RestError::Transport { .. }), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn trickled_body_outlasting_timeout_succeeds() {
    // Each byte arrives well within the timeout; the whole body does not.
    let gap = Duration::from_millis(400);
    let mut steps = vec![Step::Write(TEXT_HEADERS)];
    for byte in [b"n", b"i", b"n", b"j", b"a"] {
        steps.push(Step::Pause(gap));
        steps.push(Step::Write(byte));
    }
    let base = scripted_server(steps);

    let started = Instant::now();
    let decoded = one_second(&base).get("trickle").unwrap();
    assert_eq!(decoded.as_text(), Some("ninja"));
    assert!(started.elapsed() > Duration::from_secs(1));
}

#[test]
fn trickled_raw_download_succeeds() {
    let gap = Duration::from_millis(400);
    let mut steps = vec![Step::Write(TEXT_HEADERS)];
    for byte in [b"n", b"i", b"n", b"j", b"a"] {
        steps.push(Step::Pause(gap));
        steps.push(Step::Write(byte));
    }
    let base = scripted_server(steps);

    let sink = one_second(&base).get_raw("trickle").unwrap();
    assert_eq!(sink.read_to_vec().unwrap(), b"ninja");
}

#[test]
fn stalled_body_is_a_transport_error() {
    let base = scripted_server(vec![
        Step::Write(TEXT_HEADERS),
        Step::Write(b"ni"),
        Step::Pause(Duration::from_secs(3)),
        Step::Write(b"nja"),
    ]);
    let err = one_second(&base).get("stalled").unwrap_err();
    match err {
        RestError::Transport { url, .. } => assert!(url.ends_with("/stalled"), "{url}"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn https_to_plain_server_fails_handshake() {
    let server = start_server();
    let base = server.base.replace("http://", "https://");
    let err = RestClient::new(&base).unwrap().get("text").unwrap_err();
    assert!(matches!(err, RestError::Transport { .. }), "{err:?}");
}

#[test]
fn unverified_tls_still_requires_a_tls_peer() {
    let server = start_server();
    let base = server.base.replace("http://", "https://");
    let config = ClientConfig::builder()
        .verify_tls(false)
        .request_timeout_seconds(5)
        .build();
    let client = RestClient::with_config(&base, config).unwrap();
    let err = client.get("text").unwrap_err();
    assert!(matches!(err, RestError::Transport { .. }), "{err:?}");

    // The same settings over plain HTTP are untouched by the TLS switch.
    let config = ClientConfig::builder().verify_tls(false).build();
    let plain = RestClient::with_config(&server.base, config).unwrap();
    assert_eq!(plain.get("text").unwrap().as_text(), Some("ninja"));
}

#[test]
fn client_is_shareable_across_threads() {
    let server = start_server();
    let client = Arc::new(root(&server));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || client.get("text").unwrap().as_text().map(str::to_string))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().as_deref(), Some("ninja"));
    }
}
