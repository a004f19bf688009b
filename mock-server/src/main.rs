use tokio::net::TcpListener;

/// Serves the widget API and the redirect/raw/error fixtures on `BIND`
/// (default `127.0.0.1:3000`).
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    println!("mock resource server on http://{addr}/api");
    mock_server::run(listener).await
}
