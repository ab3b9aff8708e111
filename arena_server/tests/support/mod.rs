// Shared primitives for one-time server bootstrapping across integration tests.
use futures::StreamExt;
use serde_json::Value;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame},
};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Global host:port used by all tests after the server publishes its bound address.
static SERVER_ADDR: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return its WebSocket URL.
pub fn ws_url() -> String {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                arena_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_addr_and_readiness(published_addr);
    });

    let addr = SERVER_ADDR.get().expect("server addr should be initialized");
    format!("ws://{addr}/ws")
}

fn wait_for_addr_and_readiness(published_addr: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let _ = SERVER_ADDR.set(addr.clone());

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

pub async fn connect() -> Client {
    let (client, _response) = connect_async(ws_url()).await.expect("websocket handshake");
    client
}

// Next text frame parsed as JSON, skipping control frames.
pub async fn next_json(client: &mut Client) -> Value {
    let read = async {
        loop {
            let msg = client
                .next()
                .await
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str::<Value>(text.as_str()).expect("server sent json");
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("timed out waiting for a server message")
}

// Reads messages until one of the given type satisfies `pred`.
pub async fn wait_for<F>(client: &mut Client, msg_type: &str, mut pred: F) -> Value
where
    F: FnMut(&Value) -> bool,
{
    loop {
        let value = next_json(client).await;
        if value["type"] == msg_type && pred(&value["data"]) {
            return value["data"].clone();
        }
    }
}

// Reads until the server closes the socket and returns its close frame, if any.
pub async fn wait_for_close(client: &mut Client) -> Option<CloseFrame> {
    let read = async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(Message::Close(frame)) => return frame,
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("server should close the socket")
}
