use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, response};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::{UnixListener, UnixStream};

pub struct TestSocket {
    kind: SocketKind,
}

#[allow(dead_code)] // File variant is unused on Linux, Abstract on non-Linux
enum SocketKind {
    #[cfg(target_os = "linux")]
    Abstract(String),
    File(PathBuf),
}

impl TestSocket {
    pub fn new(name: &str) -> std::io::Result<Self> {
        #[cfg(target_os = "linux")]
        {
            Ok(Self {
                kind: SocketKind::Abstract(name.to_string()),
            })
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dir = std::env::temp_dir().join("httpapi-axum-test");
            std::fs::create_dir_all(&dir)?;
            Ok(Self {
                kind: SocketKind::File(dir.join(format!("{name}.sock"))),
            })
        }
    }

    pub fn bind(&self) -> std::io::Result<UnixListener> {
        match &self.kind {
            #[cfg(target_os = "linux")]
            SocketKind::Abstract(name) => {
                use std::os::linux::net::SocketAddrExt;
                use std::os::unix::net::SocketAddr;
                let addr = SocketAddr::from_abstract_name(name)?;
                let listener = std::os::unix::net::UnixListener::bind_addr(&addr)?;
                listener.set_nonblocking(true)?;
                UnixListener::from_std(listener)
            }
            SocketKind::File(path) => {
                let _ = std::fs::remove_file(path);
                UnixListener::bind(path)
            }
        }
    }

    pub async fn connect(&self) -> std::io::Result<UnixStream> {
        match &self.kind {
            #[cfg(target_os = "linux")]
            SocketKind::Abstract(name) => {
                use std::os::linux::net::SocketAddrExt;
                use std::os::unix::net::SocketAddr;
                let name = name.clone();
                let std_stream = tokio::task::spawn_blocking(move || {
                    let addr = SocketAddr::from_abstract_name(&name)?;
                    std::os::unix::net::UnixStream::connect_addr(&addr)
                })
                .await
                .map_err(std::io::Error::other)??;
                std_stream.set_nonblocking(true)?;
                UnixStream::from_std(std_stream)
            }
            SocketKind::File(path) => UnixStream::connect(path).await,
        }
    }

    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        for _ in 0..100 {
            if self.connect().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("socket not ready after 5s")
    }
}

/// Send one request over a fresh HTTP/1.1 connection and collect the response.
pub async fn send(
    sock: &TestSocket,
    req: Request<Full<Bytes>>,
) -> anyhow::Result<(response::Parts, Bytes)> {
    let stream = sock.connect().await?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = http1::handshake(io).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });

    let resp = sender.send_request(req).await?;
    let (parts, body) = resp.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok((parts, body))
}

/// Parse a JSON error envelope and return its `error` object.
pub fn error_object(body: &Bytes) -> anyhow::Result<serde_json::Value> {
    let json: serde_json::Value = serde_json::from_slice(body)?;
    json.get("error")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("expected error object, got: {json}"))
}

impl Drop for TestSocket {
    fn drop(&mut self) {
        if let SocketKind::File(path) = &self.kind {
            let _ = std::fs::remove_file(path);
        }
    }
}
