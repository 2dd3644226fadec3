mod client;
mod server;

use crate::report;
use crate::socket::TestSocket;

pub async fn run(sock: &TestSocket) -> anyhow::Result<(usize, usize)> {
    let listener = sock.bind()?;
    let server = tokio::spawn(server::start(listener));
    sock.wait_ready().await?;

    println!("=== Read Request Integration Tests ===");
    let cases = client::run_read_request_tests(sock).await;

    server.abort();
    Ok(report("Rust Server + Rust Client", &cases))
}
