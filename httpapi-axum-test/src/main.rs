pub mod socket;
mod query_string;
mod read_request;
mod write_error;
mod write_response;

use tracing_subscriber::EnvFilter;

pub struct CaseResult {
    pub name: &'static str,
    pub error: Option<String>,
}

/// Print one line per case and return (passed, total).
pub fn report(label: &str, cases: &[CaseResult]) -> (usize, usize) {
    let mut passed = 0;
    for case in cases {
        match &case.error {
            None => {
                println!("  PASS  {label} / {}", case.name);
                passed += 1;
            }
            Some(e) => println!("  FAIL  {label} / {}: {e}", case.name),
        }
    }
    (passed, cases.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let pid = std::process::id();
    let mut passed = 0;
    let mut total = 0;

    let sock = socket::TestSocket::new(&format!("httpapi-test-{pid}-read"))?;
    let (p, t) = read_request::run(&sock).await?;
    passed += p;
    total += t;

    let sock = socket::TestSocket::new(&format!("httpapi-test-{pid}-write"))?;
    let (p, t) = write_response::run(&sock).await?;
    passed += p;
    total += t;

    let sock = socket::TestSocket::new(&format!("httpapi-test-{pid}-error"))?;
    let (p, t) = write_error::run(&sock).await?;
    passed += p;
    total += t;

    let sock = socket::TestSocket::new(&format!("httpapi-test-{pid}-query"))?;
    let (p, t) = query_string::run(&sock).await?;
    passed += p;
    total += t;

    println!();
    println!("{passed}/{total} passed");

    if passed < total {
        std::process::exit(1);
    }
    Ok(())
}
