// JSON Database Client - one request per invocation
use jsondb_client::cli::run;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = run(std::env::args().skip(1)).await;
    std::process::exit(code);
}
