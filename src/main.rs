#[tokio::main]
async fn main() {
    if let Err(e) = diagno_lib::run().await {
        tracing::error!("Fatal: {e}");
        eprintln!("diagno: {e}");
        std::process::exit(1);
    }
}
