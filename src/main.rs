#[tokio::main]
async fn main() {
    if let Err(e) = videito::run().await {
        eprintln!("[videito] {e}");
        std::process::exit(1);
    }
}
