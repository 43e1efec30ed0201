#[tokio::main]
async fn main() -> anyhow::Result<()> {
    savory_reviews_api::cli::run_with_sys_args().await
}
