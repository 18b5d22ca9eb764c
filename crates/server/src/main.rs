fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(server::run_server())
}
