#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Tweet proxy: Twitter Clone relay and tweet generator");
    tweet_proxy::run_server().await
}
