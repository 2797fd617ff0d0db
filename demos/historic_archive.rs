use senamhi::{Senamhi, SenamhiError};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), SenamhiError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let station = env::args().nth(1).unwrap_or_else(|| "157317".to_string());
    let output = format!("historic_{station}.csv");

    let client = Senamhi::new().await?;
    let frame = client
        .historic()
        .station(&station)
        .output(Path::new(&output))
        .call()
        .await?;

    println!("{}", frame.head(Some(10)));
    println!("Wrote {} rows to {}", frame.height(), output);
    Ok(())
}
