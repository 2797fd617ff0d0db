use senamhi::{Senamhi, SenamhiError, StationClass};
use std::env;

#[tokio::main]
async fn main() -> Result<(), SenamhiError> {
    env_logger::init();

    let code = env::args().nth(1).unwrap_or_else(|| "100090".to_string());
    let client = Senamhi::new().await?;

    let station = client.station(&code)?;
    let class = StationClass::classify(station)?;
    println!("{station}");
    println!("class: {} {:?}", class, class.columns());
    println!("altitude: {} msnm", client.altitude(&code).await?);

    Ok(())
}
