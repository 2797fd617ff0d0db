use chrono::NaiveDate;
use senamhi::{Senamhi, SenamhiError};
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), SenamhiError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    configure_polars_display();

    let mut args = env::args().skip(1);
    let station = args.next().unwrap_or_else(|| "100090".to_string());
    let output = args.next().map(PathBuf::from);

    let client = Senamhi::new().await?;
    let builder = client
        .range()
        .station(&station)
        .start(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
        .end(NaiveDate::from_ymd_opt(2019, 3, 31).unwrap());
    let result = match output.as_deref() {
        Some(path) => builder.output(path).call().await?,
        None => builder.call().await?,
    };

    println!("{} ({})", result.station, result.class);
    println!("{}", result.frame);
    for month in &result.months {
        println!("{month}");
    }

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
