use std::env;

use log::info;
use socks5::Dialer;
use socksdial::config::Config;
use socksdial::fetch::fetch;
use tokio::runtime::Runtime;

fn main() {
    let mut args = env::args();
    if args.len() > 2 {
        println!("Usage: {} [config.toml]", args.nth(0).unwrap_or_default());
        println!("Fetches one http:// URL, following http:// redirects only.");
        return;
    }

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match args.nth(1) {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                println!("{}: {}", path, e);
                return;
            }
        },
        None => Config::default(),
    };

    let mut dialer = Dialer::new();
    if let Some(timeout) = config.timeout() {
        info!("Dial timeout {:?}", timeout);
        dialer = dialer.with_timeout(timeout);
    }

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    rt.block_on(async move {
        match fetch(&dialer, &config.proxy, &config.url).await {
            Ok(response) => print!("{}", response.text()),
            Err(e) => println!("{}", e),
        }
    });
}
