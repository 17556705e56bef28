use ipam_ledger::output::{range_print, supernet_print};
use ipam_ledger::{Ipam, Limits};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use std::error::Error;
use std::path::PathBuf;

const ENV_SNAPSHOT: &str = "IPAM_SNAPSHOT";

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    init_logging()?;
    dotenv::dotenv().ok();
    log::info!("#Start main()");

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_SNAPSHOT).ok())
        .map(PathBuf::from)
        .ok_or_else(|| format!("usage: ipam-ledger <snapshot.json> (or set {ENV_SNAPSHOT})"))?;

    let ipam = Ipam::load(&path, Limits::from_env())?;
    range_print(&ipam.v4.store().list())?;
    range_print(&ipam.v6.store().list())?;
    supernet_print(&ipam.supernets.list());

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return Ok(());
    }
    let stderr = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))?;
    log4rs::init_config(config)?;
    Ok(())
}
