//! Serves the systems listed in a JSON file.
//!
//! Usage: `dns-server <systems.json> [bind address]`. Set `ROAMDNS_LOCATION=local` when on the
//! systems' home network.

use std::{env, io};

use log::LevelFilter;
use roamdns::{
    config::{self, ServerConfig, SystemTable},
    resolver::TableResolver,
    server::SyncServer,
};

fn main() -> io::Result<()> {
    env_logger::Builder::new()
        .filter_module("roamdns", LevelFilter::Debug)
        .filter_module(env!("CARGO_CRATE_NAME"), LevelFilter::Trace)
        .parse_default_env()
        .init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: dns-server <systems.json> [bind address]");
        std::process::exit(2);
    };

    let mut config = ServerConfig::default();
    if let Some(addr) = args.next() {
        let addr = addr
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        config = config.bind_addr(addr);
    }

    let table = SystemTable::load(&path)?;
    let location = config::location_from_env()?;
    log::info!("serving {} systems ({:?})", table.len(), location);

    SyncServer::bind(config, TableResolver::new(table, location))?.listen()
}
