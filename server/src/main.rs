mod client_registry;
mod config;
mod protocol;
mod session;
mod trace;

use anyhow::{Context, Result};
use clap::Parser;
use client_registry::ClientRegistry;
use config::Config;
use human_panic::setup_panic;
use log::info;
use mvkv::store::Store;
use mvkv::transaction::TransactionManager;
use signal_hook::consts::SIGHUP;
use signal_hook::iterator::Signals;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn main() -> Result<()> {
    setup_panic!();

    eprintln!();
    eprintln!("██  ██  █        █");
    eprintln!("██ ██   ██      ██");
    eprintln!("███      ██    ██");
    eprintln!("██ ██     ██  ██");
    eprintln!("██  ██     ████  mvkv transactional store");
    eprintln!();

    let config = Config::parse();
    if config.debug {
        println!("{config:?}");
    }

    let _guards = trace::init_logging(&config.data_dir, &config.log_level)
        .context("failed to initialize logging")?;
    info!("mvkv-server starting with config: {config:?}");

    let listener =
        TcpListener::bind(("0.0.0.0", config.port)).context("failed to bind listening socket")?;
    let local_addr = listener.local_addr()?;
    info!("listening on {local_addr}");

    let registry = Arc::new(ClientRegistry::new());
    let store = Arc::new(Store::new());
    let txns = Arc::new(TransactionManager::new());
    let shutting_down = Arc::new(AtomicBool::new(false));

    spawn_signal_thread(Arc::clone(&shutting_down), local_addr)?;

    for incoming in listener.incoming() {
        if shutting_down.load(Ordering::SeqCst) {
            break;
        }
        let stream = match incoming {
            Ok(s) => s,
            Err(e) => {
                log::warn!("failed to accept connection: {e}");
                continue;
            }
        };
        if shutting_down.load(Ordering::SeqCst) {
            // This connection is the self-wakeup probe from the signal
            // thread, not a real client.
            break;
        }

        let registry = Arc::clone(&registry);
        let store = Arc::clone(&store);
        let txns = Arc::clone(&txns);
        thread::spawn(move || service_connection(stream, registry, store, txns));
    }

    info!("accept loop exited, shutting down all connected clients");
    registry.shutdown_all();
    registry.wait_for_empty();
    info!("mvkv-server shut down cleanly");
    Ok(())
}

fn service_connection(
    stream: TcpStream,
    registry: Arc<ClientRegistry>,
    store: Arc<Store>,
    txns: Arc<TransactionManager>,
) {
    let cloned = match stream.try_clone() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("failed to clone client socket: {e}");
            return;
        }
    };
    let id = registry.register(cloned);
    session::serve(stream, &store, &txns);
    registry.unregister(id);
}

/// Registers a SIGHUP handler on a dedicated thread. On receipt it flips
/// `shutting_down` and connects a throwaway socket to the listener to
/// unblock the accept loop's blocking `accept()` call, mirroring the
/// original's "shut down every registered socket so service threads and the
/// accept loop unblock from I/O" shutdown path.
fn spawn_signal_thread(shutting_down: Arc<AtomicBool>, local_addr: std::net::SocketAddr) -> Result<()> {
    let mut signals = Signals::new([SIGHUP])?;
    thread::spawn(move || {
        for signal in signals.forever() {
            if signal == SIGHUP {
                info!("received SIGHUP, beginning clean shutdown");
                shutting_down.store(true, Ordering::SeqCst);
                let _ = TcpStream::connect(local_addr);
                break;
            }
        }
    });
    Ok(())
}
