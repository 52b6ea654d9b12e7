//! Tracks every connected client so a shutdown can reach them all.
//!
//! The original (`client_registry.c`) keeps a fixed `fd[1024]` array guarded
//! by a semaphore and a `clients` counter, but its `creg_wait_for_empty`
//! only checks the counter once under the lock and returns immediately
//! regardless of its value — callers never actually observe the registry
//! drain. This version tracks each connection's `TcpStream` (so
//! `shutdown_all` can act on it directly, matching `creg_shutdown_all`'s
//! `shutdown(fd, SHUT_RD)`) and uses a condvar so `wait_for_empty` genuinely
//! blocks until the last client unregisters.

use std::collections::HashMap;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

pub type ClientId = u64;

pub struct ClientRegistry {
    next_id: AtomicU64,
    clients: Mutex<HashMap<ClientId, TcpStream>>,
    empty: Condvar,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry {
            next_id: AtomicU64::new(1),
            clients: Mutex::new(HashMap::new()),
            empty: Condvar::new(),
        }
    }

    pub fn register(&self, stream: TcpStream) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.clients.lock().unwrap().insert(id, stream);
        id
    }

    pub fn unregister(&self, id: ClientId) {
        let mut clients = self.clients.lock().unwrap();
        clients.remove(&id);
        if clients.is_empty() {
            self.empty.notify_all();
        }
    }

    /// Blocks the calling thread until no clients are registered.
    pub fn wait_for_empty(&self) {
        let clients = self.clients.lock().unwrap();
        let _guard = self.empty.wait_while(clients, |c| !c.is_empty()).unwrap();
    }

    /// Half-closes every registered socket's read side, unblocking any
    /// thread parked in `recv_packet` so it observes EOF and exits.
    pub fn shutdown_all(&self) {
        let clients = self.clients.lock().unwrap();
        for stream in clients.values() {
            let _ = stream.shutdown(Shutdown::Read);
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap().len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        (client, server_side)
    }

    #[test]
    fn wait_for_empty_returns_immediately_when_already_empty() {
        let registry = ClientRegistry::new();
        registry.wait_for_empty();
    }

    #[test]
    fn wait_for_empty_blocks_until_last_client_unregisters() {
        let registry = std::sync::Arc::new(ClientRegistry::new());
        let (_client, server_side) = connected_pair();
        let id = registry.register(server_side);

        let waiter = std::sync::Arc::clone(&registry);
        let handle = thread::spawn(move || waiter.wait_for_empty());

        thread::sleep(Duration::from_millis(150));
        assert!(!handle.is_finished(), "wait_for_empty returned before the registry drained");

        registry.unregister(id);
        handle.join().unwrap();
    }
}
