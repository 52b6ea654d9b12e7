//! Per-connection session state machine: one TCP connection is one
//! transaction, as `xacto_client_service` models it.
//!
//! The original tracks where it is in the PUT/GET grammar with two `int`
//! globals (`p_flag`, `g_flag`) shared by every client-service thread in the
//! process — harmless only because the reference implementation never ran
//! two clients at once in its own tests. Here that state lives in a
//! `SessionState` local to each call to [`serve`], so concurrent
//! connections can never interleave each other's PUT/GET sequencing.

use crate::protocol::{recv_packet, send_packet, Header, PacketType, ReplyStatus};
use log::{debug, info, warn};
use mvkv::blob::{Blob, Key};
use mvkv::store::Store;
use mvkv::transaction::{Status, TransactionManager};
use std::net::TcpStream;
use std::sync::Arc;

enum SessionState {
    Idle,
    AwaitingPutKey,
    AwaitingPutValue { key: Key },
    AwaitingGetKey,
}

/// Drives one client connection to completion: registers no state of its
/// own beyond the local `SessionState`, reads packets until COMMIT, EOF, or
/// a protocol violation, and replies as the grammar in `server.c` does —
/// except that the COMMIT reply carries the transaction's *actual* final
/// status rather than the original's hardcoded 1.
pub fn serve(mut stream: TcpStream, store: &Arc<Store>, txns: &Arc<TransactionManager>) {
    let peer = stream.peer_addr().ok();
    let txn = txns.begin();
    let mut state = SessionState::Idle;
    debug!("transaction {} started for {:?}", txn.id(), peer);

    loop {
        let pkt = match recv_packet(&mut stream) {
            Ok(p) => p,
            Err(e) => {
                debug!("transaction {}: ending session on {e}", txn.id());
                txn.abort();
                break;
            }
        };

        match (state, pkt.header.kind) {
            (SessionState::Idle, PacketType::Put) => {
                state = SessionState::AwaitingPutKey;
            }
            (SessionState::AwaitingPutKey, PacketType::Data) => {
                let key = Key::new(Blob::new(pkt.payload));
                state = SessionState::AwaitingPutValue { key };
            }
            (SessionState::AwaitingPutValue { key }, PacketType::Data) => {
                state = SessionState::Idle;
                let value = Blob::new(pkt.payload);
                let status = store.put(&txn, key, value);
                if !reply(&mut stream, status) {
                    break;
                }
                if status == Status::Aborted {
                    break;
                }
            }
            (SessionState::Idle, PacketType::Get) => {
                state = SessionState::AwaitingGetKey;
            }
            (SessionState::AwaitingGetKey, PacketType::Data) => {
                state = SessionState::Idle;
                let key = Key::new(Blob::new(pkt.payload));
                let (status, value) = store.get(&txn, key);
                if !reply(&mut stream, status) {
                    break;
                }
                if status == Status::Aborted {
                    break;
                }
                let sent = match value {
                    Some(blob) => send_packet(
                        &mut stream,
                        Header::new(PacketType::Data, status.into(), false, 0),
                        blob.as_bytes(),
                    ),
                    None => send_packet(
                        &mut stream,
                        Header::new(PacketType::Data, status.into(), true, 0),
                        &[],
                    ),
                };
                if sent.is_err() {
                    break;
                }
            }
            (_, PacketType::Commit) => {
                let status = txn.commit();
                let _ = send_packet(
                    &mut stream,
                    Header::new(PacketType::Reply, status.into(), false, 0),
                    &[],
                );
                break;
            }
            (_, other) => {
                warn!("transaction {}: protocol violation ({other}), aborting", txn.id());
                txn.abort();
                let _ = send_packet(
                    &mut stream,
                    Header::new(PacketType::Reply, ReplyStatus::Aborted, false, 0),
                    &[],
                );
                break;
            }
        }
    }

    let _ = stream.shutdown(std::net::Shutdown::Read);
    info!("transaction {} finished with status {:?}", txn.id(), txn.status());
}

/// Sends a REPLY carrying `status`. Returns `false` if the send itself
/// failed, in which case the caller should stop serving this connection.
fn reply(stream: &mut TcpStream, status: Status) -> bool {
    send_packet(stream, Header::new(PacketType::Reply, status.into(), false, 0), &[]).is_ok()
}
