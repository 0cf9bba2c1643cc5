//! Reachability probing for directories that live on remote hosts.
//!
//! Only UNC-style paths (`\\host\share\...` or `//host/share/...`) encode a
//! host component; anything else is treated as local and assumed reachable
//! without probing. Resolution runs on a helper thread so the caller can
//! bound the wait with a timeout.

use std::{
    net::ToSocketAddrs,
    path::Path,
    sync::mpsc,
    thread,
    time::Duration,
};

use tracing::warn;

/// Decide whether a directory is worth walking at all.
///
/// Returns `false` when the path names a remote host that cannot be resolved
/// within the timeout; the caller is expected to skip the directory entirely.
pub fn probe(path: &Path, timeout: Duration) -> bool {
    let Some(host) = remote_host(path) else {
        return true;
    };
    if resolve_within(&host, timeout) {
        true
    } else {
        warn!(
            path = %path.display(),
            host = %host,
            timeout_ms = timeout.as_millis() as u64,
            "Remote host did not resolve; treating directory as unreachable"
        );
        false
    }
}

/// Extract the host component from a UNC-style path, if any.
///
/// `\\?\` (extended-length) and `\\.\` (device namespace) prefixes are local
/// path syntax, not remote hosts.
pub(crate) fn remote_host(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy();
    let rest = raw
        .strip_prefix(r"\\")
        .or_else(|| raw.strip_prefix("//"))?;
    let host = rest.split(['\\', '/']).next()?;
    if host.is_empty() || host == "?" || host == "." {
        return None;
    }
    Some(host.to_string())
}

/// Resolve a host name on a helper thread, waiting at most `timeout`.
///
/// A resolution still in flight after the deadline is abandoned; its thread
/// finishes on its own and the send into the closed channel is discarded.
fn resolve_within(host: &str, timeout: Duration) -> bool {
    let (tx, rx) = mpsc::channel();
    let lookup = format!("{host}:0");
    thread::spawn(move || {
        let resolved = lookup
            .to_socket_addrs()
            .map(|mut addrs| addrs.next().is_some())
            .unwrap_or(false);
        let _ = tx.send(resolved);
    });
    rx.recv_timeout(timeout).unwrap_or(false)
}
