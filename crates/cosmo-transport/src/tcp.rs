use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::CosmoStream;

/// Format a host/port pair for diagnostics, bracketing bare IPv6 hosts.
pub fn display_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Host as the resolver expects it: `[::1]` becomes `::1`.
fn bare_host(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(host)
}

/// Connect to a listening cosmo host (blocking).
pub fn connect(host: &str, port: u16) -> Result<CosmoStream> {
    let addr = display_addr(host, port);
    let stream = TcpStream::connect((bare_host(host), port)).map_err(|e| TransportError::Connect {
        addr: addr.clone(),
        source: e,
    })?;
    debug!(%addr, "connected to cosmo host");
    Ok(CosmoStream::from_tcp(stream))
}

/// Connect with a bound on how long each resolved address may take.
///
/// Every resolved address is tried in order; the last failure is reported.
pub fn connect_timeout(host: &str, port: u16, timeout: Duration) -> Result<CosmoStream> {
    let addr = display_addr(host, port);
    let candidates: Vec<SocketAddr> = (bare_host(host), port)
        .to_socket_addrs()
        .map_err(|e| TransportError::Resolve {
            addr: addr.clone(),
            source: e,
        })?
        .collect();

    let mut last_err = std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "host resolved to no addresses",
    );
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                debug!(%addr, %candidate, "connected to cosmo host");
                return Ok(CosmoStream::from_tcp(stream));
            }
            Err(err) => {
                debug!(%candidate, error = %err, "connect attempt failed");
                last_err = err;
            }
        }
    }

    Err(TransportError::Connect {
        addr,
        source: last_err,
    })
}

/// Connect to a listening cosmo host from async code.
#[cfg(feature = "async")]
pub async fn connect_async(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<tokio::net::TcpStream> {
    let addr = display_addr(host, port);
    let attempt = tokio::net::TcpStream::connect((bare_host(host), port));
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {limit:?}"),
            )),
        },
        None => attempt.await,
    };
    let stream = outcome.map_err(|e| TransportError::Connect {
        addr: addr.clone(),
        source: e,
    })?;
    debug!(%addr, "connected to cosmo host");
    Ok(stream)
}
