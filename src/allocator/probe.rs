use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

/// Answers whether something outside the registry is listening on a port.
pub trait PortProbe {
    fn is_bound(&self, port: u16) -> bool;
}

/// Probes the local host with a bounded TCP connect to `127.0.0.1:port`.
///
/// A completed connect means the port is taken. A refused connect means it
/// is free. Any other outcome, timeouts included, counts as taken.
#[derive(Debug, Clone, Copy)]
pub struct HostProbe {
    timeout: Duration,
}

impl HostProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl PortProbe for HostProbe {
    fn is_bound(&self, port: u16) -> bool {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match TcpStream::connect_timeout(&addr, self.timeout) {
            Ok(_) => {
                tracing::debug!(port, "port is bound on localhost");
                true
            }
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => false,
            Err(e) => {
                tracing::debug!(port, error = %e, "probe inconclusive, treating port as busy");
                true
            }
        }
    }
}

/// Fixed set of bound ports. Useful when the host must not be consulted.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    bound: BTreeSet<u16>,
}

impl StaticProbe {
    pub fn new(bound: impl IntoIterator<Item = u16>) -> Self {
        Self {
            bound: bound.into_iter().collect(),
        }
    }

    /// A probe that reports every port as free.
    pub fn none() -> Self {
        Self::default()
    }
}

impl PortProbe for StaticProbe {
    fn is_bound(&self, port: u16) -> bool {
        self.bound.contains(&port)
    }
}
