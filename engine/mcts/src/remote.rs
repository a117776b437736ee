//! Remote position scorer over TCP.
//!
//! # Protocol
//!
//! One request per evaluation on a single persistent connection:
//! - Request: the 676-byte [`FeatureVector`] payload (169 little-endian `i32`)
//! - Response: exactly 4 bytes, a little-endian `f32` score
//!
//! Calls block the caller for the full round trip. After any I/O or protocol
//! failure the evaluator is poisoned and every later call fails with
//! [`EvaluatorError::Unavailable`].

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use engine_core::Position;
use tracing::{debug, error, info};

use crate::evaluator::{Evaluator, EvaluatorError};
use crate::features::FeatureVector;

/// Blocking TCP evaluator.
///
/// The stream sits behind a Mutex so that at most one request is in flight on
/// the connection, while the `Evaluator` trait keeps `&self`.
pub struct RemoteEvaluator {
    stream: Mutex<TcpStream>,
    addr: String,
    poisoned: AtomicBool,
    /// Number of completed round trips (for diagnostics)
    request_count: AtomicU64,
    /// Total round-trip time in microseconds (for diagnostics)
    total_request_time_us: AtomicU64,
}

impl std::fmt::Debug for RemoteEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEvaluator")
            .field("addr", &self.addr)
            .field("poisoned", &self.poisoned.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RemoteEvaluator {
    /// Connect to `addr` (`host:port`).
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, EvaluatorError> {
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| EvaluatorError::Unavailable(format!("cannot resolve {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| EvaluatorError::Unavailable(format!("no address for {}", addr)))?;

        let stream = TcpStream::connect_timeout(&socket_addr, timeout).map_err(|e| {
            EvaluatorError::Unavailable(format!("cannot connect to {}: {}", addr, e))
        })?;
        stream.set_nodelay(true)?;

        info!(addr, "Connected to remote evaluator");

        Ok(Self {
            stream: Mutex::new(stream),
            addr: addr.to_string(),
            poisoned: AtomicBool::new(false),
            request_count: AtomicU64::new(0),
            total_request_time_us: AtomicU64::new(0),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Get round-trip statistics.
    pub fn stats(&self) -> RemoteStats {
        let count = self.request_count.load(Ordering::Relaxed);
        let total_us = self.total_request_time_us.load(Ordering::Relaxed);
        RemoteStats {
            request_count: count,
            total_time_us: total_us,
            avg_time_us: if count > 0 { total_us / count } else { 0 },
        }
    }

    fn round_trip(&self, payload: &[u8]) -> Result<f32, EvaluatorError> {
        let mut stream = self
            .stream
            .lock()
            .map_err(|e| EvaluatorError::Unavailable(format!("connection lock poisoned: {}", e)))?;

        stream.write_all(payload)?;
        stream.flush()?;

        let mut response = [0u8; 4];
        stream.read_exact(&mut response)?;
        Ok(f32::from_le_bytes(response))
    }

    fn poison(&self, err: &EvaluatorError) {
        if !self.poisoned.swap(true, Ordering::AcqRel) {
            error!(addr = %self.addr, error = %err, "Remote evaluator failed, disabling");
        }
    }
}

impl Evaluator for RemoteEvaluator {
    fn evaluate(&self, position: &Position) -> Result<f64, EvaluatorError> {
        if self.is_poisoned() {
            return Err(EvaluatorError::Unavailable(format!(
                "connection to {} was lost",
                self.addr
            )));
        }

        let payload = FeatureVector::encode(position).to_le_bytes();

        let start = Instant::now();
        let score = self.round_trip(&payload).and_then(|score| {
            if score.is_finite() {
                Ok(score)
            } else {
                Err(EvaluatorError::MalformedResponse(format!(
                    "non-finite score {}",
                    score
                )))
            }
        });
        let score = match score {
            Ok(score) => score,
            Err(e) => {
                self.poison(&e);
                return Err(e);
            }
        };

        let elapsed_us = start.elapsed().as_micros() as u64;
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_request_time_us
            .fetch_add(elapsed_us, Ordering::Relaxed);
        debug!(score, elapsed_us, "Remote evaluation");

        Ok((score as f64).clamp(-1.0, 1.0))
    }
}

/// Round-trip statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteStats {
    pub request_count: u64,
    pub total_time_us: u64,
    pub avg_time_us: u64,
}
