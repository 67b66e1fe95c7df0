//! Ready-made instrumented primitives
//!
//! Storage and process primitives wrap `std`; the network facade routes
//! through a transport supplied by the caller.

pub mod network;
pub mod process;
pub mod storage;

pub use network::{Network, OutboundRequest, RequestTarget};
pub use process::{CommandSpec, Processes};
pub use storage::Storage;

use crate::intercept::{Callback, Hook};
use std::io;
use std::thread::{self, JoinHandle};

/// Continuation receiving the outcome of a callback-style primitive
pub type Done<T> = Callback<io::Result<T>>;

type Blocking<A, T> = Hook<A, io::Result<T>>;
type Deferred<A, T> = Hook<(A, Done<T>), JoinHandle<()>>;

/// Turn a blocking primitive into its callback form: the primitive runs on
/// a worker thread and its result is handed to the continuation.
fn deferred<A, T, F>(run: F) -> impl Fn((A, Done<T>)) -> JoinHandle<()> + Send + Sync + 'static
where
    A: Send + 'static,
    T: Send + 'static,
    F: Fn(A) -> io::Result<T> + Copy + Send + Sync + 'static,
{
    move |(args, done): (A, Done<T>)| thread::spawn(move || done(run(args)))
}
