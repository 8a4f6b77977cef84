//! Enumerates an object store container and checkpoints the name of the last
//! object seen, so the next run knows where the previous one stopped.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod logging;
pub mod runner;
pub mod seed;
pub mod shutdown;
pub mod store;
