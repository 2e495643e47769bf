pub mod config;
pub mod models;
pub mod services;
pub mod algorithms;
pub mod utils;

pub use config::Config;
pub use models::*;
pub use services::pipeline::Pipeline;

use anyhow::Result;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Sizes the global rayon pool used for factor solves.
pub fn init_thread_pool(workers: usize) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build_global()?;
    Ok(())
}
