#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use nsi_aura::config::Config;

/// Worker-thread count for the async runtime, mirroring
/// `turn-server::server::get_threads`/`config::Server::max_threads`: scale
/// to the host's core count. This sizes the tokio executor itself, separate
/// from the job dispatcher's own fixed-size worker pool.
fn runtime_threads() -> usize {
    num_cpus::get()
}

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    simple_logger::init_with_level(config.log_level.to_level().unwrap_or(log::Level::Info))?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(runtime_threads())
        .enable_all()
        .build()?
        .block_on(nsi_aura::run(config))
}
