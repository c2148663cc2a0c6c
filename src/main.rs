use std::sync::Arc;

use restwalk::config::{Config, DEFAULT_CONFIG_PATH};
use restwalk::handler::App;
use restwalk::{logger, server};

mod site;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Tokio runtime, sized by `server.workers` when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_debug(&format!("Using {workers} worker threads"));
    } else {
        logger::log_debug("Using default worker threads (CPU cores)");
    }
    let runtime = runtime_builder.build()?;

    let app = App::new(site::root(Arc::new(site::NoteStore::default())))
        .with_limits(&cfg.dispatch)
        .with_templating(Arc::new(site::Pages));

    runtime.block_on(server::serve(app, &cfg))
}
