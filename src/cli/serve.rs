//! Serve command - runs the HTTP API

use super::CommandContext;
use inventory_differ::web::{self, AppState};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(ctx: &CommandContext, listen: Option<String>, watch: bool) -> anyhow::Result<()> {
    let engine = Arc::new(ctx.load_engine()?);
    let listen = listen.unwrap_or_else(|| ctx.settings.listen.clone());

    // Held for the lifetime of the server; dropping it stops hot reload
    let _watcher = if watch || ctx.settings.watch_rules {
        match &ctx.rules_path {
            Some(path) => Some(engine.watch(path.clone())?),
            None => {
                warn!("no rules path configured, hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    println!("🔍 inventory-differ listening on http://{}", listen);
    println!("   rules: {}", engine.active().source);
    info!(listen = %listen, cors = ctx.settings.cors, "starting HTTP API");

    let state = Arc::new(AppState::new(Arc::clone(&engine), ctx.rules_path.clone()));
    web::start_server(&listen, state, ctx.settings.cors).await
}
