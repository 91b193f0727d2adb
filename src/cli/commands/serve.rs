use crate::cli::commands::runtime;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::server;
use crate::ui::messages::info;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Serve { bind } = cmd {
        let bind = bind.clone().unwrap_or_else(|| cfg.server.bind.clone());
        info(format!("Serving on http://{bind} (Ctrl-C to stop)"));

        runtime()?.block_on(server::serve(cfg.clone(), &bind))?;
    }

    Ok(())
}
