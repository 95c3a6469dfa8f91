use std::process::ExitCode;

use env_logger::Env;
use vista_cli::{VistaConfig, init_thread_pool, run};

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cfg = match VistaConfig::discover() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("{}", cfg.summary());

    if let Err(e) = init_thread_pool(cfg.feature.n_threads) {
        log::warn!("using default thread pool: {}", e);
    }

    match run(&cfg) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            log::error!("{} step(s) failed", report.failures.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
