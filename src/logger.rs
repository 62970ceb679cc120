use env_logger::Builder;
use log::LevelFilter;
use mpi::Rank;
use std::io::Write;
use std::sync::Once;
use std::sync::OnceLock;

static INIT: Once = Once::new();

static RANK: OnceLock<Rank> = OnceLock::new();

/// Install the env_logger backend, filtered by RUST_LOG (default `info`), with
/// every line tagged by the MPI rank. Only the first call has any effect.
pub fn init_logging(rank: Rank) {
    INIT.call_once(|| {
        let _ = RANK.set(rank);

        let installed = Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format(|buf, record| {
                let rank = RANK.get().copied().unwrap_or(-1);
                writeln!(
                    buf,
                    "[RANK {}] {} - {}: {}",
                    rank,
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .try_init();

        if installed.is_err() {
            log::warn!("A logger was already installed, keeping it");
        }
    });
}

pub fn set_log_level(level: LevelFilter) {
    log::set_max_level(level);
}
