mod limits;
mod multiple;
mod nullability;
pub mod scripted;
mod simple;
mod transaction;

pub use limits::limits;
pub use multiple::multiple;
pub use nullability::nullability;
pub use simple::simple;
pub use transaction::transaction;

use log::LevelFilter;
use quarry::{Connection, Database};
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs every shared suite on `database`.
///
/// The tables are created with `create table if not exists` and `integer primary key`
/// generated keys, the backend must accept that syntax.
pub async fn execute_tests<C: Connection + 'static>(database: &mut Database<C>) {
    simple(database).await;
    multiple(database).await;
    limits(database).await;
    nullability(database).await;
    transaction(database).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
