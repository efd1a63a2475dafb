use env_logger::{Builder, Env};
use log::error;

fn init_logger() {
    // Level from RUST_LOG, info by default.
    // Example: RUST_LOG=debug s2j validate sales_order entity_id payment_info
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = serialized_to_json::cli::run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
