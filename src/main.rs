mod commands;
mod context;
mod utils;

use commands::Registry;
use context::Context;
use utils::{arg_man, logger};

fn main() {
    let config = arg_man::handle_prog_args(std::env::args().skip(1));
    logger::init_logging(config.log_level);

    let registry = Registry::new();
    let mut context = Context::new();
    let argv: Vec<&str> = config.args.iter().map(String::as_str).collect();

    let code = registry.dispatch(&config.command, &argv, &mut context);
    context.close_fs();
    std::process::exit(code.into())
}
