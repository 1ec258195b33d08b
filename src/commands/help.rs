use crate::context::Context;
use crate::utils::arg_man::USAGE;
use anyhow::Result;

pub fn handle_argv(_argv: &[&str], _context: &mut Context) -> Result<()> {
    println!("{USAGE}");
    Ok(())
}
