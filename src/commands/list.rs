use colored::Colorize;

use crate::error::Result;
use crate::scenarios;

pub fn run() -> Result<()> {
    println!("{}", "Available scenarios:".bold());
    for scenario in scenarios::all() {
        println!("  {} {}", scenario.name.cyan(), scenario.summary.dimmed());
    }
    Ok(())
}
