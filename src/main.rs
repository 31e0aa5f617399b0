// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use std::env;
use std::io;

use bi_analytics::{logging, run_demo, AnalyticsQueries};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");

    logging::init(verbose);

    if args.len() > 1 && args[1] == "browse" {
        run_browser()?;
    } else {
        run_report()?;
    }

    Ok(())
}

fn run_report() -> Result<()> {
    let analytics = AnalyticsQueries::new()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_demo(&analytics, &mut out)?;

    Ok(())
}

#[cfg(feature = "tui")]
fn run_browser() -> Result<()> {
    println!("🖥️  Loading SQL analytics browser...\n");

    let analytics = AnalyticsQueries::new()?;
    let mut app = ui::App::load(&analytics);

    println!("Starting UI... (Press 'q' to quit)\n");
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_browser() -> Result<()> {
    eprintln!("❌ Browser mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run the plain report: cargo run");
    std::process::exit(1);
}
