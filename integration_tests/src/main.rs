//! Hardware-in-the-loop tests for the Bluetooth module driver.
//!
//! Wire the module to a USB-UART adapter: TX/RX crossed, DTR to the POWER
//! switch and RTS to KEY. The run reconfigures the module and restores its
//! original rate at the end.

mod device;

use clap::Parser;
use colored::Colorize;

use bt_link_firmware::config::{module_defaults, serial};
use bt_link_firmware::BaudDesignator;
use device::{open_module, resolve_port};
use tests::{print_results, run_all_tests, Rig};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Hardware-in-the-loop tests for the Bluetooth module driver")]
struct Args {
    /// Serial port of the USB-UART adapter (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Rate to move the module to during the run, as a designator (1-9, A-C)
    #[arg(short, long, default_value = "6", value_parser = parse_designator)]
    target: BaudDesignator,

    /// Name written to the module
    #[arg(long, default_value = module_defaults::NAME)]
    name: String,

    /// Pairing code written to the module
    #[arg(long, default_value = module_defaults::PIN)]
    pin: String,

    /// Invert DTR/RTS for adapters that drive them low when asserted
    #[arg(long)]
    active_low: bool,
}

fn parse_designator(s: &str) -> Result<BaudDesignator, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => BaudDesignator::from_char(c)
            .ok_or_else(|| format!("unknown designator '{}'", c)),
        _ => Err("expected a single character".to_string()),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Resolve port (auto-detect if "auto")
    let port = resolve_port(&args.port)?;

    println!("{}", "Bluetooth Module Integration Tests".bold());
    println!("Port: {}", port);
    println!("Target: {} baud", args.target.baud_rate());
    println!();

    let module = open_module(&port, serial::INITIAL_BAUD_RATE, args.active_low)?;
    let mut rig = Rig::new(module, args.name, args.pin, args.target);

    println!("Running tests...\n");

    let results = run_all_tests(&mut rig);
    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
