//! Example: Dump the sensor tree of an owserver
//!
//! Run with: cargo run --example tree -- localhost:4304
//!
//! Walks every sensor reachable from the root, descending into coupler
//! branches, and prints each node with its attribute values.

use clap::Parser;
use ownet::Sensor;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print the 1-Wire sensor tree", long_about = None)]
struct Args {
    /// owserver interface as host:port
    #[arg(default_value = "localhost:4304")]
    interface: String,

    /// Start below this path
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Bypass the owserver cache
    #[arg(short, long)]
    uncached: bool,

    /// Only list nodes, skip attribute values
    #[arg(short, long)]
    quiet: bool,
}

fn dump(sensor: &Sensor, depth: usize, quiet: bool) -> ownet::Result<()> {
    let indent = "  ".repeat(depth);
    println!("{}{}", indent, sensor);

    if !quiet && !sensor.is_root() {
        for name in sensor.attribute_names() {
            match sensor.get_attribute(name) {
                Ok(value) => println!("{}  {} = {}", indent, name, value),
                Err(e) => log::debug!("{}: {}", name, e),
            }
        }
    }

    for child in sensor.children() {
        dump(&child?, depth + 1, quiet)?;
    }
    Ok(())
}

fn main() -> ownet::Result<()> {
    env_logger::init();
    let args = Args::parse();

    ownet::init(&args.interface)?;

    let mut root = Sensor::new(&args.path)?;
    if args.uncached {
        root.set_cache_mode(false)?;
    }
    let result = dump(&root, 0, args.quiet);

    ownet::finish();
    result
}
