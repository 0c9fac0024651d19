//! Example: Nagios plugin checking one sensor field
//!
//! Run with: cargo run --example check_ow -- -w 28 -c 35 localhost 4304 /10.67C6697351FF
//!
//! Prints a single plugin line and exits with the Nagios status code:
//! 0 = OK, 1 = WARNING, 2 = CRITICAL, 3 = UNKNOWN.

use clap::Parser;
use ownet::{check_sensor, ConnectionConfig, Sensor, Status, Thresholds};

#[derive(Parser, Debug)]
#[command(author, version, about = "Check the value of a 1-Wire sensor", long_about = None)]
struct Args {
    /// owserver host
    server: String,

    /// owserver port
    port: u16,

    /// Sensor path, e.g. /10.67C6697351FF
    sensor_path: String,

    /// Warning level
    #[arg(short, long)]
    warning: f64,

    /// Critical level
    #[arg(short, long)]
    critical: f64,

    /// Sensor field to be used for monitoring
    #[arg(short, long, default_value = "temperature")]
    field: String,

    /// Print the sensor (twice: also its entries and children)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    env_logger::init();

    let args = Args::try_parse().unwrap_or_else(|e| {
        if !e.use_stderr() {
            e.exit();
        }
        println!("OW {} - invalid command line arguments", Status::Unknown);
        let _ = e.print();
        std::process::exit(Status::Unknown.exit_code());
    });

    let config = ConnectionConfig::new(args.server.as_str()).with_port(args.port);

    if args.verbose > 0 {
        match Sensor::with_config(&args.sensor_path, config.clone()) {
            Ok(sensor) => {
                println!("{}", sensor);
                if args.verbose > 1 {
                    println!("entryList: {:?}", sensor.entry_list());
                    println!("sensorList: {:?}", sensor.sensor_list());
                }
            }
            Err(e) => log::warn!("{}", e),
        }
    }

    let report = check_sensor(
        &config,
        &args.sensor_path,
        &args.field,
        Thresholds::new(args.warning, args.critical),
    );
    println!("{}", report);
    std::process::exit(report.status.exit_code());
}
