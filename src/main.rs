use clap::Parser;
use log::{error, Level, LevelFilter, Metadata, Record};
use rconsole::{
    client::Client,
    config::{Settings, Timeout},
};
use std::process::ExitCode;

struct SimpleLogger {
    level: Level,
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Run a single command on a Source RCON server
#[derive(Parser, Debug)]
#[command(name = "rconsole")]
struct Args {
    /// Server address, e.g. 127.0.0.1:27015
    address: String,

    /// RCON password
    #[arg(short, long)]
    password: String,

    /// Dial timeout in milliseconds (0 = default, negative = disabled)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    dial_timeout_ms: i64,

    /// Read deadline in milliseconds (0 = default, negative = disabled)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    read_timeout_ms: i64,

    /// Write deadline in milliseconds (0 = default, negative = disabled)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    write_timeout_ms: i64,

    /// Log protocol traffic to stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command to run
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::Warn,
        1 => Level::Debug,
        _ => Level::Trace,
    };
    let logger = Box::leak(Box::new(SimpleLogger { level }));
    let _ = log::set_logger(logger).map(|()| log::set_max_level(LevelFilter::Trace));

    let settings = Settings::default()
        .with_dial_timeout(Timeout::from_millis(args.dial_timeout_ms))
        .with_read_deadline(Timeout::from_millis(args.read_timeout_ms))
        .with_write_deadline(Timeout::from_millis(args.write_timeout_ms));

    let client = match Client::connect(args.address.as_str(), &args.password, settings).await {
        Ok(client) => client,
        Err(err) => {
            error!("could not connect: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = client.execute(&args.command.join(" ")).await;
    if let Err(err) = client.close().await {
        error!("error closing connection: {}", err);
    }

    match result {
        Ok(response) => {
            println!("{}", response.into_body());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("command failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
