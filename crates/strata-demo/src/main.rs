//! Strata Demo - order book walkthrough and concurrent stress run.
//!
//! Seeds a small book, prints the top of book after a modify and a cancel,
//! publishes one snapshot over UDP and optionally hammers one shared book
//! from several threads.

mod stress;

use clap::{Parser, ValueEnum};
use tracing::info;

use strata_core::{BookConfig, ConcurrentOrderBook, OrderId, Price, Quantity, Side};
use strata_feed::{Publisher, PublisherConfig, SnapshotFormat};
use strata_net::{DatagramSocket, SocketOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Binary,
}

impl From<Format> for SnapshotFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => SnapshotFormat::Text,
            Format::Binary => SnapshotFormat::Binary,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "strata-demo")]
#[command(about = "Concurrent limit order book demonstration")]
struct Cli {
    /// Lowest supported price in ticks
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    min_price: i64,

    /// Highest supported price in ticks
    #[arg(long, default_value_t = 9_999, allow_negative_numbers = true)]
    max_price: i64,

    /// Address the market data socket binds to
    #[arg(long, default_value = "127.0.0.1:8001")]
    bind: String,

    /// Snapshot destination; defaults to the bound address
    #[arg(long)]
    dest: Option<String>,

    /// Snapshot wire format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Stress threads (0 skips the stress run)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Operations per stress thread
    #[arg(long, default_value_t = 100_000)]
    ops: u64,

    /// Seed for the stress workload
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
}

fn print_status(book: &ConcurrentOrderBook) {
    let show = |p: Option<Price>| p.map_or_else(|| "NONE".to_owned(), |p| p.to_string());
    let qty = |p: Option<Price>, side| p.map_or(Quantity::ZERO, |p| book.quantity_at(p, side));

    let (bid, ask) = (book.best_bid(), book.best_ask());
    println!("   Best Bid:              {:>8}", show(bid));
    println!("   Best Ask:              {:>8}", show(ask));
    println!("   Quantity at Best Bid:  {:>8}", qty(bid, Side::Buy));
    println!("   Quantity at Best Ask:  {:>8}", qty(ask, Side::Sell));
    println!("   -------------------------------");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                        STRATA DEMO                           ║");
    println!("║             Concurrent Limit Order Book Walkthrough          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let config = BookConfig::new(Price(cli.min_price), Price(cli.max_price));
    let book = ConcurrentOrderBook::new(config)?;
    info!(min = cli.min_price, max = cli.max_price, "book ready");

    let mut socket = DatagramSocket::bind_with(
        &cli.bind,
        SocketOptions {
            nonblocking: true,
            recv_buffer_size: Some(1024 * 1024),
            send_buffer_size: None,
        },
    )?;
    if let Some(dest) = &cli.dest {
        socket.set_destination(dest)?;
    }

    book.add_order(OrderId(1), Price(100), Quantity(10), Side::Buy)?;
    book.add_order(OrderId(2), Price(101), Quantity(20), Side::Buy)?;
    book.add_order(OrderId(3), Price(102), Quantity(15), Side::Sell)?;
    book.add_order(OrderId(4), Price(103), Quantity(25), Side::Sell)?;

    println!("[1/4] Initial order book state:");
    print_status(&book);

    book.modify_order(OrderId(2), Quantity(30))?;
    println!("[2/4] After modifying order 2 to 30:");
    print_status(&book);

    let cancelled = book.cancel_order(OrderId(1))?;
    println!("[3/4] After cancelling order 1 ({} {} @ {}):", cancelled.side, cancelled.quantity, cancelled.price);
    print_status(&book);

    println!("[4/4] Publishing market data to {}...", socket.destination());
    let publisher_config = PublisherConfig {
        format: cli.format.into(),
        ..Default::default()
    };
    let mut publisher = Publisher::new(&socket, publisher_config);
    match publisher.publish(&book) {
        Ok(Some(update)) => println!("   Sent: {update}"),
        Ok(None) => println!("   Send would block, snapshot dropped"),
        Err(e) => eprintln!("   Failed to send market data: {e}"),
    }
    socket.shutdown();

    if cli.threads > 0 {
        println!();
        let report = stress::run(&stress::StressConfig {
            min_price: cli.min_price,
            max_price: cli.max_price,
            threads: cli.threads,
            ops_per_thread: cli.ops,
            seed: cli.seed,
        })?;
        report.print();
        if !report.passed() {
            return Err("stress run failed".into());
        }
    }

    Ok(())
}
