use clap::Parser;
use crossterm::event::{Event, KeyEventKind};
use feedchain::cli::{Cli, Command};
use feedchain::config::ChainConfig;
use feedchain::logging::{DEFAULT_LOG_FILE, init_logging};
use feedchain::preset::aquaculture::AquacultureChain;
use feedchain::remote::broker::Broker;
use feedchain::simulation::engine::FeederEngine;
use feedchain::simulation::order::DEFAULT_ESCALATION_LIMIT;
use feedchain::tui::app::App;
use feedchain::tui::draw::draw_app;
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn Error>> {
    let Cli {
        config,
        log_dir,
        seed,
        loss,
        command,
    } = Cli::parse();

    match command.unwrap_or(Command::Dashboard { speed: 1.0 }) {
        Command::InitConfig { force } => init_config(&config, force),
        Command::Run {
            seconds,
            orders,
            order_every,
        } => {
            let _guard = init_logging(&log_dir, DEFAULT_LOG_FILE, true)?;
            let (engine, _broker) = build_engine(&config, seed, loss)?;
            run_headless(engine, seconds, &orders, order_every);
            Ok(())
        }
        Command::Dashboard { speed } => {
            let _guard = init_logging(&log_dir, DEFAULT_LOG_FILE, false)?;
            let (engine, broker) = build_engine(&config, seed, loss)?;
            run_dashboard(App::new(engine, broker, speed))?;
            Ok(())
        }
    }
}

fn build_engine(
    config_path: &Path,
    seed: u64,
    loss: f64,
) -> Result<(FeederEngine, Broker), Box<dyn Error>> {
    let broker = Broker::new(seed, loss);
    let mut chain = AquacultureChain::build(&broker)?;
    let config = ChainConfig::load_from(config_path)?;
    config.apply(&mut chain)?;
    info!(
        config = %config_path.display(),
        feeders = chain.len(),
        seed,
        loss,
        "chain ready"
    );
    let engine = FeederEngine::new(chain, broker.telemetry(), config.coordinator());
    Ok((engine, broker))
}

fn init_config(path: &Path, force: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )
        .into());
    }
    let chain = AquacultureChain::build(&Broker::reliable())?;
    ChainConfig::from_chain(&chain, DEFAULT_ESCALATION_LIMIT).save_to(path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn run_headless(mut engine: FeederEngine, seconds: u64, orders: &[i64], order_every: u64) {
    // Order i is due at i * order_every; a zero spacing places them all at once.
    let mut due = orders
        .iter()
        .enumerate()
        .map(|(i, &quantity)| (i as u64 * order_every, quantity))
        .peekable();

    for second in 0..=seconds {
        while let Some((_, quantity)) = due.next_if(|&(at, _)| at <= second) {
            if let Err(err) = engine.place_order(quantity) {
                error!(quantity, %err, "order refused");
            }
        }
        if second < seconds {
            engine.step();
        }
    }

    let elapsed = engine.now().as_secs();
    println!("after {elapsed}s:");
    for node in engine.chain().nodes() {
        println!(
            "  {:<24} {:>8}  [{}..{}]",
            node.name(),
            node.stock(),
            node.params().min_capacity,
            node.params().max_capacity
        );
    }
}

fn run_dashboard(mut app: App) -> std::io::Result<()> {
    let mut terminal = ratatui::init();
    let mut last = Instant::now();

    while app.running {
        terminal.draw(|frame| draw_app(frame, &app))?;

        if crossterm::event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        let now = Instant::now();
        app.update(now - last);
        last = now;
    }
    Ok(())
}
