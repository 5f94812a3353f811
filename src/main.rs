use anyhow::{bail, Result};
use clap::Parser;
use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{Clear, ClearType},
};
use pay_countdown::cli::CliArgs;
use pay_countdown::clock::{parse_creation_time, Clock, SystemClock};
use pay_countdown::config::{Config, DisplayConfig};
use pay_countdown::format::format_remaining;
use pay_countdown::timer::CountdownTimer;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::{error, info};

enum CountdownEvent {
    Tick(String),
    Expired,
}

fn render(stdout: &mut io::Stdout, display: &DisplayConfig, remaining: &str) -> Result<()> {
    let line = format!("剩余支付时间: {}", remaining);
    if display.inline {
        execute!(
            stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
    } else {
        writeln!(stdout, "{}", line)?;
    }
    Ok(())
}

async fn run(cli_args: CliArgs) -> Result<()> {
    let config = Config::from_cli_and_file(&cli_args)?;
    let timeout_express = config.timeout_express()?;

    let created_at = match &cli_args.created {
        Some(created) => parse_creation_time(created)?,
        None => SystemClock.now_millis(),
    };
    let total_seconds = timeout_express.total_seconds(created_at);

    if cli_args.check {
        match total_seconds {
            Some(secs) => println!("{}", secs),
            None => bail!("Cannot resolve {} for this creation time", timeout_express),
        }
        return Ok(());
    }

    info!(
        "Counting down {} from {} ({:?}s total)",
        timeout_express, created_at, total_seconds
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let tick_tx = event_tx.clone();
    let timer = CountdownTimer::with_total_seconds(
        SystemClock,
        created_at,
        total_seconds,
        move |remaining| {
            let _ = tick_tx.send(CountdownEvent::Tick(remaining.to_string()));
        },
        move || {
            let _ = event_tx.send(CountdownEvent::Expired);
        },
    );

    let mut stdout = io::stdout();
    let remaining = timer.remaining_seconds();
    if remaining > 0 {
        render(&mut stdout, &config.display, &format_remaining(remaining as u64))?;
    }

    timer.start()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(CountdownEvent::Tick(remaining)) => {
                    render(&mut stdout, &config.display, &remaining)?;
                }
                Some(CountdownEvent::Expired) | None => {
                    if config.display.inline {
                        writeln!(stdout)?;
                    }
                    println!("{}", config.display.expired_message);
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("Ctrl+C pressed, stopping countdown");
                timer.stop();
                if config.display.inline {
                    writeln!(stdout)?;
                }
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't break the countdown line
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli_args = CliArgs::parse();

    if let Err(err) = run(cli_args).await {
        error!("Countdown failed: {:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }

    Ok(())
}
