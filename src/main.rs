//! `dp832_daq`: poll a Rigol DP832 over its raw SCPI socket.
//!
//! ```bash
//! dp832_daq --addr 192.168.0.200:5555
//! dp832_daq --passes 10 --format json > readings.jsonl
//! dp832_daq --channel ChC
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use dp832_daq::acquisition::Poller;
use dp832_daq::channel::Channel;
use dp832_daq::config::{Settings, DEFAULT_CONFIG_PATH};
use dp832_daq::instrument::Dp832;
use dp832_daq::measurement::{JsonLinesSink, LogSink, MeasurementSink, OutputFormat};
use dp832_daq::tracing_setup;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dp832_daq", version)]
#[command(about = "Poll live voltage, current and power from a Rigol DP832")]
struct Cli {
    /// Configuration file (optional; defaults apply when missing)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Instrument address as host:port
    #[arg(long)]
    addr: Option<String>,

    /// Model the instrument must report
    #[arg(long)]
    expected_model: Option<String>,

    /// Poll period in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Per-reply read deadline in milliseconds (0 waits forever)
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Stop after this many passes instead of polling forever
    #[arg(long)]
    passes: Option<u64>,

    /// Measurement output: text or json
    #[arg(long)]
    format: Option<String>,

    /// Query a single channel once (ChC/all, Ch1, Ch2, Ch3) and exit
    #[arg(long)]
    channel: Option<String>,
}

impl Cli {
    /// Layer CLI flags over file and environment, then validate.
    fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = Settings::figment(&self.config)
            .extract()
            .with_context(|| format!("Failed to load {}", self.config.display()))?;

        if let Some(addr) = &self.addr {
            settings.instrument.address = addr.clone();
        }
        if let Some(model) = &self.expected_model {
            settings.instrument.expected_model = model.clone();
        }
        if let Some(ms) = self.interval_ms {
            settings.acquisition.poll_interval_ms = ms;
        }
        if let Some(ms) = self.read_timeout_ms {
            settings.instrument.read_timeout_ms = ms;
        }
        if let Some(format) = &self.format {
            settings.acquisition.output = format.parse::<OutputFormat>()?;
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            // Fall back to default logging so the failure is still reported.
            let _ = tracing_setup::init_from_config(&Settings::default());
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tracing_setup::init_from_config(&settings) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let single = cli
        .channel
        .as_deref()
        .map(str::parse::<Channel>)
        .transpose()?;

    info!(
        app = %settings.application.name,
        address = %settings.instrument.address,
        "Connecting"
    );
    let mut psu = Dp832::connect_and_verify(
        &settings.instrument.address,
        &settings.instrument.expected_model,
        settings.connect_timeout(),
        settings.read_timeout(),
    )
    .await
    .context("Startup failed")?;

    let mut sink: Box<dyn MeasurementSink> = match settings.acquisition.output {
        OutputFormat::Text => Box::new(LogSink),
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    if let Some(channel) = single {
        let measurement = psu.measure(channel).await?;
        sink.record(&measurement)?;
        return Ok(());
    }

    let mut poller = Poller::new(psu, settings.poll_interval())?;
    match cli.passes {
        Some(passes) => poller.run_passes(passes, sink.as_mut()).await?,
        None => match poller.run(sink.as_mut()).await {
            Ok(never) => match never {},
            Err(e) => return Err(anyhow::Error::new(e).context("Polling stopped")),
        },
    }
    Ok(())
}
