use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use pcap_traffic_report::{
    analysis::PacketRecord,
    capture::{PcapEngine, RecordReader},
    config::{Config, Overrides, ReportFormat},
    pipeline::{analyze_concurrently, analyze_fallible, AnalysisReport},
    ui::ChartApp,
    visualization::render_report,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pcap-traffic-report")]
#[command(about = "Traffic statistics and port scan detection for captured packets")]
struct Cli {
    #[arg(help = "Capture file (.pcap/.pcapng), or JSON-lines records with --records")]
    input: PathBuf,

    #[arg(long, help = "Read input as JSON-lines packet records instead of a capture file")]
    records: bool,

    #[arg(short, long, help = "Unique destination ports that flag a source as a port scanner")]
    threshold: Option<u64>,

    #[arg(short, long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, help = "Report output format")]
    format: Option<OutputFormat>,

    #[arg(long, help = "Show only the N busiest IP pairs (0 shows all)")]
    top: Option<usize>,

    #[arg(long, help = "Open the interactive chart view after the report")]
    charts: bool,

    #[arg(long, help = "Buffer all records and run the two analyses on worker threads")]
    concurrent: bool,

    #[arg(long, help = "Write the effective configuration to this path")]
    save_config: Option<PathBuf>,

    #[arg(short, long, help = "Enable debug logging")]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => ReportFormat::Table,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

type RecordSource = Box<dyn Iterator<Item = anyhow::Result<PacketRecord>>>;

fn open_source(cli: &Cli, config: &Config) -> anyhow::Result<RecordSource> {
    if cli.records {
        let reader = RecordReader::open(&cli.input)?;
        Ok(Box::new(reader.map(|r| r.map_err(anyhow::Error::from))))
    } else {
        let engine = PcapEngine::open(&cli.input, config.capture.progress_interval)?;
        Ok(Box::new(engine.map(|r| r.map_err(anyhow::Error::from))))
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    config.apply_overrides(&Overrides {
        port_scan_threshold: cli.threshold,
        format: cli.format.map(ReportFormat::from),
        top_pairs: cli.top,
        charts: cli.charts,
        concurrent: cli.concurrent,
    })?;

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        info!("Configuration written to {}", path.display());
    }

    Ok(config)
}

async fn run_analysis(source: RecordSource, config: &Config) -> anyhow::Result<AnalysisReport> {
    if config.analysis.concurrent {
        let records: Vec<PacketRecord> = source.collect::<anyhow::Result<_>>()?;
        debug!("Buffered {} records for concurrent analysis", records.len());
        analyze_concurrently(Arc::from(records), &config.analysis).await
    } else {
        analyze_fallible(source, &config.analysis)
    }
}

fn print_report(report: &AnalysisReport, config: &Config) -> anyhow::Result<()> {
    match config.report.format {
        ReportFormat::Table => print!("{}", render_report(report, config.report.top_pairs)),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("cannot encode report as JSON")?;
            println!("{}", json);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };
    debug!("Effective configuration: {:?}", config);

    // capture problems are fatal before any analysis starts
    let source = match open_source(&cli, &config) {
        Ok(source) => source,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };

    let report = run_analysis(source, &config).await?;
    print_report(&report, &config)?;

    if config.report.charts {
        ChartApp::new(&report.summary).run()?;
    }

    Ok(())
}
