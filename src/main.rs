use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use structopt::StructOpt;
use tracing::Instrument;
use tracing_subscriber;

use zabbix_history::assembler::Alignment;
use zabbix_history::chart::{self, ChartOptions};
use zabbix_history::zabbix::client::ZabbixClient;
use zabbix_history::{model, pipeline};

#[derive(StructOpt, Debug)]
#[structopt(about = "Chart a week of Zabbix item history across hosts")]
pub struct Command {
    /// Zabbix login user name
    #[structopt(short, long, default_value = "admin")]
    pub user: String,

    /// Zabbix login password
    #[structopt(short, long, default_value = "passwd")]
    pub passwd: String,

    /// Zabbix server base URL
    #[structopt(short, long, default_value = "http://localhost")]
    pub server: String,

    /// Space separated host names
    #[structopt(long, default_value = "server1 server2")]
    pub hosts: String,

    /// Item key to chart
    #[structopt(short, long, default_value = "gpu.avgutilization")]
    pub item: String,

    /// Where the SVG chart is written
    #[structopt(short, long, default_value = "history.svg", parse(from_os_str))]
    pub output: PathBuf,

    #[structopt(long, default_value = "app.log", parse(from_os_str))]
    pub log_file: PathBuf,

    /// Time zone of the time axis labels
    #[structopt(long, default_value = "Asia/Shanghai")]
    pub timezone: chrono_tz::Tz,

    #[structopt(long, default_value = "GPU Avg Utilization")]
    pub ylabel: String,

    /// positional | timestamp
    #[structopt(long, default_value = "positional")]
    pub align: Alignment,

    /// HTTP connect and request timeout in seconds
    #[structopt(long, default_value = "30")]
    pub timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    // parse the command line args
    let opt: Command = Command::from_args();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&opt.log_file)
        .with_context(|| format!("opening log file {}", opt.log_file.display()))?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let span = tracing::info_span!("run", pid = std::process::id());
    execute(opt).instrument(span.clone()).await.map_err(|e| {
        span.in_scope(|| tracing::error!("{:#}", e));
        e
    })
}

async fn execute(opt: Command) -> Result<(), anyhow::Error> {
    let hosts: Vec<String> = opt.hosts.split_whitespace().map(String::from).collect();
    tracing::info!(
        "user: {}, server: {}, hosts: {:?}, item: {}",
        opt.user,
        opt.server,
        hosts,
        opt.item
    );

    let client = ZabbixClient::new(&opt.server, Duration::from_secs(opt.timeout))?;

    let request = pipeline::Request {
        user: opt.user,
        password: opt.passwd,
        hosts,
        item: opt.item,
        alignment: opt.align,
        now: Utc::now().timestamp(),
        span: model::WEEK,
    };
    let table = pipeline::run(&client, &request).await?;

    chart::render(
        &table,
        &ChartOptions {
            path: opt.output,
            caption: format!("{} over the last 7 days", request.item),
            y_label: opt.ylabel,
            timezone: opt.timezone,
            ..ChartOptions::default()
        },
    )?;

    Ok(())
}
