use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use grabbit_cli::environment::Environment;
use grabbit_cli::error::Result;
use grabbit_cli::monitor::{
    FileJobStatusCache, JobState, JobStatusCache, PollingJobMonitor,
};
use grabbit_cli::starter::{HostJobIds, JobStarter, JobsConfig};

/// The name of the job status cache file written by `start --monitor`.
const DEFAULT_JOB_STATUS_CACHE_FILENAME: &str = "grabbitIds.out";

#[derive(Parser, Debug)]
#[command(name = "grabbit-cli")]
#[command(version)]
#[command(about = "Starts and monitors Grabbit content-replication jobs")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start jobs on the hosts the job configuration targets
    Start {
        /// Monitor the started jobs until none remain running
        #[arg(long, short = 'm')]
        monitor: bool,

        /// The job configuration file (sent to each host)
        jobs_config: PathBuf,

        /// The environment configuration file
        env_config: PathBuf,

        /// The name of the environment to use
        environment: String,
    },

    /// Monitor previously started jobs from a job-ids cache file
    Monitor {
        /// The environment configuration file
        env_config: PathBuf,

        /// The name of the environment to use
        environment: String,

        /// The cache file written by an earlier `start --monitor`
        ids_file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Monitoring events own stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Start {
            monitor,
            jobs_config,
            env_config,
            environment,
        } => {
            if monitor {
                start_with_monitor(&jobs_config, &env_config, &environment).await
            } else {
                start_no_monitor(&jobs_config, &env_config, &environment).await
            }
        }
        Commands::Monitor {
            env_config,
            environment,
            ids_file,
        } => monitor_jobs(&env_config, &environment, &ids_file).await,
    }
}

/// Starts the jobs and prints their hosts and ids.
async fn start_no_monitor(
    jobs_config: &Path,
    env_config: &Path,
    environment_name: &str,
) -> Result<()> {
    let (_, started) = start_jobs(jobs_config, env_config, environment_name).await?;
    print_started_jobs(&started);
    Ok(())
}

/// Starts the jobs, seeds a fresh cache file with them, and monitors until
/// none remain running.
async fn start_with_monitor(
    jobs_config: &Path,
    env_config: &Path,
    environment_name: &str,
) -> Result<()> {
    let (environment, started) = start_jobs(jobs_config, env_config, environment_name).await?;
    print_started_jobs(&started);

    let mut cache = FileJobStatusCache::create_empty(DEFAULT_JOB_STATUS_CACHE_FILENAME)?;
    for host in &started {
        if let Ok(job_ids) = &host.job_ids {
            for job_id in job_ids {
                cache.put_state(host.base_uri.clone(), *job_id, JobState::Running)?;
            }
        }
    }

    monitor_cache(cache, environment).await
}

/// Monitors the jobs recorded in an existing cache file.
async fn monitor_jobs(env_config: &Path, environment_name: &str, ids_file: &Path) -> Result<()> {
    let environment = Environment::from_config_file(env_config, environment_name)?;
    let cache = FileJobStatusCache::open(ids_file)?;
    monitor_cache(cache, environment).await
}

async fn start_jobs(
    jobs_config: &Path,
    env_config: &Path,
    environment_name: &str,
) -> Result<(Environment, Vec<HostJobIds>)> {
    let environment = Environment::from_config_file(env_config, environment_name)?;
    let jobs_config = JobsConfig::open(jobs_config)?;
    let hosts = environment
        .hosts_of_type(jobs_config.node_type()?)
        .into_iter()
        .cloned()
        .collect();

    let starter = JobStarter::new(jobs_config, hosts);
    let started = starter.start_jobs().await;
    Ok((environment, started))
}

/// Prints `uri, jobId` per started job. A host that failed to start is
/// reported to stderr; its siblings are unaffected.
fn print_started_jobs(started: &[HostJobIds]) {
    for host in started {
        match &host.job_ids {
            Ok(job_ids) => {
                for job_id in job_ids {
                    println!("{}, {}", host.base_uri, job_id);
                }
            }
            Err(e) => eprintln!("{}: {e}", host.base_uri),
        }
    }
}

async fn monitor_cache(cache: FileJobStatusCache, environment: Environment) -> Result<()> {
    let monitor = PollingJobMonitor::builder(cache)
        .environment(environment)
        .build()?;

    let mut handle = monitor.monitor();
    while let Some(event) = handle.next_event().await {
        println!("{event}");
    }
    handle.wait().await
}
