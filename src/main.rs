use gangsheet::jobs::{InMemoryJobStore, JobSpec, JobStatus, JobStore, Worker};
use gangsheet::pipeline::PipelineBuilder;
use gangsheet::storage::FilesystemStorage;
use std::env;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// A simple CLI to run one composition job from a job-spec file against a
/// filesystem storage root.
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Compose a resolved picklist into print-ready base PDFs.");
        eprintln!();
        eprintln!("Usage: {} <path/to/job_spec.json> <storage_root>", args[0]);
        eprintln!();
        eprintln!("Artwork is read from the storage root at each item's artwork_handle;");
        eprintln!("artifacts are written under tenant/<tenant>/outputs/<job>/.");
        return ExitCode::FAILURE;
    }

    match run(&args[1], &args[2]).await {
        Ok(completed) => {
            if completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(spec_path: &str, storage_root: &str) -> Result<bool, Box<dyn std::error::Error>> {
    println!("Loading job spec from {spec_path}");
    let spec_json = fs::read_to_string(spec_path)?;
    let spec: JobSpec = serde_json::from_str(&spec_json)?;

    let config = gangsheet::config::Config::load()?;
    let storage = Arc::new(FilesystemStorage::new(storage_root.into()).await?);
    let pipeline = Arc::new(
        PipelineBuilder::new()
            .with_storage(storage)
            .with_retry_policy(config.retry_policy())
            .with_soft_deadline(Duration::from_secs(config.limits.soft_deadline_secs))
            .build()?,
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let job_id = store.enqueue(spec).await?;
    println!("Processing job {job_id}...");

    let worker = Worker::new(Arc::clone(&store), pipeline, Duration::from_millis(100), 0);
    worker.process_next_job().await?;

    let record = store
        .get(job_id)
        .await?
        .ok_or("job record disappeared from the store")?;

    println!("Job {} finished with status '{}'", job_id, record.status);
    if let Some(manifest) = &record.manifest {
        for uri in &manifest.outputs.artifacts {
            println!("  artifact: {uri}");
        }
        println!("{}", serde_json::to_string_pretty(manifest)?);
    }
    if let Some(message) = &record.error_message {
        eprintln!("failure: {message}");
    }

    Ok(record.status == JobStatus::Completed)
}
