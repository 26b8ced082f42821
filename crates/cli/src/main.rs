//! Loner CLI - enqueue, inspect and drain unique job queues

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use loner_core::domain::{EnqueueOutcome, JobPayload, JobType, PendingStatus};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "loner")]
#[command(
    about = "Unique job queues: at most one pending copy of a job per queue",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: Config,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a job (a pending duplicate of a unique job is skipped)
    Enqueue {
        /// Registered job type
        job_type: String,

        /// Job arguments, one JSON value each (bare words become strings)
        args: Vec<String>,

        /// Target queue (default: the job type's queue)
        #[arg(short, long)]
        queue: Option<String>,
    },

    /// Report whether an identical unique job is pending
    Enqueued {
        job_type: String,
        args: Vec<String>,
        #[arg(short, long)]
        queue: Option<String>,
    },

    /// Remove matching jobs from a queue
    Dequeue {
        #[arg(short, long)]
        queue: String,
        job_type: String,
        args: Vec<String>,
    },

    /// Remove every job of a type from a queue
    Destroy {
        #[arg(short, long)]
        queue: String,
        job_type: String,
    },

    /// Take the next job off a queue and print it
    Reserve {
        #[arg(short, long)]
        queue: String,
    },

    /// Count jobs in a queue
    Size {
        #[arg(short, long)]
        queue: String,
    },

    /// Drop a queue with its jobs and locks
    RemoveQueue {
        #[arg(short, long)]
        queue: String,
    },
}

/// One command-line word as a job argument
fn parse_arg(word: &str) -> Value {
    serde_json::from_str(word).unwrap_or_else(|_| Value::String(word.to_string()))
}

fn parse_payload(words: &[String]) -> JobPayload {
    JobPayload::new(words.iter().map(|w| parse_arg(w)).collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.config.log_format).context("Failed to initialize logging")?;

    let service = cli.config.build_service().await?;

    match cli.command {
        Commands::Enqueue {
            job_type,
            args,
            queue,
        } => {
            let job_type = JobType::new(job_type);
            let payload = parse_payload(&args);
            let outcome = match queue {
                Some(q) => service.enqueue_to(&q, &job_type, payload).await?,
                None => service.enqueue(&job_type, payload).await?,
            };
            let line = outcome.to_string();
            match outcome {
                EnqueueOutcome::Duplicate => println!("{}", line.yellow().bold()),
                _ => println!("{}", line.green().bold()),
            }
        }

        Commands::Enqueued {
            job_type,
            args,
            queue,
        } => {
            let job_type = JobType::new(job_type);
            let payload = parse_payload(&args);
            let status = match queue {
                Some(q) => service.enqueued_in(&q, &job_type, &payload).await?,
                None => service.enqueued(&job_type, &payload).await?,
            };
            let line = status.to_string();
            match status {
                PendingStatus::Pending => println!("{}", line.green().bold()),
                PendingStatus::NotPending => println!("{}", line.yellow()),
                PendingStatus::NotApplicable => println!("{}", line.dimmed()),
            }
        }

        Commands::Dequeue {
            queue,
            job_type,
            args,
        } => {
            let removed = service
                .dequeue_from(&queue, &JobType::new(job_type), &parse_payload(&args))
                .await?;
            println!("{}", format!("✓ {} job(s) dequeued from {}", removed, queue).green());
        }

        Commands::Destroy { queue, job_type } => {
            let removed = service.destroy(&queue, &JobType::new(job_type)).await?;
            println!("{}", format!("✓ {} job(s) destroyed in {}", removed, queue).green());
        }

        Commands::Reserve { queue } => match service.reserve(&queue).await? {
            Some(job) => println!("{}", serde_json::to_string(&job)?.cyan()),
            None => println!("{}", format!("Queue {} is empty", queue).yellow()),
        },

        Commands::Size { queue } => {
            println!("{}", service.size(&queue).await?.to_string().bold());
        }

        Commands::RemoveQueue { queue } => {
            let removed = service.remove_queue(&queue).await?;
            println!("{}", format!("✓ Queue {} removed ({} job(s))", queue, removed).green());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arg_reads_json_or_falls_back_to_string() {
        assert_eq!(parse_arg("22"), json!(22));
        assert_eq!(parse_arg(r#"{"foo":1}"#), json!({"foo": 1}));
        assert_eq!(parse_arg("\"quoted\""), json!("quoted"));
        assert_eq!(parse_arg("foo"), json!("foo"));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli =
            Cli::try_parse_from(["loner", "enqueue", "SomeUniqueJob", "foo", "--queue", "q"])
                .unwrap();
        match cli.command {
            Commands::Enqueue {
                job_type,
                args,
                queue,
            } => {
                assert_eq!(job_type, "SomeUniqueJob");
                assert_eq!(args, vec!["foo".to_string()]);
                assert_eq!(queue.as_deref(), Some("q"));
            }
            _ => panic!("expected enqueue"),
        }
        assert!(Cli::try_parse_from(["loner", "remove-queue", "--queue", "q"]).is_ok());
        assert!(Cli::try_parse_from(["loner", "size"]).is_err());
    }
}
