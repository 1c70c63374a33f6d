//! Resilient batch runner.
//!
//! Scrapes a list of players one at a time. Each player runs as its own
//! child process under a wall-clock budget; on timeout the child is asked to
//! stop, given a grace period, then killed. Whatever rows the child flushed
//! before that are counted and reported.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::scraper::player_slug;
use crate::storage::MatchRepository;
use crate::types::{BatchJob, BatchSummary, JobStatus};

/// What a launched job needs to know.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub url: String,
    pub output_path: PathBuf,
}

/// How a job ended on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobExit {
    Completed,
    Failed { code: Option<i32> },
}

/// A running job.
#[allow(async_fn_in_trait)]
pub trait JobHandle {
    /// Wait for the job to end. Must be safe to cancel and call again.
    async fn wait(&mut self) -> Result<JobExit>;

    /// Ask the job to stop.
    async fn terminate(&mut self) -> Result<()>;

    /// Stop the job unconditionally.
    async fn kill(&mut self) -> Result<()>;
}

/// Starts jobs.
#[allow(async_fn_in_trait)]
pub trait JobLauncher {
    type Handle: JobHandle;

    async fn launch(&self, spec: &JobSpec) -> Result<Self::Handle>;
}

/// Runs each job as `<program> scrape <url> -o <output>`.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Launcher that re-executes the running binary.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe().context("Failed to locate the running executable")?;
        Ok(Self::new(program))
    }
}

impl JobLauncher for ProcessLauncher {
    type Handle = ProcessHandle;

    async fn launch(&self, spec: &JobSpec) -> Result<ProcessHandle> {
        let mut command = Command::new(&self.program);
        command
            .arg("scrape")
            .arg(&spec.url)
            .arg("-o")
            .arg(&spec.output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Keep child logs quiet unless the caller chose a filter
        if std::env::var_os("RUST_LOG").is_none() {
            command.env("RUST_LOG", "dupr_scraper=warn");
        }

        let child = command
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;
        debug!("Started job for {} (pid {:?})", spec.url, child.id());

        Ok(ProcessHandle { child })
    }
}

/// Child process of a [`ProcessLauncher`].
pub struct ProcessHandle {
    child: Child,
}

impl JobHandle for ProcessHandle {
    async fn wait(&mut self) -> Result<JobExit> {
        let status = self.child.wait().await?;
        Ok(if status.success() {
            JobExit::Completed
        } else {
            JobExit::Failed {
                code: status.code(),
            }
        })
    }

    #[cfg(unix)]
    async fn terminate(&mut self) -> Result<()> {
        let Some(pid) = self.child.id() else {
            // Already reaped
            return Ok(());
        };
        // Shell builtin, so no separate kill binary is needed
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!("kill -TERM {}", pid))
            .status()
            .await
            .context("Failed to run kill")?;
        if !status.success() {
            warn!("kill -TERM {} exited with {}", pid, status);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn terminate(&mut self) -> Result<()> {
        Ok(self.child.start_kill()?)
    }

    async fn kill(&mut self) -> Result<()> {
        Ok(self.child.kill().await?)
    }
}

/// Progress notifications from [`BatchRunner::run`].
#[derive(Debug)]
pub enum Progress<'a> {
    Started { index: usize, total: usize, url: &'a str },
    Finished { index: usize, total: usize, job: &'a BatchJob },
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub jobs: Vec<BatchJob>,
    pub summary: BatchSummary,
}

/// Sequential, timeout-supervised batch runner.
pub struct BatchRunner<L> {
    launcher: L,
    timeout: Duration,
    grace: Duration,
    job_delay: Duration,
    output_dir: PathBuf,
}

impl<L: JobLauncher> BatchRunner<L> {
    pub fn new(launcher: L, config: &BatchConfig) -> Self {
        Self {
            launcher,
            timeout: Duration::from_secs(config.timeout_secs),
            grace: Duration::from_secs(config.grace_secs),
            job_delay: Duration::from_millis(config.job_delay_ms),
            output_dir: PathBuf::from(&config.output_dir),
        }
    }

    /// Run every URL in order. A failed job never stops the batch.
    pub async fn run<F>(&self, urls: &[String], mut progress: F) -> BatchReport
    where
        F: FnMut(Progress<'_>),
    {
        let total = urls.len();
        let mut jobs = Vec::with_capacity(total);
        let mut summary = BatchSummary::default();

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.job_delay.is_zero() {
                tokio::time::sleep(self.job_delay).await;
            }

            progress(Progress::Started {
                index: i + 1,
                total,
                url,
            });
            let job = self.run_job(url).await;
            info!("{}: {} ({})", url, job.status, job.message);

            summary.record(&job);
            progress(Progress::Finished {
                index: i + 1,
                total,
                job: &job,
            });
            jobs.push(job);
        }

        BatchReport { jobs, summary }
    }

    /// Run one player and classify the result.
    pub async fn run_job(&self, url: &str) -> BatchJob {
        let mut job = BatchJob {
            url: url.to_string(),
            output_path: String::new(),
            timeout_seconds: self.timeout.as_secs(),
            status: JobStatus::Failed,
            matches_recovered: 0,
            message: String::new(),
        };

        let Some(output_path) = output_path_for(&self.output_dir, url) else {
            job.message = "Failed (not a player URL)".to_string();
            return job;
        };
        job.output_path = output_path.display().to_string();

        let repo = MatchRepository::new(&output_path);
        if let Err(e) = repo.reset() {
            job.message = format!("Failed ({:#})", e);
            return job;
        }

        let spec = JobSpec {
            url: url.to_string(),
            output_path,
        };
        let mut handle = match self.launcher.launch(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                job.message = format!("Failed ({:#})", e);
                return job;
            }
        };

        let exit = match tokio::time::timeout(self.timeout, handle.wait()).await {
            Ok(exit) => Some(exit),
            Err(_) => {
                warn!("{} exceeded {:?}, stopping", url, self.timeout);
                self.stop(&mut handle).await;
                None
            }
        };

        let recovered = repo.match_count().unwrap_or_else(|e| {
            warn!("Could not inspect {}: {:#}", repo.path().display(), e);
            0
        });
        job.matches_recovered = recovered;

        let (status, message) = classify(exit, recovered);
        job.status = status;
        job.message = message;
        job
    }

    /// Graceful stop, then a forced one after the grace period.
    async fn stop(&self, handle: &mut L::Handle) {
        if let Err(e) = handle.terminate().await {
            warn!("Termination request failed: {:#}", e);
        }

        match tokio::time::timeout(self.grace, handle.wait()).await {
            Ok(_) => debug!("Job stopped after termination request"),
            Err(_) => {
                warn!("Job still running after {:?}, killing", self.grace);
                if let Err(e) = handle.kill().await {
                    warn!("Kill failed: {:#}", e);
                }
            }
        }
    }
}

fn classify(exit: Option<Result<JobExit>>, recovered: usize) -> (JobStatus, String) {
    match exit {
        Some(Ok(JobExit::Completed)) => (
            JobStatus::Success,
            format!("Success ({} matches)", recovered),
        ),
        Some(failure) if recovered > 0 => {
            if let Ok(JobExit::Failed { code }) = &failure {
                debug!("Job exited with {:?}", code);
            }
            (
                JobStatus::Partial,
                format!("Partial ({} matches saved)", recovered),
            )
        }
        Some(Ok(JobExit::Failed { code: Some(code) })) => {
            (JobStatus::Failed, format!("Failed (exit {})", code))
        }
        Some(Ok(JobExit::Failed { code: None })) => {
            (JobStatus::Failed, "Failed (terminated by signal)".to_string())
        }
        Some(Err(e)) => (JobStatus::Failed, format!("Failed ({:#})", e)),
        None if recovered > 0 => (
            JobStatus::Timeout,
            format!("Timeout ({} matches saved)", recovered),
        ),
        None => (JobStatus::Timeout, "Timeout (no data)".to_string()),
    }
}

/// `<output_dir>/<slug>_dupr.csv`, or `None` when the URL names no player.
pub fn output_path_for(output_dir: &Path, url: &str) -> Option<PathBuf> {
    let slug = player_slug(url)?;
    Some(output_dir.join(format!("{}_dupr.csv", slug)))
}

/// One URL per line; blank lines and `#` comments are skipped.
pub fn read_urls_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
