//! Observation replay: one worker task per subject

use health_state::{AlertLevel, HealthAnalysis, HealthAnalyzer, Observation};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result line written for each input line
#[derive(Debug, Clone, Serialize)]
pub struct ObservationOutcome {
    /// 1-based input line number
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<HealthAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ObservationOutcome {
    fn analyzed(line: usize, subject_id: String, analysis: HealthAnalysis) -> Self {
        Self {
            line,
            subject_id: Some(subject_id),
            analysis: Some(analysis),
            error: None,
        }
    }

    fn failed(line: usize, subject_id: Option<String>, error: String) -> Self {
        Self {
            line,
            subject_id,
            analysis: None,
            error: Some(error),
        }
    }
}

/// Totals for one replay run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub lines: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub emergencies: usize,
    pub subjects: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &ObservationOutcome) {
        self.lines += 1;
        match &outcome.analysis {
            Some(analysis) => {
                self.analyzed += 1;
                match analysis.alert_level {
                    AlertLevel::Emergency => self.emergencies += 1,
                    AlertLevel::Warning => self.warnings += 1,
                    AlertLevel::None => {}
                }
            }
            None => self.failed += 1,
        }
    }
}

type Job = (usize, Observation);

fn spawn_worker(
    subject_id: String,
    analyzer: Arc<HealthAnalyzer>,
    mut jobs: mpsc::Receiver<Job>,
    results: mpsc::Sender<ObservationOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Worker started for subject {}", subject_id);
        while let Some((line, observation)) = jobs.recv().await {
            let outcome = match analyzer.analyze(&observation) {
                Ok(analysis) => ObservationOutcome::analyzed(line, subject_id.clone(), analysis),
                Err(e) => ObservationOutcome::failed(line, Some(subject_id.clone()), e.to_string()),
            };
            if results.send(outcome).await.is_err() {
                break;
            }
        }
        debug!("Worker stopped for subject {}", subject_id);
    })
}

/// Hand a job to its subject's worker; a closed worker queue becomes a failed outcome.
///
/// Returns `false` once the results channel is closed.
async fn dispatch_job(
    subject_id: &str,
    jobs: &mpsc::Sender<Job>,
    results: &mpsc::Sender<ObservationOutcome>,
    job: Job,
) -> bool {
    match jobs.send(job).await {
        Ok(()) => true,
        Err(mpsc::error::SendError((line, _))) => {
            warn!("Line {}: worker for subject {} stopped early", line, subject_id);
            let outcome = ObservationOutcome::failed(
                line,
                Some(subject_id.to_string()),
                format!("worker for subject {} stopped", subject_id),
            );
            results.send(outcome).await.is_ok()
        }
    }
}

/// Read NDJSON observations from `reader`, analyze them, write one JSON outcome per line.
///
/// Observations for the same subject are analyzed in input order by that
/// subject's worker; different subjects run concurrently, so output lines
/// may interleave across subjects.
pub async fn replay<R, W>(
    analyzer: Arc<HealthAnalyzer>,
    reader: R,
    mut writer: W,
    channel_capacity: usize,
) -> anyhow::Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let capacity = channel_capacity.max(1);
    let (results_tx, mut results_rx) = mpsc::channel::<ObservationOutcome>(capacity);

    let dispatch = async move {
        let mut workers: HashMap<String, (mpsc::Sender<Job>, JoinHandle<()>)> = HashMap::new();
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let observation: Observation = match serde_json::from_str(&line) {
                Ok(obs) => obs,
                Err(e) => {
                    warn!("Line {}: malformed observation: {}", line_no, e);
                    let outcome = ObservationOutcome::failed(line_no, None, e.to_string());
                    if results_tx.send(outcome).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let subject_id = observation.subject_id.clone();
            let (jobs, _) = workers.entry(subject_id.clone()).or_insert_with(|| {
                info!("New subject {} on line {}", subject_id, line_no);
                let (tx, rx) = mpsc::channel(capacity);
                let handle =
                    spawn_worker(subject_id.clone(), Arc::clone(&analyzer), rx, results_tx.clone());
                (tx, handle)
            });

            if !dispatch_job(&subject_id, jobs, &results_tx, (line_no, observation)).await {
                break;
            }
        }

        let subjects = workers.len();
        drop(results_tx);
        for (subject_id, (jobs, handle)) in workers {
            drop(jobs);
            if let Err(e) = handle.await {
                warn!("Worker for subject {} failed: {}", subject_id, e);
            }
        }

        Ok::<usize, anyhow::Error>(subjects)
    };

    let collect = async {
        let mut summary = ReplaySummary::default();
        while let Some(outcome) = results_rx.recv().await {
            summary.record(&outcome);
            let mut json = serde_json::to_vec(&outcome)?;
            json.push(b'\n');
            writer.write_all(&json).await?;
        }
        writer.flush().await?;
        Ok::<ReplaySummary, anyhow::Error>(summary)
    };

    let (subjects, summary) = tokio::join!(dispatch, collect);
    let mut summary = summary?;
    summary.subjects = subjects?;

    info!(
        "Replay finished: {} lines, {} analyzed, {} failed, {} warnings, {} emergencies",
        summary.lines, summary.analyzed, summary.failed, summary.warnings, summary.emergencies
    );

    Ok(summary)
}
