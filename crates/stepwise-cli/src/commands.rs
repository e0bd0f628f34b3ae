// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subcommand bodies, each a [`JobVisitor`] so it sees the concrete
//! executor type.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use stepwise_core::{
    verify_determinism, Executor, NarrationPresenter, Presenter, Snapshot, Trace, TraceDigest,
};
use tracing::{debug, info};

use crate::job::JobVisitor;

/// One narration line; counters are dropped when `show_metrics` is off.
pub fn narrate<S>(snapshot: &Snapshot<S>, total: usize, show_metrics: bool) -> String {
    if show_metrics {
        NarrationPresenter.render(snapshot, total)
    } else {
        let bare = Snapshot::new(snapshot.index, snapshot.description.as_str(), ());
        NarrationPresenter.render(&bare, total)
    }
}

#[derive(Serialize)]
struct TraceDocument<'a, S> {
    executor: &'static str,
    digest: String,
    snapshots: &'a Trace<S>,
}

/// `stepwise run`: print the whole trace at once.
pub struct Run<'a, W> {
    /// Destination.
    pub out: &'a mut W,
    /// Emit JSON instead of narration.
    pub json: bool,
    /// Append counters to narration lines.
    pub show_metrics: bool,
}

impl<W: Write> JobVisitor for Run<'_, W> {
    type Output = Result<()>;

    fn visit<E>(self, executor: &E, input: &E::Input) -> Result<()>
    where
        E: Executor,
        E::State: Serialize + Send + Sync + 'static,
    {
        let trace = executor.run(input);
        info!(executor = executor.name(), snapshots = trace.len(), "trace recorded");
        if self.json {
            let doc = TraceDocument {
                executor: executor.name(),
                digest: trace.digest()?.to_hex(),
                snapshots: &trace,
            };
            serde_json::to_writer_pretty(&mut *self.out, &doc)?;
            writeln!(self.out)?;
        } else {
            for snapshot in &trace {
                writeln!(self.out, "{}", narrate(snapshot, trace.len(), self.show_metrics))?;
            }
        }
        Ok(())
    }
}

/// `stepwise play`: animate the trace through the playback driver.
pub struct Play<'a, W> {
    /// Destination.
    pub out: &'a mut W,
    /// Interval between snapshots.
    pub speed: Duration,
    /// Append counters to narration lines.
    pub show_metrics: bool,
}

impl<W: Write> JobVisitor for Play<'_, W> {
    type Output = Result<()>;

    fn visit<E>(self, executor: &E, input: &E::Input) -> Result<()>
    where
        E: Executor,
        E::State: Serialize + Send + Sync + 'static,
    {
        let trace = executor.run(input);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("failed to start the playback runtime")?;
        runtime.block_on(animate(trace, self.speed, self.out, self.show_metrics))
    }
}

async fn animate<S, W>(
    trace: Trace<S>,
    speed: Duration,
    out: &mut W,
    show_metrics: bool,
) -> Result<()>
where
    S: Clone + Send + Sync + 'static,
    W: Write,
{
    let total = trace.len();
    let (player, task) = stepwise_player::spawn::<S>(speed);
    let mut views = player.subscribe();
    player.load(trace.clone()).await?;
    player.play().await?;

    // The watch channel may coalesce ticks; print every index up to the
    // published one so no step is skipped.
    let mut next = 0;
    loop {
        let view = views.borrow_and_update().clone();
        if let Some(current) = view.state.current_index {
            for snapshot in trace.as_slice().get(next..=current).unwrap_or_default() {
                writeln!(out, "{}", narrate(snapshot, total, show_metrics))?;
            }
            out.flush()?;
            next = next.max(current + 1);
        }
        if !view.state.is_playing || views.changed().await.is_err() {
            break;
        }
    }
    debug!(shown = next, total, "playback drained");

    player.shutdown().await?;
    task.await.context("player task failed")?;
    Ok(())
}

/// `stepwise record` / `stepwise verify`: digest one run.
pub struct Record;

/// What [`Record`] measured.
pub struct Recording {
    /// Executor identifier.
    pub executor: &'static str,
    /// Trace length.
    pub snapshots: usize,
    /// Trace digest.
    pub digest: TraceDigest,
}

impl JobVisitor for Record {
    type Output = Result<Recording>;

    fn visit<E>(self, executor: &E, input: &E::Input) -> Result<Recording>
    where
        E: Executor,
        E::State: Serialize + Send + Sync + 'static,
    {
        let trace = executor.run(input);
        Ok(Recording {
            executor: executor.name(),
            snapshots: trace.len(),
            digest: trace.digest()?,
        })
    }
}

/// `stepwise torture`: re-run and compare digests.
pub struct Torture {
    /// Total number of runs, including the first.
    pub runs: usize,
}

impl JobVisitor for Torture {
    type Output = Result<TraceDigest>;

    fn visit<E>(self, executor: &E, input: &E::Input) -> Result<TraceDigest>
    where
        E: Executor,
        E::State: Serialize + Send + Sync + 'static,
    {
        info!(executor = executor.name(), runs = self.runs, "torture started");
        let digest = verify_determinism(executor, input, self.runs)
            .with_context(|| format!("{} is not deterministic", executor.name()))?;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::job::Job;

    fn job(algorithm: &str, raw: &[&str]) -> Job {
        let args: Vec<String> = raw.iter().map(|s| (*s).to_owned()).collect();
        Job::parse(algorithm, &args).unwrap()
    }

    #[test]
    fn run_prints_one_line_per_snapshot() {
        let mut out = Vec::new();
        job("insertion", &["3", "1", "2"])
            .dispatch(Run {
                out: &mut out,
                json: false,
                show_metrics: true,
            })
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("[1/"));
        let total = lines.len();
        assert!(lines[total - 1].starts_with(&format!("[{total}/{total}]")));
    }

    #[test]
    fn metrics_can_be_hidden() {
        let metrics = [("swaps", 1)].into_iter().collect();
        let snap = Snapshot::new(0, "Swap", ()).with_metrics(metrics);
        assert_eq!(narrate(&snap, 2, true), "[1/2] Swap (swaps=1)");
        assert_eq!(narrate(&snap, 2, false), "[1/2] Swap");
    }

    #[test]
    fn json_output_carries_the_digest() {
        let mut out = Vec::new();
        let sorting = job("bubble", &["2", "1"]);
        sorting
            .dispatch(Run {
                out: &mut out,
                json: true,
                show_metrics: true,
            })
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let recording = sorting.dispatch(Record).unwrap();
        assert_eq!(doc["executor"], "bubble-sort");
        assert_eq!(doc["digest"], recording.digest.to_hex());
        assert_eq!(
            doc["snapshots"].as_array().unwrap().len(),
            recording.snapshots
        );
    }

    #[test]
    fn play_prints_every_snapshot_in_order() {
        let sorting = job("selection", &["4", "2", "3", "1"]);
        let mut played = Vec::new();
        sorting
            .dispatch(Play {
                out: &mut played,
                speed: Duration::from_millis(1),
                show_metrics: false,
            })
            .unwrap();
        let mut printed = Vec::new();
        sorting
            .dispatch(Run {
                out: &mut printed,
                json: false,
                show_metrics: false,
            })
            .unwrap();
        assert_eq!(played, printed);
    }

    #[test]
    fn torture_returns_the_common_digest() {
        let matching = job("kmp", &["abab", "ab"]);
        let digest = matching.dispatch(Torture { runs: 5 }).unwrap();
        assert_eq!(digest, matching.dispatch(Record).unwrap().digest);
    }
}
