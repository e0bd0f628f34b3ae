// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message-queue scheduling on a discrete clock.
//!
//! One time unit of work is done per tick. Arrivals at time `t` join the
//! queue before a message preempted at `t` rejoins it. Selection ties break
//! by arrival time, then by input position.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Most messages per run.
pub const MAX_MESSAGES: usize = 20;
/// Longest processing time of one message.
pub const MAX_BURST: u32 = 20;
/// Latest arrival time.
pub const MAX_ARRIVAL: u32 = 100;
/// Highest priority; larger is more urgent.
pub const MAX_PRIORITY: u8 = 5;
/// Longest round-robin quantum.
pub const MAX_QUANTUM: u32 = 10;

const COUNTERS: &[&str] = &["ticks", "dispatches", "preemptions", "completions"];

/// Queue discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    /// First in, first out.
    Fifo,
    /// Highest priority first; non-preemptive.
    Priority,
    /// Shortest processing time first; non-preemptive.
    ShortestJobFirst,
    /// FIFO with a time quantum.
    RoundRobin {
        /// Units a message may run before it is preempted.
        quantum: u32,
    },
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::Priority => f.write_str("priority"),
            Self::ShortestJobFirst => f.write_str("sjf"),
            Self::RoundRobin { quantum } => write!(f, "rr:{quantum}"),
        }
    }
}

impl FromStr for Policy {
    type Err = InputError;

    /// Accepts `fifo`, `priority`, `sjf` and `rr:Q` (quantum `Q`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        match key.as_str() {
            "fifo" => Ok(Self::Fifo),
            "priority" => Ok(Self::Priority),
            "sjf" => Ok(Self::ShortestJobFirst),
            _ => key
                .strip_prefix("rr:")
                .and_then(|q| q.parse().ok())
                .map(|quantum| Self::RoundRobin { quantum })
                .ok_or_else(|| InputError::Parse {
                    input: s.to_owned(),
                    reason: "expected `fifo`, `priority`, `sjf` or `rr:Q`".to_owned(),
                }),
        }
    }
}

/// One message to schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Display label.
    pub label: String,
    /// Urgency `1..=MAX_PRIORITY`.
    pub priority: u8,
    /// Time the message enters the queue.
    pub arrival: u32,
    /// Units of work needed.
    pub burst: u32,
}

impl FromStr for Message {
    type Err = InputError;

    /// Accepts `label,burst[,priority[,arrival]]`; priority defaults to 1,
    /// arrival to 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || InputError::Parse {
            input: s.to_owned(),
            reason: "expected `label,burst[,priority[,arrival]]`".to_owned(),
        };
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let (label, rest) = parts.split_first().ok_or_else(parse_err)?;
        if label.is_empty() || rest.is_empty() || rest.len() > 3 {
            return Err(parse_err());
        }
        let burst = rest[0].parse().map_err(|_| parse_err())?;
        let priority = rest.get(1).map_or(Ok(1), |p| p.parse()).map_err(|_| parse_err())?;
        let arrival = rest.get(2).map_or(Ok(0), |a| a.parse()).map_err(|_| parse_err())?;
        Ok(Self {
            label: (*label).to_owned(),
            priority,
            arrival,
            burst,
        })
    }
}

/// Input for [`SchedulerExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerInput {
    /// Queue discipline.
    pub policy: Policy,
    /// Messages in input order.
    pub messages: Vec<Message>,
}

impl SchedulerInput {
    fn validate(&self) -> Result<(), InputError> {
        InputError::check_len("message list", self.messages.len(), MAX_MESSAGES)?;
        if let Policy::RoundRobin { quantum } = self.policy {
            InputError::check_range("quantum", quantum.into(), 1, MAX_QUANTUM.into())?;
        }
        for m in &self.messages {
            InputError::check_range("processing time", m.burst.into(), 1, MAX_BURST.into())?;
            InputError::check_range("priority", m.priority.into(), 1, MAX_PRIORITY.into())?;
            InputError::check_range("arrival time", m.arrival.into(), 0, MAX_ARRIVAL.into())?;
        }
        Ok(())
    }
}

/// Per-message view inside a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    /// The message as submitted.
    pub message: Message,
    /// Units of work left.
    pub remaining: u32,
    /// First dispatch time.
    pub started: Option<u32>,
    /// Completion time.
    pub finished: Option<u32>,
}

impl JobView {
    /// Time from arrival to first dispatch.
    pub fn response(&self) -> Option<u32> {
        self.started.map(|s| s - self.message.arrival)
    }

    /// Time from arrival to completion.
    pub fn turnaround(&self) -> Option<u32> {
        self.finished.map(|f| f - self.message.arrival)
    }

    /// Time spent ready but not running.
    pub fn wait(&self) -> Option<u32> {
        self.turnaround().map(|t| t - self.message.burst)
    }
}

/// Averages over every completed message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Mean wait time.
    pub average_wait: f64,
    /// Mean response time.
    pub average_response: f64,
    /// Mean turnaround time.
    pub average_turnaround: f64,
    /// Completed messages per time unit.
    pub throughput: f64,
}

/// What a scheduler snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedStep {
    /// Nothing has happened yet.
    #[default]
    Init,
    /// A message joined the queue.
    Arrive,
    /// The processor took a message.
    Dispatch,
    /// One unit of work.
    Run,
    /// A quantum expired.
    Preempt,
    /// A message finished.
    Complete,
    /// Nothing ready; the clock jumped.
    Idle,
    /// Every message finished.
    Done,
}

/// Snapshot payload for scheduler traces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    /// Current time.
    pub time: u32,
    /// Every message with its progress, in input order.
    pub jobs: Vec<JobView>,
    /// Waiting message ids in queue order.
    pub queue: Vec<usize>,
    /// Message on the processor.
    pub running: Option<usize>,
    /// Quantum units left for the running message (round robin only).
    pub quantum_left: Option<u32>,
    /// Completed message ids in completion order.
    pub completed: Vec<usize>,
    /// Averages once every message has finished.
    pub stats: Option<QueueStats>,
    /// Kind of step.
    pub step: SchedStep,
}

/// Simulates one [`Policy`] over a message list.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchedulerExecutor;

impl Executor for SchedulerExecutor {
    type Input = SchedulerInput;
    type State = SchedulerState;

    fn name(&self) -> &'static str {
        "message-queue"
    }

    fn run(&self, input: &SchedulerInput) -> Trace<SchedulerState> {
        if let Err(e) = input.validate() {
            return reject(&e, SchedulerState::default());
        }
        let mut sim = Sim::new(input);
        sim.run();
        sim.rec.finish()
    }
}

struct Sim {
    policy: Policy,
    /// Ids ordered by `(arrival, id)`.
    arrivals: Vec<usize>,
    admitted: usize,
    state: SchedulerState,
    rec: TraceRecorder<SchedulerState>,
}

impl Sim {
    fn new(input: &SchedulerInput) -> Self {
        let jobs: Vec<JobView> = input
            .messages
            .iter()
            .map(|m| JobView {
                message: m.clone(),
                remaining: m.burst,
                started: None,
                finished: None,
            })
            .collect();
        let mut arrivals: Vec<usize> = (0..jobs.len()).collect();
        arrivals.sort_by_key(|&i| (jobs[i].message.arrival, i));
        let state = SchedulerState {
            jobs,
            ..SchedulerState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!(
                "Scheduling {} messages with {} policy",
                state.jobs.len(),
                input.policy
            ),
            state.clone(),
            COUNTERS,
        );
        Self {
            policy: input.policy,
            arrivals,
            admitted: 0,
            state,
            rec,
        }
    }

    fn snap(&mut self, description: String, step: SchedStep) {
        self.state.step = step;
        self.rec.record(description, self.state.clone());
    }

    fn label(&self, id: usize) -> String {
        self.state.jobs[id].message.label.clone()
    }

    fn admit(&mut self) {
        while let Some(&id) = self.arrivals.get(self.admitted) {
            if self.state.jobs[id].message.arrival > self.state.time {
                break;
            }
            self.admitted += 1;
            self.state.queue.push(id);
            let t = self.state.time;
            self.snap(format!("t={t}: {} arrived", self.label(id)), SchedStep::Arrive);
        }
    }

    /// Position in the queue of the next message to dispatch.
    fn pick(&self) -> usize {
        let key = |pos: usize| {
            let id = self.state.queue[pos];
            let m = &self.state.jobs[id].message;
            match self.policy {
                Policy::Fifo | Policy::RoundRobin { .. } => (0, 0, pos),
                Policy::Priority => (u32::from(MAX_PRIORITY - m.priority), m.arrival, id),
                Policy::ShortestJobFirst => (m.burst, m.arrival, id),
            }
        };
        (0..self.state.queue.len()).min_by_key(|&p| key(p)).unwrap_or(0)
    }

    fn run(&mut self) {
        loop {
            self.admit();
            let Some(id) = self.state.running.or_else(|| self.dispatch()) else {
                match self.arrivals.get(self.admitted) {
                    Some(&next) => {
                        let from = self.state.time;
                        self.state.time = self.state.jobs[next].message.arrival;
                        let to = self.state.time;
                        self.snap(format!("t={from}: queue empty, idle until t={to}"), SchedStep::Idle);
                        continue;
                    }
                    None => break,
                }
            };
            self.tick(id);
        }
        self.finish();
    }

    fn dispatch(&mut self) -> Option<usize> {
        if self.state.queue.is_empty() {
            return None;
        }
        let pos = self.pick();
        let id = self.state.queue.remove(pos);
        let t = self.state.time;
        let job = &mut self.state.jobs[id];
        if job.started.is_none() {
            job.started = Some(t);
        }
        self.state.running = Some(id);
        if let Policy::RoundRobin { quantum } = self.policy {
            self.state.quantum_left = Some(quantum);
        }
        self.rec.count("dispatches");
        self.snap(format!("t={t}: dispatched {}", self.label(id)), SchedStep::Dispatch);
        Some(id)
    }

    fn tick(&mut self, id: usize) {
        self.state.time += 1;
        self.rec.count("ticks");
        let t = self.state.time;
        self.state.jobs[id].remaining -= 1;
        if let Some(q) = self.state.quantum_left.as_mut() {
            *q -= 1;
        }
        let left = self.state.jobs[id].remaining;
        let label = self.label(id);
        if left == 0 {
            self.state.jobs[id].finished = Some(t);
            self.state.running = None;
            self.state.quantum_left = None;
            self.state.completed.push(id);
            self.rec.count("completions");
            self.snap(format!("t={t}: {label} completed"), SchedStep::Complete);
        } else if self.state.quantum_left == Some(0) {
            self.admit();
            self.state.running = None;
            self.state.quantum_left = None;
            self.state.queue.push(id);
            self.rec.count("preemptions");
            self.snap(
                format!("t={t}: quantum expired, {label} preempted with {left} left"),
                SchedStep::Preempt,
            );
        } else {
            self.snap(format!("t={t}: processed {label}, {left} left"), SchedStep::Run);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&mut self) {
        let n = self.state.jobs.len() as f64;
        let sum = |f: fn(&JobView) -> Option<u32>| {
            self.state
                .jobs
                .iter()
                .filter_map(f)
                .map(f64::from)
                .sum::<f64>()
        };
        let stats = QueueStats {
            average_wait: sum(JobView::wait) / n,
            average_response: sum(JobView::response) / n,
            average_turnaround: sum(JobView::turnaround) / n,
            throughput: n / f64::from(self.state.time.max(1)),
        };
        self.state.stats = Some(stats);
        self.snap(
            format!(
                "All messages processed at t={}; average wait {:.2}, average turnaround {:.2}",
                self.state.time, stats.average_wait, stats.average_turnaround
            ),
            SchedStep::Done,
        );
    }
}
