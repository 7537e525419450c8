//! Tick budget monitoring for the headless runner
//!
//! Keeps a rolling window of `step()` durations against the frame budget
//! implied by the tick rate. The runner logs the status periodically and
//! warns when the horde outgrows the budget.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept in the rolling window (~2 seconds at 60Hz)
const WINDOW: usize = 120;
/// Samples required before the status leaves `Nominal`
const MIN_SAMPLES: usize = 10;

/// Budget usage levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under 50% of the frame budget
    Nominal,
    /// 50-90% of the frame budget
    Strained,
    /// 90% or more; frames will be dropped
    Overrun,
}

impl BudgetStatus {
    pub fn is_overrun(&self) -> bool {
        matches!(self, BudgetStatus::Overrun)
    }
}

pub struct TickBudget {
    durations: VecDeque<Duration>,
    budget: Duration,
    status: BudgetStatus,
    started: Option<Instant>,
    last_population: usize,
}

impl TickBudget {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            durations: VecDeque::with_capacity(WINDOW),
            budget: Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32),
            status: BudgetStatus::Nominal,
            started: None,
            last_population: 0,
        }
    }

    pub fn tick_start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the current measurement; `population` is the live agent count
    pub fn tick_end(&mut self, population: usize) {
        if let Some(start) = self.started.take() {
            self.record(start.elapsed());
            self.last_population = population;
        }
    }

    fn record(&mut self, duration: Duration) {
        self.durations.push_back(duration);
        while self.durations.len() > WINDOW {
            self.durations.pop_front();
        }
        if self.durations.len() < MIN_SAMPLES {
            return;
        }

        let usage = self.usage();
        self.status = if usage < 0.5 {
            BudgetStatus::Nominal
        } else if usage < 0.9 {
            BudgetStatus::Strained
        } else {
            BudgetStatus::Overrun
        };
    }

    pub fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.durations.iter().sum();
        sum / self.durations.len() as u32
    }

    pub fn p95(&self) -> Duration {
        let mut sorted: Vec<_> = self.durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted
            .get(idx.min(sorted.len().saturating_sub(1)))
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Average step time as a fraction of the frame budget
    pub fn usage(&self) -> f32 {
        self.average().as_secs_f32() / self.budget.as_secs_f32()
    }

    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget (p95 {:?}), {} agents",
            self.status,
            self.usage() * 100.0,
            self.p95(),
            self.last_population
        )
    }
}

impl Default for TickBudget {
    fn default() -> Self {
        Self::new(crate::game::constants::timing::TICK_RATE)
    }
}
