//! Timed replay of saved lines.
//!
//! Paints are queued against a virtual clock the host advances. Every paint
//! is stamped with the queue generation at scheduling time; [`ReplayQueue::cancel`]
//! moves to a new generation so nothing scheduled earlier can land on a
//! canvas that has since been cleared or reloaded.

use crate::line::Line;
use std::rc::Rc;
use std::time::Duration;

/// A single deferred paint.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayStep {
    /// Preview the first `upto` points of `line` on the temp layer.
    Preview { line: Rc<Line>, upto: usize },
    /// Commit `line` with its own color and radius.
    Commit { line: Rc<Line> },
}

#[derive(Debug, Clone)]
struct ScheduledPaint {
    due: Duration,
    seq: u64,
    generation: u64,
    step: ReplayStep,
}

/// Pending replay paints ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub struct ReplayQueue {
    clock: Duration,
    generation: u64,
    next_seq: u64,
    pending: Vec<ScheduledPaint>,
}

impl ReplayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.clock
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of paints still waiting.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue an animated replay of `lines`, one prefix per `gap`, strokes
    /// strictly one after another. Returns the time the last commit lands,
    /// relative to now.
    pub fn schedule_lines(&mut self, lines: Vec<Line>, gap: Duration) -> Duration {
        let mut offset = Duration::ZERO;
        let mut scheduled = 0usize;

        for line in lines {
            let line = Rc::new(line);
            for upto in 2..=line.len() {
                offset += gap;
                self.push(offset, ReplayStep::Preview { line: line.clone(), upto });
                scheduled += 1;
            }
            offset += gap;
            self.push(offset, ReplayStep::Commit { line });
            scheduled += 1;
        }

        log::debug!(
            "Scheduled {} replay paints over {:?} (generation {})",
            scheduled,
            offset,
            self.generation
        );
        offset
    }

    fn push(&mut self, offset: Duration, step: ReplayStep) {
        let paint = ScheduledPaint {
            due: self.clock + offset,
            seq: self.next_seq,
            generation: self.generation,
            step,
        };
        self.next_seq += 1;
        let at = self
            .pending
            .partition_point(|p| (p.due, p.seq) <= (paint.due, paint.seq));
        self.pending.insert(at, paint);
    }

    /// Invalidate everything scheduled so far.
    pub fn cancel(&mut self) {
        if !self.pending.is_empty() {
            log::debug!(
                "Cancelling {} pending replay paints (generation {})",
                self.pending.len(),
                self.generation
            );
        }
        self.generation += 1;
        self.pending.clear();
    }

    /// Move the clock forward.
    pub fn advance(&mut self, dt: Duration) {
        self.clock += dt;
    }

    /// Next paint that is due and still current.
    pub fn pop_due(&mut self) -> Option<ReplayStep> {
        while let Some(first) = self.pending.first() {
            if first.due > self.clock {
                return None;
            }
            let paint = self.pending.remove(0);
            if paint.generation == self.generation {
                return Some(paint.step);
            }
        }
        None
    }

    /// Take every current paint regardless of due time, in order, and move
    /// the clock to the last due time.
    pub fn drain_all(&mut self) -> Vec<ReplayStep> {
        if let Some(last) = self.pending.last() {
            self.clock = self.clock.max(last.due);
        }
        let generation = self.generation;
        std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|p| p.generation == generation)
            .map(|p| p.step)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::BrushColor;
    use kurbo::Point;

    fn line(n: usize) -> Line {
        Line::new(
            (0..n).map(|i| Point::new(i as f64, 0.0)).collect(),
            BrushColor::default(),
            2.0,
        )
    }

    fn describe(step: &ReplayStep) -> String {
        match step {
            ReplayStep::Preview { line, upto } => format!("p{}/{}", upto, line.len()),
            ReplayStep::Commit { line } => format!("c{}", line.len()),
        }
    }

    #[test]
    fn test_schedule_order_and_timing() {
        let mut q = ReplayQueue::new();
        let total = q.schedule_lines(vec![line(3), line(2)], Duration::from_millis(5));
        assert_eq!(total, Duration::from_millis(25));
        assert_eq!(q.pending(), 5);

        q.advance(Duration::from_millis(9));
        let first: Vec<_> = std::iter::from_fn(|| q.pop_due()).map(|s| describe(&s)).collect();
        assert_eq!(first, vec!["p2/3"]);

        q.advance(Duration::from_millis(100));
        let rest: Vec<_> = std::iter::from_fn(|| q.pop_due()).map(|s| describe(&s)).collect();
        assert_eq!(rest, vec!["p3/3", "c3", "p2/2", "c2"]);
        assert!(q.is_idle());
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut q = ReplayQueue::new();
        q.schedule_lines(vec![line(4)], Duration::from_millis(1));
        let generation = q.generation();

        q.cancel();
        assert!(q.is_idle());
        assert_eq!(q.generation(), generation + 1);

        q.advance(Duration::from_secs(1));
        assert!(q.pop_due().is_none());
    }

    #[test]
    fn test_drain_all_moves_clock() {
        let mut q = ReplayQueue::new();
        q.schedule_lines(vec![line(2)], Duration::from_millis(10));
        let steps = q.drain_all();

        assert_eq!(steps.len(), 2);
        assert_eq!(q.now(), Duration::from_millis(20));
        assert!(q.is_idle());
    }

    #[test]
    fn test_zero_gap_keeps_order() {
        let mut q = ReplayQueue::new();
        q.schedule_lines(vec![line(2), line(2)], Duration::ZERO);
        let steps: Vec<_> = std::iter::from_fn(|| q.pop_due()).map(|s| describe(&s)).collect();
        assert_eq!(steps, vec!["p2/2", "c2", "p2/2", "c2"]);
    }
}
