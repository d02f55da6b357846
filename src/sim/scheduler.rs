//! Delayed one-shot tasks
//!
//! Anything that happens "a little later" (restoring a flashed target,
//! the plunger's delayed push, respawning a free ball) is queued here with
//! a fire time on the simulation clock. Tasks fire at the start of the first
//! tick whose time has reached them, in (fire time, insertion) order, so a
//! replay with the same inputs fires them identically.
//!
//! Tasks carry the ids of the shapes they act on. A task whose shape was
//! destroyed in the meantime is simply skipped by the simulator.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::shape::ShapeId;
use crate::theme::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledTask {
    /// Put a flashed target back to its resting color
    RestoreFill { shape: ShapeId, color: Color },
    /// Plunger push on the ball waiting in the lane
    LaunchImpulse { ball: ShapeId },
    /// Replace a faded free ball with a fresh one in the lane
    RespawnBall { old_ball: ShapeId },
    HideFreeBallNotice,
    /// Remove a drained ball once it has faded
    DestroyBall { ball: ShapeId },
}

#[derive(Debug, Clone)]
struct Entry {
    fire_at: f32,
    seq: u64,
    task: ScheduledTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and we want the earliest entry on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to fire once the clock reaches `fire_at`
    pub fn schedule(&mut self, fire_at: f32, task: ScheduledTask) {
        log::trace!("Scheduled {:?} at {:.3}", task, fire_at);
        self.queue.push(Entry {
            fire_at,
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    /// Pop the next task due at or before `now`
    pub fn pop_due(&mut self, now: f32) -> Option<ScheduledTask> {
        if self.queue.peek()?.fire_at > now {
            return None;
        }
        self.queue.pop().map(|entry| entry.task)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
