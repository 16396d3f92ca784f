//! Step clocks standing in for the tracker player.
//!
//! The player advances one step per division played. Clocks only increment a pending step
//! counter, and the frame loop drains it before composing each frame.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, trace};

use crate::track::Tempo;

/// Timer ticks per frame are `bpm / FRAME_TICKS_DIVISOR` at 50 frames per second.
const FRAME_TICKS_DIVISOR: u32 = 125;
/// Longest sleep of the clock thread before it checks whether it was stopped.
const MAX_SLEEP: Duration = Duration::from_millis(20);

/// Steps played but not yet consumed by the frame loop. Written by a single clock, read by the
/// frame loop.
#[derive(Debug, Clone, Default)]
pub struct StepCounter(Arc<AtomicU8>);

impl StepCounter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(&self, steps: u8) {
        self.0.fetch_add(steps, Ordering::AcqRel);
    }

    /// Consumes one pending step. Returns false if none was pending.
    pub fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn pending(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

/// Real-time clock: a thread sleeping the duration of every step in turn.
pub struct ThreadedClock {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadedClock {
    /// Starts counting steps into `counter`, the `n`th step lasting as long as `tempos[n]`.
    pub fn start(counter: StepCounter, tempos: Vec<Tempo>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = thread::spawn(move || {
            for tempo in tempos {
                let mut remaining = tempo.step_duration();
                while remaining > Duration::default() {
                    if thread_stop.load(Ordering::Acquire) {
                        return;
                    }
                    let nap = remaining.min(MAX_SLEEP);
                    thread::sleep(nap);
                    remaining -= nap;
                }
                counter.add(1);
            }
            debug!("step clock reached the end of the track");
        });

        ThreadedClock {
            stop,
            thread: Some(thread),
        }
    }
}

impl Drop for ThreadedClock {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Deterministic clock advanced by the frame loop itself, at 50 frames per second.
#[derive(Debug)]
pub struct FrameClock {
    tempos: Vec<Tempo>,
    step: usize,
    ticks: u32,
}

impl FrameClock {
    pub fn new(tempos: Vec<Tempo>) -> Self {
        FrameClock {
            tempos,
            step: 0,
            ticks: 0,
        }
    }

    /// Advances the clock by one frame.
    pub fn frame(&mut self, counter: &StepCounter) {
        let tempo = match self.tempos.get(self.step) {
            Some(&tempo) => tempo,
            None => return,
        };

        // Ticks are counted in units of 1 / FRAME_TICKS_DIVISOR. Fast tempos play several
        // divisions per frame.
        self.ticks += tempo.bpm as u32;
        while let Some(tempo) = self.tempos.get(self.step) {
            let step_ticks = tempo.speed.max(1) as u32 * FRAME_TICKS_DIVISOR;
            if self.ticks < step_ticks {
                break;
            }
            self.ticks -= step_ticks;
            self.step += 1;
            counter.add(1);
            trace!("frame clock: step {}", self.step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_counter_drain() {
        let counter = StepCounter::new();
        assert!(!counter.take());
        counter.add(3);
        let handle = counter.clone();
        assert_eq!(handle.pending(), 3);

        let mut drained = 0;
        while counter.take() {
            drained += 1;
        }
        assert_eq!(drained, 3);
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_frame_clock_default_tempo() {
        // Speed 6 at 125 BPM plays a division every 6 frames.
        let counter = StepCounter::new();
        let mut clock = FrameClock::new(vec![Tempo::default(); 4]);
        for _ in 0..5 {
            clock.frame(&counter);
        }
        assert_eq!(counter.pending(), 0);
        clock.frame(&counter);
        assert_eq!(counter.pending(), 1);

        for _ in 0..100 {
            clock.frame(&counter);
        }
        // Stops at the end of the track.
        assert_eq!(counter.pending(), 4);
    }

    #[test]
    fn test_frame_clock_tempo_change() {
        let counter = StepCounter::new();
        let fast = Tempo { speed: 3, bpm: 250 };
        let mut clock = FrameClock::new(vec![fast, fast, Tempo::default()]);

        // 250 BPM at speed 3: 2 ticks per frame, one step every 1.5 frames.
        for _ in 0..3 {
            clock.frame(&counter);
        }
        assert_eq!(counter.pending(), 2);
        for _ in 0..6 {
            clock.frame(&counter);
        }
        assert_eq!(counter.pending(), 3);
    }

    #[test]
    fn test_frame_clock_several_steps_per_frame() {
        // Speed 1 at 250 BPM plays two divisions per frame.
        let counter = StepCounter::new();
        let mut clock = FrameClock::new(vec![Tempo { speed: 1, bpm: 250 }; 100]);
        for _ in 0..10 {
            clock.frame(&counter);
        }
        assert_eq!(counter.pending(), 20);

        // No backlog is left behind, and the clock still stops at the end.
        for _ in 0..100 {
            clock.frame(&counter);
        }
        assert_eq!(counter.pending(), 100);
    }

    #[test]
    fn test_threaded_clock() {
        let counter = StepCounter::new();
        let tempo = Tempo { speed: 1, bpm: 250 };
        let start = Instant::now();
        let clock = ThreadedClock::start(counter.clone(), vec![tempo; 3]);

        while counter.pending() < 3 {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
        assert!(start.elapsed() >= tempo.step_duration() * 3);
        drop(clock);
        assert_eq!(counter.pending(), 3);
    }

    #[test]
    fn test_threaded_clock_stops() {
        let counter = StepCounter::new();
        let slow = Tempo { speed: 0x1F, bpm: 32 };
        let clock = ThreadedClock::start(counter.clone(), vec![slow; 10]);
        drop(clock);
        assert_eq!(counter.pending(), 0);
    }
}
