//! Named groups of clips and the cycle that plays through them.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;
use crate::frame::{Signal, SignalFrame};
use crate::node::Generate;
use crate::state::Vibe;
use crate::utils::Latch;

/// Shortest clip length, in seconds.
const MIN_DURATION: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct ContentUnit {
    pub name: String,
    /// Playback length in seconds
    pub duration: f64,
}

impl ContentUnit {
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        let duration = if duration.is_finite() { duration.max(MIN_DURATION) } else { MIN_DURATION };
        Self { name: name.into(), duration }
    }
}

/// ContentLibrary
///
/// Clips by group name. Groups are never empty.
#[derive(Clone, Debug, Default)]
pub struct ContentLibrary {
    groups: BTreeMap<String, Vec<ContentUnit>>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&mut self, name: impl Into<String>, units: Vec<ContentUnit>) -> Result<(), ConfigError> {
        let name = name.into();
        if units.is_empty() {
            return Err(ConfigError::EmptyContentGroup(name));
        }
        self.groups.insert(name, units);
        Ok(())
    }

    pub fn group(&self, name: &str) -> Result<&[ContentUnit], ConfigError> {
        self.groups
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::UnknownContentGroup(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Small stock library used when nothing else is configured.
    pub fn builtin() -> Self {
        let groups: [(&str, &[(&str, f64)]); 3] = [
            ("bg", &[("clouds", 12.0), ("waves", 9.0), ("smoke", 15.0), ("stars", 10.0)]),
            ("hype", &[("tunnel", 4.0), ("shards", 3.0), ("grid", 5.0)]),
            ("calm", &[("aurora", 20.0)]),
        ];
        let groups = groups
            .into_iter()
            .map(|(name, units)| (name.to_string(), units.iter().map(|&(n, d)| ContentUnit::new(n, d)).collect()))
            .collect();
        Self { groups }
    }
}

/// ContentCycle
///
/// Plays one clip from a group to completion, then picks another uniformly
/// at random, never the one that just played unless it is the only one. An
/// optional advance signal skips to the next clip on each rising edge.
///
/// A clip is chosen as soon as the cycle exists. Its clock starts on the
/// first step.
#[derive(Clone, Debug)]
pub struct ContentCycle {
    group: String,
    units: Vec<ContentUnit>,
    advance: Option<(Signal, Latch)>,
    current: usize,
    started: Option<f64>,
    /// Own generator so picking a clip mid-tick stays reproducible
    rng: StdRng,
    plays: usize,
}

impl ContentCycle {
    pub fn new(library: &ContentLibrary, group: &str, advance: Option<Signal>) -> Result<Self, ConfigError> {
        let units = library.group(group)?.to_vec();
        let mut rng = StdRng::seed_from_u64(0);
        let current = rng.gen_range(0..units.len());
        Ok(Self {
            group: group.to_string(),
            units,
            advance: advance.map(|s| (s, Latch::default())),
            current,
            started: None,
            rng,
            plays: 1,
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn current(&self) -> &ContentUnit {
        // Groups are never empty and `current` always indexes into them
        &self.units[self.current]
    }

    /// Seconds into the current clip at time `t`. Zero until the first step.
    pub fn offset(&self, t: f64) -> f64 {
        match self.started {
            Some(started) => (t - started).clamp(0.0, self.current().duration),
            None => 0.0,
        }
    }

    /// Number of clips started so far.
    pub fn plays(&self) -> usize {
        self.plays
    }

    pub fn step(&mut self, frame: &SignalFrame) {
        let skipped = match &mut self.advance {
            Some((signal, latch)) => {
                latch.update(frame.get(*signal));
                latch.rising()
            }
            None => false,
        };
        let Some(started) = self.started else {
            log::debug!("content {}: playing {}", self.group, self.current().name);
            self.started = Some(frame.t);
            return;
        };
        if skipped || frame.t - started >= self.current().duration {
            self.select(frame.t);
        }
    }

    fn select(&mut self, t: f64) {
        let n = self.units.len();
        let next = if n > 1 {
            // Draw from the others by skipping over the last index
            let i = self.rng.gen_range(0..n - 1);
            if i >= self.current {
                i + 1
            } else {
                i
            }
        } else {
            0
        };
        log::debug!("content {}: playing {}", self.group, self.units[next].name);
        self.current = next;
        self.started = Some(t);
        self.plays += 1;
    }
}

impl Generate for ContentCycle {
    /// Reseed clip selection. A playing clip runs to its end; one that has
    /// not started yet is drawn again.
    fn generate(&mut self, rng: &mut StdRng, _vibe: &Vibe) {
        self.rng = StdRng::seed_from_u64(rng.gen());
        if self.started.is_none() {
            self.current = self.rng.gen_range(0..self.units.len());
        }
    }

    fn describe(&self) -> String {
        format!("Content({}: {})", self.group, self.current().name)
    }
}
