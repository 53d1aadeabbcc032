use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::color::Color;
use crate::error::ConfigError;
use crate::num::Float;

/// Fastest strobe rate a fixture is asked for, in Hz.
pub const MAX_STROBE_HZ: f64 = 25.0;

///////////////////////// FIXTURE /////////////////////////

/// The output record of a single fixture. Every field always holds a legal value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixtureState {
    /// Pan position, `0..1` across the fixture's range
    pub pan: f64,
    /// Tilt position, `0..1`
    pub tilt: f64,
    /// Brightness, `0..1`
    pub dimmer: f64,
    pub color: Color,
    /// Strobe rate in Hz, `0` is no strobe
    pub strobe: f64,
}

impl FixtureState {
    pub fn is_legal(&self) -> bool {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        unit(self.pan)
            && unit(self.tilt)
            && unit(self.dimmer)
            && unit(self.color.r)
            && unit(self.color.g)
            && unit(self.color.b)
            && (0.0..=MAX_STROBE_HZ).contains(&self.strobe)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    Par,
    Mover,
    Strobe,
    Laser,
}

impl FixtureKind {
    pub const ALL: [FixtureKind; 4] = [FixtureKind::Par, FixtureKind::Mover, FixtureKind::Strobe, FixtureKind::Laser];

    pub fn name(self) -> &'static str {
        match self {
            FixtureKind::Par => "par",
            FixtureKind::Mover => "mover",
            FixtureKind::Strobe => "strobe",
            FixtureKind::Laser => "laser",
        }
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FixtureKind {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FixtureKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ConfigError::UnknownFixtureKind(s.to_string()))
    }
}

/// A single addressable output. Writes clamp into range; nothing is ever rejected.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub name: String,
    pub kind: FixtureKind,
    state: FixtureState,
}

impl Fixture {
    pub fn new(name: impl Into<String>, kind: FixtureKind) -> Self {
        Self { name: name.into(), kind, state: FixtureState::default() }
    }

    pub fn set_pan(&mut self, pan: f64) {
        self.state.pan = pan.clamp01();
    }
    pub fn set_tilt(&mut self, tilt: f64) {
        self.state.tilt = tilt.clamp01();
    }
    pub fn set_dimmer(&mut self, dimmer: f64) {
        self.state.dimmer = dimmer.clamp01();
    }
    pub fn set_color(&mut self, color: Color) {
        self.state.color = color.clamped();
    }
    pub fn set_strobe(&mut self, hz: f64) {
        self.state.strobe = if hz.is_nan() { 0.0 } else { hz.clamp(0.0, MAX_STROBE_HZ) };
    }

    pub fn pan(&self) -> f64 {
        self.state.pan
    }
    pub fn tilt(&self) -> f64 {
        self.state.tilt
    }
    pub fn dimmer(&self) -> f64 {
        self.state.dimmer
    }
    pub fn color(&self) -> Color {
        self.state.color
    }
    pub fn strobe(&self) -> f64 {
        self.state.strobe
    }

    pub fn state(&self) -> FixtureState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = FixtureState::default();
    }
}

///////////////////////// RIG /////////////////////////

/// Contiguous index range of fixtures within a [`Rig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &Span) -> Span {
        let start = self.start.min(other.start);
        Span::new(start, self.end().max(other.end()) - start)
    }

    /// Split into `n` nearly equal consecutive parts, dropping empty ones.
    pub fn split(&self, n: usize) -> Vec<Span> {
        let n = n.max(1);
        (0..n)
            .map(|i| {
                let a = self.start + self.len * i / n;
                let b = self.start + self.len * (i + 1) / n;
                Span::new(a, b - a)
            })
            .filter(|s| s.len > 0)
            .collect()
    }
}

/// Named group of same-kind fixtures inside a [`Rig`].
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub kind: FixtureKind,
    pub span: Span,
}

/// Rig
///
/// Every fixture of the show in output order, plus the per-kind groups they
/// were added in. The lighting tree owns the rig exclusively during a tick.
#[derive(Clone, Debug, Default)]
pub struct Rig {
    fixtures: Vec<Fixture>,
    groups: Vec<Group>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` fixtures of `kind` as a new group.
    pub fn add_group(&mut self, kind: FixtureKind, count: usize) -> Result<Span, ConfigError> {
        if count == 0 {
            return Err(ConfigError::EmptyGroup(kind.to_string()));
        }
        let span = Span::new(self.fixtures.len(), count);
        self.fixtures.extend((0..count).map(|i| Fixture::new(format!("{kind}-{i}"), kind)));
        self.groups.push(Group { kind, span });
        Ok(span)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixtures_mut(&mut self) -> &mut [Fixture] {
        &mut self.fixtures
    }

    /// Fixtures of a span. Spans are validated when nodes are added, so this never panics.
    pub fn slice_mut(&mut self, span: Span) -> &mut [Fixture] {
        let end = span.end().min(self.fixtures.len());
        let start = span.start.min(end);
        &mut self.fixtures[start..end]
    }

    pub fn contains(&self, span: Span) -> bool {
        span.len > 0 && span.end() <= self.fixtures.len()
    }

    pub fn reset(&mut self) {
        self.fixtures.iter_mut().for_each(Fixture::reset);
    }

    pub fn snapshot(&self) -> Vec<FixtureState> {
        self.fixtures.iter().map(Fixture::state).collect()
    }
}

/// Iterate through the fixtures, with additional index and fr (from 0 to 1) parameters.
pub fn for_each(fixtures: &mut [Fixture], mut f: impl FnMut(&mut Fixture, usize, f64)) {
    let n = fixtures.len();
    fixtures.iter_mut().enumerate().for_each(|(i, t)| f(t, i, i as f64 / n as f64));
}

/// Apply a function to the color of each fixture
pub fn map_colors(fixtures: &mut [Fixture], mut f: impl FnMut(Color) -> Color) {
    for_each(fixtures, |fixture, _, _| fixture.set_color(f(fixture.color())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rig_groups() {
        let mut rig = Rig::new();
        let pars = rig.add_group(FixtureKind::Par, 4).unwrap();
        let movers = rig.add_group(FixtureKind::Mover, 2).unwrap();
        assert_eq!(pars, Span::new(0, 4));
        assert_eq!(movers, Span::new(4, 2));
        assert_eq!(rig.len(), 6);
        assert_eq!(rig.fixtures()[5].name, "mover-1");
        assert_eq!(rig.add_group(FixtureKind::Laser, 0), Err(ConfigError::EmptyGroup("laser".into())));
    }

    #[test]
    fn span_split_and_union() {
        let s = Span::new(2, 5);
        assert_eq!(s.split(2), vec![Span::new(2, 2), Span::new(4, 3)]);
        assert_eq!(s.split(10).len(), 5);
        assert_eq!(Span::new(0, 2).union(&Span::new(4, 2)), Span::new(0, 6));
    }

    #[test]
    fn for_each_fraction() {
        let mut rig = Rig::new();
        let span = rig.add_group(FixtureKind::Par, 4).unwrap();
        let mut seen = vec![];
        for_each(rig.slice_mut(span), |_, i, fr| seen.push((i, fr)));
        assert_eq!(seen, vec![(0, 0.0), (1, 0.25), (2, 0.5), (3, 0.75)]);
    }

    proptest! {
        #[test]
        fn writes_always_clamp(v in proptest::num::f64::ANY) {
            let mut f = Fixture::new("x", FixtureKind::Mover);
            f.set_pan(v);
            f.set_tilt(v);
            f.set_dimmer(v);
            f.set_strobe(v);
            f.set_color(Color::rgb(v, -v, v * 0.5));
            prop_assert!(f.state().is_legal());
        }
    }
}
