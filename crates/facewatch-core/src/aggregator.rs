//! Rolling windows that smooth per-frame age, gender and mood estimates.
//!
//! Each attribute keeps up to `W` recent observations. When a window fills,
//! its representative is recomputed (lower median for age, mode for labels)
//! and the oldest observation is evicted, so the representative refreshes once
//! per slide rather than continuously.

use crate::types::Detection;
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Fixed-size FIFO window.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    values: VecDeque<T>,
    size: usize,
}

impl<T> RollingWindow<T> {
    /// A window of `size` observations (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            values: VecDeque::with_capacity(size),
            size,
        }
    }

    /// Append `value`. When the window is full, summarize it with `reduce`,
    /// evict the oldest value and return the summary.
    pub fn push_with<R>(&mut self, value: T, reduce: impl FnOnce(&VecDeque<T>) -> R) -> Option<R> {
        self.values.push_back(value);
        if self.values.len() < self.size {
            return None;
        }
        let summary = reduce(&self.values);
        self.values.pop_front();
        Some(summary)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Element at `len / 2` of the sorted values, rounded to the nearest integer.
pub fn lower_median<'a>(values: impl IntoIterator<Item = &'a f32>) -> Option<u32> {
    let mut sorted: Vec<f32> = values.into_iter().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2].round().max(0.0) as u32)
}

/// Most frequent value; ties go to the value seen first.
pub fn mode<'a, T: PartialEq + Clone + 'a>(values: impl IntoIterator<Item = &'a T>) -> Option<T> {
    let mut counts: Vec<(&T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(&T, usize)> = None;
    for (value, n) in counts {
        match best {
            Some((_, max)) if n <= max => {}
            _ => best = Some((value, n)),
        }
    }
    best.map(|(value, _)| value.clone())
}

/// A single attribute observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Age(f32),
    Gender(String),
    Mood(String),
}

/// Current representative values. `None` until the first full window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Representatives {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub mood: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RollingAggregator {
    age: RollingWindow<f32>,
    gender: RollingWindow<String>,
    mood: RollingWindow<String>,
    current: Representatives,
}

impl Default for RollingAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl RollingAggregator {
    pub fn new(window_size: usize) -> Self {
        Self {
            age: RollingWindow::new(window_size),
            gender: RollingWindow::new(window_size),
            mood: RollingWindow::new(window_size),
            current: Representatives::default(),
        }
    }

    pub fn observe(&mut self, observation: Observation) {
        match observation {
            Observation::Age(age) => {
                if let Some(median) = self.age.push_with(age, |w| lower_median(w)) {
                    self.current.age = median;
                }
            }
            Observation::Gender(gender) => {
                if let Some(m) = self.gender.push_with(gender, |w| mode(w)) {
                    self.current.gender = m;
                }
            }
            Observation::Mood(mood) => {
                if let Some(m) = self.mood.push_with(mood, |w| mode(w)) {
                    self.current.mood = m;
                }
            }
        }
    }

    /// Feed every attribute the detection carries.
    pub fn observe_detection(&mut self, detection: &Detection) {
        if let Some(age) = detection.age {
            self.observe(Observation::Age(age));
        }
        if let Some(gender) = &detection.gender {
            self.observe(Observation::Gender(gender.clone()));
        }
        if let Some(mood) = detection.mood() {
            self.observe(Observation::Mood(mood.to_string()));
        }
    }

    pub fn representatives(&self) -> &Representatives {
        &self.current
    }

    pub fn median_age(&self) -> Option<u32> {
        self.current.age
    }

    pub fn mode_gender(&self) -> Option<&str> {
        self.current.gender.as_deref()
    }

    pub fn mode_mood(&self) -> Option<&str> {
        self.current.mood.as_deref()
    }

    pub fn reset(&mut self) {
        self.age.clear();
        self.gender.clear();
        self.mood.clear();
        self.current = Representatives::default();
    }
}
