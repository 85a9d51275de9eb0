//! Weighted random selection with a recent-history exclusion window.

use rand::Rng;
use std::collections::VecDeque;

/// Bounded number of draw attempts before the exclusion window is ignored.
/// Guarantees a pick always terminates even when the window starves the
/// candidate set.
const SAFETY_TRIES: usize = 32;

/// Picks indices from candidate lists, weighted, while refusing to repeat
/// any index seen in the last `window` picks.
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    avoid_immediate_repeat: bool,
    no_repeat_window: usize,
    recent: VecDeque<usize>,
}

impl WeightedSelector {
    /// `avoid_immediate_repeat` forces a window of at least 1;
    /// `no_repeat_window` widens it further (0 = off).
    pub fn new(avoid_immediate_repeat: bool, no_repeat_window: usize) -> Self {
        Self {
            avoid_immediate_repeat,
            no_repeat_window,
            recent: VecDeque::new(),
        }
    }

    fn window(&self) -> usize {
        self.no_repeat_window
            .max(if self.avoid_immediate_repeat { 1 } else { 0 })
    }

    fn is_allowed(&self, index: usize) -> bool {
        self.window() == 0 || !self.recent.contains(&index)
    }

    fn push_recent(&mut self, index: usize) {
        let keep = self.window();
        if keep == 0 {
            return;
        }
        self.recent.push_back(index);
        while self.recent.len() > keep {
            self.recent.pop_front();
        }
    }

    /// Pick one of `indices`, weighted by `weights[index]` when provided.
    ///
    /// Weights are clamped to zero; a non-positive total falls back to a
    /// uniform draw. Indices inside the recent window are excluded until
    /// `SAFETY_TRIES` draws have failed, after which the exclusion is
    /// dropped for this pick so the call always returns. The chosen index
    /// enters the history ring.
    pub fn pick<R: Rng>(
        &mut self,
        rng: &mut R,
        indices: &[usize],
        weights: Option<&[f32]>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let mut chosen = None;
        for _ in 0..SAFETY_TRIES {
            let candidate = Self::draw(rng, indices, weights);
            if self.is_allowed(candidate) {
                chosen = Some(candidate);
                break;
            }
        }
        // Safety-cap fallback: every candidate is in the window, take one
        // anyway rather than starve.
        let index = chosen.unwrap_or_else(|| Self::draw(rng, indices, weights));

        self.push_recent(index);
        Some(index)
    }

    /// One weighted draw, no history involved.
    fn draw<R: Rng>(rng: &mut R, indices: &[usize], weights: Option<&[f32]>) -> usize {
        let weight_of = |idx: usize| -> f32 {
            match weights {
                Some(w) if idx < w.len() => w[idx].max(0.0),
                _ => 1.0,
            }
        };

        let total: f32 = indices.iter().map(|&i| weight_of(i)).sum();
        if total <= 0.0 {
            return indices[rng.gen_range(0..indices.len())];
        }

        let mut r = rng.gen::<f32>() * total;
        for &idx in indices {
            let w = weight_of(idx);
            if r < w {
                return idx;
            }
            r -= w;
        }
        indices[indices.len() - 1]
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.recent.clear();
    }
}
