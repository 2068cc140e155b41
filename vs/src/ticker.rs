//! Observation-only iterator adapter
//!
//! [`Tracked`] forwards every item of its source unchanged and advances the
//! progress bars held by its [`Ticker`] once per completed item: an item
//! counts as done when the loop asks for the next one, or when the source
//! runs out. It holds no borrow of the strategy that produced the ticker, so
//! the loop body is free to keep calling hooks while iterating.

use std::fmt;
use std::iter::FusedIterator;

use indicatif::ProgressBar;

/// Owned handle to the displays a wrapped iterator advances
#[derive(Clone, Default)]
pub struct Ticker {
    bars: Vec<ProgressBar>,
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker").field("bars", &self.bars.len()).finish()
    }
}

impl Ticker {
    /// A ticker with no visible effect
    pub fn none() -> Self {
        Self::default()
    }

    /// A ticker advancing a single bar
    pub fn bar(bar: ProgressBar) -> Self {
        Self { bars: vec![bar] }
    }

    /// Combine two tickers so one tick advances both
    pub fn merge(mut self, other: Ticker) -> Self {
        self.bars.extend(other.bars);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    fn tick(&self) {
        for bar in &self.bars {
            bar.inc(1);
        }
    }
}

/// Exact length of an iterator, if its size hint pins it down
pub fn exact_len<I: Iterator>(iter: &I) -> Option<u64> {
    match iter.size_hint() {
        (lower, Some(upper)) if lower == upper => Some(lower as u64),
        _ => None,
    }
}

/// An iterator yielding exactly the items of `I`, in order, ticking per item
///
/// The tick for an item lands when the following item is requested, so a bar
/// never reports work the loop body has not finished. An item abandoned with
/// `break` is not counted.
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Tracked<I> {
    inner: I,
    ticker: Ticker,
    in_flight: bool,
}

impl<I: Iterator> Tracked<I> {
    pub fn new(inner: I, ticker: Ticker) -> Self {
        Self {
            inner,
            ticker,
            in_flight: false,
        }
    }

    /// Drop the display side effect and recover the source iterator
    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I: Iterator> Iterator for Tracked<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.in_flight {
            self.ticker.tick();
            self.in_flight = false;
        }
        let item = self.inner.next()?;
        self.in_flight = true;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I: ExactSizeIterator> ExactSizeIterator for Tracked<I> {}

impl<I: FusedIterator> FusedIterator for Tracked<I> {}
