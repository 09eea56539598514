//! Tick-based deferred actions for ceremonies that outlast a frame

/// Items queued to fire a number of ticks in the future
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tick: u64,
    pending: Vec<(u64, T)>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tick: 0,
            pending: Vec::new(),
        }
    }

    /// Queue `item` to fire after `delay_ticks` calls to `advance`
    pub fn schedule(&mut self, delay_ticks: u64, item: T) {
        self.pending.push((self.tick + delay_ticks.max(1), item));
    }

    /// Move one tick forward and return everything now due, oldest first
    pub fn advance(&mut self) -> Vec<T> {
        self.tick += 1;
        let now = self.tick;
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.pending = later;

        let mut due = due;
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, item)| item).collect()
    }

    pub fn any(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.pending.iter().any(|(_, item)| pred(item))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
