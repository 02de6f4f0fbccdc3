/// Block Range Cursor
///
/// Tracks how far one ingestion run got. Ranges are half-open: a window
/// `[from, to)` covers blocks `from..to`, and after it is processed the cursor
/// sits at `to` (the next block to fetch).
use anyhow::Result;

/// One bounded fetch range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Debug, Clone)]
pub struct BlockRangeCursor {
    current: u64,
    target: u64,
    window_size: u64,
}

impl BlockRangeCursor {
    pub fn new(start: u64, target: u64, window_size: u64) -> Result<Self> {
        if window_size == 0 {
            anyhow::bail!("Window size must be greater than 0");
        }

        Ok(Self { current: start, target, window_size })
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.target
    }

    /// Blocks left until the target
    pub fn remaining(&self) -> u64 {
        self.target.saturating_sub(self.current)
    }

    /// Next window to fetch, `None` once the target is reached
    pub fn next_window(&self) -> Option<Window> {
        if self.is_done() {
            return None;
        }

        let to_block = self.current.saturating_add(self.window_size).min(self.target);
        Some(Window { from_block: self.current, to_block })
    }

    /// Move to `next_block` reported for `window`. It must make progress and stay inside the window.
    pub fn advance(&mut self, window: Window, next_block: u64) -> Result<()> {
        if window.from_block != self.current {
            anyhow::bail!("Window {:?} does not start at cursor position {}", window, self.current);
        }
        if next_block <= window.from_block || next_block > window.to_block {
            anyhow::bail!("Block {} is outside window [{}, {})", next_block, window.from_block, window.to_block);
        }

        self.current = next_block;
        Ok(())
    }
}
