//! Line history: committed strokes, undo snapshots and erased groups.

use crate::line::Line;

/// Committed lines plus the two history stacks.
///
/// Operations that change which lines are visible return the list that
/// should be replayed and leave `lines` empty; the replay re-appends them
/// one by one as it paints.
#[derive(Debug, Clone, Default)]
pub struct History {
    lines: Vec<Line>,
    undo_stack: Vec<Vec<Line>>,
    erased_stack: Vec<Vec<Line>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed lines, oldest first.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Groups removed by `erase_all`, oldest first.
    pub fn erased_groups(&self) -> &[Vec<Line>] {
        &self.erased_stack
    }

    /// Number of snapshots available to `redo`.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.lines.is_empty() || !self.erased_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Append a committed line.
    pub fn push_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Forget every redo snapshot. Called when a new stroke is drawn.
    pub fn invalidate_redo(&mut self) {
        if !self.undo_stack.is_empty() {
            log::debug!("Dropping {} redo snapshots", self.undo_stack.len());
            self.undo_stack.clear();
        }
    }

    /// Remove the newest line, or bring back the newest erased group if
    /// there are no lines. Returns the lines to replay.
    pub fn undo(&mut self) -> Option<Vec<Line>> {
        if !self.lines.is_empty() {
            self.undo_stack.push(self.lines.clone());
            let mut remaining = std::mem::take(&mut self.lines);
            remaining.pop();
            return Some(remaining);
        }

        let group = self.erased_stack.pop()?;
        self.undo_stack.push(Vec::new());
        Some(group)
    }

    /// Restore the newest snapshot. Returns the lines to replay.
    pub fn redo(&mut self) -> Option<Vec<Line>> {
        let snapshot = self.undo_stack.pop()?;
        self.lines.clear();
        Some(snapshot)
    }

    /// Move every line into a new erased group.
    pub fn erase_all(&mut self) {
        let group = std::mem::take(&mut self.lines);
        self.erased_stack.push(group);
    }

    /// Drop lines and both stacks.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.undo_stack.clear();
        self.erased_stack.clear();
    }

    /// Drop the lines only. Used before a replay repopulates them.
    pub fn take_lines(&mut self) -> Vec<Line> {
        std::mem::take(&mut self.lines)
    }
}
