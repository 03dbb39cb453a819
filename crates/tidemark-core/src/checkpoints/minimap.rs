//! Minimap projection
//!
//! Maps an edit to a point on a 100x100 canvas: `y` is how far down the file
//! the edit sits, `x` how deeply the edited line is indented.

use super::types::{ChangeEvent, MinimapKind, MinimapPoint};

/// Indentation (in characters) mapped to the right edge of the canvas
const MAX_INDENT: usize = 50;

/// Line statistics needed to place an edit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineProfile {
    /// Number of lines in the file
    pub total_lines: usize,
    /// Leading whitespace of the target line, 0 when blank or absent
    pub indentation: usize,
}

impl LineProfile {
    /// Profile `content` for the zero-based `line_number`
    pub fn from_content(content: &str, line_number: usize) -> Self {
        let mut profile = Self::default();
        for line in content.lines() {
            profile.observe(line, line_number);
        }
        profile
    }

    /// Feed the next line of the file
    pub fn observe(&mut self, line: &str, line_number: usize) {
        if self.total_lines == line_number {
            self.indentation = indentation_of(line);
        }
        self.total_lines += 1;
    }
}

fn indentation_of(line: &str) -> usize {
    line.chars()
        .position(|c| !c.is_whitespace())
        .unwrap_or(0)
}

fn percent(value: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (value as u128 * 100) / total as u128;
    scaled.min(100) as u8
}

/// Project `event` using a precomputed line profile
pub fn project_with_profile(event: &ChangeEvent, profile: LineProfile) -> MinimapPoint {
    MinimapPoint {
        x: percent(profile.indentation, MAX_INDENT),
        y: percent(event.line_number, profile.total_lines),
        kind: MinimapKind::from(event.action),
        timestamp: event.timestamp,
        line_number: event.line_number,
    }
}

/// Project `event` against the file's current content
pub fn project(event: &ChangeEvent, content: &str) -> MinimapPoint {
    project_with_profile(event, LineProfile::from_content(content, event.line_number))
}
