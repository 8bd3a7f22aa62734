//! Column and cursor state for the release board.

use std::collections::HashSet;

use releaseboard_core::{FreshnessRule, GameRelease, PlatformSelection};

/// Address of a tile on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub column: usize,
    pub tile: usize,
}

/// One configured platform column.
#[derive(Debug, Clone)]
pub struct Column {
    pub platform: String,
    pub releases: Vec<GameRelease>,
    pub rule: Option<FreshnessRule>,
    pub fell_back: bool,
    offset: usize,
}

impl Column {
    fn new(platform: String) -> Self {
        Self {
            platform,
            releases: Vec::new(),
            rule: None,
            fell_back: false,
            offset: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

pub struct Board {
    columns: Vec<Column>,
    column_cursor: usize,
    tile_cursor: usize,
    playing: HashSet<TileKey>,
}

impl Board {
    pub fn new(platforms: &[String]) -> Self {
        Self {
            columns: platforms.iter().cloned().map(Column::new).collect(),
            column_cursor: 0,
            tile_cursor: 0,
            playing: HashSet::new(),
        }
    }

    /// Replace every column's contents with the matching selection entry.
    /// Returns the selected platforms that have no column.
    pub fn apply_selection(&mut self, selection: &PlatformSelection) -> Vec<String> {
        for column in &mut self.columns {
            match selection.group(&column.platform) {
                Some(group) => {
                    column.releases = group.releases.clone();
                    column.rule = Some(group.rule);
                    column.fell_back = group.fell_back;
                }
                None => {
                    column.releases.clear();
                    column.rule = None;
                    column.fell_back = false;
                }
            }
            column.offset = 0;
        }
        self.playing.clear();
        self.clamp_cursor();

        selection
            .platforms()
            .filter(|platform| !self.columns.iter().any(|column| column.platform == *platform))
            .map(str::to_string)
            .collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn release_count(&self) -> usize {
        self.columns.iter().map(|column| column.releases.len()).sum()
    }

    pub fn column_cursor(&self) -> usize {
        self.column_cursor
    }

    /// Cursor position, if the focused column has any tiles.
    pub fn cursor(&self) -> Option<TileKey> {
        let column = self.columns.get(self.column_cursor)?;
        if column.releases.is_empty() {
            return None;
        }
        Some(TileKey {
            column: self.column_cursor,
            tile: self.tile_cursor,
        })
    }

    pub fn release(&self, key: TileKey) -> Option<&GameRelease> {
        self.columns.get(key.column)?.releases.get(key.tile)
    }

    pub fn selected(&self) -> Option<&GameRelease> {
        self.cursor().and_then(|key| self.release(key))
    }

    pub fn move_tile(&mut self, delta: isize) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let idx = (self.tile_cursor as isize + delta).clamp(0, len as isize - 1);
        self.tile_cursor = idx as usize;
    }

    pub fn move_tile_to(&mut self, index: usize) {
        let len = self.focused_len();
        if len > 0 {
            self.tile_cursor = index.min(len - 1);
        }
    }

    pub fn move_column(&mut self, delta: isize) {
        if self.columns.is_empty() {
            return;
        }
        let idx = (self.column_cursor as isize + delta).clamp(0, self.columns.len() as isize - 1);
        self.column_cursor = idx as usize;
        self.clamp_cursor();
    }

    /// Focus a specific tile. Returns `false` when it does not exist.
    pub fn select_tile(&mut self, key: TileKey) -> bool {
        if self.release(key).is_none() {
            return false;
        }
        self.column_cursor = key.column;
        self.tile_cursor = key.tile;
        true
    }

    /// Mark a tile as playing its trailer. Returns `false` if it already was.
    pub fn mark_playing(&mut self, key: TileKey) -> bool {
        self.playing.insert(key)
    }

    pub fn is_playing(&self, key: TileKey) -> bool {
        self.playing.contains(&key)
    }

    /// First playing tile in board order.
    pub fn first_playing(&self) -> Option<TileKey> {
        self.playing.iter().min().copied()
    }

    /// Scroll `column` so the cursor stays inside a window of `visible` tiles.
    pub fn ensure_visible(&mut self, column: usize, visible: usize) {
        let cursor = (column == self.column_cursor).then_some(self.tile_cursor);
        let Some(col) = self.columns.get_mut(column) else {
            return;
        };
        let visible = visible.max(1);
        if let Some(cursor) = cursor {
            if cursor < col.offset {
                col.offset = cursor;
            } else if cursor >= col.offset + visible {
                col.offset = cursor + 1 - visible;
            }
        }
        let max_offset = col.releases.len().saturating_sub(visible);
        if col.offset > max_offset {
            col.offset = max_offset;
        }
    }

    fn focused_len(&self) -> usize {
        self.columns
            .get(self.column_cursor)
            .map(|column| column.releases.len())
            .unwrap_or(0)
    }

    fn clamp_cursor(&mut self) {
        if self.column_cursor >= self.columns.len() {
            self.column_cursor = self.columns.len().saturating_sub(1);
        }
        let len = self.focused_len();
        if self.tile_cursor >= len {
            self.tile_cursor = len.saturating_sub(1);
        }
    }
}
