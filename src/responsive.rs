use crate::model::ColumnId;

/// Single-column mode for narrow viewports.
///
/// While narrow exactly one column is active; while wide none is. The tab selection is
/// the active column, so the two can never disagree.
#[derive(Debug, Clone)]
pub struct ViewController {
    breakpoint: u32,
    width: u32,
    active: Option<ColumnId>,
}

impl ViewController {
    pub fn new(breakpoint: u32, width: u32) -> Self {
        let mut view = ViewController {
            breakpoint,
            width,
            active: None,
        };
        if view.is_narrow() {
            view.active = Some(ColumnId::Todo);
        }
        view
    }

    pub fn is_narrow(&self) -> bool {
        self.width <= self.breakpoint
    }

    pub fn active(&self) -> Option<ColumnId> {
        self.active
    }

    pub fn is_visible(&self, column: ColumnId) -> bool {
        match self.active {
            Some(active) => active == column,
            None => true,
        }
    }

    pub fn visible_columns(&self) -> Vec<ColumnId> {
        ColumnId::ALL
            .into_iter()
            .filter(|c| self.is_visible(*c))
            .collect()
    }

    /// Tab click. Tabs only exist while narrow.
    pub fn select_tab(&mut self, column: ColumnId) -> bool {
        if !self.is_narrow() {
            return false;
        }
        self.active = Some(column);
        true
    }

    pub fn resize(&mut self, width: u32) {
        self.width = width;
        if !self.is_narrow() {
            self.active = None;
        } else if self.active.is_none() {
            self.active = Some(ColumnId::Todo);
        }
    }

    /// A card landed in `destination`; in narrow mode, show that column.
    pub fn follow_move(&mut self, destination: ColumnId) {
        if self.is_narrow() {
            self.active = Some(destination);
        }
    }
}
