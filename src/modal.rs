use crate::model::{Board, BoardError, Task, TaskId};
use crate::schedule::{Deferred, Scheduler, Ticket};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum ModalState {
    Closed,
    OpenCreate(TaskForm),
    OpenEdit { target: TaskId, form: TaskForm },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(TaskId),
    Saved(TaskId),
    /// Title was blank; the form stays open with its error flash on.
    Invalid,
    /// The edit target no longer exists; the form closed without writing.
    DroppedStaleEdit(TaskId),
    /// Nothing was open.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    pub title: FieldValue,
    pub description: FieldValue,
    /// `None` until the deferred focus lands after opening.
    pub focus: Option<FormField>,
    pub title_error: bool,
}

impl TaskForm {
    fn blank() -> Self {
        TaskForm {
            title: FieldValue::new(""),
            description: FieldValue::new(""),
            focus: None,
            title_error: false,
        }
    }

    fn from_task(task: &Task) -> Self {
        TaskForm {
            title: FieldValue::new(&task.title),
            description: FieldValue::new(&task.description),
            focus: None,
            title_error: false,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = Some(match self.focus {
            None | Some(FormField::Submit) => FormField::Title,
            Some(FormField::Title) => FormField::Description,
            Some(FormField::Description) => FormField::Submit,
        });
    }

    pub fn prev_field(&mut self) {
        self.focus = Some(match self.focus {
            None | Some(FormField::Description) => FormField::Title,
            Some(FormField::Title) => FormField::Submit,
            Some(FormField::Submit) => FormField::Description,
        });
    }

    /// The text field under focus, if the focus is on one.
    pub fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        match self.focus? {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Submit => None,
        }
    }
}

#[derive(Debug)]
pub struct Modal {
    state: ModalState,
    focus_pending: Option<Ticket>,
    error_flash: Option<Ticket>,
}

impl Default for Modal {
    fn default() -> Self {
        Modal::new()
    }
}

impl Modal {
    pub fn new() -> Self {
        Modal {
            state: ModalState::Closed,
            focus_pending: None,
            error_flash: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    pub fn edit_target(&self) -> Option<TaskId> {
        match self.state {
            ModalState::OpenEdit { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&TaskForm> {
        match &self.state {
            ModalState::Closed => None,
            ModalState::OpenCreate(form) | ModalState::OpenEdit { form, .. } => Some(form),
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        match &mut self.state {
            ModalState::Closed => None,
            ModalState::OpenCreate(form) | ModalState::OpenEdit { form, .. } => Some(form),
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.state {
            ModalState::OpenEdit { .. } => "Edit Task",
            _ => "New Task",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.state {
            ModalState::OpenEdit { .. } => "Save Changes",
            _ => "Add Task",
        }
    }

    /// Opens a blank form. Any previous session is overwritten.
    pub fn open_create(&mut self, sched: &mut Scheduler, focus_delay: Duration, now: Instant) {
        self.reset_pending(sched);
        self.state = ModalState::OpenCreate(TaskForm::blank());
        self.focus_pending = Some(sched.schedule(Deferred::FocusTitle, focus_delay, now));
    }

    /// Opens the form pre-filled from `task`.
    pub fn open_edit(
        &mut self,
        task: &Task,
        sched: &mut Scheduler,
        focus_delay: Duration,
        now: Instant,
    ) {
        self.reset_pending(sched);
        self.state = ModalState::OpenEdit {
            target: task.id,
            form: TaskForm::from_task(task),
        };
        self.focus_pending = Some(sched.schedule(Deferred::FocusTitle, focus_delay, now));
    }

    /// Deferred focus landing. Ignored once the form has closed.
    pub fn focus_title(&mut self) {
        self.focus_pending = None;
        if let Some(form) = self.form_mut() {
            form.focus = Some(FormField::Title);
        }
    }

    pub fn clear_title_error(&mut self) {
        self.error_flash = None;
        if let Some(form) = self.form_mut() {
            form.title_error = false;
        }
    }

    /// Closes without writing anything back. Returns whether a session was open.
    pub fn cancel(&mut self, sched: &mut Scheduler) -> bool {
        let was_open = self.is_open();
        self.close(sched);
        was_open
    }

    pub fn submit(
        &mut self,
        board: &mut Board,
        sched: &mut Scheduler,
        error_for: Duration,
        now: Instant,
    ) -> SubmitOutcome {
        let result = match &self.state {
            ModalState::Closed => return SubmitOutcome::Ignored,
            ModalState::OpenCreate(form) => board
                .create_task(&form.title.value, &form.description.value)
                .map(SubmitOutcome::Created),
            ModalState::OpenEdit { target, form } => {
                let target = *target;
                match board.edit_task(target, &form.title.value, &form.description.value) {
                    Ok(()) => Ok(SubmitOutcome::Saved(target)),
                    Err(BoardError::MissingEditTarget) => {
                        Ok(SubmitOutcome::DroppedStaleEdit(target))
                    }
                    Err(err) => Err(err),
                }
            }
        };
        match result {
            Ok(outcome) => {
                self.close(sched);
                outcome
            }
            Err(_) => {
                self.flash_title_error(sched, error_for, now);
                SubmitOutcome::Invalid
            }
        }
    }

    fn flash_title_error(&mut self, sched: &mut Scheduler, error_for: Duration, now: Instant) {
        if let Some(previous) = self.error_flash.take() {
            sched.cancel(previous);
        }
        if let Some(form) = self.form_mut() {
            form.title_error = true;
            form.focus = Some(FormField::Title);
        }
        self.error_flash = Some(sched.schedule(Deferred::ClearTitleError, error_for, now));
    }

    /// Cancels the focus and error-flash follow-ups of the current session.
    fn reset_pending(&mut self, sched: &mut Scheduler) {
        for ticket in [self.focus_pending.take(), self.error_flash.take()]
            .into_iter()
            .flatten()
        {
            sched.cancel(ticket);
        }
    }

    fn close(&mut self, sched: &mut Scheduler) {
        self.reset_pending(sched);
        self.state = ModalState::Closed;
    }
}

/// A single editable text value with a byte cursor on a char boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    pub cursor: usize,
}

impl FieldValue {
    pub fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    pub fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    pub fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    pub fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    #[cfg(test)]
    pub fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.len();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

/// Line start offsets, the cursor's line, and its column in chars.
fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnId;

    const FOCUS: Duration = Duration::from_millis(50);
    const FLASH: Duration = Duration::from_millis(1200);

    fn type_title(modal: &mut Modal, text: &str) {
        let form = modal.form_mut().unwrap();
        form.title.set(text);
    }

    #[test]
    fn create_flow_focuses_late_then_creates_and_closes() {
        let start = Instant::now();
        let mut board = Board::new();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();

        modal.open_create(&mut sched, FOCUS, start);
        assert_eq!(modal.heading(), "New Task");
        assert_eq!(modal.submit_label(), "Add Task");
        assert_eq!(modal.form().unwrap().focus, None);
        assert_eq!(
            sched.take_due(start + FOCUS),
            vec![Deferred::FocusTitle]
        );
        modal.focus_title();
        assert_eq!(modal.form().unwrap().focus, Some(FormField::Title));

        type_title(&mut modal, "Design API");
        let outcome = modal.submit(&mut board, &mut sched, FLASH, start);
        let SubmitOutcome::Created(id) = outcome else {
            panic!("expected a created task, got {outcome:?}");
        };
        assert!(!modal.is_open());
        assert_eq!(board.column_of(id), Some(ColumnId::Todo));
    }

    #[test]
    fn blank_title_keeps_form_open_and_flashes() {
        let start = Instant::now();
        let mut board = Board::new();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_create(&mut sched, FOCUS, start);
        sched.take_due(start + FOCUS);
        modal.form_mut().unwrap().focus = Some(FormField::Description);
        type_title(&mut modal, "   ");

        assert_eq!(
            modal.submit(&mut board, &mut sched, FLASH, start),
            SubmitOutcome::Invalid
        );
        assert!(modal.is_open() && modal.edit_target().is_none());
        assert!(board.is_empty());
        let form = modal.form().unwrap();
        assert!(form.title_error);
        assert_eq!(form.focus, Some(FormField::Title));

        assert_eq!(
            sched.take_due(start + FLASH),
            vec![Deferred::ClearTitleError]
        );
        modal.clear_title_error();
        assert!(!modal.form().unwrap().title_error);
    }

    #[test]
    fn repeated_invalid_submits_keep_a_single_flash_timer() {
        let start = Instant::now();
        let mut board = Board::new();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_create(&mut sched, FOCUS, start);
        sched.take_due(start + FOCUS);
        modal.submit(&mut board, &mut sched, FLASH, start);
        modal.submit(&mut board, &mut sched, FLASH, start + Duration::from_millis(500));
        assert_eq!(sched.len(), 1);
        assert!(sched.take_due(start + FLASH).is_empty());
    }

    #[test]
    fn edit_flow_prefills_and_writes_in_place() {
        let start = Instant::now();
        let mut board = Board::new();
        let id = board.create_task("Design API", "v1 draft").unwrap();
        board.move_task(id, ColumnId::Progress);
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();

        modal.open_edit(board.task(id).unwrap(), &mut sched, FOCUS, start);
        assert_eq!(modal.heading(), "Edit Task");
        assert_eq!(modal.submit_label(), "Save Changes");
        assert_eq!(modal.edit_target(), Some(id));
        let form = modal.form().unwrap();
        assert_eq!(form.title.value, "Design API");
        assert_eq!(form.description.value, "v1 draft");

        type_title(&mut modal, "Design API v2");
        assert_eq!(
            modal.submit(&mut board, &mut sched, FLASH, start),
            SubmitOutcome::Saved(id)
        );
        assert_eq!(modal.edit_target(), None);
        assert_eq!(board.task(id).unwrap().title, "Design API v2");
        assert_eq!(board.column_of(id), Some(ColumnId::Progress));
    }

    #[test]
    fn cancel_discards_edits() {
        let start = Instant::now();
        let mut board = Board::new();
        let id = board.create_task("keep", "me").unwrap();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_edit(board.task(id).unwrap(), &mut sched, FOCUS, start);
        type_title(&mut modal, "changed");
        assert!(modal.cancel(&mut sched));
        assert!(!modal.cancel(&mut sched));
        assert_eq!(board.task(id).unwrap().title, "keep");
    }

    #[test]
    fn stale_edit_target_closes_without_writing() {
        let start = Instant::now();
        let mut board = Board::new();
        let id = board.create_task("gone soon", "").unwrap();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_edit(board.task(id).unwrap(), &mut sched, FOCUS, start);
        board.delete_task(id);
        assert_eq!(
            modal.submit(&mut board, &mut sched, FLASH, start),
            SubmitOutcome::DroppedStaleEdit(id)
        );
        assert!(!modal.is_open());
        assert!(board.is_empty());
    }

    #[test]
    fn opening_create_over_edit_discards_the_edit_session() {
        let start = Instant::now();
        let mut board = Board::new();
        let id = board.create_task("a", "b").unwrap();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_edit(board.task(id).unwrap(), &mut sched, FOCUS, start);
        modal.open_create(&mut sched, FOCUS, start);
        assert_eq!(modal.edit_target(), None);
        assert_eq!(modal.form().unwrap().title.value, "");
    }

    #[test]
    fn late_focus_after_close_is_ignored() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_create(&mut sched, FOCUS, start);
        modal.cancel(&mut sched);
        modal.focus_title();
        assert!(!modal.is_open());
    }

    #[test]
    fn reopening_waits_for_its_own_focus_delay() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_create(&mut sched, FOCUS, start);
        modal.cancel(&mut sched);
        assert!(sched.is_empty());

        let reopened = start + Duration::from_millis(40);
        modal.open_create(&mut sched, FOCUS, reopened);
        assert!(sched.take_due(start + FOCUS).is_empty());
        assert_eq!(modal.form().unwrap().focus, None);
        assert_eq!(sched.take_due(reopened + FOCUS), vec![Deferred::FocusTitle]);
    }

    #[test]
    fn reopening_without_cancel_replaces_the_pending_focus() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let mut modal = Modal::new();
        modal.open_create(&mut sched, FOCUS, start);
        let reopened = start + Duration::from_millis(30);
        modal.open_create(&mut sched, FOCUS, reopened);
        assert_eq!(sched.len(), 1);
        assert!(sched.take_due(start + FOCUS).is_empty());
    }

    #[test]
    fn field_cursor_moves_across_lines_and_multibyte_chars() {
        let mut field = FieldValue::new("ab\ncdé");
        field.move_left();
        assert_eq!(field.cursor, "ab\ncd".len());
        field.move_up();
        assert_eq!(field.cursor, 2);
        field.move_down();
        assert_eq!(field.cursor, "ab\ncd".len());
        field.move_right();
        field.backspace();
        assert_eq!(field.value, "ab\ncd");
        field.insert_char('!');
        assert_eq!(field.with_caret(), "ab\ncd!▌");
    }
}
