use crate::config::Settings;
use crate::controller::BoardController;
use crate::modal::{FieldValue, FormField, SubmitOutcome};
use crate::model::{ColumnId, MoveOutcome, Task, TaskId};
use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::debug;

const CARD_HEIGHT: u16 = 5;
const IDLE_POLL: Duration = Duration::from_millis(200);
const EDIT_LABEL: &str = "[Edit Task]";
const DELETE_LABEL: &str = "[Delete]";
const MOVE_LABEL: &str = "[Move to]";

pub fn run(settings: Settings) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let size = terminal.size()?;
    let mut app = App::new(&settings, size.width);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    ctl: BoardController,
    cell_width_px: u32,
    selected_column: ColumnId,
    selected_task: usize,
    scroll_offsets: [usize; 3],
    status: String,
    focus: Focus,
    search_field: FieldValue,
    pointer: Pointer,
    key_drag: Option<ColumnId>,
    hits: Vec<(Rect, Hit)>,
    modal_area: Option<Rect>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Focus {
    Board,
    Search,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Pointer {
    Idle,
    Pressed(TaskId),
    Dragging { over: Option<ColumnId> },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Hit {
    NewTask,
    Search,
    Tab(ColumnId),
    Column(ColumnId),
    Card(TaskId, ColumnId),
    Edit(TaskId),
    Delete(TaskId),
    MoveTo(TaskId),
    ModalTitle,
    ModalDescription,
    ModalSubmit,
    ModalClose,
    MenuEntry(usize),
}

impl App {
    fn new(settings: &Settings, term_width: u16) -> Self {
        let cell_width_px = settings.cell_width_px.max(1);
        let ctl = BoardController::new(settings, logical_width(term_width, cell_width_px));
        let selected_column = ctl.view().active().unwrap_or(ColumnId::Todo);
        App {
            ctl,
            cell_width_px,
            selected_column,
            selected_task: 0,
            scroll_offsets: [0; 3],
            status: "Press n to add a task".into(),
            focus: Focus::Board,
            search_field: FieldValue::new(""),
            pointer: Pointer::Idle,
            key_drag: None,
            hits: Vec::new(),
            modal_area: None,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(self.poll_timeout(Instant::now()))? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press && self.handle_key(key, now) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse, now),
                    Event::Resize(width, _) => self.handle_resize(width),
                    _ => {}
                }
            }
            self.ctl.tick(Instant::now());
            self.sync_selection();
        }
        Ok(())
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        match self.ctl.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(IDLE_POLL),
            None => IDLE_POLL,
        }
    }

    fn handle_resize(&mut self, term_width: u16) {
        self.ctl.resize(logical_width(term_width, self.cell_width_px));
        self.sync_selection();
    }

    // -- keyboard ----------------------------------------------------------------

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        if self.ctl.modal().is_open() {
            self.handle_form_key(key, now);
            return false;
        }
        if self.ctl.move_menu().is_some() {
            self.handle_menu_key(key, now);
            return false;
        }
        if self.focus == Focus::Search {
            self.handle_search_key(key, now);
            return false;
        }
        if self.key_drag.is_some() {
            self.handle_drag_key(key, now);
            return false;
        }
        self.handle_board_key(key, now)
    }

    fn handle_board_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('n') => self.ctl.open_new_task(now),
            KeyCode::Char('e') => match self.current_task() {
                Some(id) => {
                    self.ctl.open_edit_task(id, now);
                }
                None => self.status = "No task selected to edit".into(),
            },
            KeyCode::Char('d') | KeyCode::Delete => match self.current_task() {
                Some(id) => self.delete(id, now),
                None => self.status = "No task selected to delete".into(),
            },
            KeyCode::Char('m') => match self.current_task() {
                Some(id) => {
                    self.ctl.open_move_menu(id);
                }
                None => self.status = "No task selected to move".into(),
            },
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Char(' ') => self.begin_key_drag(now),
            KeyCode::Char(c @ '1'..='3') => {
                if let Some(column) = c.to_digit(10).and_then(|d| ColumnId::from_index(d as usize - 1)) {
                    self.focus_column(column);
                }
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => self.step_column(-1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => self.step_column(1),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_task = self.selected_task.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.ctl.board().column(self.selected_column).len();
                if self.selected_task + 1 < len {
                    self.selected_task += 1;
                }
            }
            KeyCode::Esc => self.status.clear(),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent, now: Instant) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let focus = self.ctl.modal().form().and_then(|f| f.focus);
        match key.code {
            KeyCode::Esc => {
                self.ctl.cancel_modal();
                self.status = "Canceled".into();
            }
            KeyCode::Enter => match focus {
                Some(FormField::Description) if !control => {
                    if let Some(field) = self.ctl.form_mut().and_then(|f| f.active_field_mut()) {
                        field.insert_char('\n');
                    }
                }
                Some(_) => self.submit(now),
                None => {}
            },
            _ => {
                let Some(form) = self.ctl.form_mut() else {
                    return;
                };
                match key.code {
                    KeyCode::Tab => form.next_field(),
                    KeyCode::BackTab => form.prev_field(),
                    _ => {
                        if let Some(field) = form.active_field_mut() {
                            edit_field(field, key);
                        }
                    }
                }
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.ctl.move_menu_select(-1),
            KeyCode::Down | KeyCode::Char('j') => self.ctl.move_menu_select(1),
            KeyCode::Enter => {
                let task = self.ctl.move_menu().map(|m| m.task);
                if let (Some(task), Some(outcome)) = (task, self.ctl.choose_move_target(now)) {
                    self.report_move(task, outcome);
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.ctl.close_move_menu();
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => self.focus = Focus::Board,
            _ => {
                let before = self.search_field.value.clone();
                edit_field(&mut self.search_field, key);
                if self.search_field.value != before {
                    self.ctl.search_input(&self.search_field.value, now);
                }
            }
        }
    }

    fn handle_drag_key(&mut self, key: KeyEvent, now: Instant) {
        let Some(over) = self.key_drag else {
            return;
        };
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.carry_key_drag(over, -1),
            KeyCode::Right | KeyCode::Char('l') => self.carry_key_drag(over, 1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                let lifted = self.ctl.dnd().lifted();
                let dropped = self.ctl.drop_on(over, now);
                self.ctl.drag_end();
                self.key_drag = None;
                if let (Some(task), Some(dropped)) = (lifted, dropped) {
                    self.report_move(task, dropped.outcome);
                }
            }
            KeyCode::Esc => {
                self.ctl.drag_leave(over, None);
                self.ctl.drag_end();
                self.key_drag = None;
                self.status = "Drag canceled".into();
            }
            _ => {}
        }
    }

    fn begin_key_drag(&mut self, now: Instant) {
        let Some(id) = self.current_task() else {
            self.status = "No task selected to drag".into();
            return;
        };
        let column = self.selected_column;
        self.ctl.drag_start(id, now);
        self.ctl.drag_enter(column);
        self.ctl.drag_over(column);
        self.key_drag = Some(column);
        self.status = "Dragging: ←/→ to carry, Space to drop, Esc to cancel".into();
    }

    fn carry_key_drag(&mut self, over: ColumnId, delta: isize) {
        let Some(next) = step(over, delta) else {
            return;
        };
        self.ctl.drag_leave(over, Some(next));
        self.ctl.drag_enter(next);
        self.ctl.drag_over(next);
        self.key_drag = Some(next);
        if self.ctl.view().is_narrow() {
            self.ctl.select_tab(next);
        }
    }

    // -- mouse ---------------------------------------------------------------------

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.press(mouse.column, mouse.row, now),
            MouseEventKind::Drag(MouseButton::Left) => self.drag_to(mouse.column, mouse.row, now),
            MouseEventKind::Up(MouseButton::Left) => self.release(now),
            MouseEventKind::ScrollDown => self.scroll(1),
            MouseEventKind::ScrollUp => self.scroll(-1),
            _ => {}
        }
    }

    fn press(&mut self, x: u16, y: u16, now: Instant) {
        let hit = self.hit_at(x, y);
        if self.ctl.modal().is_open() {
            let inside = self.modal_area.is_some_and(|area| point_in_rect(x, y, area));
            match hit {
                Some(Hit::ModalClose) => {
                    self.ctl.cancel_modal();
                }
                Some(Hit::ModalSubmit) => self.submit(now),
                Some(Hit::ModalTitle) => self.set_form_focus(FormField::Title),
                Some(Hit::ModalDescription) => self.set_form_focus(FormField::Description),
                _ if !inside => {
                    self.ctl.cancel_modal();
                }
                _ => {}
            }
            return;
        }
        if self.ctl.move_menu().is_some() {
            match hit {
                Some(Hit::MenuEntry(idx)) => {
                    let task = self.ctl.move_menu().map(|m| m.task);
                    let current = self.ctl.move_menu().map(|m| m.selected).unwrap_or(0);
                    self.ctl.move_menu_select(idx as isize - current as isize);
                    if let (Some(task), Some(outcome)) = (task, self.ctl.choose_move_target(now)) {
                        self.report_move(task, outcome);
                    }
                }
                _ => {
                    self.ctl.close_move_menu();
                }
            }
            return;
        }
        self.focus = Focus::Board;
        match hit {
            Some(Hit::NewTask) => self.ctl.open_new_task(now),
            Some(Hit::Search) => self.focus = Focus::Search,
            Some(Hit::Tab(column)) => self.focus_column(column),
            Some(Hit::Edit(id)) => {
                self.ctl.open_edit_task(id, now);
            }
            Some(Hit::Delete(id)) => self.delete(id, now),
            Some(Hit::MoveTo(id)) => {
                self.ctl.open_move_menu(id);
            }
            Some(Hit::Card(id, column)) => {
                self.select_task(id, column);
                self.pointer = Pointer::Pressed(id);
            }
            Some(Hit::Column(column)) => self.selected_column = column,
            _ => {}
        }
    }

    fn drag_to(&mut self, x: u16, y: u16, now: Instant) {
        let over = match self.pointer {
            Pointer::Idle => return,
            Pointer::Pressed(id) => {
                self.ctl.drag_start(id, now);
                None
            }
            Pointer::Dragging { over } => over,
        };
        let under = self.column_at(x, y);
        if under != over {
            if let Some(left) = over {
                self.ctl.drag_leave(left, under);
            }
            if let Some(entered) = under {
                self.ctl.drag_enter(entered);
            }
        }
        if let Some(column) = under {
            self.ctl.drag_over(column);
        }
        self.pointer = Pointer::Dragging { over: under };
    }

    fn release(&mut self, now: Instant) {
        if let Pointer::Dragging { over } = self.pointer {
            let lifted = self.ctl.dnd().lifted();
            let dropped = over.and_then(|column| self.ctl.drop_on(column, now));
            self.ctl.drag_end();
            if let (Some(task), Some(dropped)) = (lifted, dropped) {
                self.report_move(task, dropped.outcome);
            }
        }
        self.pointer = Pointer::Idle;
    }

    fn scroll(&mut self, delta: isize) {
        let len = self.ctl.board().column(self.selected_column).len();
        if len == 0 {
            return;
        }
        let next = (self.selected_task as isize + delta).clamp(0, len as isize - 1);
        self.selected_task = next as usize;
    }

    fn hit_at(&self, x: u16, y: u16) -> Option<Hit> {
        self.hits
            .iter()
            .rev()
            .find(|(rect, _)| point_in_rect(x, y, *rect))
            .map(|(_, hit)| *hit)
    }

    fn column_at(&self, x: u16, y: u16) -> Option<ColumnId> {
        self.hits.iter().find_map(|(rect, hit)| match hit {
            Hit::Column(column) if point_in_rect(x, y, *rect) => Some(*column),
            _ => None,
        })
    }

    // -- actions -------------------------------------------------------------------

    fn submit(&mut self, now: Instant) {
        match self.ctl.submit_modal(now) {
            SubmitOutcome::Created(id) => {
                self.select_task(id, ColumnId::Todo);
                self.status = format!("Created task {}", id);
            }
            SubmitOutcome::Saved(id) => self.status = format!("Saved task {}", id),
            SubmitOutcome::Invalid => self.status = "A title is required".into(),
            SubmitOutcome::DroppedStaleEdit(id) => {
                self.status = format!("Task {} no longer exists; nothing saved", id)
            }
            SubmitOutcome::Ignored => {}
        }
    }

    fn delete(&mut self, id: TaskId, now: Instant) {
        if let Some(task) = self.ctl.delete_task(id, now) {
            self.status = format!("Deleted \"{}\"", task.title);
        }
        self.sync_selection();
    }

    fn report_move(&mut self, task: TaskId, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Moved { to, .. } => {
                self.select_task(task, to);
                self.status = format!("Moved {} to {}", task, to.label());
            }
            MoveOutcome::SameColumn => self.status = "Dropped in place".into(),
            MoveOutcome::Missing => {}
        }
    }

    fn set_form_focus(&mut self, field: FormField) {
        if let Some(form) = self.ctl.form_mut() {
            form.focus = Some(field);
        }
    }

    fn focus_column(&mut self, column: ColumnId) {
        if self.ctl.view().is_narrow() {
            self.ctl.select_tab(column);
        }
        if self.selected_column != column {
            self.selected_column = column;
            self.selected_task = 0;
        }
    }

    fn step_column(&mut self, delta: isize) {
        if let Some(next) = step(self.selected_column, delta) {
            self.focus_column(next);
        }
    }

    fn select_task(&mut self, id: TaskId, column: ColumnId) {
        self.selected_column = column;
        self.selected_task = self
            .ctl
            .board()
            .column(column)
            .task_ids
            .iter()
            .position(|t| *t == id)
            .unwrap_or(0);
    }

    fn current_task(&self) -> Option<TaskId> {
        self.ctl
            .board()
            .column(self.selected_column)
            .task_ids
            .get(self.selected_task)
            .copied()
    }

    /// Keeps the cursor on a visible column and inside its bounds.
    fn sync_selection(&mut self) {
        if let Some(active) = self.ctl.view().active() {
            if active != self.selected_column {
                debug!(column = %active, "selection follows active column");
                self.selected_column = active;
                self.selected_task = 0;
            }
        }
        let len = self.ctl.board().column(self.selected_column).len();
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
    }

    // -- drawing -------------------------------------------------------------------

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        self.hits.clear();
        self.modal_area = None;
        let narrow = self.ctl.view().is_narrow();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(if narrow { 1 } else { 0 }),
                Constraint::Min(CARD_HEIGHT + 2),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        if narrow {
            self.draw_tabs(f, layout[1]);
        }
        self.draw_board(f, layout[2]);
        self.draw_footer(f, layout[3]);

        if self.ctl.modal().is_open() {
            self.draw_form(f);
        } else if self.ctl.move_menu().is_some() {
            self.draw_move_menu(f);
        }
    }

    fn draw_header(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let new_label = "[+ New Task]";
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(12),
                Constraint::Min(10),
                Constraint::Length(new_label.len() as u16 + 2),
            ])
            .split(inner);

        f.render_widget(
            Paragraph::new(Span::styled(
                "taskboard",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            chunks[0],
        );

        let searching = self.focus == Focus::Search;
        let text = if searching {
            self.search_field.with_caret()
        } else if self.search_field.value.is_empty() {
            "/ search tasks".to_string()
        } else {
            self.search_field.value.clone()
        };
        let mut search_style = Style::default().fg(if searching {
            Color::Cyan
        } else {
            Color::Gray
        });
        if self.ctl.search().is_pending() {
            search_style = search_style.add_modifier(Modifier::ITALIC);
        }
        let matches = self.ctl.search().highlighted_count();
        let total = self.ctl.counts().total();
        let mut spans = vec![
            Span::styled(
                format!("{} task{}  ", total, if total == 1 { "" } else { "s" }),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(text, search_style),
        ];
        if matches > 0 {
            spans.push(Span::styled(
                format!("  {} match{}", matches, if matches == 1 { "" } else { "es" }),
                Style::default().fg(Color::LightYellow),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
        self.hits.push((chunks[1], Hit::Search));

        f.render_widget(
            Paragraph::new(Span::styled(
                new_label,
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Right),
            chunks[2],
        );
        self.hits.push((chunks[2], Hit::NewTask));
    }

    fn draw_tabs(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let active = self.ctl.view().active();
        let counts = self.ctl.counts();
        let mut x = area.x;
        let mut spans = Vec::new();
        for column in ColumnId::ALL {
            let label = format!(" {} ({}) ", column.label(), counts.of(column));
            let width = label.chars().count() as u16;
            let style = if active == Some(column) {
                Style::default()
                    .fg(Color::Black)
                    .bg(color_for_column(column))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(color_for_column(column))
            };
            let clipped = width.min(area.right().saturating_sub(x));
            self.hits
                .push((Rect::new(x, area.y, clipped, 1), Hit::Tab(column)));
            spans.push(Span::styled(label, style));
            spans.push(Span::raw(" "));
            x = x.saturating_add(width + 1);
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_board(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let visible = self.ctl.view().visible_columns();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                visible
                    .iter()
                    .map(|_| Constraint::Ratio(1, visible.len() as u32))
                    .collect::<Vec<_>>(),
            )
            .split(area);
        for (column, chunk) in visible.into_iter().zip(chunks.iter()) {
            self.draw_column(f, column, *chunk);
        }
    }

    fn draw_column(&mut self, f: &mut ratatui::Frame<'_>, column: ColumnId, area: Rect) {
        let accent = color_for_column(column);
        let focused = column == self.selected_column;
        let hovered = self.ctl.dnd().is_hovered(column);
        let mut title = format!("{} ({})", column.label(), self.ctl.counts().of(column));
        if self.ctl.dnd().lifted().is_some() && self.ctl.dnd().accepting() == Some(column) {
            title.push_str(" · drop here");
        }
        let mut title_style = Style::default().fg(accent).add_modifier(Modifier::BOLD);
        if focused {
            title_style = title_style.add_modifier(Modifier::UNDERLINED);
        }
        let border_style = if hovered {
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(accent)
        };
        let block = Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_type(if hovered {
                BorderType::Double
            } else {
                BorderType::Plain
            })
            .border_style(border_style)
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));
        let inner = block.inner(area);
        f.render_widget(block, area);
        self.hits.push((area, Hit::Column(column)));

        if self.ctl.board().column(column).is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "(empty)",
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Center),
                inner,
            );
            return;
        }

        let tasks: Vec<Task> = self.ctl.board().tasks_in(column).cloned().collect();
        let viewport = (inner.height / CARD_HEIGHT) as usize;
        let idx = column.index();
        let offset = if focused {
            adjust_offset(self.selected_task, self.scroll_offsets[idx], viewport, 0, tasks.len())
        } else {
            self.scroll_offsets[idx].min(tasks.len().saturating_sub(viewport))
        };
        self.scroll_offsets[idx] = offset;

        for (slot, (pos, task)) in tasks.iter().enumerate().skip(offset).take(viewport).enumerate() {
            let card = Rect::new(
                inner.x,
                inner.y + slot as u16 * CARD_HEIGHT,
                inner.width,
                CARD_HEIGHT,
            );
            let selected = focused && pos == self.selected_task;
            self.draw_card(f, task, column, card, selected);
        }
    }

    fn draw_card(
        &mut self,
        f: &mut ratatui::Frame<'_>,
        task: &Task,
        column: ColumnId,
        area: Rect,
        selected: bool,
    ) {
        let card = CardLook {
            selected,
            highlighted: self.ctl.search().is_highlighted(task.id),
            pulsing: self.ctl.is_pulsing(task.id),
            dragging: self.ctl.dnd().is_dragging(task.id),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(card.border_style())
            .style(card.body_style());
        let inner = block.inner(area);
        f.render_widget(block, area);
        self.hits.push((area, Hit::Card(task.id, column)));

        let width = inner.width as usize;
        let description = if task.description.is_empty() {
            Span::styled("no description", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(
                truncate_text(&first_line(&task.description), width),
                Style::default().fg(Color::Gray),
            )
        };
        let mut actions = vec![
            Span::styled(EDIT_LABEL, Style::default().fg(Color::LightYellow)),
            Span::raw(" "),
            Span::styled(DELETE_LABEL, Style::default().fg(Color::LightRed)),
        ];
        let narrow = self.ctl.view().is_narrow();
        if narrow {
            actions.push(Span::raw(" "));
            actions.push(Span::styled(MOVE_LABEL, Style::default().fg(Color::LightGreen)));
        }
        let lines = vec![
            Line::from(Span::styled(
                truncate_text(&task.title, width),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(description),
            Line::from(actions),
        ];
        f.render_widget(Paragraph::new(lines), inner);

        let row = inner.y + 2;
        if inner.height < 3 {
            return;
        }
        let mut x = inner.x;
        let mut buttons = vec![(EDIT_LABEL, Hit::Edit(task.id)), (DELETE_LABEL, Hit::Delete(task.id))];
        if narrow {
            buttons.push((MOVE_LABEL, Hit::MoveTo(task.id)));
        }
        for (label, hit) in buttons {
            let width = (label.len() as u16).min(inner.right().saturating_sub(x));
            if width == 0 {
                break;
            }
            self.hits.push((Rect::new(x, row, width, 1), hit));
            x = x.saturating_add(label.len() as u16 + 1);
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail = match self.current_task().and_then(|id| self.ctl.board().task(id)) {
            Some(task) => task_detail(task, Utc::now()),
            None if self.ctl.board().is_empty() => Line::from("The board is empty"),
            None => Line::from("No task selected"),
        };
        let detail = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Selected"),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        if self.key_drag.is_some() {
            return Line::from(vec![
                key("←→", Color::LightCyan),
                Span::raw(" carry  "),
                key("Space", Color::LightGreen),
                Span::raw(" drop  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ]);
        }
        let mut spans = vec![
            key("←↑↓→ / h j k l", Color::LightCyan),
            Span::raw(" select  "),
            key("n", Color::LightMagenta),
            Span::raw(" new  "),
            key("e", Color::LightYellow),
            Span::raw(" edit  "),
            key("d", Color::LightRed),
            Span::raw(" delete  "),
            key("Space", Color::LightGreen),
            Span::raw(" drag  "),
            key("m", Color::LightGreen),
            Span::raw(" move to  "),
            key("/", Color::LightCyan),
            Span::raw(" search  "),
        ];
        if self.ctl.view().is_narrow() {
            spans.push(key("1-3 Tab", Color::LightCyan));
            spans.push(Span::raw(" column  "));
        }
        spans.push(key("q", Color::LightRed));
        spans.push(Span::raw(" quit"));
        Line::from(spans)
    }

    fn draw_form(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = centered_rect(60, 50, f.size());
        self.modal_area = Some(area);
        let modal = self.ctl.modal();
        let Some(form) = modal.form() else {
            return;
        };
        let heading = match modal.edit_target() {
            Some(id) => format!("{} {}", modal.heading(), id),
            None => modal.heading().to_string(),
        };
        let submit_label = format!("[ {} ]", modal.submit_label());

        let block = Block::default()
            .title(Span::styled(
                heading,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let title_border = if form.title_error {
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD)
        } else if form.focus == Some(FormField::Title) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let title = Paragraph::new(field_lines(&form.title, form.focus == Some(FormField::Title)))
            .block(
                Block::default()
                    .title("Title (required)")
                    .borders(Borders::ALL)
                    .border_style(title_border),
            );
        f.render_widget(title, rows[0]);

        let description_active = form.focus == Some(FormField::Description);
        let description = Paragraph::new(field_lines(&form.description, description_active))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Description")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(if description_active {
                        Color::Cyan
                    } else {
                        Color::DarkGray
                    })),
            );
        f.render_widget(description, rows[1]);

        let submit_style = if form.focus == Some(FormField::Submit) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD)
        };
        let close_label = "[ Close ]";
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(submit_label.clone(), submit_style),
                Span::raw("  "),
                Span::styled(close_label, Style::default().fg(Color::Gray)),
            ])),
            rows[2],
        );
        f.render_widget(
            Paragraph::new(Span::styled(
                "Enter in title submits · Tab next field · Ctrl+Enter submits from description · Esc closes",
                Style::default().fg(Color::DarkGray),
            )),
            rows[3],
        );

        let submit_width = submit_label.chars().count() as u16;
        let close_x = rows[2].x + submit_width + 2;
        self.hits.push((rows[0], Hit::ModalTitle));
        self.hits.push((rows[1], Hit::ModalDescription));
        self.hits
            .push((Rect::new(rows[2].x, rows[2].y, submit_width, 1), Hit::ModalSubmit));
        self.hits.push((
            Rect::new(close_x, rows[2].y, close_label.len() as u16, 1),
            Hit::ModalClose,
        ));
    }

    fn draw_move_menu(&mut self, f: &mut ratatui::Frame<'_>) {
        let Some(menu) = self.ctl.move_menu().cloned() else {
            return;
        };
        let title = self
            .ctl
            .board()
            .task(menu.task)
            .map(|t| t.title.clone())
            .unwrap_or_default();
        let area = centered_rect(40, 25, f.size());
        let block = Block::default()
            .title(Span::styled(
                format!("Move \"{}\" to", truncate_text(&title, 24)),
                Style::default()
                    .fg(Color::LightGreen)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightGreen));
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let lines: Vec<Line> = menu
            .targets
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let style = if idx == menu.selected {
                    Style::default()
                        .fg(Color::Black)
                        .bg(color_for_column(*column))
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(color_for_column(*column))
                };
                Line::from(Span::styled(format!(" {} ", column.label()), style))
            })
            .collect();
        f.render_widget(Paragraph::new(lines), inner);
        for idx in 0..menu.targets.len() {
            let row = inner.y + idx as u16;
            if row < inner.bottom() {
                self.hits
                    .push((Rect::new(inner.x, row, inner.width, 1), Hit::MenuEntry(idx)));
            }
        }
    }
}

struct CardLook {
    selected: bool,
    highlighted: bool,
    pulsing: bool,
    dragging: bool,
}

impl CardLook {
    fn border_style(&self) -> Style {
        let style = if self.pulsing {
            Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD)
        } else if self.selected {
            Style::default()
                .fg(Color::Rgb(252, 214, 112))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if self.dragging {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }

    fn body_style(&self) -> Style {
        let bg = if self.highlighted {
            Color::Rgb(92, 78, 20)
        } else if self.pulsing {
            Color::Rgb(18, 58, 30)
        } else {
            Color::Rgb(22, 24, 30)
        };
        let style = Style::default().bg(bg).fg(Color::Gray);
        if self.dragging {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }
}

fn edit_field(field: &mut FieldValue, key: KeyEvent) {
    match key.code {
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Up => field.move_up(),
        KeyCode::Down => field.move_down(),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Char(c) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                field.insert_char(c);
            }
        }
        _ => {}
    }
}

fn step(column: ColumnId, delta: isize) -> Option<ColumnId> {
    let idx = column.index() as isize + delta;
    if idx < 0 {
        return None;
    }
    ColumnId::from_index(idx as usize)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn logical_width(term_width: u16, cell_width_px: u32) -> u32 {
    u32::from(term_width).saturating_mul(cell_width_px)
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom()
}

fn color_for_column(column: ColumnId) -> Color {
    match column {
        ColumnId::Todo => Color::Cyan,
        ColumnId::Progress => Color::LightMagenta,
        ColumnId::Done => Color::LightGreen,
    }
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn field_lines(field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .map(|line| Line::from(Span::styled(line.to_string(), style)))
        .collect()
}

fn task_detail(task: &Task, now: DateTime<Utc>) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{} ", task.id), Style::default().fg(Color::DarkGray)),
        Span::styled(
            task.title.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("created {}", format_elapsed(task.created_at, now)),
            Style::default().fg(Color::Gray),
        ),
    ];
    if task.updated_at != task.created_at {
        spans.push(Span::styled(
            format!(", updated {}", format_elapsed(task.updated_at, now)),
            Style::default().fg(Color::Gray),
        ));
    }
    if !task.description.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            task.description.replace('\n', " "),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}

fn format_elapsed(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
