use crate::config::{Settings, Timings};
use crate::counters::{recompute_counters, ColumnCounts};
use crate::dnd::{DragCoordinator, DropOutcome};
use crate::modal::{Modal, SubmitOutcome, TaskForm};
use crate::model::{Board, ColumnId, MoveOutcome, Task, TaskId};
use crate::responsive::ViewController;
use crate::schedule::{Deferred, Scheduler, Transient};
use crate::search::SearchFilter;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveMenu {
    pub task: TaskId,
    pub targets: Vec<ColumnId>,
    pub selected: usize,
}

#[derive(Debug)]
pub struct BoardController {
    board: Board,
    counts: ColumnCounts,
    pulses: Transient<TaskId>,
    modal: Modal,
    dnd: DragCoordinator,
    search: SearchFilter,
    view: ViewController,
    move_menu: Option<MoveMenu>,
    sched: Scheduler,
    timings: Timings,
}

impl BoardController {
    /// `width` is the viewport width in logical pixels.
    pub fn new(settings: &Settings, width: u32) -> Self {
        let view = ViewController::new(settings.breakpoint_px, width);
        debug!(width, narrow = view.is_narrow(), "board view initialized");
        BoardController {
            board: Board::new(),
            counts: ColumnCounts::default(),
            pulses: Transient::new(),
            modal: Modal::new(),
            dnd: DragCoordinator::new(),
            search: SearchFilter::new(),
            view,
            move_menu: None,
            sched: Scheduler::new(),
            timings: settings.timings.clone(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn counts(&self) -> ColumnCounts {
        self.counts
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        self.modal.form_mut()
    }

    pub fn dnd(&self) -> &DragCoordinator {
        &self.dnd
    }

    pub fn search(&self) -> &SearchFilter {
        &self.search
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn move_menu(&self) -> Option<&MoveMenu> {
        self.move_menu.as_ref()
    }

    pub fn is_pulsing(&self, id: TaskId) -> bool {
        self.pulses.contains(id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.sched.next_deadline()
    }

    // -- modal -------------------------------------------------------------

    pub fn open_new_task(&mut self, now: Instant) {
        self.move_menu = None;
        self.modal
            .open_create(&mut self.sched, self.timings.focus_delay(), now);
    }

    pub fn open_edit_task(&mut self, id: TaskId, now: Instant) -> bool {
        let Some(task) = self.board.task(id) else {
            return false;
        };
        self.move_menu = None;
        self.modal
            .open_edit(task, &mut self.sched, self.timings.focus_delay(), now);
        true
    }

    pub fn submit_modal(&mut self, now: Instant) -> SubmitOutcome {
        let outcome = self.modal.submit(
            &mut self.board,
            &mut self.sched,
            self.timings.title_error(),
            now,
        );
        match &outcome {
            SubmitOutcome::Created(id) => {
                info!(task = %id, tasks = self.board.len(), "created task");
                self.recompute_counters(now);
            }
            SubmitOutcome::Saved(id) => info!(task = %id, "saved task"),
            SubmitOutcome::DroppedStaleEdit(id) => {
                warn!(task = %id, "edit target is gone; closing without saving")
            }
            SubmitOutcome::Invalid => debug!("rejected submit with empty title"),
            SubmitOutcome::Ignored => {}
        }
        outcome
    }

    pub fn cancel_modal(&mut self) -> bool {
        self.modal.cancel(&mut self.sched)
    }

    // -- card actions --------------------------------------------------------

    /// Removes a card immediately. Unknown ids are a no-op.
    pub fn delete_task(&mut self, id: TaskId, now: Instant) -> Option<Task> {
        let removed = self.board.delete_task(id)?;
        self.pulses.remove(id, &mut self.sched);
        self.search.forget(id, &mut self.sched);
        self.dnd.forget(id, &mut self.sched);
        if self.move_menu.as_ref().is_some_and(|m| m.task == id) {
            self.move_menu = None;
        }
        info!(task = %id, "deleted task");
        self.recompute_counters(now);
        Some(removed)
    }

    pub fn open_move_menu(&mut self, id: TaskId) -> bool {
        let targets = self.board.move_targets(id);
        if targets.is_empty() {
            return false;
        }
        self.move_menu = Some(MoveMenu {
            task: id,
            targets,
            selected: 0,
        });
        true
    }

    pub fn move_menu_select(&mut self, delta: isize) {
        if let Some(menu) = self.move_menu.as_mut() {
            let len = menu.targets.len() as isize;
            menu.selected = (menu.selected as isize + delta).rem_euclid(len) as usize;
        }
    }

    pub fn close_move_menu(&mut self) -> bool {
        self.move_menu.take().is_some()
    }

    /// Moves the menu's task to the highlighted entry and closes the menu.
    pub fn choose_move_target(&mut self, now: Instant) -> Option<MoveOutcome> {
        let menu = self.move_menu.take()?;
        let target = *menu.targets.get(menu.selected)?;
        Some(self.move_task_to(menu.task, target, now))
    }

    /// Moves a card to the end of `target`, following it with the view when narrow.
    pub fn move_task_to(&mut self, id: TaskId, target: ColumnId, now: Instant) -> MoveOutcome {
        let outcome = self.board.move_task(id, target);
        self.after_move(id, outcome, now);
        outcome
    }

    // -- drag and drop -------------------------------------------------------

    pub fn drag_start(&mut self, id: TaskId, now: Instant) {
        if self.board.task(id).is_none() {
            return;
        }
        debug!(task = %id, "drag start");
        self.dnd
            .drag_start(id, &mut self.sched, self.timings.drag_style_delay(), now);
    }

    pub fn drag_enter(&mut self, column: ColumnId) {
        self.dnd.drag_enter(column, &mut self.sched);
    }

    pub fn drag_leave(&mut self, column: ColumnId, related: Option<ColumnId>) {
        self.dnd.drag_leave(column, related, &mut self.sched);
    }

    pub fn drag_over(&mut self, column: ColumnId) {
        self.dnd.drag_over(column);
    }

    pub fn drop_on(&mut self, column: ColumnId, now: Instant) -> Option<DropOutcome> {
        let dropped = self.dnd.drop_on(
            column,
            &mut self.board,
            &mut self.sched,
            self.timings.hover_linger(),
            now,
        )?;
        self.after_move(dropped.task, dropped.outcome, now);
        Some(dropped)
    }

    pub fn drag_end(&mut self) {
        if let Some(id) = self.dnd.lifted() {
            debug!(task = %id, "drag end");
        }
        self.dnd.drag_end(&mut self.sched);
    }

    // -- search and view -----------------------------------------------------

    pub fn search_input(&mut self, raw: &str, now: Instant) {
        self.search
            .input(raw, &mut self.sched, self.timings.search_debounce(), now);
    }

    pub fn select_tab(&mut self, column: ColumnId) -> bool {
        let selected = self.view.select_tab(column);
        if selected {
            debug!(column = %column, "tab selected");
        }
        selected
    }

    pub fn resize(&mut self, width: u32) {
        let was_narrow = self.view.is_narrow();
        self.view.resize(width);
        if was_narrow != self.view.is_narrow() {
            debug!(width, narrow = self.view.is_narrow(), "crossed breakpoint");
        }
    }

    /// Applies every follow-up whose time has come. Returns how many ran.
    pub fn tick(&mut self, now: Instant) -> usize {
        let due = self.sched.take_due(now);
        let ran = due.len();
        for action in due {
            match action {
                Deferred::FocusTitle => self.modal.focus_title(),
                Deferred::ApplyDragging(id) => self.dnd.apply_dragging(id),
                Deferred::ClearPulse(id) => self.pulses.expire(id),
                Deferred::ClearHighlight(id) => self.search.clear_highlight(id),
                Deferred::ClearHover(column) => self.dnd.clear_hover(column),
                Deferred::ClearTitleError => self.modal.clear_title_error(),
                Deferred::RunSearch(query) => {
                    let hits = self.search.run(
                        &query,
                        &self.board,
                        &mut self.sched,
                        self.timings.search_highlight(),
                        now,
                    );
                    debug!(query = %query, hits = hits.len(), "search scan");
                }
            }
        }
        ran
    }

    fn after_move(&mut self, id: TaskId, outcome: MoveOutcome, now: Instant) {
        match outcome {
            MoveOutcome::Moved { from, to } => {
                info!(task = %id, from = %from, to = %to, "moved task");
                self.view.follow_move(to);
                self.recompute_counters(now);
            }
            MoveOutcome::SameColumn => self.recompute_counters(now),
            MoveOutcome::Missing => {}
        }
    }

    fn recompute_counters(&mut self, now: Instant) {
        self.counts = recompute_counters(
            &self.board,
            &mut self.pulses,
            &mut self.sched,
            self.timings.done_pulse(),
            now,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::FormField;
    use proptest::prelude::*;
    use std::time::Duration;

    const WIDE: u32 = 1200;
    const NARROW: u32 = 480;

    fn controller(width: u32) -> BoardController {
        BoardController::new(&Settings::default(), width)
    }

    fn create(ctl: &mut BoardController, title: &str, desc: &str, now: Instant) -> TaskId {
        ctl.open_new_task(now);
        let form = ctl.form_mut().unwrap();
        form.title.set(title);
        form.description.set(desc);
        match ctl.submit_modal(now) {
            SubmitOutcome::Created(id) => id,
            other => panic!("expected a created task, got {other:?}"),
        }
    }

    fn assert_counts_consistent(ctl: &BoardController) {
        for column in ColumnId::ALL {
            assert_eq!(ctl.counts().of(column), ctl.board().column(column).len());
        }
    }

    #[test]
    fn design_api_walkthrough() {
        let now = Instant::now();
        let mut ctl = controller(WIDE);

        let id = create(&mut ctl, "Design API", "v1 draft", now);
        assert_eq!(id.to_string(), "#1");
        assert_eq!(ctl.board().column_of(id), Some(ColumnId::Todo));
        assert_eq!(ctl.counts().of(ColumnId::Todo), 1);

        ctl.move_task_to(id, ColumnId::Progress, now);
        assert_eq!(ctl.counts().of(ColumnId::Todo), 0);
        assert_eq!(ctl.counts().of(ColumnId::Progress), 1);

        assert!(ctl.open_edit_task(id, now));
        ctl.form_mut().unwrap().title.set("Design API v2");
        assert_eq!(ctl.submit_modal(now), SubmitOutcome::Saved(id));
        let task = ctl.board().task(id).unwrap();
        assert_eq!(task.title, "Design API v2");
        assert_eq!(task.id, id);
        assert_eq!(ctl.board().column_of(id), Some(ColumnId::Progress));

        assert!(ctl.delete_task(id, now).is_some());
        assert_eq!(ctl.counts().of(ColumnId::Progress), 0);
        assert!(ctl.board().column_of(id).is_none());
        assert_counts_consistent(&ctl);
    }

    #[test]
    fn blank_title_leaves_board_untouched() {
        let now = Instant::now();
        let mut ctl = controller(WIDE);
        ctl.open_new_task(now);
        ctl.form_mut().unwrap().title.set("  \t ");
        assert_eq!(ctl.submit_modal(now), SubmitOutcome::Invalid);
        assert!(ctl.modal().is_open());
        assert!(ctl.board().is_empty());
        assert_eq!(ctl.counts().total(), 0);
        assert!(ctl.modal().form().unwrap().title_error);

        ctl.tick(now + Duration::from_millis(1200));
        assert!(!ctl.modal().form().unwrap().title_error);
        assert_eq!(ctl.modal().form().unwrap().focus, Some(FormField::Title));
    }

    #[test]
    fn title_focus_lands_after_the_open() {
        let now = Instant::now();
        let mut ctl = controller(WIDE);
        ctl.open_new_task(now);
        assert_eq!(ctl.modal().form().unwrap().focus, None);
        ctl.tick(now + Duration::from_millis(49));
        assert_eq!(ctl.modal().form().unwrap().focus, None);
        ctl.tick(now + Duration::from_millis(50));
        assert_eq!(ctl.modal().form().unwrap().focus, Some(FormField::Title));
    }

    #[test]
    fn deleting_the_edit_target_drops_the_session_on_submit() {
        let now = Instant::now();
        let mut ctl = controller(WIDE);
        let id = create(&mut ctl, "doomed", "", now);
        ctl.open_edit_task(id, now);
        ctl.delete_task(id, now);
        assert_eq!(ctl.submit_modal(now), SubmitOutcome::DroppedStaleEdit(id));
        assert!(!ctl.modal().is_open());
        assert!(ctl.board().is_empty());
    }

    #[test]
    fn drop_into_done_pulses_every_done_card() {
        let now = Instant::now();
        let mut ctl = controller(WIDE);
        let a = create(&mut ctl, "a", "", now);
        let b = create(&mut ctl, "b", "", now);
        ctl.move_task_to(a, ColumnId::Done, now);
        ctl.tick(now + Duration::from_millis(1000));
        assert!(!ctl.is_pulsing(a));

        let later = now + Duration::from_millis(1500);
        ctl.drag_start(b, later);
        ctl.tick(later);
        assert!(ctl.dnd().is_dragging(b));
        ctl.drag_enter(ColumnId::Done);
        ctl.drag_over(ColumnId::Done);
        let dropped = ctl.drop_on(ColumnId::Done, later).unwrap();
        ctl.drag_end();
        assert_eq!(dropped.task, b);
        assert_eq!(ctl.counts().of(ColumnId::Done), 2);
        assert!(ctl.is_pulsing(a) && ctl.is_pulsing(b));
        assert_eq!(ctl.dnd().lifted(), None);
        assert!(!ctl.dnd().is_dragging(b));
        assert!(ctl.dnd().is_hovered(ColumnId::Done));

        ctl.tick(later + Duration::from_millis(1000));
        assert!(!ctl.is_pulsing(a) && !ctl.is_pulsing(b));
        assert!(!ctl.dnd().is_hovered(ColumnId::Done));
    }

    #[test]
    fn narrow_drop_switches_active_column() {
        let now = Instant::now();
        let mut ctl = controller(NARROW);
        assert_eq!(ctl.view().active(), Some(ColumnId::Todo));
        let id = create(&mut ctl, "card", "", now);
        ctl.drag_start(id, now);
        ctl.drag_enter(ColumnId::Progress);
        ctl.drag_over(ColumnId::Progress);
        ctl.drop_on(ColumnId::Progress, now);
        ctl.drag_end();
        assert_eq!(ctl.view().active(), Some(ColumnId::Progress));
    }

    #[test]
    fn move_menu_offers_the_other_two_columns() {
        let now = Instant::now();
        let mut ctl = controller(NARROW);
        let id = create(&mut ctl, "card", "", now);
        assert!(ctl.open_move_menu(id));
        assert_eq!(
            ctl.move_menu().unwrap().targets,
            vec![ColumnId::Progress, ColumnId::Done]
        );
        ctl.move_menu_select(1);
        assert_eq!(
            ctl.choose_move_target(now),
            Some(MoveOutcome::Moved {
                from: ColumnId::Todo,
                to: ColumnId::Done
            })
        );
        assert!(ctl.move_menu().is_none());
        assert_eq!(ctl.view().active(), Some(ColumnId::Done));
        assert_counts_consistent(&ctl);
    }

    #[test]
    fn search_runs_after_debounce_and_spans_hidden_columns() {
        let now = Instant::now();
        let mut ctl = controller(NARROW);
        let fix = create(&mut ctl, "Fix login bug", "", now);
        let docs = create(&mut ctl, "Update docs", "", now);
        ctl.move_task_to(fix, ColumnId::Done, now);
        ctl.select_tab(ColumnId::Todo);

        ctl.search_input("fix", now);
        ctl.tick(now + Duration::from_millis(400));
        assert!(ctl.search().is_highlighted(fix));
        assert!(!ctl.search().is_highlighted(docs));

        ctl.search_input("", now + Duration::from_millis(500));
        assert!(!ctl.search().is_highlighted(fix));
    }

    #[derive(Debug, Clone)]
    enum Action {
        Create(String),
        Delete(usize),
        Move(usize, usize),
        Drop(usize, usize),
        Tick(u64),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            "[a-z ]{0,5}".prop_map(Action::Create),
            (0usize..12).prop_map(Action::Delete),
            (0usize..12, 0usize..3).prop_map(|(t, c)| Action::Move(t, c)),
            (0usize..12, 0usize..3).prop_map(|(t, c)| Action::Drop(t, c)),
            (0u64..3000).prop_map(Action::Tick),
        ]
    }

    proptest! {
        #[test]
        fn counts_always_match_columns(actions in prop::collection::vec(action(), 0..40)) {
            let start = Instant::now();
            let mut now = start;
            let mut ctl = controller(NARROW);
            let mut ids: Vec<TaskId> = Vec::new();
            for act in actions {
                match act {
                    Action::Create(title) => {
                        ctl.open_new_task(now);
                        ctl.form_mut().unwrap().title.set(&title);
                        match ctl.submit_modal(now) {
                            SubmitOutcome::Created(id) => {
                                prop_assert!(ids.last().map_or(true, |last| id > *last));
                                ids.push(id);
                            }
                            other => {
                                prop_assert_eq!(other, SubmitOutcome::Invalid);
                                ctl.cancel_modal();
                            }
                        }
                    }
                    Action::Delete(i) => {
                        if let Some(id) = ids.get(i) {
                            ctl.delete_task(*id, now);
                        }
                    }
                    Action::Move(i, c) => {
                        if let Some(id) = ids.get(i) {
                            ctl.move_task_to(*id, ColumnId::ALL[c], now);
                        }
                    }
                    Action::Drop(i, c) => {
                        if let Some(id) = ids.get(i) {
                            let column = ColumnId::ALL[c];
                            ctl.drag_start(*id, now);
                            ctl.drag_enter(column);
                            ctl.drag_over(column);
                            ctl.drop_on(column, now);
                            ctl.drag_end();
                            prop_assert_eq!(ctl.dnd().lifted(), None);
                        }
                    }
                    Action::Tick(ms) => {
                        now += Duration::from_millis(ms);
                        ctl.tick(now);
                    }
                }
                for column in ColumnId::ALL {
                    prop_assert_eq!(ctl.counts().of(column), ctl.board().column(column).len());
                }
                prop_assert!(ctl.view().active().is_some());
            }
        }
    }
}
