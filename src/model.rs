use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Identity of a task. Allocated from a monotonically increasing counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnId {
    Todo,
    Progress,
    Done,
}

impl ColumnId {
    pub const ALL: [ColumnId; 3] = [ColumnId::Todo, ColumnId::Progress, ColumnId::Done];

    pub fn key(self) -> &'static str {
        match self {
            ColumnId::Todo => "todo",
            ColumnId::Progress => "progress",
            ColumnId::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnId::Todo => "To Do",
            ColumnId::Progress => "In Progress",
            ColumnId::Done => "Done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ColumnId::Todo => 0,
            ColumnId::Progress => 1,
            ColumnId::Done => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<ColumnId> {
        ColumnId::ALL.get(idx).copied()
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub id: ColumnId,
    pub task_ids: Vec<TaskId>,
}

impl Column {
    fn new(id: ColumnId) -> Self {
        Column {
            id,
            task_ids: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.task_ids.contains(&id)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("edit session has no target task")]
    MissingEditTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: ColumnId, to: ColumnId },
    SameColumn,
    Missing,
}

/// The three fixed columns and the tasks they hold.
///
/// Membership lives only in the column sequences; a task's column is found by lookup.
#[derive(Debug, Clone)]
pub struct Board {
    columns: [Column; 3],
    tasks: HashMap<TaskId, Task>,
    last_id: u64,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Board {
            columns: ColumnId::ALL.map(Column::new),
            tasks: HashMap::new(),
            last_id: 0,
        }
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.index()]
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in board order: column by column, top to bottom.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.columns
            .iter()
            .flat_map(|c| c.task_ids.iter())
            .filter_map(|id| self.tasks.get(id))
    }

    pub fn tasks_in(&self, column: ColumnId) -> impl Iterator<Item = &Task> + '_ {
        self.column(column)
            .task_ids
            .iter()
            .filter_map(|id| self.tasks.get(id))
    }

    pub fn column_of(&self, id: TaskId) -> Option<ColumnId> {
        self.columns.iter().find(|c| c.contains(id)).map(|c| c.id)
    }

    /// Creates a task at the end of `todo`.
    pub fn create_task(&mut self, title: &str, description: &str) -> Result<TaskId, BoardError> {
        let title = validate_title(title)?;
        self.last_id += 1;
        let id = TaskId(self.last_id);
        let now = Utc::now();
        self.tasks.insert(
            id,
            Task {
                id,
                title,
                description: description.trim().to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        self.columns[ColumnId::Todo.index()].task_ids.push(id);
        Ok(id)
    }

    /// Overwrites title and description in place. Column and position are untouched.
    pub fn edit_task(
        &mut self,
        id: TaskId,
        title: &str,
        description: &str,
    ) -> Result<(), BoardError> {
        let title = validate_title(title)?;
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(BoardError::MissingEditTarget)?;
        task.title = title;
        task.description = description.trim().to_string();
        task.updated_at = Utc::now();
        Ok(())
    }

    /// Removes the task from its column. Returns `None` if it was already gone.
    pub fn delete_task(&mut self, id: TaskId) -> Option<Task> {
        for column in &mut self.columns {
            column.task_ids.retain(|t| *t != id);
        }
        self.tasks.remove(&id)
    }

    /// Appends the task to the end of `target`, leaving its previous column.
    pub fn move_task(&mut self, id: TaskId, target: ColumnId) -> MoveOutcome {
        let from = match self.column_of(id) {
            Some(from) => from,
            None => return MoveOutcome::Missing,
        };
        if from == target {
            return MoveOutcome::SameColumn;
        }
        self.columns[from.index()].task_ids.retain(|t| *t != id);
        self.columns[target.index()].task_ids.push(id);
        if let Some(task) = self.tasks.get_mut(&id) {
            task.updated_at = Utc::now();
        }
        MoveOutcome::Moved { from, to: target }
    }

    /// The two columns a task could be moved to.
    pub fn move_targets(&self, id: TaskId) -> Vec<ColumnId> {
        match self.column_of(id) {
            Some(current) => ColumnId::ALL
                .into_iter()
                .filter(|c| *c != current)
                .collect(),
            None => Vec::new(),
        }
    }
}

fn validate_title(title: &str) -> Result<String, BoardError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoardError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}
