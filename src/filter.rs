// List filtering for tasks and habits

use crate::models::{Difficulty, Habit, Task};

/// Which completion states to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Completion {
    All,
    Done,
    #[default]
    Undone,
}

impl Completion {
    fn admits(self, done: bool) -> bool {
        match self {
            Completion::All => true,
            Completion::Done => done,
            Completion::Undone => !done,
        }
    }
}

/// Filter for task and habit lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Difficulties to keep; empty keeps all
    pub difficulties: Vec<Difficulty>,
    /// Completion state to keep
    pub completion: Completion,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_difficulties(mut self, difficulties: impl IntoIterator<Item = Difficulty>) -> Self {
        self.difficulties = difficulties.into_iter().collect();
        self
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// Back to the defaults: any difficulty, undone only
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, difficulty: Difficulty, done: bool) -> bool {
        let difficulty_ok = self.difficulties.is_empty() || self.difficulties.contains(&difficulty);
        difficulty_ok && self.completion.admits(done)
    }

    pub fn tasks<'a>(&'a self, tasks: &'a [Task]) -> impl Iterator<Item = &'a Task> + 'a {
        tasks.iter().filter(|t| self.matches(t.difficulty, t.done))
    }

    pub fn habits<'a>(&'a self, habits: &'a [Habit]) -> impl Iterator<Item = &'a Habit> + 'a {
        habits.iter().filter(|h| self.matches(h.difficulty, h.done))
    }
}
