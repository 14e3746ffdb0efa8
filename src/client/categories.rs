//! Category filtering and completion counts for the task view. Nothing here
//! is cached; every call recomputes from the task list it is given.

use std::fmt;
use std::str::FromStr;

use crate::models::{Category, CategoryError, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(c) => f.write_str(c.as_str()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// `completed` out of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Rounded percentage; an empty set is 0%.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

fn count<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Progress {
    tasks.into_iter().fold(Progress::default(), |mut p, t| {
        p.total += 1;
        if t.completed {
            p.completed += 1;
        }
        p
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub category: Category,
    pub tasks: Vec<&'a Task>,
    pub progress: Progress,
}

/// Tasks matching `filter`, in list order.
pub fn filter_tasks(tasks: &[Task], filter: CategoryFilter) -> Vec<&Task> {
    match filter {
        CategoryFilter::All => tasks.iter().collect(),
        CategoryFilter::Only(category) => tasks.iter().filter(|t| t.category == category).collect(),
    }
}

/// Non-empty categories in display order, each with its tasks and counts.
pub fn group_by_category(tasks: &[Task]) -> Vec<CategoryGroup<'_>> {
    Category::ALL
        .iter()
        .filter_map(|&category| {
            let members = filter_tasks(tasks, CategoryFilter::Only(category));
            if members.is_empty() {
                return None;
            }
            let progress = count(members.iter().copied());
            Some(CategoryGroup {
                category,
                tasks: members,
                progress,
            })
        })
        .collect()
}

pub fn category_progress(tasks: &[Task], category: Category) -> Progress {
    count(tasks.iter().filter(|t| t.category == category))
}

pub fn overall_progress(tasks: &[Task]) -> Progress {
    count(tasks)
}

pub fn subtask_progress(task: &Task) -> Progress {
    Progress {
        completed: task.subtasks.iter().filter(|s| s.completed).count(),
        total: task.subtasks.len(),
    }
}
