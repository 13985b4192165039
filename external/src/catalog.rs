//! Task catalog read interface.

use terra_types::{Difficulty, Task};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("task catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the static task definitions.
pub trait TaskCatalog: Send + Sync {
    fn list_tasks(&self) -> Result<Vec<Task>, CatalogError>;

    fn list_by_difficulty(&self, difficulty: Difficulty) -> Result<Vec<Task>, CatalogError> {
        Ok(self
            .list_tasks()?
            .into_iter()
            .filter(|t| t.difficulty == difficulty)
            .collect())
    }
}

/// A catalog fixed at construction time.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    tasks: Vec<Task>,
}

impl StaticCatalog {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

impl TaskCatalog for StaticCatalog {
    fn list_tasks(&self) -> Result<Vec<Task>, CatalogError> {
        Ok(self.tasks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_types::TaskId;

    #[test]
    fn filter_by_difficulty() {
        let catalog = StaticCatalog::new(vec![
            Task::new(TaskId::new("walk").unwrap(), Difficulty::Easy, "Walk to work"),
            Task::new(TaskId::new("solar").unwrap(), Difficulty::Hard, "Install a panel"),
            Task::new(TaskId::new("tap").unwrap(), Difficulty::Easy, "Drink tap water"),
        ]);
        let easy = catalog.list_by_difficulty(Difficulty::Easy).unwrap();
        assert_eq!(easy.len(), 2);
        let hard = catalog.list_by_difficulty(Difficulty::Hard).unwrap();
        assert_eq!(hard[0].id.as_str(), "solar");
    }
}
