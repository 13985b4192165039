//! Nullable task catalog with outage injection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use terra_external::{CatalogError, TaskCatalog};
use terra_types::Task;

pub struct NullCatalog {
    tasks: Mutex<Vec<Task>>,
    unavailable: AtomicBool,
}

impl NullCatalog {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every read fails with [`CatalogError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn add_task(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }
}

impl TaskCatalog for NullCatalog {
    fn list_tasks(&self) -> Result<Vec<Task>, CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("null catalog offline".into()));
        }
        Ok(self.tasks.lock().unwrap().clone())
    }
}
