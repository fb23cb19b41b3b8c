// ABOUTME: Deep traversal primitives over the task tree
// ABOUTME: Underlies status queries, task lookup, merging, and scheduling

use indexmap::IndexMap;

use super::instance::{Task, TaskStatus};

/// A path from the instance root to a task, as a chain of task names.
pub type TaskPath = Vec<String>;

/// Walk a tasks mapping depth-first, pre-order, in insertion order.
///
/// The visitor returns a continue signal; a `false` return halts the entire
/// traversal and propagates upward. Recurses into `task.tasks` iff `deep`
/// is set.
pub fn walk_tasks<F>(tasks: &IndexMap<String, Task>, deep: bool, visit: &mut F) -> bool
where
    F: FnMut(&str, &Task) -> bool,
{
    for (name, task) in tasks {
        if !visit(name, task) {
            return false;
        }
        if deep && !task.tasks.is_empty() && !walk_tasks(&task.tasks, deep, visit) {
            return false;
        }
    }
    true
}

/// Mutable variant of [`walk_tasks`], same ordering and halt semantics.
pub fn walk_tasks_mut<F>(tasks: &mut IndexMap<String, Task>, deep: bool, visit: &mut F) -> bool
where
    F: FnMut(&str, &mut Task) -> bool,
{
    for (name, task) in tasks.iter_mut() {
        if !visit(name, task) {
            return false;
        }
        if deep && !task.tasks.is_empty() && !walk_tasks_mut(&mut task.tasks, deep, visit) {
            return false;
        }
    }
    true
}

/// Walk depth-first with the full path to each task available to the visitor.
pub fn walk_with_path<F>(tasks: &IndexMap<String, Task>, visit: &mut F) -> bool
where
    F: FnMut(&[String], &Task) -> bool,
{
    fn inner<F>(tasks: &IndexMap<String, Task>, path: &mut Vec<String>, visit: &mut F) -> bool
    where
        F: FnMut(&[String], &Task) -> bool,
    {
        for (name, task) in tasks {
            path.push(name.clone());
            let keep_going = visit(path, task) && inner(&task.tasks, path, visit);
            path.pop();
            if !keep_going {
                return false;
            }
        }
        true
    }

    let mut path = Vec::new();
    inner(tasks, &mut path, visit)
}

/// True when any task in the tree is paused.
pub fn any_paused(tasks: &IndexMap<String, Task>) -> bool {
    !walk_tasks(tasks, true, &mut |_, task| task.status != TaskStatus::Paused)
}

/// True when every task in the tree is completed. An empty tree is complete.
pub fn all_completed(tasks: &IndexMap<String, Task>) -> bool {
    walk_tasks(tasks, true, &mut |_, task| {
        task.status == TaskStatus::Completed
    })
}

/// Find the path of the first task with the given name, depth-first in
/// insertion order.
pub fn find_task_path(tasks: &IndexMap<String, Task>, name: &str) -> Option<TaskPath> {
    let mut found = None;
    walk_with_path(tasks, &mut |path, _| {
        if path.last().map(String::as_str) == Some(name) {
            found = Some(path.to_vec());
            false
        } else {
            true
        }
    });
    found
}

/// Resolve a [`TaskPath`] to a shared reference.
pub fn task_at_path<'a>(tasks: &'a IndexMap<String, Task>, path: &[String]) -> Option<&'a Task> {
    let (first, rest) = path.split_first()?;
    let task = tasks.get(first)?;
    if rest.is_empty() {
        Some(task)
    } else {
        task_at_path(&task.tasks, rest)
    }
}

/// Resolve a [`TaskPath`] to a mutable reference.
pub fn task_at_path_mut<'a>(
    tasks: &'a mut IndexMap<String, Task>,
    path: &[String],
) -> Option<&'a mut Task> {
    let (first, rest) = path.split_first()?;
    let task = tasks.get_mut(first)?;
    if rest.is_empty() {
        Some(task)
    } else {
        task_at_path_mut(&mut task.tasks, rest)
    }
}

/// Find the first task with the given name, depth-first in insertion order.
pub fn find_task_mut<'a>(
    tasks: &'a mut IndexMap<String, Task>,
    name: &str,
) -> Option<&'a mut Task> {
    let path = find_task_path(tasks, name)?;
    task_at_path_mut(tasks, &path)
}
