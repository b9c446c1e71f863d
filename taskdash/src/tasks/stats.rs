//! Summary counts for the dashboard header.

use std::fmt;

use taskdash_proto::{Task, User};

/// Task and user totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskStats {
    /// All tasks.
    pub total: usize,
    /// Tasks marked completed.
    pub completed: usize,
    /// Tasks not yet completed.
    pub pending: usize,
    /// Completed share of all tasks, in percent (0 when there are none).
    pub completion_rate: f64,
    /// Known users.
    pub users: usize,
    /// Average tasks per user (0 when there are no users).
    pub tasks_per_user: f64,
}

impl TaskStats {
    /// Computes totals over `tasks` and `users`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(tasks: &[Task], users: &[User]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        let tasks_per_user = if users.is_empty() {
            0.0
        } else {
            total as f64 / users.len() as f64
        };
        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate,
            users: users.len(),
            tasks_per_user,
        }
    }
}

impl fmt::Display for TaskStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total tasks:  {} ({:.1}% completion rate)",
            self.total, self.completion_rate
        )?;
        writeln!(f, "Completed:    {}", self.completed)?;
        writeln!(f, "Pending:      {}", self.pending)?;
        write!(
            f,
            "Users:        {} ({:.1} tasks per user)",
            self.users, self.tasks_per_user
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collections_have_zero_rates() {
        let stats = TaskStats::compute(&[], &[]);
        assert_eq!(stats.total, 0);
        assert!(stats.completion_rate.abs() < f64::EPSILON);
        assert!(stats.tasks_per_user.abs() < f64::EPSILON);
    }

    #[test]
    fn counts_and_rates() {
        let tasks = vec![
            Task::new(1, 1, "A", true),
            Task::new(2, 1, "B", false),
            Task::new(3, 2, "C", false),
            Task::new(4, 2, "D", false),
        ];
        let users = vec![User::new(1, "Ann", "a@x.io"), User::new(2, "Bo", "b@x.io")];
        let stats = TaskStats::compute(&tasks, &users);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 3);
        assert!((stats.completion_rate - 25.0).abs() < 1e-9);
        assert!((stats.tasks_per_user - 2.0).abs() < 1e-9);
        assert!(stats.to_string().contains("25.0% completion rate"));
    }
}
