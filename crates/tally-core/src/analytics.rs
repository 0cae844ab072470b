//! Completion-rate aggregation over the current task list.
//!
//! Pure derivations with no hidden state; callers feed the results to a
//! renderer after every mutation.

use crate::task::Task;

/// Completion rate for one category, produced in category-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRate {
    pub name: String,
    pub rate: f64,
}

/// Percentage of completed tasks among those tagged with each category,
/// rounded to two decimals. A category no task references rates 0.
pub fn category_rates(tasks: &[Task], categories: &[String]) -> Vec<CategoryRate> {
    categories
        .iter()
        .map(|name| {
            let mut total = 0usize;
            let mut completed = 0usize;
            for task in tasks.iter().filter(|task| task.in_category(name)) {
                total += 1;
                if task.completed {
                    completed += 1;
                }
            }

            let rate = if total == 0 {
                0.0
            } else {
                round2(100.0 * completed as f64 / total as f64)
            };
            CategoryRate { name: name.clone(), rate }
        })
        .collect()
}

/// Percentage of completed tasks overall, rounded to two decimals; 0 when
/// there are no tasks.
pub fn overall_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    round2(100.0 * completed as f64 / tasks.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{category_rates, overall_rate};
    use crate::task::Task;

    fn task(completed: bool, categories: &[&str], id: u64) -> Task {
        let mut task = Task::new(
            format!("task {id}"),
            None,
            categories.iter().map(|c| c.to_string()).collect(),
            id,
        );
        task.completed = completed;
        task
    }

    #[test]
    fn overall_rate_of_empty_list_is_zero() {
        assert_eq!(overall_rate(&[]), 0.0);
    }

    #[test]
    fn overall_rate_rounds_to_two_decimals() {
        let tasks = vec![task(true, &[], 1), task(false, &[], 2)];
        assert_eq!(overall_rate(&tasks), 50.0);

        let tasks = vec![task(true, &[], 1), task(false, &[], 2), task(false, &[], 3)];
        assert_eq!(overall_rate(&tasks), 33.33);
    }

    #[test]
    fn category_with_no_tasks_rates_zero() {
        let categories = vec!["idle".to_string()];
        let rates = category_rates(&[task(true, &["busy"], 1)], &categories);

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].name, "idle");
        assert_eq!(rates[0].rate, 0.0);
    }

    #[test]
    fn category_rates_follow_category_list_order() {
        let categories = vec!["home".to_string(), "work".to_string()];
        let tasks = vec![
            task(true, &["home"], 1),
            task(false, &["home", "work"], 2),
            task(false, &["home"], 3),
            task(true, &["work"], 4),
        ];

        let rates = category_rates(&tasks, &categories);
        let names: Vec<&str> = rates.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["home", "work"]);
        assert_eq!(rates[0].rate, 33.33);
        assert_eq!(rates[1].rate, 50.0);
    }
}
