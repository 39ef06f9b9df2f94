//! Progress parsing for backend output lines.
//!
//! The backend prints two markers:
//!
//! - `--- タスク X/Y を処理中 ---` when task X starts, so X-1 are done;
//! - `[進捗: X/Y | ...]` when task X finishes.

use std::sync::LazyLock;

use regex::Regex;

static TASK_STARTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--- タスク (\d+)/(\d+) を処理中 ---").expect("valid regex"));

static TASK_FINISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[進捗: (\d+)/(\d+)").expect("valid regex"));

/// A progress point parsed from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

/// Every progress marker in `line`, start marker first.
pub fn parse_progress(line: &str) -> Vec<ProgressUpdate> {
    let mut updates = Vec::new();

    if let Some((current, total)) = capture_pair(&TASK_STARTED_RE, line) {
        updates.push(ProgressUpdate {
            processed: current.saturating_sub(1),
            total,
            message: format!("Processing task {current}/{total}"),
        });
    }
    if let Some((current, total)) = capture_pair(&TASK_FINISHED_RE, line) {
        updates.push(ProgressUpdate {
            processed: current,
            total,
            message: format!("Completed task {current}/{total}"),
        });
    }

    updates
}

fn capture_pair(re: &Regex, line: &str) -> Option<(usize, usize)> {
    let caps = re.captures(line)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((current, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_marker_counts_previous_tasks() {
        let updates = parse_progress("--- タスク 3/10 を処理中 ---");
        assert_eq!(
            updates,
            vec![ProgressUpdate {
                processed: 2,
                total: 10,
                message: "Processing task 3/10".into(),
            }]
        );
    }

    #[test]
    fn finish_marker_counts_current_task() {
        let updates = parse_progress("[進捗: 4/10 | 経過: 00:12 | 予想残り時間: 00:18]");
        assert_eq!(updates.len(), 1);
        assert_eq!((updates[0].processed, updates[0].total), (4, 10));
    }

    #[test]
    fn first_task_start_is_zero_processed() {
        assert_eq!(parse_progress("--- タスク 1/2 を処理中 ---")[0].processed, 0);
    }

    #[test]
    fn unrelated_lines_yield_nothing() {
        assert!(parse_progress("Loading model...").is_empty());
        assert!(parse_progress("[進捗: x/y").is_empty());
    }

    #[test]
    fn overflowing_numbers_are_ignored() {
        assert!(parse_progress("[進捗: 99999999999999999999999/1").is_empty());
    }
}
