use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::analytics::CategoryRate;
use crate::config::Config;
use crate::dates::format_due;
use crate::task::Task;

const RATE_BAR_WIDTH: usize = 30;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[Task], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Due".to_string(),
            "Categories".to_string(),
            "Task".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = task
                .id
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string());
            let id = self.paint(&id, "33");

            let done = if task.completed { "x" } else { "" }.to_string();

            let due = format_due(task.due);
            let due = match task.due {
                Some(task_due) if task_due < today && !task.completed => self.paint(&due, "31"),
                _ => due,
            };

            let categories = task.categories.join(", ");
            let text = if task.completed {
                // Strikethrough, the terminal cousin of the struck list entry.
                self.paint(&task.text, "9")
            } else {
                task.text.clone()
            };

            rows.push(vec![id, done, due, categories, text]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, categories))]
    pub fn print_category_table(&mut self, categories: &[String]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec!["#".to_string(), "Category".to_string()];
        let rows = categories
            .iter()
            .enumerate()
            .map(|(idx, name)| vec![self.paint(&(idx + 1).to_string(), "33"), name.clone()])
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Overall completion rate plus a per-category table with a proportional
    /// bar — the text rendition of the original's bar chart.
    #[tracing::instrument(skip(self, overall, rates))]
    pub fn print_stats(&mut self, overall: f64, rates: &[CategoryRate]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "Overall completion rate: {overall:.2}%")?;

        if rates.is_empty() {
            return Ok(());
        }
        writeln!(out)?;

        let headers = vec![
            "Category".to_string(),
            "Rate".to_string(),
            "".to_string(),
        ];
        let rows = rates
            .iter()
            .map(|entry| {
                let filled = ((entry.rate / 100.0) * RATE_BAR_WIDTH as f64).round() as usize;
                let bar = self.paint(&"#".repeat(filled.min(RATE_BAR_WIDTH)), "36");
                vec![entry.name.clone(), format!("{:.2}%", entry.rate), bar]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Blocking yes/no prompt on stdin. Anything but `y`/`yes` declines.
    pub fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        let mut out = io::stdout().lock();
        write!(out, "{prompt} (yes/no) ")?;
        out.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
