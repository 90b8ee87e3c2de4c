use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::category::{Category, FALLBACK_PALETTE, UNCATEGORIZED_COLOR};
use crate::config::Config;
use crate::contrast::{contrast_color, parse_hex_color};
use crate::format::minutes_to_hours;
use crate::icon::IconKey;
use crate::profile::UserProfile;
use crate::schedule::{ScheduleRequest, ScheduleSuggestion};
use crate::task::Task;
use crate::view::{CategoryPill, DashboardView, Panel, TaskCard, TaskListView};

const BAR_WIDTH: usize = 30;

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

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_list(
        &self,
        pills: &[CategoryPill],
        view: &TaskListView,
    ) -> anyhow::Result<()> {
        self.write_task_list(io::stdout().lock(), pills, view)
    }

    pub fn write_task_list<W: Write>(
        &self,
        mut out: W,
        pills: &[CategoryPill],
        view: &TaskListView,
    ) -> anyhow::Result<()> {
        let pill_line = pills
            .iter()
            .map(|pill| self.pill(pill))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{pill_line}")?;
        writeln!(out, "Showing: {}", view.filter.status)?;
        writeln!(out)?;

        let cards = match &view.cards {
            Panel::Ready(cards) => cards,
            Panel::Empty(message) => {
                writeln!(out, "{message}")?;
                return Ok(());
            }
        };

        let headers = ["ID", "", "Title", "Category", "Est", "Actual", "Due", "Created"]
            .map(String::from)
            .to_vec();
        let rows = cards.iter().map(|card| self.card_row(card)).collect();
        write_table(&mut out, headers, rows)
    }

    fn card_row(&self, card: &TaskCard) -> Vec<String> {
        let mark = if card.completed { "[x]" } else { "[ ]" };
        let title = match card.recurrence {
            Some(pattern) => format!("{} ({pattern})", card.title),
            None => card.title.clone(),
        };
        let title = if card.completed {
            self.paint(&title, "9")
        } else {
            title
        };
        vec![
            self.paint(&card.short_id, "33"),
            mark.to_string(),
            title,
            self.badge(card.category_icon, &card.category_name, &card.category_color),
            minutes_cell(card.estimated_minutes),
            minutes_cell(card.actual_minutes),
            card.due.clone().unwrap_or_default(),
            card.created.clone(),
        ]
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_detail(&self, task: &Task, category: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        if let Some(description) = &task.description {
            writeln!(out, "description {description}")?;
        }
        writeln!(out, "category    {category}")?;
        writeln!(
            out,
            "status      {}",
            if task.completed { "completed" } else { "active" }
        )?;
        if let Some(minutes) = task.estimated_minutes {
            writeln!(out, "estimate    {minutes} min")?;
        }
        if let Some(minutes) = task.actual_minutes {
            writeln!(out, "actual      {minutes} min")?;
        }
        if let Some(due) = task.due {
            writeln!(out, "due         {}", due.to_rfc3339())?;
        }
        if let Some(reminder) = task.reminder {
            writeln!(out, "reminder    {}", reminder.to_rfc3339())?;
        }
        if let Some(pattern) = task.recurrence {
            writeln!(out, "recurs      {pattern}")?;
        }
        if let Some(completed_at) = task.completed_at {
            writeln!(out, "completed   {}", completed_at.to_rfc3339())?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_categories(&self, categories: &[Category]) -> anyhow::Result<()> {
        self.write_categories(io::stdout().lock(), categories)
    }

    pub fn write_categories<W: Write>(
        &self,
        mut out: W,
        categories: &[Category],
    ) -> anyhow::Result<()> {
        let headers = ["ID", "Category", "Color", "Icon", ""]
            .map(String::from)
            .to_vec();
        let rows = categories
            .iter()
            .map(|category| {
                let color = if category.has_color() {
                    category.color.as_str()
                } else {
                    UNCATEGORIZED_COLOR
                };
                vec![
                    self.paint(&category.short_id(), "33"),
                    self.badge(category.icon, &category.name, color),
                    category.color.clone(),
                    category.icon.to_string(),
                    if category.protected {
                        "default".to_string()
                    } else {
                        String::new()
                    },
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_dashboard(&self, view: &DashboardView) -> anyhow::Result<()> {
        self.write_dashboard(io::stdout().lock(), view)
    }

    pub fn write_dashboard<W: Write>(&self, mut out: W, view: &DashboardView) -> anyhow::Result<()> {
        let summary = &view.summary;
        writeln!(out, "{}", self.paint("Dashboard", "1"))?;
        writeln!(
            out,
            "Completion rate   {}  ({} of {} tasks, {} active)",
            view.completion_rate, summary.completed, summary.total, summary.active
        )?;
        writeln!(out, "Time tracked      {} h", view.actual_hours)?;
        writeln!(out, "Time estimated    {} h", view.estimated_hours)?;

        writeln!(out)?;
        writeln!(out, "{}", self.paint("Time per category", "1"))?;
        match &view.time_per_category {
            Panel::Ready(rows) => {
                let max = rows.iter().map(|row| row.minutes).max().unwrap_or(0);
                let label_width = rows
                    .iter()
                    .map(|row| UnicodeWidthStr::width(row.name.as_str()))
                    .max()
                    .unwrap_or(0);
                for row in rows {
                    let pad = label_width.saturating_sub(UnicodeWidthStr::width(row.name.as_str()));
                    writeln!(
                        out,
                        "  {}{} {} {} h",
                        row.name,
                        " ".repeat(pad),
                        self.bar(row.minutes, max, &row.color),
                        minutes_to_hours(row.minutes)
                    )?;
                }
            }
            Panel::Empty(message) => writeln!(out, "  {message}")?,
        }

        writeln!(out)?;
        writeln!(out, "{}", self.paint("Completed per day", "1"))?;
        match &view.trend {
            Panel::Ready(trend) => {
                let max = trend.max_count() as u64;
                for bucket in &trend.buckets {
                    writeln!(
                        out,
                        "  {:<6} {} {}",
                        bucket.label,
                        self.bar(bucket.count as u64, max, FALLBACK_PALETTE[0]),
                        bucket.count
                    )?;
                }
            }
            Panel::Empty(message) => writeln!(out, "  {message}")?,
        }

        writeln!(out)?;
        writeln!(out, "{}", self.paint("Estimated vs actual (min)", "1"))?;
        match &view.estimates {
            Panel::Ready(rows) => {
                let headers = ["Task", "Est", "Actual", "Diff"].map(String::from).to_vec();
                let rows = rows
                    .iter()
                    .map(|row| {
                        let diff = row.overrun();
                        let diff = if diff > 0 {
                            self.paint(&format!("+{diff}"), "31")
                        } else {
                            self.paint(&diff.to_string(), "32")
                        };
                        vec![
                            row.label.clone(),
                            row.estimated.to_string(),
                            row.actual.to_string(),
                            diff,
                        ]
                    })
                    .collect();
                write_table(&mut out, headers, rows)?;
            }
            Panel::Empty(message) => writeln!(out, "  {message}")?,
        }

        Ok(())
    }

    pub fn print_suggestion(&self, suggestion: &ScheduleSuggestion) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", self.paint("Suggested schedule", "1"))?;
        writeln!(out, "{}", suggestion.suggested_schedule)?;
        writeln!(out)?;
        writeln!(out, "{}", self.paint("Why", "1"))?;
        writeln!(out, "{}", suggestion.explanation)?;
        Ok(())
    }

    /// The request body and prompt, for handing to an external service.
    pub fn print_schedule_request(&self, request: &ScheduleRequest) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", serde_json::to_string_pretty(request)?)?;
        writeln!(out)?;
        write!(out, "{}", request.prompt())?;
        Ok(())
    }

    pub fn print_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "user     {}", profile.label())?;
        writeln!(out, "uid      {}", profile.uid)?;
        writeln!(out, "email    {}", profile.email.as_deref().unwrap_or("-"))?;
        writeln!(out, "avatar   {}", profile.avatar_url.as_deref().unwrap_or("-"))?;
        writeln!(out, "theme    {}", profile.theme)?;
        Ok(())
    }

    pub fn print_icons(&self) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for icon in IconKey::ALL {
            writeln!(out, "{} {}", icon.glyph(), icon.name())?;
        }
        Ok(())
    }

    pub fn print_contrast(&self, background: &str) -> anyhow::Result<()> {
        let foreground = contrast_color(background);
        let sample = self.swatch(&format!(" {foreground} "), background, foreground);
        println!("{foreground} {sample}");
        Ok(())
    }

    pub fn message(&self, text: &str) {
        println!("{text}");
    }

    fn pill(&self, pill: &CategoryPill) -> String {
        let text = format!("[{}]", pill.label);
        match (&pill.fill, &pill.accent) {
            (Some((background, foreground)), _) => self.swatch(&text, background, foreground),
            (None, Some(accent)) => self.fg(&text, accent),
            (None, None) if pill.selected => self.paint(&text, "7"),
            (None, None) => text,
        }
    }

    fn badge(&self, icon: IconKey, name: &str, color: &str) -> String {
        let text = format!(" {} {} ", icon.glyph(), name);
        self.swatch(&text, color, contrast_color(color))
    }

    fn bar(&self, value: u64, max: u64, color: &str) -> String {
        let len = if max == 0 {
            0
        } else {
            ((value as f64 / max as f64) * BAR_WIDTH as f64).round() as usize
        };
        let filled = "█".repeat(len.max(usize::from(value > 0)));
        self.fg(&filled, color)
    }

    fn swatch(&self, text: &str, background: &str, foreground: &str) -> String {
        match (parse_hex_color(background), parse_hex_color(foreground)) {
            (Some((br, bg, bb)), Some((fr, fg, fb))) => self.paint(
                text,
                &format!("48;2;{br};{bg};{bb};38;2;{fr};{fg};{fb}"),
            ),
            _ => text.to_string(),
        }
    }

    fn fg(&self, text: &str, color: &str) -> String {
        match parse_hex_color(color) {
            Some((r, g, b)) => self.paint(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn minutes_cell(minutes: Option<u32>) -> String {
    minutes.map(|m| format!("{m}m")).unwrap_or_default()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
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

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Renderer, strip_ansi, write_table};
    use crate::aggregate::{CATEGORY_TIME_EMPTY_MESSAGE, ESTIMATE_EMPTY_MESSAGE};
    use crate::category::Category;
    use crate::filter::{LIST_EMPTY_MESSAGE, TaskFilter};
    use crate::trend::TREND_EMPTY_MESSAGE;
    use crate::view::Snapshot;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn strips_truecolor_sequences() {
        assert_eq!(strip_ansi("\x1b[48;2;255;0;0;38;2;255;255;255mWork\x1b[0m"), "Work");
    }

    #[test]
    fn table_pads_by_display_width() {
        let text = render(|buf| {
            write_table(
                buf,
                vec!["A".to_string(), "B".to_string()],
                vec![vec!["📦 x".to_string(), "1".to_string()]],
            )
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[2], "📦 x 1 ");
    }

    #[test]
    fn empty_dashboard_prints_all_empty_states() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let view = Snapshot::default().dashboard(&now);
        let text = render(|buf| Renderer::plain().write_dashboard(buf, &view));
        assert!(text.contains("No tasks yet"));
        assert!(text.contains(CATEGORY_TIME_EMPTY_MESSAGE));
        assert!(text.contains(TREND_EMPTY_MESSAGE));
        assert!(text.contains(ESTIMATE_EMPTY_MESSAGE));
    }

    #[test]
    fn empty_list_prints_message_and_pills() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let snapshot = Snapshot::new(vec![Category::default_for("u1", now)], vec![]);
        let view = snapshot.task_list(TaskFilter::default(), &now);
        let pills = snapshot.category_pills(None);

        let text = render(|buf| Renderer::plain().write_task_list(buf, &pills, &view));
        assert!(text.starts_with("[All Tasks] [General]"));
        assert!(text.contains(LIST_EMPTY_MESSAGE));
    }
}
