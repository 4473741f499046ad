//! Human-readable terminal output.

use std::fmt::Write as _;

use colored::{Color, Colorize};

use crate::core::classifier::ProbeKind;
use crate::core::models::{
    CacheSnapshot, CatalogSource, ModelCatalog, MonitorSnapshot, ProbeState, RefreshReport,
    StatusMap, StatusStats,
};

const MARKER: &str = "●";

fn paint(text: &str, color: Color, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.color(color).to_string()
    }
}

fn bold(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.bold().to_string()
    }
}

fn dim(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.dimmed().to_string()
    }
}

const fn state_color(state: ProbeState) -> Color {
    match state {
        ProbeState::Online => Color::Green,
        ProbeState::Offline => Color::Red,
        ProbeState::Error => Color::Yellow,
    }
}

/// `42s`, `3m 05s`, `2h 10m`.
#[must_use]
pub fn format_age(seconds: u64) -> String {
    match seconds {
        0..=59 => format!("{seconds}s"),
        60..=3599 => format!("{}m {:02}s", seconds / 60, seconds % 60),
        _ => format!("{}h {:02}m", seconds / 3600, (seconds % 3600) / 60),
    }
}

fn stats_line(stats: &StatusStats, no_color: bool) -> String {
    let ratio = format!("{}/{} online", stats.online, stats.total);
    let ratio = if stats.total > 0 && stats.online == stats.total {
        paint(&ratio, Color::Green, no_color)
    } else if stats.online == 0 {
        paint(&ratio, Color::Red, no_color)
    } else {
        paint(&ratio, Color::Yellow, no_color)
    };
    format!("{}  {ratio}  ({}% uptime)", bold("Models", no_color), stats.uptime)
}

fn cache_line(cache: &CacheSnapshot, no_color: bool) -> String {
    let mut line = format!(
        "{}   updated {} ago, next update {}",
        bold("Cache", no_color),
        format_age(cache.age_seconds),
        cache.next_update.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    if cache.is_stale {
        line.push(' ');
        line.push_str(&paint("[stale]", Color::Yellow, no_color));
    }
    line
}

fn status_table(statuses: &StatusMap, no_color: bool) -> String {
    if statuses.is_empty() {
        return dim("  No model statuses yet.", no_color);
    }

    let width = statuses.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (model, status) in statuses {
        let color = state_color(status.status);
        let detail = status
            .error
            .as_deref()
            .or(status.response.as_deref())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} {model:<width$}  {}  {}",
            paint(MARKER, color, no_color),
            paint(&format!("{:<7}", status.status.label()), color, no_color),
            dim(detail, no_color),
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Status table with stats and cache freshness.
#[must_use]
pub fn render_snapshot(snapshot: &MonitorSnapshot, no_color: bool) -> String {
    [
        stats_line(&snapshot.stats, no_color),
        cache_line(&snapshot.cache, no_color),
        String::new(),
        status_table(&snapshot.data, no_color),
    ]
    .join("\n")
}

#[must_use]
pub fn render_refresh(report: &RefreshReport, no_color: bool) -> String {
    let headline = if report.success {
        paint(&report.message, Color::Green, no_color)
    } else {
        paint(&report.message, Color::Red, no_color)
    };
    let stats = StatusStats::from_statuses(&report.statuses);
    [
        headline,
        dim(
            &format!(
                "{} models probed (catalog: {})",
                report.count,
                source_label(report.catalog_source)
            ),
            no_color,
        ),
        stats_line(&stats, no_color),
        String::new(),
        status_table(&report.statuses, no_color),
    ]
    .join("\n")
}

const fn source_label(source: CatalogSource) -> &'static str {
    match source {
        CatalogSource::Upstream => "upstream",
        CatalogSource::Fallback => "built-in fallback",
    }
}

#[must_use]
pub fn render_catalog(catalog: &ModelCatalog, no_color: bool) -> String {
    let mut out = format!(
        "{} {}",
        bold(&format!("{} models", catalog.len()), no_color),
        dim(&format!("({})", source_label(catalog.source())), no_color),
    );
    for model in catalog.iter() {
        let _ = write!(out, "\n  {model}");
    }
    out
}

#[must_use]
pub fn render_classification(rows: &[(String, ProbeKind)], no_color: bool) -> String {
    let width = rows.iter().map(|(model, _)| model.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(model, kind)| {
            let color = match kind {
                ProbeKind::Chat => Color::Cyan,
                ProbeKind::NonChat => Color::Magenta,
            };
            format!("{model:<width$}  {}", paint(kind.label(), color, no_color))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
