use colored::{ColoredString, Colorize};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use routeboard_core::{
    GlobalPercentages, RoutePoint, TaskKind, TechnicianStat, Timeline, VisitRecord,
};

const LABEL_WIDTH: usize = 16;

pub fn print_summary_cards(heading: &str, global: &GlobalPercentages) {
    println!("\n  {}", heading.bold());
    println!(
        "  {}  {}  {}",
        card("Idle Time", global.idle_pct).red(),
        card("Travel Time", global.travel_pct).cyan(),
        card("Productive Time", global.service_pct).green()
    );
}

fn card(label: &str, pct: f64) -> String {
    format!("{label}: {pct:.1}%")
}

pub fn technician_table(stats: &[TechnicianStat]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Technician",
        "Days",
        "Idle",
        "Idle %",
        "Travel",
        "Travel %",
        "Optimizable",
        "Opt %",
    ]);

    for stat in stats {
        table.add_row(vec![
            Cell::new(&stat.technician),
            Cell::new(stat.days_worked).set_alignment(CellAlignment::Right),
            Cell::new(format_minutes(stat.idle_minutes)).set_alignment(CellAlignment::Right),
            Cell::new(format_pct(stat.idle_pct)).set_alignment(CellAlignment::Right),
            Cell::new(format_minutes(stat.travel_minutes)).set_alignment(CellAlignment::Right),
            Cell::new(format_pct(stat.travel_pct)).set_alignment(CellAlignment::Right),
            Cell::new(format_minutes(stat.optimizable_minutes()))
                .set_alignment(CellAlignment::Right),
            Cell::new(format_pct(stat.opt_pct)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

pub fn route_table(points: &[RoutePoint]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Technician",
        "Company",
        "Service",
        "Arrival",
        "Departure",
        "Lat",
        "Lon",
    ]);

    for point in points {
        table.add_row(vec![
            point.technician.clone(),
            point.company_name.clone().unwrap_or_default(),
            point.service_code.clone().unwrap_or_default(),
            format_time(point.arrival),
            format_time(point.departure),
            format!("{:.5}", point.latitude),
            format!("{:.5}", point.longitude),
        ]);
    }

    table
}

/// The fetched rows as they came from the source, nulls shown as `-`.
pub fn visit_table(visits: &[VisitRecord]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Technician",
        "Session",
        "Started Travel",
        "Arrival",
        "Departure",
        "Lat",
        "Lon",
        "Company",
        "Service",
    ]);

    for visit in visits {
        table.add_row(vec![
            text_or_dash(visit.technician.as_deref()),
            text_or_dash(visit.session_id.as_deref()),
            format_timestamp(visit.started_travel),
            format_timestamp(visit.arrival),
            format_timestamp(visit.departure),
            format_coord(visit.latitude),
            format_coord(visit.longitude),
            text_or_dash(visit.company_name.as_deref()),
            text_or_dash(visit.service_code.as_deref()),
        ]);
    }

    table
}

fn text_or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn format_timestamp(ts: Option<chrono::NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_coord(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.5}"))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_minutes(minutes: i64) -> String {
    format!("{minutes} min")
}

pub fn format_pct(pct: f64) -> String {
    format!("{pct:.1}%")
}

fn format_time(ts: Option<chrono::NaiveDateTime>) -> String {
    ts.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One slot per column: what occupies that slice of the timeline, if
/// anything. Later intervals paint over earlier ones.
pub fn lane_slots(timeline: &Timeline, lane: usize, width: usize) -> Vec<Option<TaskKind>> {
    let mut slots = vec![None; width];
    let Some(lane) = timeline.lanes.get(lane) else {
        return slots;
    };
    if width == 0 {
        return slots;
    }

    for interval in &lane.intervals {
        let from = (timeline.position(interval.start) * width as f64).floor() as usize;
        let to = (timeline.position(interval.end) * width as f64).ceil() as usize;
        for slot in slots.iter_mut().take(to.min(width)).skip(from.min(width)) {
            *slot = Some(interval.kind);
        }
    }
    slots
}

/// Hour ticks above the bars, e.g. `06    08    10`.
pub fn axis_line(timeline: &Timeline, width: usize) -> String {
    let mut axis = vec![' '; width];
    let mut tick = timeline.start;
    while tick <= timeline.end {
        let col = (timeline.position(tick) * width as f64).round() as usize;
        let label = tick.format("%H").to_string();
        if col + label.len() <= width && axis[col..col + label.len()].iter().all(|c| *c == ' ') {
            for (offset, ch) in label.chars().enumerate() {
                axis[col + offset] = ch;
            }
        }
        tick += chrono::Duration::hours(2);
    }
    axis.into_iter().collect()
}

fn paint(slot: Option<TaskKind>) -> ColoredString {
    match slot {
        Some(TaskKind::Travel) => "=".cyan(),
        Some(TaskKind::Service) => "#".green(),
        None => "·".bright_black(),
    }
}

pub fn print_timeline(timeline: &Timeline, width: usize) {
    println!(
        "{:LABEL_WIDTH$} {}",
        "",
        axis_line(timeline, width).bright_black()
    );
    for (index, lane) in timeline.lanes.iter().enumerate() {
        let bar: String = lane_slots(timeline, index, width)
            .into_iter()
            .map(|slot| paint(slot).to_string())
            .collect();
        println!("{:LABEL_WIDTH$} {}", truncate(&lane.technician, LABEL_WIDTH), bar);
    }
    println!(
        "{:LABEL_WIDTH$} {} travel  {} service",
        "",
        "=".cyan(),
        "#".green()
    );
}

fn truncate(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
