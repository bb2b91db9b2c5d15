use tabled::{Style, Table, Tabled};

use sat_arena_runner::histogram::{Counts, Histogram};

#[derive(Tabled)]
struct SummaryLine {
    #[tabled(rename = "time limit")]
    time_limit: String,
    wins: usize,
    passes: usize,
    fails: usize,
    timeouts: usize,
    errors: usize,
    total: usize,
}

impl SummaryLine {
    fn new(time_limit: String, counts: &Counts) -> Self {
        Self {
            time_limit,
            wins: counts.wins,
            passes: counts.passes,
            fails: counts.fails,
            timeouts: counts.timeouts,
            errors: counts.errors,
            total: counts.total(),
        }
    }
}

/// Per-time-limit verdict counts followed by the totals.
pub fn render(histogram: &Histogram) -> String {
    let lines = histogram
        .by_time_limit
        .iter()
        .map(|(&time_limit, counts)| {
            let label = if time_limit == 0 {
                "none".to_string()
            } else {
                format!("{}s", time_limit)
            };
            SummaryLine::new(label, counts)
        })
        .chain(std::iter::once(SummaryLine::new("all".to_string(), &histogram.totals)));
    Table::new(lines).with(Style::modern()).to_string()
}
