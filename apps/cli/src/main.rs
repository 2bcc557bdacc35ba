#![deny(warnings)]

//! Headless viewer for clinic simulation results.

use anyhow::{bail, Context, Result};
use record_source::{HttpSource, JsonDirSource};
use report_analytics::AnalyticsReport;
use report_core::{parse_selection, FilterOptions, Granularity, SimulationState, TimeFilter};
use report_pipeline::{DetailView, Table};
use report_runtime::{
    DetailDriver, RecordSource, RefreshOutcome, ReportConfig, SummaryDriver, ViewState,
};
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: report-cli --source <dir|url> [--view daily|weekly|monthly|patient] \
[--month N|all] [--week N|all] [--day N|all] [--page N] [--summary] [--json] \
[--config file.yaml] [--watch]";

#[derive(Debug)]
struct Args {
    source: String,
    view: Granularity,
    filter: TimeFilter,
    page: u32,
    summary: bool,
    json: bool,
    config: Option<String>,
    watch: bool,
}

fn next_value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next().with_context(|| format!("{flag} needs a value"))
}

fn parse_args() -> Result<Args> {
    let mut source = None;
    let mut view = Granularity::Daily;
    let mut filter = TimeFilter::all();
    let mut page = 1;
    let mut summary = false;
    let mut json = false;
    let mut config = None;
    let mut watch = false;
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--source" => source = Some(next_value(&mut it, "--source")?),
            "--view" => view = next_value(&mut it, "--view")?.parse()?,
            "--month" => filter.month = parse_selection("month", &next_value(&mut it, "--month")?)?,
            "--week" => filter.week = parse_selection("week", &next_value(&mut it, "--week")?)?,
            "--day" => filter.day = parse_selection("day", &next_value(&mut it, "--day")?)?,
            "--page" => {
                page = parse_selection("page", &next_value(&mut it, "--page")?)?.unwrap_or(1)
            }
            "--summary" => summary = true,
            "--json" => json = true,
            "--config" => config = Some(next_value(&mut it, "--config")?),
            "--watch" => watch = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("report-cli {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    let Some(source) = source else {
        bail!("--source is required\n{USAGE}");
    };
    Ok(Args {
        source,
        view,
        filter,
        page,
        summary,
        json,
        config,
        watch,
    })
}

fn open_source(spec: &str, timeout: Duration) -> Result<Box<dyn RecordSource>> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        let source = HttpSource::new(spec, timeout).context("creating HTTP client")?;
        Ok(Box::new(source))
    } else {
        Ok(Box::new(JsonDirSource::new(spec)))
    }
}

fn pad_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(c, w)| format!("{c:>w$}"))
        .collect::<Vec<_>>()
        .join("  ")
}

fn render_table(table: &Table) -> String {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.len()).collect();
    for row in table.rows.iter().chain(table.totals.iter()) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let mut out = pad_row(table.headers.iter().copied(), &widths);
    out.push('\n');
    for row in table.rows.iter().chain(table.totals.iter()) {
        out.push_str(&pad_row(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn join_range(values: &[u32]) -> String {
    match (values.first(), values.last()) {
        (Some(a), Some(b)) if a != b => format!("{a}-{b}"),
        (Some(a), _) => a.to_string(),
        _ => "none".to_string(),
    }
}

fn render_detail(view: &DetailView, options: &FilterOptions) -> String {
    let mut out = format!(
        "== {} | month {} | week {} | day {} ==\n",
        view.granularity,
        opt_label(view.filter.month),
        opt_label(view.filter.week),
        opt_label(view.filter.day),
    );
    out.push_str(&format!(
        "choices: months {} | weeks {} | days {}\n",
        join_range(&options.months),
        join_range(&options.weeks),
        join_range(&options.days),
    ));
    if view.is_empty() {
        out.push_str("No records for the current selection.\n");
    } else {
        out.push_str(&render_table(&view.table()));
    }
    out.push_str(&format!(
        "Page {} of {} ({} rows)\n",
        view.window.page,
        view.window.display_pages(),
        view.window.total_items
    ));
    out
}

fn opt_label(v: Option<u32>) -> String {
    v.map_or_else(|| "all".to_string(), |v| v.to_string())
}

fn money(v: Decimal) -> String {
    format!("{:.2}", v.round_dp(2))
}

fn render_summary(report: &AnalyticsReport) -> String {
    let a = &report.assessment;
    let mut out = format!(
        "== summary ({:?}) ==\nStatus: {}\nAverage annual return: {}% over {} years\n",
        report.kind,
        a.status,
        money(a.annual_return.avg_annual_return_pct),
        money(a.annual_return.years_elapsed),
    );
    out.push_str("Findings:\n");
    for f in &a.findings {
        out.push_str(&format!("  - {f}\n"));
    }
    out.push_str("Recommendations:\n");
    for r in &a.recommendations {
        out.push_str(&format!("  - {r}\n"));
    }

    let curves = &report.curves;
    let flows = &report.inflow_vs_cost;
    let table = Table {
        headers: vec!["Period", "Investment", "Revenue", "Cash inflow", "Costs"],
        rows: (0..curves.labels.len())
            .map(|i| {
                vec![
                    curves.labels[i].clone(),
                    money(curves.investment[i]),
                    money(curves.revenue[i]),
                    money(flows.inflow[i]),
                    money(flows.costs[i]),
                ]
            })
            .collect(),
        totals: None,
    };
    out.push_str(&render_table(&table));

    let src = &report.source_cash_flow;
    let table = Table {
        headers: vec!["Period", "Old store", "New store"],
        rows: (0..src.labels.len())
            .map(|i| {
                vec![
                    src.labels[i].clone(),
                    money(src.old_store[i]),
                    money(src.new_store[i]),
                ]
            })
            .collect(),
        totals: None,
    };
    out.push_str(&render_table(&table));
    out
}

fn print_detail(driver: &DetailDriver, state: &SimulationState, json: bool) -> Result<()> {
    let Some(view) = driver.view() else {
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&view.table())?);
    } else {
        let options = FilterOptions::for_view(view.granularity, state);
        print!("{}", render_detail(view, &options));
    }
    Ok(())
}

fn print_summary(driver: &SummaryDriver, json: bool) -> Result<()> {
    let Some(report) = driver.report() else {
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_summary(report));
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => ReportConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => ReportConfig::default(),
    };
    info!(source = %args.source, view = %args.view, watch = args.watch, "starting report viewer");

    let source = open_source(&args.source, Duration::from_secs(10))?;
    let state = ViewState::new(args.view)
        .with_page_size(config.page_size)
        .with_filter(args.filter)
        .with_page(args.page);
    let mut detail = DetailDriver::new(state);
    let mut summary = SummaryDriver::new(config.initial_investment);

    let mut sim_state = source.fetch_state().unwrap_or_else(|e| {
        warn!(error = %e, "simulation state unavailable");
        SimulationState::default()
    });
    if detail.refresh(&source) == RefreshOutcome::FetchFailed && !args.watch {
        bail!("{}", detail.last_error().unwrap_or("fetch failed"));
    }
    print_detail(&detail, &sim_state, args.json)?;
    if args.summary {
        if summary.refresh(&source) == RefreshOutcome::FetchFailed && !args.watch {
            bail!("{}", summary.last_error().unwrap_or("fetch failed"));
        }
        print_summary(&summary, args.json)?;
    }
    if !args.watch {
        return Ok(());
    }

    let mut last_summary = Instant::now();
    loop {
        std::thread::sleep(config.detail_poll());
        if let Ok(s) = source.fetch_state() {
            sim_state = s;
        }
        if detail.refresh(&source) == RefreshOutcome::Applied {
            print_detail(&detail, &sim_state, args.json)?;
        }
        if args.summary && last_summary.elapsed() >= config.summary_poll() {
            last_summary = Instant::now();
            if summary.refresh(&source) == RefreshOutcome::Applied {
                print_summary(&summary, args.json)?;
            }
        }
    }
}
