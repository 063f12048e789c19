// Result presentation: tables and listings printed once a run is finished

use crate::output::{paint, BLUE, GREEN, RED, RESET, YELLOW};

use repostates_service::{NoteSeverity, PipelineCommand, RepoReport, RepoState, RepoStatus};

const MARGIN: usize = 3;

/// Print the view that fits the command that was run
pub fn present(command: &PipelineCommand, reports: &[RepoReport]) {
    match command {
        PipelineCommand::GoneBranches => print_gone_branches(reports),
        PipelineCommand::MergeState => print_merge_state(reports),
        PipelineCommand::Shell { .. } => {
            print_shell_output(reports);
            print_summary(reports);
        }
        PipelineCommand::Status | PipelineCommand::Pull | PipelineCommand::Checkout { .. } => {
            print_summary(reports)
        }
    }
    print_notes(reports);
}

/// Dump the reports as pretty JSON on stdout
pub fn print_json(reports: &[RepoReport]) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(reports)?);
    Ok(())
}

fn status_color(status: RepoStatus) -> &'static str {
    match status {
        RepoStatus::Ok => GREEN,
        RepoStatus::Moderate => YELLOW,
        RepoStatus::Critical | RepoStatus::Failed => RED,
    }
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells.map(str::len).chain([header.len()]).max().unwrap_or(0) + MARGIN
}

fn divergence_cell(state: &RepoState) -> String {
    match state.divergence {
        Some(d) => format!("{}/{}", d.ahead, d.behind),
        None => "-".to_string(),
    }
}

fn notes_cell(state: &RepoState) -> String {
    let mut notes = Vec::new();
    if state.is_cancelled() {
        notes.push("cancelled".to_string());
    }
    if state.is_clean == Some(false) {
        notes.push("uncommitted changes".to_string());
    }
    if state.on_branch() && state.upstream.is_none() && state.divergence.is_none() {
        notes.push("no upstream".to_string());
    }
    if let Some(tag) = &state.latest_tag {
        if tag.head_is_tagged() {
            notes.push(format!("tag {}", tag.name));
        }
    }
    if let Some(branch) = &state.checked_out {
        notes.push(format!("checked out {}", branch));
    }
    if state.pulled == Some(true) {
        notes.push("pulled".to_string());
    }
    let errors = state.errors().count();
    if errors > 0 {
        notes.push(format!("{} error(s)", errors));
    }
    notes.join(", ")
}

/// Rows of the summary table, header first, without colors
pub fn summary_rows(reports: &[RepoReport]) -> Vec<(Option<RepoStatus>, String)> {
    let branches: Vec<String> = reports.iter().map(|r| r.state.head_label()).collect();
    let counts: Vec<String> = reports.iter().map(|r| divergence_cell(&r.state)).collect();

    let name_width = column_width(
        "REPOSITORY",
        reports.iter().map(|r| r.repository.name.as_str()),
    );
    let branch_width = column_width("BRANCH", branches.iter().map(String::as_str));
    let count_width = column_width("AHEAD/BEHIND", counts.iter().map(String::as_str));

    let mut rows = vec![(
        None,
        format!(
            "{:<name_width$}{:<branch_width$}{:<count_width$}NOTES",
            "REPOSITORY", "BRANCH", "AHEAD/BEHIND"
        ),
    )];
    for ((report, branch), count) in reports.iter().zip(&branches).zip(&counts) {
        let line = format!(
            "{:<name_width$}{:<branch_width$}{:<count_width$}{}",
            report.repository.name,
            branch,
            count,
            notes_cell(&report.state)
        );
        rows.push((Some(report.state.status()), line.trim_end().to_string()));
    }
    rows
}

pub fn print_summary(reports: &[RepoReport]) {
    println!();
    for (status, line) in summary_rows(reports) {
        match status {
            None => println!("\x1b[1m{}{}{}", BLUE, line, RESET),
            Some(status) => println!("{}", paint(status_color(status), &line)),
        }
    }
}

pub fn print_gone_branches(reports: &[RepoReport]) {
    println!("\n{}\n", paint(BLUE, "ALREADY GONE BRANCHES:"));
    for report in reports {
        println!("{}", paint(GREEN, &report.repository.name));
        for branch in report.state.gone_branches.iter().flatten() {
            println!("  {}", paint(RED, &format!("\u{21b3} {}", branch)));
        }
    }
}

fn merge_cell(state: &RepoState) -> String {
    match (state.merge, state.default_branch.as_deref()) {
        (Some(m), Some(default)) if m.behind > 0 => {
            format!("merge needed, {} behind {}", m.behind, default)
        }
        (Some(_), Some(default)) => format!("up to date with {}", default),
        (None, Some(default)) if state.branch() == Some(default) => "on default branch".to_string(),
        _ => "-".to_string(),
    }
}

/// Rows of the merge-state table, header first, without colors
pub fn merge_rows(reports: &[RepoReport]) -> Vec<(bool, String)> {
    let branches: Vec<String> = reports.iter().map(|r| r.state.head_label()).collect();
    let name_width = column_width(
        "REPOSITORY",
        reports.iter().map(|r| r.repository.name.as_str()),
    );
    let branch_width = column_width("BRANCH", branches.iter().map(String::as_str));

    let mut rows = vec![(
        false,
        format!("{:<name_width$}{:<branch_width$}MERGE", "REPOSITORY", "BRANCH"),
    )];
    for (report, branch) in reports.iter().zip(&branches) {
        let line = format!(
            "{:<name_width$}{:<branch_width$}{}",
            report.repository.name,
            branch,
            merge_cell(&report.state)
        );
        rows.push((report.state.needs_merge() == Some(true), line));
    }
    rows
}

pub fn print_merge_state(reports: &[RepoReport]) {
    println!();
    for (index, (needs_merge, line)) in merge_rows(reports).into_iter().enumerate() {
        let color = match (index, needs_merge) {
            (0, _) => BLUE,
            (_, true) => RED,
            (_, false) => GREEN,
        };
        println!("{}", paint(color, &line));
    }
}

pub fn print_shell_output(reports: &[RepoReport]) {
    for report in reports {
        let Some(output) = &report.state.output else {
            continue;
        };
        let color = if output.exit_code == Some(0) { GREEN } else { RED };
        println!("\n{}", paint(color, &report.repository.name));
        for line in output.stdout.lines() {
            println!("  {}", line);
        }
        for line in output.stderr.lines() {
            println!("  {}", paint(RED, line));
        }
    }
}

/// One line per recorded warning or error, in repository order
pub fn note_lines(reports: &[RepoReport]) -> Vec<(NoteSeverity, String)> {
    reports
        .iter()
        .flat_map(|report| {
            report.state.notes.iter().map(move |note| {
                (
                    note.severity,
                    format!(
                        "{} [{}]: {}",
                        report.repository.name, note.step, note.message
                    ),
                )
            })
        })
        .collect()
}

/// Print every warning and error recorded by the steps, on stdout next to
/// the table they belong to
pub fn print_notes(reports: &[RepoReport]) {
    let lines = note_lines(reports);
    if lines.is_empty() {
        return;
    }

    println!();
    for (severity, line) in lines {
        match severity {
            NoteSeverity::Warning => println!("{} {}", paint(YELLOW, "  !"), line),
            NoteSeverity::Error => println!("{} {}", paint(RED, "  \u{2717}"), line),
        }
    }
}
