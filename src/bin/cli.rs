use chrono::{NaiveDate, Weekday};
use polars::prelude::{AnyValue, DataFrame};
use schedule_engine::{
    DependencyType, MultiDayAllocationPlan, OverflowDecision, Project, Resource, Task, TaskUpdate,
    WorkCalendar, load_dependencies_from_csv, load_project_from_json, merge_consecutive_days, parse_date, report,
    save_fragments_to_csv, save_project_to_json,
};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::str::SplitWhitespace;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
            .collect::<Vec<_>>();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                     Show this help\n  show                                     Show tasks\n  add <id> <name> <duration_days> [start]  Upsert a task, optionally dated from start\n  delete <id>                              Delete a task and its links\n  link <task> <pred> [fs|ss|ff|sf] [lag]   Make <task> depend on <pred>\n  unlink <task> <pred>                     Remove a link\n  deps                                     List links\n  deps load <csv_path>                     Add links from a CSV file\n  cpm                                      Run the critical path calculation\n  validate <id> <YYYY-MM-DD>               Check a proposed start date\n  move <id> <YYYY-MM-DD>                   Move a task and cascade to dependents\n  audit [apply]                            List (or fix) tasks that start too early\n  rollup                                   Derive summary task dates from children\n  meta show                                Show project metadata\n  meta name <text...>                      Update project name\n  meta start <YYYY-MM-DD>                  Set the project start date\n  plan <minutes> <capacity> <rate> <start> [auto|overtime|ask]\n                                           Spread work over days for one resource\n  fragments [save <csv_path>]              Show (or export) the last plan as fragments\n  calendar show                            Show working days and holidays\n  calendar next <YYYY-MM-DD> [n]           Next (or n-th next) working day\n  calendar prev <YYYY-MM-DD>               Previous working day\n  calendar range <start> <end>             List working days in a range\n  calendar holiday <YYYY-MM-DD>            Add a holiday\n  calendar recurring <month> <day> <from_year> <to_year>\n                                           Add a holiday on the same date every year\n  calendar federal <from_year> <to_year>   Add US federal holidays\n  calendar workdays <mon,tue,...>          Set the working week\n  save <json_path>                         Persist project to disk\n  load <json_path>                         Load project from disk\n  quit|exit                                Exit"
    );
}

fn print_table(df: polars::prelude::PolarsResult<DataFrame>) {
    match df {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Report error: {}", e),
    }
}

fn print_updates(updates: &[TaskUpdate]) {
    if updates.is_empty() {
        println!("No updates.");
        return;
    }
    for update in updates {
        let marker = if update.changed { "*" } else { " " };
        println!(
            "{marker} task {:<4} {} .. {}  {}",
            update.id, update.start_date, update.end_date, update.reason
        );
    }
}

fn print_metadata(project: &Project) {
    let metadata = project.metadata();
    println!("Project name       : {}", metadata.project_name);
    println!("Project description: {}", metadata.project_description);
    match metadata.project_start_date {
        Some(date) => println!("Project start date : {}", date),
        None => println!("Project start date : (earliest task)"),
    }
}

fn parse_id(value: Option<&str>) -> Option<i32> {
    value.and_then(|v| v.parse::<i32>().ok())
}

fn parse_day(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| parse_date(v).ok())
}

fn parse_num<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.parse::<T>().ok())
}

fn run_calendar_command(project: &mut Project, mut parts: SplitWhitespace<'_>) {
    let mut calendar = project.calendar().clone();
    match parts.next() {
        Some("show") => {
            let config = calendar.to_config();
            let days: Vec<String> = config.working_days().iter().map(|d| d.to_string()).collect();
            println!("Working days: {}", days.join(","));
            let mut holidays = config.holidays().to_vec();
            holidays.sort();
            println!("Holidays    : {}", holidays.len());
            for date in holidays {
                println!("  {date}");
            }
        }
        Some("next") => {
            let Some(date) = parse_day(parts.next()) else {
                println!("Usage: calendar next <YYYY-MM-DD> [n]");
                return;
            };
            let found = match parse_num::<u32>(parts.next()) {
                Some(n) => calendar.find_next_available(date, i64::from(n)),
                None => calendar.next_available(date),
            };
            match found {
                Ok(next) => println!("Next working day: {next}"),
                Err(e) => println!("Calendar error: {}", e),
            }
        }
        Some("prev") => {
            let Some(date) = parse_day(parts.next()) else {
                println!("Usage: calendar prev <YYYY-MM-DD>");
                return;
            };
            match calendar.prev_available(date) {
                Ok(prev) => println!("Previous working day: {prev}"),
                Err(e) => println!("Calendar error: {}", e),
            }
        }
        Some("range") => {
            let (Some(start), Some(end)) = (parse_day(parts.next()), parse_day(parts.next())) else {
                println!("Usage: calendar range <start> <end>");
                return;
            };
            println!(
                "{} working day(s) from {start} to {end}",
                calendar.count_available_days(start, end)
            );
            for date in calendar.available_days_in_range(start, end) {
                println!("  {date}");
            }
        }
        Some("holiday") => {
            let Some(date) = parse_day(parts.next()) else {
                println!("Usage: calendar holiday <YYYY-MM-DD>");
                return;
            };
            calendar.add_holiday(date);
            project.set_calendar(calendar);
            println!("Added holiday {date}.");
        }
        Some("recurring") => {
            let month = parse_num::<u32>(parts.next());
            let day = parse_num::<u32>(parts.next());
            let from = parse_num::<i32>(parts.next());
            let to = parse_num::<i32>(parts.next());
            let (Some(month), Some(day), Some(from), Some(to)) = (month, day, from, to) else {
                println!("Usage: calendar recurring <month> <day> <from_year> <to_year>");
                return;
            };
            calendar.add_recurring_holiday(month, day, from, to);
            project.set_calendar(calendar);
            println!("Added {month:02}-{day:02} for {from}..{to}.");
        }
        Some("federal") => {
            let (Some(from), Some(to)) = (parse_num::<i32>(parts.next()), parse_num::<i32>(parts.next()))
            else {
                println!("Usage: calendar federal <from_year> <to_year>");
                return;
            };
            let federal = WorkCalendar::with_year_range(from, to).to_config();
            calendar.add_holidays(federal.holidays());
            project.set_calendar(calendar);
            println!("Added {} federal holiday(s).", federal.holidays().len());
        }
        Some("workdays") => {
            let parsed: Result<Vec<Weekday>, _> = parts
                .next()
                .unwrap_or("")
                .split(',')
                .filter(|day| !day.is_empty())
                .map(str::parse::<Weekday>)
                .collect();
            let Ok(days) = parsed else {
                println!("Usage: calendar workdays <mon,tue,...>");
                return;
            };
            match calendar.set_working_days(&days) {
                Ok(()) => {
                    project.set_calendar(calendar);
                    println!("Working week updated.");
                }
                Err(e) => println!("Calendar error: {}", e),
            }
        }
        _ => println!("Usage: calendar <show|next|prev|range|holiday|recurring|federal|workdays>"),
    }
}

/// Drive an allocation interactively, asking for each overflowing day.
fn plan_interactively(
    project: &Project,
    minutes: u32,
    resource: &Resource,
    start: NaiveDate,
    input: &mut impl BufRead,
) -> Result<MultiDayAllocationPlan, String> {
    let allocator = project.allocator();
    let existing: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    let mut session = allocator
        .session(minutes, resource, start, &existing)
        .start()
        .map_err(|e| e.to_string())?;
    while let Some(pending) = session.pending().cloned() {
        print!(
            "{}: {} min over capacity, accept {} min overtime at x{}? [y/N] ",
            pending.date, pending.overflow_minutes, pending.overtime_offer, pending.overtime_multiplier
        );
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if input.read_line(&mut answer).map_err(|e| e.to_string())? == 0 {
            return Err("input closed before the plan was finished".to_string());
        }
        let decision = if answer.trim().eq_ignore_ascii_case("y") {
            OverflowDecision::AcceptOvertime
        } else {
            OverflowDecision::PushToNextDay
        };
        session.decide(decision).map_err(|e| e.to_string())?;
    }
    session.finish().map_err(|e| e.to_string())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let mut project = Project::default();
    let mut last_plan: Option<MultiDayAllocationPlan> = None;

    println!("Schedule Engine (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let text = line.trim().to_string();
        if text.is_empty() {
            continue;
        }

        let mut parts = text.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => print_table(report::task_dataframe(project.tasks())),
            "add" => {
                let id = parse_id(parts.next());
                let name = parts.next();
                let duration = parts.next().and_then(|v| v.parse::<f64>().ok());
                let start = parts.next();
                let (Some(id), Some(name), Some(duration)) = (id, name, duration) else {
                    println!("Usage: add <id> <name> <duration_days> [start]");
                    continue;
                };
                let mut task = Task::new(id, name, duration);
                if let Some(start) = start {
                    match parse_date(start).and_then(|date| task.shifted_to(date)) {
                        Ok(shifted) => task = shifted,
                        Err(e) => {
                            println!("Error: {}", e);
                            continue;
                        }
                    }
                }
                match project.upsert_task(task) {
                    Ok(()) => {
                        println!("Task upserted.");
                        print_table(report::task_dataframe(project.tasks()));
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "delete" => match parse_id(parts.next()) {
                Some(id) if project.remove_task(id) => println!("Deleted task {id}."),
                Some(id) => println!("Task {id} not found."),
                None => println!("Usage: delete <id>"),
            },
            "link" => {
                let task_id = parse_id(parts.next());
                let pred_id = parse_id(parts.next());
                let (Some(task_id), Some(pred_id)) = (task_id, pred_id) else {
                    println!("Usage: link <task> <pred> [fs|ss|ff|sf] [lag]");
                    continue;
                };
                let dependency_type = match parts.next().map(str::parse::<DependencyType>) {
                    None => DependencyType::default(),
                    Some(Ok(kind)) => kind,
                    Some(Err(e)) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                let lag = match parts.next().map(str::parse::<i64>) {
                    None => None,
                    Some(Ok(lag)) => Some(lag),
                    Some(Err(_)) => {
                        println!("Invalid lag");
                        continue;
                    }
                };
                match project.link(task_id, pred_id, dependency_type, lag) {
                    Ok(dep) => println!(
                        "Linked {} -> {} ({}, lag {}).",
                        dep.predecessor_id, dep.task_id, dep.dependency_type, dep.lag_time
                    ),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "unlink" => match (parse_id(parts.next()), parse_id(parts.next())) {
                (Some(task_id), Some(pred_id)) => {
                    if project.unlink(task_id, pred_id) {
                        println!("Unlinked {pred_id} -> {task_id}.");
                    } else {
                        println!("No link {pred_id} -> {task_id}.");
                    }
                }
                _ => println!("Usage: unlink <task> <pred>"),
            },
            "deps" => match parts.next() {
                None => {
                    for dep in project.dependencies() {
                        println!(
                            "  {} -> {}  {} lag {}",
                            dep.predecessor_id, dep.task_id, dep.dependency_type, dep.lag_time
                        );
                    }
                }
                Some("load") => {
                    let Some(path) = parts.next() else {
                        println!("Usage: deps load <csv_path>");
                        continue;
                    };
                    match load_dependencies_from_csv(path) {
                        Ok(deps) => {
                            let mut linked = 0;
                            for dep in deps {
                                match project.link(
                                    dep.task_id,
                                    dep.predecessor_id,
                                    dep.dependency_type,
                                    Some(dep.lag_time),
                                ) {
                                    Ok(_) => linked += 1,
                                    Err(e) => println!("Skipped link: {}", e),
                                }
                            }
                            println!("Loaded {linked} link(s) from {path}.");
                        }
                        Err(e) => println!("Load error: {}", e),
                    }
                }
                Some(_) => println!("Usage: deps [load <csv_path>]"),
            },
            "cpm" => match project.refresh() {
                Ok(summary) => {
                    println!("Refreshed ({})", summary.to_cli_summary());
                    match project.critical_path() {
                        Ok(result) => print_table(report::cpm_dataframe(&result, project.tasks())),
                        Err(e) => println!("CPM error: {}", e),
                    }
                }
                Err(e) => println!("CPM error: {}", e),
            },
            "validate" => {
                let (Some(id), Some(date)) = (parse_id(parts.next()), parse_day(parts.next()))
                else {
                    println!("Usage: validate <id> <YYYY-MM-DD>");
                    continue;
                };
                match project.validate_move(id, date) {
                    Ok(result) if result.is_valid => println!("Task {id} may start on {date}."),
                    Ok(result) => println!(
                        "Invalid: {}",
                        result.message.unwrap_or_else(|| "blocked".to_string())
                    ),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "move" => {
                let (Some(id), Some(date)) = (parse_id(parts.next()), parse_day(parts.next()))
                else {
                    println!("Usage: move <id> <YYYY-MM-DD>");
                    continue;
                };
                match project.move_task(id, date) {
                    Ok(updates) => print_updates(&updates),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "audit" => match parts.next() {
                None => print_updates(&project.audit()),
                Some("apply") => {
                    let updates = project.apply_audit();
                    println!("Applied {} fix(es).", updates.len());
                    print_updates(&updates);
                }
                Some(_) => println!("Usage: audit [apply]"),
            },
            "rollup" => print_updates(&project.rollup_parents()),
            "meta" => match parts.next() {
                Some("show") => print_metadata(&project),
                Some("name") => {
                    let name = parts.collect::<Vec<_>>().join(" ");
                    if name.is_empty() {
                        println!("Usage: meta name <text...>");
                        continue;
                    }
                    let mut metadata = project.metadata().clone();
                    metadata.project_name = name;
                    project.set_metadata(metadata);
                    print_metadata(&project);
                }
                Some("start") => match parse_day(parts.next()) {
                    Some(date) => {
                        let mut metadata = project.metadata().clone();
                        metadata.project_start_date = Some(date);
                        project.set_metadata(metadata);
                        print_metadata(&project);
                    }
                    None => println!("Usage: meta start <YYYY-MM-DD>"),
                },
                _ => println!("Usage: meta <show|name|start> ..."),
            },
            "plan" => {
                let minutes = parts.next().and_then(|v| v.parse::<u32>().ok());
                let capacity = parts.next().and_then(|v| v.parse::<u32>().ok());
                let rate = parts.next().and_then(|v| v.parse::<f64>().ok());
                let start = parse_day(parts.next());
                let mode = parts.next().unwrap_or("auto");
                let (Some(minutes), Some(capacity), Some(rate), Some(start)) =
                    (minutes, capacity, rate, start)
                else {
                    println!(
                        "Usage: plan <minutes> <capacity> <rate> <start> [auto|overtime|ask]"
                    );
                    continue;
                };
                let resource = Resource::new("cli", capacity, rate);
                let outcome = match mode {
                    "auto" | "overtime" => project
                        .plan_allocation(minutes, &resource, start, &BTreeMap::new(), mode == "overtime")
                        .map_err(|e| e.to_string()),
                    "ask" => plan_interactively(&project, minutes, &resource, start, &mut input),
                    other => Err(format!("unknown plan mode '{other}'")),
                };
                match outcome {
                    Ok(plan) => {
                        print_table(report::day_plan_dataframe(&plan));
                        println!(
                            "Allocated {} of {} min, estimated cost {:.2}{}",
                            plan.allocated_minutes(),
                            plan.total_minutes,
                            plan.estimated_cost,
                            if plan.requires_user_decision {
                                " (overflow pushed to later days)"
                            } else {
                                ""
                            }
                        );
                        last_plan = Some(plan);
                    }
                    Err(e) => println!("Plan error: {}", e),
                }
            }
            "fragments" => {
                let Some(plan) = &last_plan else {
                    println!("No plan yet; run 'plan' first.");
                    continue;
                };
                let fragments = match merge_consecutive_days(&plan.days) {
                    Ok(fragments) => fragments,
                    Err(e) => {
                        println!("Merge error: {}", e);
                        continue;
                    }
                };
                match (parts.next(), parts.next()) {
                    (None, _) => print_table(report::fragment_dataframe(&fragments)),
                    (Some("save"), Some(path)) => match save_fragments_to_csv(&fragments, path) {
                        Ok(()) => println!("Fragments saved to {path}."),
                        Err(e) => println!("Save error: {}", e),
                    },
                    _ => println!("Usage: fragments [save <csv_path>]"),
                }
            }
            "calendar" => run_calendar_command(&mut project, parts),
            "save" => match parts.next() {
                Some(path) => match save_project_to_json(&project, path) {
                    Ok(()) => println!("Project saved to {path}."),
                    Err(e) => println!("Save error: {}", e),
                },
                None => println!("Usage: save <json_path>"),
            },
            "load" => match parts.next() {
                Some(path) => match load_project_from_json(path) {
                    Ok(loaded) => {
                        project = loaded;
                        println!("Project loaded from {path}.");
                    }
                    Err(e) => println!("Load error: {}", e),
                },
                None => println!("Usage: load <json_path>"),
            },
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
}
