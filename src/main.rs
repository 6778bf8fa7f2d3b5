use anyhow::{Context, Result};
use chrono::Utc;
use provision::cli::commands::{ApplyCommand, HistoryCommand, PlanCommand, ValidateCommand};
use provision::cli::output::*;
use provision::cli::printer::StreamPrinter;
use provision::cli::{Cli, Command};
use provision::core::step::render_template;
use provision::journal::create_summary;
use provision::system::OutputCallback;
use provision::{
    InMemoryJournal, Journal, JsonJournal, Plan, PlanConfig, RunEngine, RunEvent, RunStatus,
    RunSummary, ShellRunner,
};
use std::sync::Arc;
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Apply(cmd) => apply_plan(cmd, cli.clone()).await?,
        Command::Validate(cmd) => validate_plan(cmd)?,
        Command::Plan(cmd) => preview_plan(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

fn load_plan(file: &str, overrides: &[(String, String)]) -> Result<Plan> {
    let config = PlanConfig::from_file(file).context("Failed to load plan config")?;
    let mut plan = config.to_plan()?;

    for (key, value) in overrides {
        plan.variables.insert(key.clone(), value.clone());
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    Ok(plan)
}

async fn apply_plan(cmd: &ApplyCommand, cli: Cli) -> Result<()> {
    let mut plan = load_plan(&cmd.file, &cmd.variable)?;

    println!("{} Loaded plan: {}", INFO, style(&plan.name).bold());

    let journal: Arc<dyn Journal> = if cmd.no_history {
        Arc::new(InMemoryJournal::new())
    } else {
        Arc::new(JsonJournal::with_default_path().await?)
    };

    warn_on_reapply(journal.as_ref(), &plan).await?;

    let runner = Arc::new(ShellRunner::new());
    let engine = RunEngine::new(runner);

    // With --stream the raw subprocess lines take over the terminal, so the
    // progress bar is only shown in the default mode.
    let progress = if cli.stream {
        None
    } else {
        Some(create_progress_bar(plan.steps.len()))
    };

    let printer = Arc::new(StreamPrinter::new());

    match progress.clone() {
        Some(pb) => engine.add_event_handler(Arc::new(move |event| {
            match &event {
                RunEvent::StepStarted { step_id, .. } => pb.set_message(step_id.clone()),
                RunEvent::StepCompleted { .. }
                | RunEvent::StepFailed { .. }
                | RunEvent::StepSkipped { .. } => pb.inc(1),
                _ => {}
            }
            pb.println(format_run_event(&event));
        })),
        None => {
            // Streaming mode: separate each step's raw output with a header
            let header_printer = printer.clone();
            engine.add_event_handler(Arc::new(move |event| match &event {
                RunEvent::StepStarted {
                    step_id,
                    index,
                    total,
                } => {
                    header_printer.print_separator();
                    header_printer.print_step_header(index + 1, *total, step_id);
                }
                _ => println!("{}", format_run_event(&event)),
            }));
        }
    }

    let callback: Option<&dyn OutputCallback> = if cli.stream {
        Some(printer.as_ref())
    } else {
        None
    };

    println!();
    let result = engine.execute(&mut plan, callback).await;

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    if !cmd.no_history {
        let summary = create_summary(&plan);
        journal.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    if result.is_ok() {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&plan.name).bold(),
            style("successfully").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&plan.name).bold(),
            style("failed").red()
        );
        error!("{}", result.unwrap_err());
        std::process::exit(1);
    }

    Ok(())
}

/// Warn when re-applying non-idempotent steps to an already-provisioned host
async fn warn_on_reapply(journal: &dyn Journal, plan: &Plan) -> Result<()> {
    let previous = journal.list_runs(&plan.name).await?;
    let already_provisioned = previous.iter().any(|r| r.status == RunStatus::Completed);

    if !already_provisioned {
        return Ok(());
    }

    for step in plan.non_idempotent_steps() {
        warn!(
            "Plan '{}' completed before on this host; step '{}' ({}) is not safe to re-apply",
            plan.name,
            step.id,
            step.action.kind()
        );
        println!(
            "{} {} is not idempotent and this plan has already completed here",
            WARN,
            style(&step.id).yellow()
        );
    }

    Ok(())
}

fn validate_plan(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating plan...", INFO);

    let result = PlanConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Plan configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Variables: {}", style(config.variables.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn preview_plan(cmd: &PlanCommand) -> Result<()> {
    let plan = load_plan(&cmd.file, &cmd.variable)?;

    println!("{} Plan: {}", INFO, style(&plan.name).bold());

    for (index, step) in plan.steps.iter().enumerate() {
        let context = plan.context_for_step(&step.id);
        let action = step
            .action
            .render(&context.rendering_variables())
            .with_context(|| format!("Failed to render step '{}'", step.id))?;

        println!(
            "\n[{}/{}] {} ({})",
            index + 1,
            plan.steps.len(),
            style(&step.name).bold(),
            style(action.kind()).dim()
        );
        for line in provision::stages::describe(&action) {
            println!("    {}", line);
        }
        if !step.idempotent {
            println!("    {}", style("not idempotent").yellow());
        }
    }

    if !plan.cleanup.is_empty() {
        println!("\n{} Cleanup on failure:", BROOM);
        for cleanup in &plan.cleanup {
            let mut parts = vec![render_template(&cleanup.command, &plan.variables)?];
            for arg in &cleanup.args {
                parts.push(render_template(arg, &plan.variables)?);
            }
            println!("    {}", parts.join(" "));
        }
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let journal = JsonJournal::with_default_path().await?;

    // A specific run was requested
    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        match journal.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.verbose)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = if let Some(plan_name) = &cmd.plan {
        journal.list_runs(plan_name).await?
    } else {
        let plans = journal.list_plans().await?;
        let mut all_runs = Vec::new();
        for plan in &plans {
            all_runs.extend(journal.list_runs(plan).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs
    };
    let runs: Vec<RunSummary> = runs.into_iter().take(cmd.limit).collect();

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Plan: {}", style(&summary.plan_name).bold());
    println!("  Status: {}", format_status(summary.status));
    if let Some(started) = summary.started_at {
        println!("  Started: {}", style(started.to_rfc3339()).dim());
    }
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        let started = summary.started_at.unwrap_or_else(Utc::now);
        if let Ok(duration) = completed.signed_duration_since(started).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Progress: {} ({}/{})",
        style(format!("{:.0}%", summary.progress() * 100.0)).cyan(),
        summary.completed_steps,
        summary.total_steps
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
