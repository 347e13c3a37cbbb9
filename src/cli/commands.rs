use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::db::DbConnection;
use crate::models::{standard_template, Pipeline, PipelineStatus, PlanRequest, Stage};
use crate::plan::{compute, requirements};
use crate::repo::{PipelineRepo, PlanRepo, StageRepo};
use crate::cli::error::{
    user_error, validate_conversion_rate, validate_non_empty, validate_stage_order,
    validate_tat_days, validate_target_count,
};
use crate::cli::output::{
    format_pipeline_list_table, format_plan_table, format_requirements_table,
    format_saved_plans_table, format_stage_table,
};
use crate::utils::parse_date_expr;
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "pipeplan")]
#[command(about = "Pipeline Planner - a command-line recruiting funnel planning tool")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline management commands
    Pipeline {
        #[command(subcommand)]
        subcommand: PipelineCommands,
    },
    /// Stage management commands
    Stage {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Compute a reverse pipeline plan (back-solve candidate counts from a hiring target)
    Plan {
        /// Pipeline name
        pipeline: String,
        /// Target headcount at the terminal stage
        #[arg(long)]
        target: i64,
        /// Target date for backward scheduling (YYYY-MM-DD, today, tomorrow, +Nd)
        #[arg(long = "by")]
        by: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Persist the computed plan
        #[arg(long)]
        save: bool,
    },
    /// Compute forward stage requirements with a safety buffer
    Requirements {
        /// Pipeline name
        pipeline: String,
        /// Target headcount at the terminal stage
        #[arg(long)]
        target: i64,
        /// Target date for milestone scheduling (YYYY-MM-DD, today, tomorrow, +Nd)
        #[arg(long = "by")]
        by: Option<String>,
        /// Safety buffer percentage applied to the target
        #[arg(long, default_value_t = 20.0)]
        buffer: f64,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Saved plan history commands
    Plans {
        #[command(subcommand)]
        subcommand: PlansCommands,
    },
}

#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create a new pipeline
    Add {
        /// Pipeline name
        name: String,
        /// Client this pipeline hires for
        #[arg(long)]
        client: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Stage template to seed: standard (the house funnel) or empty
        #[arg(long, default_value = "standard")]
        template: String,
    },
    /// List pipelines
    List {
        /// Include inactive pipelines
        #[arg(long)]
        all: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show a pipeline and its stages
    Show {
        /// Pipeline name
        name: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Rename a pipeline
    Rename {
        /// Current pipeline name
        old_name: String,
        /// New pipeline name
        new_name: String,
    },
    /// Mark a pipeline active
    Activate {
        /// Pipeline name
        name: String,
    },
    /// Mark a pipeline inactive (hidden from default listings)
    Deactivate {
        /// Pipeline name
        name: String,
    },
    /// Delete a pipeline (soft delete; saved plans are retained)
    Delete {
        /// Pipeline name
        name: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// Add a stage to a pipeline
    Add {
        /// Pipeline name
        pipeline: String,
        /// Stage name
        name: String,
        /// Sequence position (required for chain stages)
        #[arg(long)]
        order: Option<i64>,
        /// Conversion rate percentage in (0, 100] (required for chain stages)
        #[arg(long)]
        rate: Option<f64>,
        /// Turnaround time in calendar days (required for chain stages)
        #[arg(long)]
        tat: Option<i64>,
        /// Candidate-tracking status label this stage maps to
        #[arg(long)]
        status: Option<String>,
        /// Special stage (funnel exit/hold, excluded from plan arithmetic)
        #[arg(long)]
        special: bool,
    },
    /// Update a stage's configuration
    Update {
        /// Pipeline name
        pipeline: String,
        /// Stage name
        name: String,
        /// New conversion rate percentage
        #[arg(long)]
        rate: Option<f64>,
        /// New turnaround time in days
        #[arg(long)]
        tat: Option<i64>,
        /// New sequence position
        #[arg(long)]
        order: Option<i64>,
        /// New status label ("none" clears the mapping)
        #[arg(long)]
        status: Option<String>,
    },
    /// Remove a stage from a pipeline
    Remove {
        /// Pipeline name
        pipeline: String,
        /// Stage name
        name: String,
        /// Remove without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Remove all stages from a pipeline
    Clear {
        /// Pipeline name
        pipeline: String,
        /// Clear without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum PlansCommands {
    /// List saved plans for a pipeline
    List {
        /// Pipeline name
        pipeline: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show a saved plan
    Show {
        /// Plan ID
        plan_id: i64,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    #[cfg(windows)]
    let _ = enable_ansi_support::enable_ansi_support();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests print to stdout and succeed;
            // usage errors go to stderr and exit as user errors.
            e.print()?;
            if e.use_stderr() {
                std::process::exit(1);
            }
            return Ok(());
        }
    };

    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Pipeline { subcommand } => handle_pipeline(subcommand),
        Commands::Stage { subcommand } => handle_stage(subcommand),
        Commands::Plan { pipeline, target, by, json, save } => {
            handle_plan(pipeline, target, by, json, save)
        }
        Commands::Requirements { pipeline, target, by, buffer, json } => {
            handle_requirements(pipeline, target, by, buffer, json)
        }
        Commands::Plans { subcommand } => handle_plans(subcommand),
    }
}

/// Look up a pipeline by name or exit with a user error
fn resolve_pipeline(conn: &Connection, name: &str) -> Result<Pipeline> {
    PipelineRepo::get_by_name(conn, name)?
        .ok_or_else(|| anyhow::anyhow!("Pipeline '{}' not found", name))
}

/// Look up a stage by name within a pipeline or exit with a user error
fn resolve_stage(conn: &Connection, pipeline_id: i64, name: &str) -> Result<Stage> {
    StageRepo::get_by_name(conn, pipeline_id, name)?
        .ok_or_else(|| anyhow::anyhow!("Stage '{}' not found", name))
}

/// Ask for confirmation on a destructive action
fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    print!("{} (y/N) ", prompt);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim(), "y" | "Y" | "yes"))
}

fn handle_pipeline(subcommand: PipelineCommands) -> Result<()> {
    match subcommand {
        PipelineCommands::Add { name, client, description, template } => {
            if let Err(e) = validate_non_empty(&name, "Pipeline name") {
                user_error(&e);
            }
            let conn = DbConnection::connect().context("Failed to connect to database")?;

            if PipelineRepo::get_by_name(&conn, &name)?.is_some() {
                user_error(&format!("Pipeline '{}' already exists", name));
            }

            let stages: Vec<Stage> = match template.as_str() {
                "standard" => standard_template(),
                "empty" => Vec::new(),
                other => user_error(&format!(
                    "Unknown template '{}'. Available templates: standard, empty.",
                    other
                )),
            };

            let pipeline =
                PipelineRepo::create(&conn, &name, client.as_deref(), description.as_deref())?;
            let pipeline_id = pipeline.id.expect("freshly created pipeline has an id");
            for stage in &stages {
                StageRepo::add(&conn, pipeline_id, stage)?;
            }

            if stages.is_empty() {
                println!("Created pipeline '{}'", name);
            } else {
                println!(
                    "Created pipeline '{}' with {} stages ({} template)",
                    name,
                    stages.len(),
                    template
                );
            }
            Ok(())
        }
        PipelineCommands::List { all, json } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipelines = PipelineRepo::list(&conn, all)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&pipelines)?);
                return Ok(());
            }

            if pipelines.is_empty() {
                println!("No pipelines found.");
                return Ok(());
            }

            let mut stage_counts = Vec::with_capacity(pipelines.len());
            for pipeline in &pipelines {
                let count = StageRepo::list_for_pipeline(&conn, pipeline.id.unwrap_or(0))?.len();
                stage_counts.push(count);
            }
            print!("{}", format_pipeline_list_table(&pipelines, &stage_counts));
            Ok(())
        }
        PipelineCommands::Show { name, json } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipeline = resolve_pipeline(&conn, &name)?;
            let stages = StageRepo::list_for_pipeline(&conn, pipeline.id.unwrap_or(0))?;

            if json {
                let doc = serde_json::json!({
                    "pipeline": pipeline,
                    "stages": stages,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            println!("Pipeline: {}", pipeline.name);
            if let Some(client) = &pipeline.client {
                println!("Client: {}", client);
            }
            if let Some(description) = &pipeline.description {
                println!("Description: {}", description);
            }
            println!("Status: {}", pipeline.status.as_str());
            println!();
            if stages.is_empty() {
                println!("No stages configured.");
            } else {
                print!("{}", format_stage_table(&stages));
            }
            Ok(())
        }
        PipelineCommands::Rename { old_name, new_name } => {
            if let Err(e) = validate_non_empty(&new_name, "Pipeline name") {
                user_error(&e);
            }
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            if PipelineRepo::get_by_name(&conn, &new_name)?.is_some() {
                user_error(&format!("Pipeline '{}' already exists", new_name));
            }
            PipelineRepo::rename(&conn, &old_name, &new_name)?;
            println!("Renamed pipeline '{}' to '{}'", old_name, new_name);
            Ok(())
        }
        PipelineCommands::Activate { name } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            PipelineRepo::set_status(&conn, &name, PipelineStatus::Active)?;
            println!("Activated pipeline '{}'", name);
            Ok(())
        }
        PipelineCommands::Deactivate { name } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            PipelineRepo::set_status(&conn, &name, PipelineStatus::Inactive)?;
            println!("Deactivated pipeline '{}'", name);
            Ok(())
        }
        PipelineCommands::Delete { name, yes } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            resolve_pipeline(&conn, &name)?;

            if !yes && !confirm(&format!("Delete pipeline '{}'?", name))? {
                println!("Aborted.");
                return Ok(());
            }

            PipelineRepo::delete(&conn, &name)?;
            println!("Deleted pipeline '{}'", name);
            Ok(())
        }
    }
}

fn handle_stage(subcommand: StageCommands) -> Result<()> {
    match subcommand {
        StageCommands::Add { pipeline, name, order, rate, tat, status, special } => {
            if let Err(e) = validate_non_empty(&name, "Stage name") {
                user_error(&e);
            }
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipeline = resolve_pipeline(&conn, &pipeline)?;
            let pipeline_id = pipeline.id.expect("stored pipeline has an id");

            let stage = if special {
                if order.is_some() || rate.is_some() || tat.is_some() {
                    user_error("Special stages take no --order, --rate, or --tat.");
                }
                let mut stage = Stage::special(name.clone());
                stage.maps_to_status = status;
                stage
            } else {
                let (order, rate, tat) = match (order, rate, tat) {
                    (Some(o), Some(r), Some(t)) => (o, r, t),
                    _ => user_error(
                        "Chain stages require --order, --rate, and --tat (or pass --special).",
                    ),
                };
                if let Err(e) = validate_stage_order(order) {
                    user_error(&e);
                }
                if let Err(e) = validate_conversion_rate(rate) {
                    user_error(&e);
                }
                if let Err(e) = validate_tat_days(tat) {
                    user_error(&e);
                }
                let mut stage = Stage::new(name.clone(), order, rate, tat);
                stage.maps_to_status = status;
                stage
            };

            StageRepo::add(&conn, pipeline_id, &stage)?;
            println!("Added stage '{}' to pipeline '{}'", name, pipeline.name);
            Ok(())
        }
        StageCommands::Update { pipeline, name, rate, tat, order, status } => {
            if let Some(rate) = rate {
                if let Err(e) = validate_conversion_rate(rate) {
                    user_error(&e);
                }
            }
            if let Some(tat) = tat {
                if let Err(e) = validate_tat_days(tat) {
                    user_error(&e);
                }
            }
            if let Some(order) = order {
                if let Err(e) = validate_stage_order(order) {
                    user_error(&e);
                }
            }

            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipeline = resolve_pipeline(&conn, &pipeline)?;
            let stage = resolve_stage(&conn, pipeline.id.expect("stored pipeline has an id"), &name)?;

            // "none" clears the mapping; any other value replaces it
            let status_update = status.as_deref().map(|s| {
                if s == "none" {
                    None
                } else {
                    Some(s)
                }
            });

            StageRepo::update(
                &conn,
                stage.id.expect("stored stage has an id"),
                rate,
                tat,
                order,
                status_update,
            )?;
            println!("Updated stage '{}'", name);
            Ok(())
        }
        StageCommands::Remove { pipeline, name, yes } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipeline = resolve_pipeline(&conn, &pipeline)?;
            let stage = resolve_stage(&conn, pipeline.id.expect("stored pipeline has an id"), &name)?;

            if !yes && !confirm(&format!("Remove stage '{}'?", name))? {
                println!("Aborted.");
                return Ok(());
            }

            StageRepo::remove(&conn, stage.id.expect("stored stage has an id"))?;
            println!("Removed stage '{}'", name);
            Ok(())
        }
        StageCommands::Clear { pipeline, yes } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipeline = resolve_pipeline(&conn, &pipeline)?;

            if !yes && !confirm(&format!("Remove all stages from '{}'?", pipeline.name))? {
                println!("Aborted.");
                return Ok(());
            }

            let removed =
                StageRepo::clear_for_pipeline(&conn, pipeline.id.expect("stored pipeline has an id"))?;
            println!("Removed {} stages from '{}'", removed, pipeline.name);
            Ok(())
        }
    }
}

fn handle_plan(
    pipeline_name: String,
    target: i64,
    by: Option<String>,
    json: bool,
    save: bool,
) -> Result<()> {
    if let Err(e) = validate_target_count(target) {
        user_error(&e);
    }

    let conn = DbConnection::connect().context("Failed to connect to database")?;
    let pipeline = resolve_pipeline(&conn, &pipeline_name)?;
    let pipeline_id = pipeline.id.expect("stored pipeline has an id");
    let stages = StageRepo::list_for_pipeline(&conn, pipeline_id)?;

    let mut request = PlanRequest::new(stages, target);
    if let Some(expr) = by {
        let date = match parse_date_expr(&expr) {
            Ok(date) => date,
            Err(e) => user_error(&e.to_string()),
        };
        request = request.with_target_date(date);
    }

    let plan = match compute(&request) {
        Ok(plan) => plan,
        Err(e) => user_error(&e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Plan for '{}' ({} hires):\n", pipeline.name, target);
        print!("{}", format_plan_table(&plan));
    }

    if save {
        let plan_id = PlanRepo::save(&conn, pipeline_id, &plan)?;
        println!("Saved plan #{}", plan_id);
    }
    Ok(())
}

fn handle_requirements(
    pipeline_name: String,
    target: i64,
    by: Option<String>,
    buffer: f64,
    json: bool,
) -> Result<()> {
    if let Err(e) = validate_target_count(target) {
        user_error(&e);
    }

    let conn = DbConnection::connect().context("Failed to connect to database")?;
    let pipeline = resolve_pipeline(&conn, &pipeline_name)?;
    let stages = StageRepo::list_for_pipeline(&conn, pipeline.id.expect("stored pipeline has an id"))?;

    let target_date = match by {
        Some(expr) => match parse_date_expr(&expr) {
            Ok(date) => Some(date),
            Err(e) => user_error(&e.to_string()),
        },
        None => None,
    };

    let rows = match requirements(&stages, target, target_date, buffer) {
        Ok(rows) => rows,
        Err(e) => user_error(&e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!(
            "Requirements for '{}' ({} hires, {}% buffer):\n",
            pipeline.name, target, buffer
        );
        print!("{}", format_requirements_table(&rows));
    }
    Ok(())
}

fn handle_plans(subcommand: PlansCommands) -> Result<()> {
    match subcommand {
        PlansCommands::List { pipeline, json } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let pipeline = resolve_pipeline(&conn, &pipeline)?;
            let plans =
                PlanRepo::list_for_pipeline(&conn, pipeline.id.expect("stored pipeline has an id"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
                return Ok(());
            }

            if plans.is_empty() {
                println!("No saved plans for '{}'.", pipeline.name);
                return Ok(());
            }
            print!("{}", format_saved_plans_table(&plans));
            Ok(())
        }
        PlansCommands::Show { plan_id, json } => {
            let conn = DbConnection::connect().context("Failed to connect to database")?;
            let (header, plan) = match PlanRepo::get(&conn, plan_id)? {
                Some(found) => found,
                None => user_error(&format!("Plan #{} not found", plan_id)),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }

            println!(
                "Plan #{} ({} hires{}):\n",
                header.id,
                header.target_count,
                header
                    .target_date
                    .map(|d| format!(", by {}", d))
                    .unwrap_or_default()
            );
            print!("{}", format_plan_table(&plan));
            Ok(())
        }
    }
}
