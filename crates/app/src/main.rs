mod cli;
mod render;

use std::sync::Arc;

use clap::Parser;
use recovery_core::model::{PlanStatus, SubjectPlanDraft};
use services::{Clock, PlanService};
use storage::repository::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, StoreTarget, prepare_sqlite_file};

async fn open_storage(target: &StoreTarget) -> Result<Storage, Box<dyn std::error::Error>> {
    match target {
        StoreTarget::Json(path) => Ok(Storage::json_file(path.clone())),
        StoreTarget::Sqlite(url) => {
            // Open + migrate at startup. Keep this in the binary glue so core/services stay pure.
            prepare_sqlite_file(url)?;
            Ok(Storage::sqlite(url).await?)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let target = StoreTarget::from_arg(&cli.db)?;
    debug!(?target, "opening plan store");

    let storage = open_storage(&target).await?;
    let service = PlanService::new(Clock::default_clock(), Arc::clone(&storage.plans));

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => match service.dashboard().await? {
            Some(view) => print!("{}", render::dashboard(&view)),
            None => println!("{}", render::setup_hint()),
        },
        Command::Today => match service.dashboard().await? {
            Some(view) => print!("{}", render::todays_plan(&view)),
            None => println!("{}", render::setup_hint()),
        },
        Command::Start {
            backlog,
            daily_load,
        } => {
            let plan = service.start_plan(backlog, daily_load).await?;
            println!(
                "Plan started: {} lecture(s) at {daily_load} per day.",
                plan.remaining()
            );
            print_dashboard(&service).await?;
        }
        Command::StartSubjects {
            subjects,
            daily_load,
        } => {
            let mut draft = SubjectPlanDraft::new();
            for subject in subjects {
                draft.add_subject(subject.name, subject.backlog)?;
            }
            let plan = service.start_subject_plan(draft, daily_load).await?;
            println!(
                "Plan started: {} lecture(s) at {daily_load} per day.",
                plan.remaining()
            );
            print_dashboard(&service).await?;
        }
        Command::Complete => {
            let check_in = service.complete_today().await?;
            print!("{}", render::check_in(&check_in));
        }
        Command::Miss => {
            let check_in = service.miss_today().await?;
            print!("{}", render::check_in(&check_in));
        }
        Command::Reset => {
            let had_plan = !matches!(service.status().await, Ok(PlanStatus::NoPlan));
            service.reset().await?;
            if had_plan {
                println!("Plan deleted.");
            }
            println!("{}", render::setup_hint());
        }
    }

    Ok(())
}

async fn print_dashboard(service: &PlanService) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(view) = service.dashboard().await? {
        print!("{}", render::dashboard(&view));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
