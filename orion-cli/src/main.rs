use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;

use orion_calendar::NullCalendarNotifier;
use orion_core::ProjectService;
use orion_store::InMemoryProjectStore;
use orion_types::{Caller, ExposureRequest, Project, ProjectChanges, Role};

#[derive(Parser)]
#[command(name = "orion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a project through its whole lifecycle against an in-memory store.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Demo => demo().await,
    }
}

async fn demo() -> anyhow::Result<()> {
    let service = ProjectService::new(
        Arc::new(InMemoryProjectStore::new()),
        Arc::new(NullCalendarNotifier),
    );

    let created_at = chrono::Utc::now().to_rfc3339();
    let user_id = "google-oauth2|100354044221813550027";

    let project = Project {
        project_name: "m101".into(),
        created_at: created_at.clone(),
        user_id: user_id.into(),
        project_note: serde_json::json!("Pinwheel galaxy, LRGB"),
        exposures: vec![
            ExposureRequest {
                filter: "R".into(),
                exposure_time: Decimal::from(30),
                count: Decimal::from(10),
                bin: Decimal::ONE,
            },
            ExposureRequest {
                filter: "B".into(),
                exposure_time: Decimal::from(60),
                count: Decimal::from(4),
                bin: Decimal::ONE,
            },
        ],
        project_data: vec![vec![], vec![]],
        remaining: vec![Decimal::from(10), Decimal::from(4)],
        ..Default::default()
    };
    let key = project.key();

    let created = service.add_project(project).await?;
    println!("created:\n{}\n", serde_json::to_string_pretty(&created)?);

    let event_id = Uuid::new_v4().to_string();
    let outcome = service.add_project_event(&key, event_id.clone()).await?;
    println!("event {event_id}: {}", outcome.message());
    // Same id again is a no-op.
    let outcome = service.add_project_event(&key, event_id).await?;
    println!("again: {}\n", outcome.message());

    service.add_project_data(&key, 0, "m101-r-001".into()).await?;
    service.add_project_data(&key, 0, "m101-r-002".into()).await?;
    let progressed = service.get_project(&key).await?;
    println!(
        "after two captures:\n{}\n",
        serde_json::to_string_pretty(&progressed)?
    );

    // Unchanged R exposure keeps its captures; the B exposure's count shrinks
    // and therefore starts from scratch.
    let changes = ProjectChanges {
        project_name: "m101".into(),
        project_note: serde_json::json!("Pinwheel galaxy, revised"),
        scheduled_with_events: progressed.scheduled_with_events.clone(),
        exposures: vec![
            ExposureRequest {
                filter: "R".into(),
                exposure_time: Decimal::from(30),
                count: Decimal::from(10),
                bin: Decimal::ONE,
            },
            ExposureRequest {
                filter: "B".into(),
                exposure_time: Decimal::from(60),
                count: Decimal::from(8),
                bin: Decimal::ONE,
            },
        ],
        ..Default::default()
    };
    let modified = service.modify_project(&key, changes).await?;
    println!("modified:\n{}\n", serde_json::to_string_pretty(&modified)?);

    let caller = Caller::new(user_id, [Role::from("admin".to_string())]);
    let deleted = service.delete_project(&key, &caller).await?;
    println!("deleted: {}", deleted.project_name);

    Ok(())
}
