use std::env::args;

use chrono::{Local, NaiveDate};
use eyre::{bail, eyre, Context as _, Result};
use ledger::{service::calendar::ScheduleError, Ledger};
use log::info;
use model::{ids::WeekId, recurrence::RecurrenceRequest};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

const USAGE: &str = "usage: schedule-cli weekly <request.json> | schedule-cli week [YYYY-MM-DD]";

#[tokio::main]
async fn main() -> Result<()> {
    let env = env::Env::load()?;
    pretty_env_logger::init();
    color_eyre::install()?;

    let args: Vec<String> = args().skip(1).collect();
    let command = match args.first().map(String::as_str) {
        Some("weekly") => Command::Weekly(
            args.get(1)
                .ok_or_else(|| eyre!("missing request file\n{}", USAGE))?
                .clone(),
        ),
        Some("week") => Command::Week(
            args.get(1)
                .map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
                .transpose()
                .context("Invalid date")?
                .unwrap_or_else(|| Local::now().date_naive()),
        ),
        _ => bail!(USAGE),
    };

    info!("connecting to mongo");
    let storage = storage::Storage::with_db_name(env.mongo_url(), env.mongo_db())
        .await
        .context("Failed to create storage")?;
    let ledger = Ledger::new(storage);
    let actor = ObjectId::new();
    info!("acting as {}", actor);
    let mut session = ledger.db.start_session(actor).await?;

    match command {
        Command::Weekly(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path))?;
            let request: RecurrenceRequest =
                serde_json::from_str(&raw).context("Invalid recurrence request")?;
            match ledger
                .calendar
                .schedule_weekly(&mut session, &request)
                .await
            {
                Ok(created) => println!("{}", json!({ "created": created })),
                Err(ScheduleError::SchedulingConflict(report)) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    bail!("Rejected: {}", report);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Week(date) => {
            let schedule = ledger
                .calendar
                .week_schedule(&mut session, WeekId::from_date(date))
                .await?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
    }
    Ok(())
}

enum Command {
    Weekly(String),
    Week(NaiveDate),
}
