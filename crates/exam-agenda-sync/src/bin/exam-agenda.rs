use anyhow::{bail, Context};
use exam_agenda_core::ingest::validate_record;
use exam_agenda_core::{
    ImportSession, ListingFilter, ListingState, RowIngestor, SpreadsheetReader,
};
use exam_agenda_sync::{
    AgendaConfig, BatchImporter, CancellationToken, HttpBackend, ListingLoader,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  exam-agenda import <file> <YYYY-MM-DD> <profile-id>
  exam-agenda list [text]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = AgendaConfig::from_env().context("loading configuration")?;
    let backend = HttpBackend::new(&config).context("building HTTP client")?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let (Some(file), Some(date), Some(profile)) = (args.get(2), args.get(3), args.get(4))
            else {
                bail!(USAGE);
            };
            let group_id: i64 = profile
                .parse()
                .with_context(|| format!("invalid profile id {:?}", profile))?;
            import(&config, &backend, file, date, group_id, &cancel).await
        }
        Some("list") => {
            let text = args.get(2).cloned().unwrap_or_default();
            list(&config, &backend, &text, &cancel).await
        }
        _ => bail!(USAGE),
    }
}

async fn import(
    config: &AgendaConfig,
    backend: &HttpBackend,
    file: &str,
    date: &str,
    group_id: i64,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let sheet = SpreadsheetReader::read_path(file).with_context(|| format!("reading {}", file))?;
    let records = RowIngestor::new().ingest_spreadsheet(&sheet);
    tracing::info!(file = %sheet.source.name, sha256 = %sheet.source.sha256, rows = records.len(), "Roster parsed");

    for record in &records {
        for warning in validate_record(record) {
            println!("line {}: {}", record.line_number, warning);
        }
    }

    let profiles = ListingLoader::new(backend)
        .with_fetch_batch(config.fetch_batch)
        .load_profiles()
        .await
        .context("loading exam profiles")?;
    let profile = profiles.into_iter().find(|p| p.group_id == group_id);

    let mut session = ImportSession::new();
    session.select_file(sheet.source, records)?;
    session.begin_preview(date, profile)?;

    let summary = BatchImporter::new(backend)
        .run_session(&mut session, config.unit_id, &[], cancel)
        .await?;

    println!(
        "{} of {} patients imported, {} exams scheduled",
        summary.successes, summary.total_processed, summary.total_exams
    );
    for error in session.errors() {
        println!(
            "line {} {} ({}): {}",
            error.line_number, error.name, error.cpf, error.message
        );
    }
    Ok(())
}

async fn list(
    config: &AgendaConfig,
    backend: &HttpBackend,
    text: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let rows = ListingLoader::new(backend)
        .with_fetch_batch(config.fetch_batch)
        .load(config.listing_unit(), cancel)
        .await
        .context("loading agenda")?;

    let mut listing = ListingState::new(rows).with_page_size(config.page_size);
    listing.set_filter(ListingFilter::text(text));

    for row in listing.page_rows() {
        let exams: Vec<&str> = row.exams.iter().map(|e| e.display_name.as_str()).collect();
        println!(
            "{:>8}  {:<11}  {:<30}  {:<10}  {:?}  {}",
            row.key.appointment_id,
            row.key.cpf,
            row.name,
            row.appointment_date,
            row.status,
            exams.join(", ")
        );
    }

    let stats = listing.statistics();
    println!(
        "page {}/{} | total {} | sent {} | pending {} | errors {}",
        listing.page(),
        listing.total_pages(),
        stats.total,
        stats.sent,
        stats.pending,
        stats.errors
    );
    Ok(())
}
