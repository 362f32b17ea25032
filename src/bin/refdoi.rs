//! CLI binary for reference resolution and row expansion.
//!
//! Usage: refdoi resolve --txt refs.txt --out resolved_refs.csv --resume

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use refdoi::error::ResolveError;
    use refdoi::{
        CrossrefClient, CsvMappingStore, ExpandConfig, IdentifierMap, MappingStore,
        ResolveConfig, Resolver, RunSummary, StartPoint, Table,
    };
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing_subscriber::{fmt, EnvFilter};

    #[derive(Parser)]
    #[command(
        name = "refdoi",
        about = "Resolve title-less references to DOIs via Crossref",
        version
    )]
    struct Cli {
        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, global = true, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Resolve a [n]-numbered reference list to DOIs
        Resolve {
            /// Text file: each reference starts with [n]; lines may wrap
            #[arg(long)]
            txt: PathBuf,
            /// Mapping CSV to append to
            #[arg(long, default_value = "resolved_refs.csv")]
            out: PathBuf,
            /// Contact email for the Crossref User-Agent (overrides CROSSREF_MAILTO)
            #[arg(long)]
            mailto: Option<String>,
            /// Minimum score to accept a match
            #[arg(long, default_value = "35")]
            min_score: u32,
            /// Crossref candidates to fetch per reference
            #[arg(long, default_value = "7")]
            rows: u32,
            /// Seconds to pause between Crossref requests
            #[arg(long, default_value = "0.25")]
            pause: f64,
            /// Process at most N references from the start point
            #[arg(long)]
            limit: Option<usize>,
            /// Continue after the highest idx already in --out
            #[arg(long)]
            resume: bool,
            /// Start after this idx (overrides --resume)
            #[arg(long)]
            start_idx: Option<u32>,
        },
        /// Expand reference lists in a table and attach accepted DOIs
        Expand {
            /// Input table (delimiter auto-detected)
            #[arg(long)]
            data: PathBuf,
            /// Mapping CSV produced by `resolve`
            #[arg(long)]
            mapping: PathBuf,
            /// Output CSV
            #[arg(long)]
            out: PathBuf,
            /// Reference-list column
            #[arg(long, default_value = "Refs.")]
            refs_col: String,
            /// Identifier column (default: doi or doi_list if present, else a new doi column)
            #[arg(long, default_value = "")]
            doi_col: String,
        },
        /// Show how a reference list is parsed, without querying Crossref
        Parse {
            /// Text file: each reference starts with [n]; lines may wrap
            #[arg(long)]
            txt: PathBuf,
        },
    }

    fn init_logging(verbose: u8) {
        let filter = match verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        };

        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    fn start_point(resume: bool, start_idx: Option<u32>) -> StartPoint {
        match (start_idx, resume) {
            (Some(idx), _) => StartPoint::After(idx),
            (None, true) => StartPoint::Resume,
            (None, false) => StartPoint::Fresh,
        }
    }

    fn read_references(path: &PathBuf) -> refdoi::error::Result<Vec<refdoi::Reference>> {
        let text = std::fs::read_to_string(path)?;
        Ok(refdoi::parse_references(&text))
    }

    fn print_summary(summary: &RunSummary) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Started after", "Attempted", "Accepted", "Low confidence", "No match", "Last idx"]);
        table.add_row(vec![
            summary.start_after.to_string(),
            summary.attempted.to_string(),
            summary.accepted.to_string(),
            summary.low_confidence.to_string(),
            summary.no_match.to_string(),
            summary
                .last_ordinal
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
        println!("{table}");

        if let Some(halt) = &summary.halted {
            println!("Stopped early: {}. Re-run with --resume to continue.", halt);
        }
    }

    fn print_references_table(references: &[refdoi::Reference]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Idx", "Authors", "Journal", "Year", "Volume", "Page/Art."]);

        for r in references {
            table.add_row(vec![
                r.ordinal.to_string(),
                r.authors.join(", "),
                r.journal.clone().unwrap_or_default(),
                r.year.map(|y| y.to_string()).unwrap_or_default(),
                r.volume.clone().unwrap_or_default(),
                r.page_or_article.clone().unwrap_or_default(),
            ]);
        }

        println!("{table}");
    }

    pub async fn run() -> refdoi::error::Result<()> {
        let cli = Cli::parse();
        init_logging(cli.verbose);

        match cli.command {
            Commands::Resolve {
                txt,
                out,
                mailto,
                min_score,
                rows,
                pause,
                limit,
                resume,
                start_idx,
            } => {
                let references = read_references(&txt)?;
                match (references.first(), references.last()) {
                    (Some(first), Some(last)) => tracing::info!(
                        count = references.len(),
                        min_idx = first.ordinal,
                        max_idx = last.ordinal,
                        "parsed references"
                    ),
                    _ => tracing::warn!(path = %txt.display(), "no references found"),
                }

                let pause = Duration::try_from_secs_f64(pause)
                    .map_err(|e| ResolveError::Config(format!("invalid --pause: {}", e)))?;
                let config = ResolveConfig::default()
                    .with_min_score(min_score)
                    .with_rows(rows)
                    .with_pause(pause)
                    .with_limit(limit)
                    .with_start(start_point(resume, start_idx));

                let mut client = CrossrefClient::from_env();
                if let Some(mailto) = mailto {
                    client = client.with_mailto(mailto);
                }

                let mut resolver = Resolver::new(client, CsvMappingStore::new(&out), config);
                let summary = resolver.run(&references).await?;

                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                    OutputFormat::Table => {
                        print_summary(&summary);
                        println!("Wrote/updated: {}", resolver.store().path().display());
                    }
                }
            }

            Commands::Expand {
                data,
                mapping,
                out,
                refs_col,
                doi_col,
            } => {
                let records = CsvMappingStore::new(&mapping).load()?;
                let identifiers = IdentifierMap::from_records(&records);
                if identifiers.is_empty() {
                    tracing::warn!(path = %mapping.display(), "no accepted DOIs in mapping; output may be empty");
                }

                let table = Table::read_path(&data)?;
                let config = ExpandConfig::default()
                    .with_refs_column(refs_col)
                    .with_identifier_column(doi_col);
                let (expanded, report) = refdoi::expand_table(&table, &identifiers, &config)?;
                expanded.write_path(&out)?;

                println!("Wrote: {}", out.display());
                println!(
                    "Kept with DOI: {} | Expanded rows created: {} | Dropped (no accepted DOI): {}",
                    report.kept, report.expanded, report.dropped
                );
            }

            Commands::Parse { txt } => {
                let references = read_references(&txt)?;
                match cli.output {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&references)?)
                    }
                    OutputFormat::Table => print_references_table(&references),
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
