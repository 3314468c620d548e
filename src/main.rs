// Standings CLI: load the field, the saved entries, and the finalized
// results, then print the ranked board for one challenge format.

use std::fs;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use pickem::config::Config;
use pickem::field::Field;
use pickem::results::{FinalizedResult, ResultsSet};
use pickem::scoring::{self, Challenge, Entry};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <field.csv> <entries.json> <results.json> [best|worst]", args[0]);
        return ExitCode::from(2);
    }

    let challenge = match args.get(4).map(String::as_str) {
        None => Challenge::Best,
        Some(raw) => match Challenge::parse(raw) {
            Some(c) => c,
            None => {
                eprintln!("unknown challenge '{}'; expected 'best' or 'worst'", raw);
                return ExitCode::from(2);
            }
        },
    };

    let config = Config::load_or_default(None);

    let field = match Field::from_csv(&args[1]) {
        Ok(field) => field,
        Err(err) => {
            eprintln!("could not load field: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let entries: Vec<Entry> = match fs::read_to_string(&args[2])
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("could not load entries: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let results: Vec<FinalizedResult> = match fs::read_to_string(&args[3])
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(results) => results,
        Err(err) => {
            eprintln!("could not load results: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let results = ResultsSet::from_results(results);

    println!(
        "{} standings - {} of 63 games decided",
        challenge.label(),
        results.decided_count()
    );
    println!();

    let rows = scoring::leaderboard(&field, &results, &entries, challenge, &config.scoring);
    for row in &rows {
        let extra = match challenge {
            Challenge::Best => {
                let champ = row
                    .champion
                    .as_ref()
                    .map(|t| format!("{} ({})", t.name, t.seed))
                    .unwrap_or_else(|| "-".to_string());
                let diff = row
                    .tiebreaker_diff
                    .map(|d| format!("{:.0}", d))
                    .unwrap_or_else(|| "-".to_string());
                format!("champion: {:<20} tiebreak diff: {}", champ, diff)
            }
            Challenge::Worst => {
                let counts = row.stage_counts.unwrap_or_default();
                format!("losses by stage: {}/{}/{}", counts[0], counts[1], counts[2])
            }
        };
        println!(
            "{:>4}. {:<20} {:<24} {:>5} pts  {:>2}/{} ({:5.1}%)  max {:>5}  {}",
            row.rank,
            row.user_name,
            row.bracket_name,
            row.score,
            row.numerator,
            row.denominator,
            row.percentage,
            row.total_possible,
            extra
        );
    }

    ExitCode::SUCCESS
}
