//! risk-runner: headless train/evaluate runner over a device-log tree.
//!
//! Usage:
//!   risk-runner --logs ./users --labels bad_loanees.txt
//!   risk-runner --logs ./users --labels bad.txt --classifier linear --db training_db
//!   risk-runner --logs ./users --labels bad.txt --select 5 --seed 7 --json

use anyhow::{bail, Context, Result};
use loanee_core::{
    aggregate::{LogAggregator, UserAggregates},
    clock::SystemClock,
    config::RiskConfig,
    evaluate::{ClassifierChoice, EvaluationReport, TrainEvaluateLoop},
    labels::load_bad_loanees,
    linear::SgdLogisticRegression,
    log_source::LogSource,
    store::FeatureStore,
};
use log::info;
use std::env;
use std::str::FromStr;

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    users: usize,
    skipped_records: usize,
    accuracy: f64,
    report: &'a EvaluationReport,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(logs_dir) = flag_value(&args, "--logs") else {
        bail!("usage: risk-runner --logs DIR --labels FILE [--db PATH] [--config FILE] [--classifier nb|linear] [--select N] [--seed N] [--json]");
    };
    let Some(labels_path) = flag_value(&args, "--labels") else {
        bail!("--labels FILE is required");
    };
    let db = flag_value(&args, "--db");
    let classifier_name = flag_value(&args, "--classifier").unwrap_or("nb");
    let json = args.iter().any(|a| a == "--json");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => RiskConfig::load(path)?,
        None => RiskConfig::default(),
    };
    if let Some(seed) = parsed_flag::<u64>(&args, "--seed")? {
        config = config.with_seed(seed);
    }
    // --select 0 classifies with the full schema.
    let select = parsed_flag::<usize>(&args, "--select")?
        .or(Some(config.selection_target))
        .filter(|n| *n > 0);

    if !json {
        println!("risk-runner");
        println!("  logs:        {logs_dir}");
        println!("  labels:      {labels_path}");
        println!("  classifier:  {classifier_name}");
        println!("  db:          {}", db.unwrap_or("(none)"));
        println!();
    }

    let schema = config.feature_schema();
    let labels = load_bad_loanees(labels_path)
        .with_context(|| format!("loading labels from {labels_path}"))?;

    // All logs are read and aggregated before any training starts.
    let source = LogSource::new(logs_dir);
    let aggregator = LogAggregator::new(config.sms_rules()?);
    let population = source
        .list_users()
        .with_context(|| format!("listing users in {logs_dir}"))?
        .iter()
        .map(|user_id| -> Result<UserAggregates> {
            Ok(aggregator.aggregate(&source.load_user(user_id)?))
        })
        .collect::<Result<Vec<UserAggregates>>>()?;
    let users = population.len();
    let skipped_records: usize = population.iter().map(|u| u.skipped).sum();
    info!(
        "aggregated {users} users ({} bad by label), {skipped_records} records skipped",
        labels.bad_count()
    );

    let classifier = match classifier_name {
        "nb" | "naive_bayes" => ClassifierChoice::NaiveBayes { select },
        "linear" | "sgd" => ClassifierChoice::Linear(Box::new(SgdLogisticRegression::new(config.sgd))),
        other => bail!("unknown classifier '{other}' (expected nb or linear)"),
    };

    let report = TrainEvaluateLoop::new(&schema, &config, SystemClock)
        .run(population, &labels, classifier)?;

    if let Some(path) = db {
        let mut store = FeatureStore::open(path)?;
        store.replace_table(&schema, &report.training_vectors)?;
    }

    if json {
        let summary = RunSummary { users, skipped_records, accuracy: report.accuracy(), report: &report };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&report, users, skipped_records);
    }
    Ok(())
}

fn print_report(report: &EvaluationReport, users: usize, skipped_records: usize) {
    for o in &report.outcomes {
        println!(
            "  user {:>8}  predicted {:<4}  actual {:<4}  {}",
            o.user_id,
            o.predicted,
            o.actual,
            if o.correct { "ok" } else { "MISS" }
        );
    }

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  classifier:      {}", report.classifier);
    println!("  users:           {users}");
    println!("  training users:  {}", report.training_users);
    println!("  dropped (empty): {}", report.dropped_training_users.len());
    println!("  skipped records: {skipped_records}");
    if let Some(steps) = &report.selected_features {
        let names: Vec<&str> = steps.iter().map(|s| s.feature.as_str()).collect();
        println!("  selected:        {}", names.join(", "));
        println!(
            "  fit / holdout:   {} / {}",
            report.fit_users.len(),
            report.selection_users.len()
        );
    }
    if let Some(at) = chrono::DateTime::from_timestamp(report.scored_at, 0) {
        println!("  scored at:       {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("  result:          {report} ({:.1}%)", report.accuracy() * 100.0);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// A numeric flag: absent is `None`, present but unparsable is an error.
fn parsed_flag<T: FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match flag_value(args, flag) {
        None => Ok(None),
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => bail!("{flag} expects a non-negative integer, got '{raw}'"),
        },
    }
}
