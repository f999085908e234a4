use loanee_core::{
    aggregate::{CallAggregate, UserAggregates},
    clock::{FixedClock, SteppingClock},
    config::RiskConfig,
    error::RiskError,
    evaluate::{ClassifierChoice, TrainEvaluateLoop},
    labels::LabelMap,
    linear::{SgdConfig, SgdLogisticRegression},
    records::CallRecord,
    schema::FeatureSchema,
    split::SplitStrategy,
};
use std::collections::HashSet;

// ── Helpers ──────────────────────────────────────────────────────────────────

const NOW: i64 = 1_600_000_000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ten users u0..u9. Bad users make many calls to many people; good users few.
fn population() -> (Vec<UserAggregates>, LabelMap) {
    let bad = ["u0", "u1", "u5", "u8"];
    let users = (0..10)
        .map(|i| {
            let id = format!("u{i}");
            let is_bad = bad.contains(&id.as_str());
            let n = if is_bad { 30 + i } else { 2 + i % 3 };
            let records: Vec<CallRecord> = (0..n)
                .map(|k| CallRecord {
                    timestamp: NOW - 86_400 * (k as i64 + 1),
                    counterparty: format!("{id}-peer-{}", k % if is_bad { 20 } else { 2 }),
                })
                .collect();
            let mut user = UserAggregates::new(id);
            user.calls = CallAggregate::from_records(&records);
            user
        })
        .collect();
    (users, LabelMap::from_bad(bad))
}

fn ordered_config() -> RiskConfig {
    RiskConfig { split: SplitStrategy::Ordered, ..RiskConfig::default() }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// 10 users at 70% → 7 train, 3 test, and the report denominator is 3.
#[test]
fn seventy_thirty_split_reports_over_test_users() {
    init_logging();
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, labels) = population();

    let report = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
        .run(users, &labels, ClassifierChoice::NaiveBayes { select: None })
        .unwrap();

    assert_eq!(report.training_users, 7);
    assert_eq!(report.total, 3);
    assert_eq!(report.outcomes.len(), 3);
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.user_id.as_str()).collect();
    assert_eq!(ids, ["u7", "u8", "u9"]);
    assert_eq!(report.to_string(), format!("{}/3 correct", report.correct));
    assert!(report.accuracy() >= 0.0 && report.accuracy() <= 1.0);
}

/// The shuffled split keeps the same sizes and is reproducible for a seed.
#[test]
fn shuffled_split_is_seeded() {
    let schema = FeatureSchema::standard();
    let config = RiskConfig::default().with_seed(11);
    let run = || {
        let (users, labels) = population();
        TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
            .run(users, &labels, ClassifierChoice::NaiveBayes { select: None })
    };

    match (run(), run()) {
        (Ok(a), Ok(b)) => {
            assert_eq!(a.total, 3);
            assert_eq!(a.outcomes, b.outcomes);
        }
        // A shuffle may leave fewer than two bad users in training.
        (Err(RiskError::InsufficientClassData { .. }), Err(RiskError::InsufficientClassData { .. })) => {}
        (a, b) => panic!("runs diverged: {a:?} vs {b:?}"),
    }
}

/// An empty population has no test users; the run fails instead of dividing by zero.
#[test]
fn empty_population_is_a_degenerate_split() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();

    let res = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW)).run(
        Vec::new(),
        &LabelMap::default(),
        ClassifierChoice::NaiveBayes { select: None },
    );
    assert!(matches!(res, Err(RiskError::DegenerateSplit { test: 0, .. })));
}

/// Training with only one bad user fails before any statistics are computed.
#[test]
fn insufficient_bad_users_fails_training() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, _) = population();

    let res = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW)).run(
        users,
        &LabelMap::from_bad(["u0"]),
        ClassifierChoice::NaiveBayes { select: None },
    );
    assert!(matches!(res, Err(RiskError::InsufficientClassData { count: 1, .. })));
}

/// Forward selection runs inside the training users and its picks are reported.
#[test]
fn naive_bayes_with_selection_reports_features() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, labels) = population();

    let report = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
        .run(users, &labels, ClassifierChoice::NaiveBayes { select: Some(3) })
        .unwrap();

    let steps = report.selected_features.expect("selection recorded");
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| schema.contains(&s.feature)));
    assert_eq!(report.total, 3);
}

/// Selection candidates are scored on training users the model was not fit
/// on, and neither group overlaps the test users.
#[test]
fn selection_scores_on_a_holdout_disjoint_from_the_fit_set() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, labels) = population();

    let report = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
        .run(users, &labels, ClassifierChoice::NaiveBayes { select: Some(2) })
        .unwrap();

    // 7 training users at a 0.3 holdout: fit on 4, score candidates on 3.
    assert_eq!(report.fit_users, ["u0", "u1", "u2", "u3"]);
    assert_eq!(report.selection_users, ["u4", "u5", "u6"]);

    let fit: HashSet<&str> = report.fit_users.iter().map(String::as_str).collect();
    let held_out: HashSet<&str> = report.selection_users.iter().map(String::as_str).collect();
    let tested: HashSet<&str> = report.outcomes.iter().map(|o| o.user_id.as_str()).collect();
    assert!(fit.is_disjoint(&held_out), "selection must not score on fit users");
    assert!(fit.is_disjoint(&tested) && held_out.is_disjoint(&tested));
    assert_eq!(fit.len() + held_out.len(), report.training_users);
}

/// Without selection every training user is fit on and nothing is held out.
#[test]
fn no_holdout_without_selection() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, labels) = population();

    let report = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
        .run(users, &labels, ClassifierChoice::NaiveBayes { select: None })
        .unwrap();

    assert_eq!(report.fit_users.len(), 7);
    assert!(report.selection_users.is_empty());
}

/// The linear path trains through the adapter and scores every test user.
#[test]
fn linear_classifier_path() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, labels) = population();
    let sgd = SgdLogisticRegression::new(SgdConfig { learning_rate: 0.1, epochs: 200, ..SgdConfig::default() });

    let report = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
        .run(users, &labels, ClassifierChoice::Linear(Box::new(sgd)))
        .unwrap();

    assert_eq!(report.classifier, "sgd_logistic");
    assert_eq!(report.total, 3);
    assert!(report.selected_features.is_none());
}

/// Training and scoring read the clock separately. Timestamp features of the
/// same record therefore differ between the training and the scoring vectors.
#[test]
fn scoring_time_differs_from_training_time() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (users, labels) = population();

    let report = TrainEvaluateLoop::new(&schema, &config, SteppingClock::new(NOW, 3_600))
        .run(users, &labels, ClassifierChoice::NaiveBayes { select: None })
        .unwrap();

    assert_eq!(report.trained_at, NOW);
    assert_eq!(report.scored_at, NOW + 3_600);
    assert!(report.training_vectors.iter().all(|v| v.evaluated_at == NOW));
}

/// Users without any log data are left out of training when configured.
#[test]
fn empty_training_users_are_dropped() {
    let schema = FeatureSchema::standard();
    let config = ordered_config();
    let (mut users, labels) = population();
    users[3] = UserAggregates::new("u3");

    let report = TrainEvaluateLoop::new(&schema, &config, FixedClock(NOW))
        .run(users, &labels, ClassifierChoice::NaiveBayes { select: None })
        .unwrap();

    assert_eq!(report.dropped_training_users, vec!["u3".to_string()]);
    assert_eq!(report.training_users, 6);
    assert_eq!(report.total, 3);
}
