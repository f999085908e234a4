use loanee_core::{
    aggregate::{SmsAggregate, UserAggregates},
    feature_vector::FeatureVectorBuilder,
    records::SmsRecord,
    sms_signals::SmsSignalRules,
    schema::FeatureSchema,
    store::FeatureStore,
};

const NOW: i64 = 1_700_000_000;

fn vectors(schema: &FeatureSchema) -> Vec<loanee_core::feature_vector::FeatureVector> {
    let rules = SmsSignalRules::default();
    let builder = FeatureVectorBuilder::new(schema, NOW);
    ["a1", "b2"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut user = UserAggregates::new(*id);
            user.sms = SmsAggregate::from_records(
                &[SmsRecord {
                    timestamp: NOW - 60 * (i as i64 + 1),
                    counterparty: "LENDER".into(),
                    body: format!("loan of ksh {} received", 100 * (i + 1)),
                }],
                &rules,
            );
            builder.build_from_aggregates(&user)
        })
        .collect()
}

/// Rows read back equal the vectors written, flags and elapsed seconds included.
#[test]
fn round_trips_feature_vectors() {
    let schema = FeatureSchema::standard();
    let written = vectors(&schema);

    let mut store = FeatureStore::in_memory().unwrap();
    store.replace_table(&schema, &written).unwrap();

    assert_eq!(store.row_count().unwrap(), 2);
    assert_eq!(store.load_table(&schema).unwrap(), written);
}

/// Each replace drops the previous table.
#[test]
fn replace_drops_previous_rows() {
    let schema = FeatureSchema::standard();
    let written = vectors(&schema);

    let mut store = FeatureStore::in_memory().unwrap();
    store.replace_table(&schema, &written).unwrap();
    store.replace_table(&schema, &written[..1]).unwrap();
    assert_eq!(store.row_count().unwrap(), 1);

    store.clear().unwrap();
    assert!(store.row_count().is_err(), "table should be gone after clear");
}

/// A store pointed at another table leaves the default table alone.
#[test]
fn custom_table_is_independent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("features.db");
    let path = path.to_str().unwrap();
    let schema = FeatureSchema::standard();
    let written = vectors(&schema);

    FeatureStore::open(path).unwrap().replace_table(&schema, &written).unwrap();
    let mut scratch = FeatureStore::open(path).unwrap().with_table("scratch_features");
    scratch.replace_table(&schema, &written[..1]).unwrap();

    assert_eq!(scratch.row_count().unwrap(), 1);
    assert_eq!(FeatureStore::open(path).unwrap().row_count().unwrap(), 2);
}
