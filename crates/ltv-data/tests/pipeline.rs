use std::fs;
use std::path::Path;

use ltv_core::models::{ProductCatalog, SegmentColumn};
use ltv_core::LtvError;
use ltv_data::analysis::{analyze, AnalysisOptions};
use tempfile::TempDir;

const HEADER: &str = "status,all_purchased_product_ids,total_renewals,total_spent,rpr,ip_country,first_seen_at,last_seen_at,trial_start_at";

fn write_csv(path: &Path, rows: &[&str]) {
    let mut text = String::from(HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

fn options(input: &Path, skip_invalid: bool) -> AnalysisOptions {
    AnalysisOptions {
        input: input.to_path_buf(),
        catalog: ProductCatalog::default(),
        segment_column: SegmentColumn::IpCountry,
        top_n: 10,
        skip_invalid,
    }
}

#[test]
fn directory_of_exports_is_analysed_as_one_dataset() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("2021")).unwrap();
    write_csv(
        &dir.path().join("2021").join("january.csv"),
        &[
            "cancelled,com.app.year,0,40,1.0,US,1609459200000,1609545600000,",
            "cancelled,com.app.year,2,90,1.0,US,1609459200000,1640995200000,",
        ],
    );
    write_csv(
        &dir.path().join("weekly.csv"),
        &[
            "cancelled,com.app.week,4,25,1.0,BR,1612137600000,1614556800000,1612137600000",
            "active,com.app.week,1,10,1.0,BR,1612137600000.0,,",
            "cancelled_trial,com.app.week,,,,US,,,",
        ],
    );
    fs::write(dir.path().join("notes.txt"), "not an export").unwrap();

    let result = analyze(&options(dir.path(), false)).unwrap();

    assert_eq!(result.metadata.files_read, 2);
    assert_eq!(result.metadata.records_loaded, 5);
    assert_eq!(result.sampling.total, 5);

    // Yearly: (1 + 3) / 2, weekly: 5 / 1.
    assert_eq!(result.product_lifetimes.yearly, Some(2.0));
    assert_eq!(result.product_lifetimes.weekly, Some(5.0));

    let ranked: Vec<&str> = result
        .country_distribution
        .entries
        .iter()
        .map(|e| e.value.as_str())
        .collect();
    assert_eq!(ranked, vec!["US", "BR"]);

    // US yearly: mean AOV (40 + 30) / 2 = 35, lifetime 2.
    let us = result.country_ltv.iter().find(|c| c.country == "US").unwrap();
    assert_eq!(us.yearly, Some(70.0));
    assert_eq!(us.weekly, None);
    assert_eq!(result.country_ltv[0].country, "US");

    let us_profile = &result.ltv_profiles[0];
    assert_eq!(us_profile.users, 3);
    assert_eq!(us_profile.zero_ltv, 1);

    assert_eq!(
        result.time_span.last_seen.unwrap().timestamp_millis(),
        1_640_995_200_000
    );
}

#[test]
fn invalid_row_fails_the_load_unless_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.csv");
    write_csv(
        &path,
        &[
            "cancelled,com.app.year,0,40,1.0,US,,,",
            "refunded,com.app.year,0,40,1.0,US,,,",
        ],
    );

    match analyze(&options(&path, false)) {
        Err(LtvError::InvalidRecord { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected invalid record error, got {other:?}"),
    }

    let result = analyze(&options(&path, true)).unwrap();
    assert_eq!(result.metadata.records_loaded, 1);
    assert_eq!(result.metadata.records_skipped, 1);
}

#[test]
fn missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.csv");
    assert!(matches!(
        analyze(&options(&missing, false)),
        Err(LtvError::InputNotFound(_))
    ));
}
