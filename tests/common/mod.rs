//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use surveyfit::pipeline::PipelineConfig;

const TITLES: [&str; 5] = ["Mr", "Mrs", "Miss", "Master", "Dr"];
const PORTS: [&str; 3] = ["S", "C", "Q"];

/// Create a 40-row passenger table in the raw header style of the public
/// Titanic extract (`home.dest`, mixed-case names are left to the loader).
///
/// Survival depends on sex and class so a fitted model has signal; age,
/// fare, embarked and cabin carry missing values.
pub fn create_passenger_dataframe() -> DataFrame {
    let n = 40;
    let mut pclass = Vec::with_capacity(n);
    let mut survived = Vec::with_capacity(n);
    let mut name = Vec::with_capacity(n);
    let mut sex = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut sibsp = Vec::with_capacity(n);
    let mut parch = Vec::with_capacity(n);
    let mut ticket = Vec::with_capacity(n);
    let mut fare = Vec::with_capacity(n);
    let mut cabin = Vec::with_capacity(n);
    let mut embarked = Vec::with_capacity(n);
    let mut boat = Vec::with_capacity(n);
    let mut home_dest = Vec::with_capacity(n);

    for i in 0..n {
        let class = (i % 3) as i64 + 1;
        let female = i % 2 == 0;
        let lived = if female { class < 3 || i % 4 == 0 } else { class == 1 && i % 5 == 0 };

        pclass.push(class);
        survived.push(lived as i64);
        let title = if female {
            if i % 6 == 0 { "Miss" } else { "Mrs" }
        } else {
            TITLES[[0, 0, 0, 3, 4][i % 5]]
        };
        name.push(format!("Family{}, {}. Passenger {}", i / 2, title, i));
        sex.push(if female { "female" } else { "male" });
        age.push(if i % 7 == 3 { None } else { Some(18.0 + ((i * 11) % 50) as f64) });
        sibsp.push((i % 3 == 0) as i64);
        parch.push((i % 4 == 0) as i64 * 2);
        ticket.push(format!("T{}", 1000 + i));
        fare.push(if i == 11 { None } else { Some(100.0 / class as f64 + (i % 5) as f64) });
        cabin.push(if class == 1 { Some(format!("C{}", 20 + i)) } else { None });
        embarked.push(if i == 5 { None } else { Some(PORTS[i % 3]) });
        let rescued = (lived && i % 3 != 0) || (!lived && i % 7 == 0);
        boat.push(if rescued { Some(((i % 13) + 1).to_string()) } else { None });
        home_dest.push(if i % 3 == 1 { None } else { Some(format!("City {}", i % 4)) });
    }

    df! {
        "pclass" => pclass,
        "survived" => survived,
        "name" => name,
        "sex" => sex,
        "age" => age,
        "sibsp" => sibsp,
        "parch" => parch,
        "ticket" => ticket,
        "fare" => fare,
        "cabin" => cabin,
        "embarked" => embarked,
        "boat" => boat,
        "home.dest" => home_dest,
    }
    .unwrap()
}

/// The four-passenger table used by the end-to-end scenario tests.
pub fn create_four_row_dataframe() -> DataFrame {
    df! {
        "survived" => [0i64, 1, 1, 0],
        "sex" => ["male", "female", "female", "male"],
        "age" => [Some(22.0f64), None, Some(38.0), Some(35.0)],
        "fare" => [7.25f64, 71.28, 53.1, 8.05],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = write_csv(df, temp_dir.path(), "titanic.csv");
    (temp_dir, csv_path)
}

/// Write a frame as CSV into `dir`
pub fn write_csv(df: &mut DataFrame, dir: &Path, name: &str) -> PathBuf {
    let csv_path = dir.join(name);
    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    csv_path
}

/// Default configuration reading `input` and writing into `output_dir`
pub fn test_config(input: &Path, output_dir: &Path) -> PipelineConfig {
    surveyfit::utils::set_quiet(true);
    PipelineConfig {
        input: input.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

/// Count of null cells in a column
pub fn null_count(df: &DataFrame, column: &str) -> usize {
    df.column(column).unwrap().null_count()
}
