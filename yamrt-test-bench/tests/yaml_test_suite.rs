extern crate libtest_mimic;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use libtest_mimic::{Arguments, Failed, Trial};
use yamrt_core::{Input, Parser};
use yamrt_test_bench::write_str_from_events;

const TEST_SIZE: usize = 440;

#[derive(Default)]
struct TestData {
    desc: String,
    input_yaml: PathBuf,
    is_error: bool,
    test_event: Option<PathBuf>,
}

fn perform_test(data: TestData) -> Result<(), Failed> {
    let input = match Input::from_bytes(&fs::read(&data.input_yaml)?) {
        Ok(input) => input,
        Err(_) if data.is_error => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    let mut actual = String::new();
    write_str_from_events(&mut actual, Parser::new(input), false);
    let failed = actual.ends_with("\nERR");

    if data.is_error {
        return if failed {
            Ok(())
        } else {
            Err(format!("expected an error, got:{actual}").into())
        };
    }
    if failed {
        return Err(format!("unexpected error after:{actual}").into());
    }
    let Some(event_path) = data.test_event else {
        return Ok(());
    };
    let expected: String = fs::read_to_string(event_path)?
        .lines()
        .filter(|line| !matches!(*line, "+STR" | "-STR"))
        .flat_map(|line| ["\n", line])
        .collect();
    if actual == expected {
        Ok(())
    } else {
        Err(format!("{}\nexpected:{expected}\nactual:{actual}", data.desc).into())
    }
}

fn collect_test_suite(
    path: &Path,
    ignore_list: &[&str],
    tests: &mut Vec<Trial>,
) -> Result<(), Box<dyn Error>> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && !ignore_list.contains(&dir_name.as_str()) {
            collect_test(dir_name, &entry.path(), ignore_list, tests)?;
        }
    }
    Ok(())
}

fn collect_test(
    dir_name: String,
    test_dir_path: &Path,
    ignore_list: &[&str],
    tests: &mut Vec<Trial>,
) -> Result<(), Box<dyn Error>> {
    let mut test_data = TestData::default();
    let mut is_dir = false;
    for entry in fs::read_dir(test_dir_path)? {
        let entry = entry?;
        let filename = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && !ignore_list.contains(&filename.as_str()) {
            let dir_name = format!("{dir_name}/{filename}");
            collect_test(dir_name, &entry.path(), ignore_list, tests)?;
            is_dir = true;
        } else {
            match filename.as_str() {
                "===" => {
                    if let Ok(desc) = fs::read_to_string(entry.path()) {
                        test_data.desc = desc.trim().to_string();
                    }
                }
                "in.yaml" => test_data.input_yaml = entry.path(),
                "error" => test_data.is_error = true,
                "test.event" => test_data.test_event = Some(entry.path()),
                _ => {}
            }
        }
    }
    if !is_dir && !test_data.input_yaml.as_os_str().is_empty() {
        let name = format!("{} ({})", dir_name, test_data.desc);
        tests.push(Trial::test(name, move || perform_test(test_data)));
    }
    Ok(())
}

fn collect_tests(path: &Path, filter_list: &[&str]) -> Result<Vec<Trial>, Box<dyn Error>> {
    let mut tests = Vec::with_capacity(TEST_SIZE);
    if path.is_dir() {
        collect_test_suite(path, filter_list, &mut tests)?;
    }
    Ok(tests)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Arguments::from_args();
    let filter_list = [".git", "name", "tags"];

    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("yaml-test-suite");

    let tests = collect_tests(&path, &filter_list)?;

    libtest_mimic::run(&args, tests).exit();
}
