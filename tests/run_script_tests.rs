use quill::{Environment, Evaluator, Parser};

use regex::Regex;
use std::path::Path;
use test_generator::test_resources;

/// Runs every script and compares its final value against the script's
/// trailing `// expect:` comment.
#[test_resources("tests/script_test_cases/**/*.qu")]
fn test_script_final_value(file: &str) {
    let source = std::fs::read_to_string(file).unwrap();
    let expected = expected_value(&source)
        .unwrap_or_else(|| panic!("{} has no `// expect:` comment", file));

    let source_root = Path::new(file)
        .parent()
        .map(|parent| parent.to_path_buf())
        .unwrap_or_default();
    let program = Parser::new(&source, file)
        .with_source_root(source_root)
        .parse()
        .unwrap_or_else(|errors| panic!("{} failed to parse: {:?}", file, errors));

    let result = Evaluator::new().eval_program(&program, &Environment::new());
    assert_eq!(result.inspect(), expected, "final value of {}", file);
}

fn expected_value(source: &str) -> Option<String> {
    let regexer = Regex::new(r"// expect: (.*)$").unwrap();
    source
        .lines()
        .rev()
        .find_map(|line| regexer.captures(line))
        .map(|capture| capture.get(1).unwrap().as_str().to_owned())
}
