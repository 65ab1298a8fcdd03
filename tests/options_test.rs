use pretty_assertions::assert_eq;
use sqlsplice::prelude::*;
use sqlsplice::SpliceError;

#[test]
fn test_load_options_file() {
    let path = std::env::temp_dir().join(format!("sqlsplice-options-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
        parameter_symbol = ":"
        auto_parameter_prefix = "arg"
        reuse_identical_parameters = true
        "#,
    )
    .unwrap();

    let options = Options::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let b = SqlBuilder::parse_with(options.into(), sql!("{} = {}", 1, 1).unwrap());
    assert_eq!(b.sql(), ":arg0 = :arg0");
}

#[test]
fn test_missing_options_file_is_io_error() {
    let err = Options::load("/nonexistent/sqlsplice/options.toml").unwrap_err();
    assert!(matches!(err, SpliceError::Io(_)));
}

#[test]
fn test_options_change_applies_to_later_edits() {
    let mut b = SqlBuilder::parse(sql!("a = {}", 1).unwrap());
    b.set_options(Options::builder().parameter_symbol("$").build());
    b.append(sql!("OR a = {}", 1).unwrap());
    // references are generated at render time with the current options
    assert_eq!(b.sql(), "a = $p0 OR a = $p1");
}

#[test]
fn test_dedent_option() {
    let options = Options::builder().auto_dedent(true).build();
    let template = sql!(
        "
        SELECT *
        FROM users
        WHERE id = {}
        ",
        3
    )
    .unwrap();
    let b = SqlBuilder::parse_with(options, template);
    assert_eq!(b.sql(), "SELECT *\nFROM users\nWHERE id = @p0");
}
