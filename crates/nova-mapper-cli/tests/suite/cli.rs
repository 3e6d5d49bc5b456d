use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn nova_mapper() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("nova-mapper"))
}

const CAR_WORKSPACE: &str = r#"{
  "types": [
    { "kind": "class", "name": "Car", "members": [{ "name": "Seats", "type": "int" }] },
    {
      "kind": "class",
      "name": "CarDto",
      "members": [{ "name": "Seats", "type": "int" }, { "name": "Doors", "type": "int" }]
    }
  ],
  "mappers": [{
    "name": "CarMapper",
    "methods": [
      { "name": "Map", "params": [{ "name": "source", "type": "Car" }], "returns": "CarDto" }
    ]
  }]
}"#;

fn workspace(contents: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("workspace.json").write_str(contents).unwrap();
    temp
}

#[test]
fn help_mentions_commands() {
    nova_mapper().arg("--help").assert().success().stdout(
        predicate::str::contains("plan")
            .and(predicate::str::contains("check"))
            .and(predicate::str::contains("schema")),
    );
}

#[test]
fn plan_prints_methods_and_diagnostics() {
    let temp = workspace(CAR_WORKSPACE);
    nova_mapper()
        .arg("plan")
        .arg(temp.child("workspace.json").path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("partial class CarMapper")
                .and(predicate::str::contains("public partial CarDto Map(Car source)"))
                .and(predicate::str::contains("target.Seats = source.Seats;"))
                .and(predicate::str::contains(
                    "CarMapper.Map: warning[SourceMemberNotFound]",
                ))
                .and(predicate::str::contains("summary: 0 errors, 1 warnings, 0 infos")),
        );
}

#[test]
fn plan_json_lists_methods() {
    let temp = workspace(CAR_WORKSPACE);
    let output = nova_mapper()
        .arg("plan")
        .arg("--json")
        .arg(temp.child("workspace.json").path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["warnings"], 1);
    assert_eq!(json["mappers"][0]["mapper"], "CarMapper");
    assert_eq!(json["mappers"][0]["methods"][0]["name"], "Map");
    assert_eq!(json["mappers"][0]["methods"][0]["kind"], "new_instance");
}

#[test]
fn check_fails_on_error_diagnostics() {
    let temp = workspace(
        r#"{
          "types": [{ "kind": "class", "name": "Car", "members": [{ "name": "Seats", "type": "int" }] }],
          "mappers": [{
            "name": "M",
            "methods": [{ "name": "Map", "params": [{ "name": "source", "type": "Car" }], "returns": "int" }]
          }]
        }"#,
    );
    let output = nova_mapper()
        .arg("check")
        .arg("--json")
        .arg(temp.child("workspace.json").path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["errors"], 1);
    assert_eq!(
        json["diagnostics"][0]["diagnostic"]["code"],
        "CouldNotCreateMapping"
    );
    assert_eq!(json["diagnostics"][0]["method"], "Map");
}

#[test]
fn config_next_to_the_workspace_is_applied() {
    let temp = workspace(CAR_WORKSPACE);
    temp.child("nova-mapper.toml")
        .write_str(
            r#"
[options.severity_overrides]
SourceMemberNotFound = "error"
"#,
        )
        .unwrap();

    nova_mapper()
        .arg("check")
        .arg(temp.child("workspace.json").path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "CarMapper.Map: error[SourceMemberNotFound]",
        ));
}

#[test]
fn explicit_invalid_config_is_an_input_error() {
    let temp = workspace(CAR_WORKSPACE);
    temp.child("strict.toml")
        .write_str(
            r#"
[options]
enabled_conversions = ["span"]
disabled_conversions = ["span"]
"#,
        )
        .unwrap();

    nova_mapper()
        .arg("check")
        .arg("--config")
        .arg(temp.child("strict.toml").path())
        .arg(temp.child("workspace.json").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn unknown_types_are_input_errors() {
    let temp = workspace(
        r#"{ "mappers": [{ "name": "M", "methods": [
            { "name": "Map", "params": [{ "name": "source", "type": "Car" }], "returns": "int" }
        ] }] }"#,
    );
    nova_mapper()
        .arg("plan")
        .arg(temp.child("workspace.json").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown type `Car`"));
}

#[test]
fn missing_workspace_files_are_input_errors() {
    let temp = TempDir::new().unwrap();
    nova_mapper()
        .arg("check")
        .arg(temp.child("missing.json").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read workspace file"));
}

#[test]
fn schema_describes_the_config_file() {
    let output = nova_mapper().arg("schema").output().unwrap();
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "NovaMapperConfig");
    assert!(schema["definitions"]["MapperOptionsLayer"]["properties"]
        .get("deep_cloning")
        .is_some());
}
