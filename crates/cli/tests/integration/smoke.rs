// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tempfile::TempDir;

const CATALOG: &str = r#"[
  {
    "name": "t",
    "columns": [
      { "name": "id", "typ": "Int", "default": "nextval('t_id_seq')" },
      { "name": "name", "typ": "Text" },
      { "name": "tags", "typ": "Json", "nullable": true },
      { "name": "count", "typ": "Int", "nullable": true }
    ],
    "constraints": [
      { "name": "t_pkey", "kind": "PrimaryKey", "columns": ["id"] }
    ]
  }
]"#;

const PERMISSIONS: &str = r#"[
  {
    "role": "editor",
    "tables": {
      "t": {
        "insert": { "columns": ["name", "tags"] },
        "update": { "columns": ["name", "count"] },
        "delete": {},
        "select": { "columns": ["id", "name", "tags", "count"] }
      }
    }
  },
  {
    "role": "reader",
    "tables": {
      "t": {
        "select": { "columns": ["id", "name"] }
      }
    }
  }
]"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let cargo_tmp_dir = env!("CARGO_TARGET_TMPDIR");
        let dir = tempfile::tempdir_in(cargo_tmp_dir).expect("Failed to create tempdir");
        std::fs::write(dir.path().join("catalog.json"), CATALOG).expect("Failed to write catalog");
        std::fs::write(dir.path().join("permissions.json"), PERMISSIONS)
            .expect("Failed to write permissions");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run<I>(&self, args: I) -> Output
    where
        I: IntoIterator<Item = &'static str>,
    {
        mutation_schema(self.dir.path())
            .args(args)
            .arg("--catalog")
            .arg(self.path("catalog.json"))
            .arg("--permissions")
            .arg(self.path("permissions.json"))
            .output()
            .expect("Failed to run mutation-schema")
    }
}

fn mutation_schema(cwd: impl AsRef<Path>) -> Command {
    let bin = env!("CARGO_BIN_EXE_mutation-schema");

    let mut cmd = Command::new(bin);
    cmd.current_dir(cwd)
        .env_remove("EXO_MUTATION_NAMING_CONVENTION")
        .env_remove("EXO_MUTATION_UPDATE_MANY");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn schema_of_every_role() {
    let project = Project::new();

    let output = project.run(["schema"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let sdl = stdout(&output);
    assert!(sdl.contains("# role: editor"));
    assert!(sdl.contains("# role: reader"));
    assert!(sdl.contains("  insert_t_one(\n    object: t_insert_input!"));
    assert!(sdl.contains("  update_t_by_pk(\n"));
    assert!(sdl.contains("input t_set_input {"));
}

#[test]
fn schema_as_json_to_file() {
    let project = Project::new();
    let output_file = project.path("out/schema.json");

    let output = project.run([
        "schema",
        "--role",
        "editor",
        "--format",
        "json",
        "-o",
        "out/schema.json",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let content = std::fs::read_to_string(&output_file).expect("No schema file written");
    let fields: serde_json::Value = serde_json::from_str(&content).expect("Invalid JSON");
    let editor = fields["editor"].as_object().expect("No fields for editor");

    assert_eq!(
        editor.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "insert_t",
            "insert_t_one",
            "update_t",
            "update_t_by_pk",
            "update_t_many",
            "delete_t",
            "delete_t_by_pk"
        ]
    );
}

#[test]
fn lower_delete_with_variables() {
    let project = Project::new();

    let output = project.run([
        "lower",
        "--role",
        "editor",
        "--query",
        "mutation($id: Int!) { removed: delete_t(where: {id: {_eq: $id}}) { affected_rows } }",
        "--variables",
        r#"{"id": 5}"#,
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let lowered: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("Invalid JSON");
    assert_eq!(lowered["removed"]["Delete"]["table"], "t");
}

#[test]
fn lower_reports_argument_errors() {
    let project = Project::new();

    let output = project.run([
        "lower",
        "--role",
        "editor",
        "--query",
        "mutation { update_t(where: {}) { affected_rows } }",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("at least one of _set, _inc is required (at 'update_t')"));
}

#[test]
fn lower_unknown_role() {
    let project = Project::new();

    let output = project.run([
        "lower",
        "--role",
        "admin",
        "--query",
        "mutation { delete_t(where: {}) { affected_rows } }",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Role 'admin' not found"));
}
