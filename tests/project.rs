use nlblocks_core::generate_from_project_json;
use nlblocks_core::generator::GenerateOptions;
use nlblocks_core::project::ProjectFile;
use nlblocks_core::registry::{BreedKind, Registries, VariableScope};
use nlblocks_core::workspace::{BlockInstance, Workspace};

const SAMPLE: &str = r#"{
  "registries": {
    "breeds": [
      { "plural": "wolves", "singular": "wolf", "kind": "turtle" }
    ],
    "variables": [
      { "name": "population", "scope": "Global" },
      { "name": "energy", "scope": { "Breed": "wolves" } }
    ]
  },
  "workspace": {
    "blocks": {
      "setup": {
        "type": "procedure_define",
        "fields": { "NAME": "setup" },
        "statements": { "STACK": "create" },
        "topLevel": true,
        "x": 10,
        "y": 10
      },
      "create": {
        "type": "agent_create",
        "fields": { "BREED": "wolves" },
        "inputs": { "COUNT": "ten" }
      },
      "ten": { "type": "math_number", "fields": { "NUM": 10 } }
    }
  }
}"#;

const SAMPLE_OUTPUT: &str = "\
globals [ population ]

breed [ wolves wolf ]

wolves-own [ energy ]

to setup
  create-wolves 10
end";

#[test]
fn sample_project_generates_from_json() {
    let out = generate_from_project_json(SAMPLE, GenerateOptions::default()).unwrap();
    assert_eq!(out, SAMPLE_OUTPUT);
}

#[test]
fn saved_project_loads_back_identically() {
    let mut registries = Registries::new();
    registries.add_breed("roads", "road", BreedKind::UndirectedLink).unwrap();
    registries.add_variable("speed", VariableScope::Turtles).unwrap();
    let mut workspace = Workspace::new();
    workspace
        .insert("tick", BlockInstance::new("observer_tick").top_level_at(0, 0).next("show"))
        .insert("show", BlockInstance::new("output_show").input("VALUE", "msg"))
        .insert("msg", BlockInstance::new("text").field("TEXT", "hi"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.json");
    let project = ProjectFile::capture(&registries, &workspace);
    project.save(&path).unwrap();

    let loaded = ProjectFile::load(&path).unwrap();
    assert_eq!(loaded, project);

    let (restored, restored_workspace) = loaded.into_parts().unwrap();
    assert_eq!(restored.breeds(), registries.breeds());
    assert_eq!(restored.variables(None), registries.variables(None));
    assert_eq!(restored_workspace, workspace);
}

#[test]
fn inconsistent_registries_are_rejected() {
    let json = r#"{
      "registries": {
        "breeds": [ { "plural": "ask", "singular": "asker", "kind": "turtle" } ]
      }
    }"#;
    let project = ProjectFile::from_json(json).unwrap();
    let err = project.into_parts().unwrap_err();
    assert!(format!("{:#}", err).contains("reserved word"));

    let json = r#"{
      "registries": {
        "variables": [ { "name": "energy", "scope": { "Breed": "ghosts" } } ]
      }
    }"#;
    assert!(ProjectFile::from_json(json).unwrap().into_parts().is_err());
}

#[test]
fn malformed_files_report_context() {
    assert!(ProjectFile::from_json("{ not json").is_err());

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let err = ProjectFile::load(&missing).unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}

#[test]
fn empty_project_generates_nothing() {
    let out = generate_from_project_json("{}", GenerateOptions::default()).unwrap();
    assert_eq!(out, "");
}

#[test]
fn unknown_blocks_surface_as_errors() {
    let json = r#"{
      "workspace": {
        "blocks": { "a": { "type": "legacy_block", "topLevel": true } }
      }
    }"#;
    let err = generate_from_project_json(json, GenerateOptions::default()).unwrap_err();
    assert!(err.to_string().contains("legacy_block"));
}
