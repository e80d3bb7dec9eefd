use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use mdl_compiler::loader::load_map_directory;
use mdl_compiler::processor::CompileOptions;
use mdl_compiler::templates::{ObjectRegistry, Player, bind_objects, execute_interaction};
use mdl_compiler::writer;

fn fixture_objects() -> PathBuf {
    PathBuf::from("tests/fixtures/objects")
}

#[test]
fn loads_maps_init_first() {
    let maps = load_map_directory(Path::new("tests/fixtures/maps"), &CompileOptions::new())
        .expect("valid maps");
    let ids: Vec<_> = maps.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["plaza", "harbor"]);
    assert_eq!(
        maps[0].source_path.as_deref(),
        Some(Path::new("tests/fixtures/maps").join("init.map").display().to_string().as_str())
    );
}

#[test]
fn missing_map_directory_is_empty() {
    let maps = load_map_directory(Path::new("tests/fixtures/nowhere"), &CompileOptions::new())
        .expect("no error");
    assert!(maps.is_empty());
}

#[test]
fn registry_skips_broken_files() {
    let registry = ObjectRegistry::new(vec![fixture_objects()]);
    let set = registry.load();
    assert_eq!(set.len(), 1);
    assert!(set.get("lamp").is_some());
    assert!(set.get("broken").is_none());
}

#[test]
fn force_reload_sees_new_templates() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bench.obj"), r#"{ "id": "bench", "name": "Banco" }"#).unwrap();

    let registry = ObjectRegistry::new(vec![dir.path().to_path_buf()]);
    assert_eq!(registry.load().len(), 1);

    fs::write(dir.path().join("well.json"), r#"{ "id": "well", "name": "Pozo" }"#).unwrap();
    // cached until forced
    assert_eq!(registry.load().len(), 1);
    let reloaded = registry.force_reload();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("well").map(|t| t.name.as_str()), Some("Pozo"));
}

#[test]
fn bound_plaza_interacts_and_writes() {
    let maps = load_map_directory(Path::new("tests/fixtures/maps"), &CompileOptions::new())
        .expect("valid maps");
    let plaza = &maps[0];
    let templates = ObjectRegistry::new(vec![fixture_objects()]).load();
    let bound = bind_objects(plaza, &templates);

    let lamp = bound.get("lamp").expect("lamp");
    assert_eq!(lamp.public.name, "Farol de la plaza");
    assert_eq!(lamp.public.description, "Un farol encendido");
    assert_eq!(lamp.public.metadata["category"], "light");

    let outcome = execute_interaction(&bound, "lamp", &Player::named("Ana"), "interact");
    assert!(outcome.ok);
    assert!(outcome.broadcast);
    assert_eq!(outcome.message, "Ana enciende el farol");

    // no template for the sign
    let silent = execute_interaction(&bound, "sign", &Player::default(), "interact");
    assert!(!silent.ok);

    let out = tempfile::tempdir().unwrap();
    let model_path = writer::json::emit(plaza, out.path()).unwrap();
    let public_path = writer::json::emit_bound(&bound, out.path()).unwrap();
    assert_eq!(model_path.file_name().unwrap(), "plaza.json");
    assert_eq!(public_path.file_name().unwrap(), "plaza.public.json");

    let written: mdl_compiler::model::MapModel =
        serde_json::from_str(&fs::read_to_string(&model_path).unwrap()).unwrap();
    assert_eq!(&written, plaza);

    let public: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&public_path).unwrap()).unwrap();
    assert_eq!(public["objects"][0]["name"], "Farol de la plaza");
    assert_eq!(public["objects"][0]["interaction"]["title"], "Farol");
}
