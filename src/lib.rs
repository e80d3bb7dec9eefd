pub mod cli;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod processor;
pub mod templates;
pub mod writer;

use anyhow::Context;
use clap::Parser;

use processor::CompileOptions;
use processor::tile_parser::TileCatalog;
use templates::{ObjectRegistry, Player, bind_objects, execute_interaction};

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let mut opts = CompileOptions::new();
    if args.no_base_tiles {
        opts = opts.with_catalog(TileCatalog::empty());
    }

    // 1. ── Parse ──────────────────────────────────────────────────────
    let maps = if args.input.is_dir() {
        loader::load_map_directory(&args.input, &opts)
            .with_context(|| format!("Compiling maps in {}", args.input.display()))?
    } else {
        vec![
            loader::load_map_file(&args.input, &opts)
                .with_context(|| format!("Compiling {}", args.input.display()))?,
        ]
    };

    // 2. ── Bind templates ─────────────────────────────────────────────
    let registry = ObjectRegistry::new(ObjectRegistry::search_path(&args.objects));
    let templates = registry.load();
    let bound: Vec<_> = maps.iter().map(|map| bind_objects(map, &templates)).collect();

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;

    for map in &bound {
        writer::json::emit(&map.map, &args.output)
            .with_context(|| format!("Writing map `{}`", map.map.id))?;
        writer::json::emit_bound(map, &args.output)
            .with_context(|| format!("Writing public view of `{}`", map.map.id))?;
    }

    // 4. ── Interact ───────────────────────────────────────────────────
    if let Some(object_id) = &args.interact {
        let player = args.player.clone().map(Player::named).unwrap_or_default();
        let map = bound
            .iter()
            .find(|map| map.get(object_id).is_some())
            .with_context(|| format!("No map has an object `{object_id}`"))?;
        let outcome = execute_interaction(map, object_id, &player, &args.action);
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).with_context(|| "Encoding outcome")?
        );
    }

    Ok(())
}
