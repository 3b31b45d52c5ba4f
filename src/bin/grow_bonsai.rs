//! Headless bonsai generation driver
//!
//! Generates trees, places them in a scene graph the way a render host would,
//! and prints what the host would draw.
//!
//! Usage:
//!     grow_bonsai [OPTIONS]
//!
//! Options:
//!     -s, --style <STYLE>        Preset: bonsai, windswept or sparse (default: bonsai)
//!     -c, --config <FILE>        Load a JSON TreeConfig (overrides --style)
//!     -n, --count <N>            Number of trees, seeds counting up from --seed (default: 1)
//!     --seed <SEED>              Seed for the first tree (default: preset seed)
//!     --depth <DEPTH>            Override max_depth
//!     --save-config <FILE>       Write the effective config as JSON
//!     -h, --help                 Show this help message

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use bonsai::core::logging;
use bonsai::procgen::{generate_batch, TreeConfig, TreeStats, TreeStyle};
use bonsai::scene::{SceneGraph, TreeNode};
use glam::Vec3;

fn print_help() {
    eprintln!("grow_bonsai - Headless bonsai generation driver");
    eprintln!();
    eprintln!("Usage: grow_bonsai [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    -s, --style <STYLE>        Preset: bonsai, windswept or sparse (default: bonsai)");
    eprintln!("    -c, --config <FILE>        Load a JSON TreeConfig (overrides --style)");
    eprintln!("    -n, --count <N>            Number of trees, seeds counting up from --seed (default: 1)");
    eprintln!("    --seed <SEED>              Seed for the first tree (default: preset seed)");
    eprintln!("    --depth <DEPTH>            Override max_depth");
    eprintln!("    --save-config <FILE>       Write the effective config as JSON");
    eprintln!("    -h, --help                 Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    grow_bonsai -s windswept --seed 42");
    eprintln!("    grow_bonsai -c my_tree.json -n 50");
}

#[derive(Debug)]
struct Args {
    style: TreeStyle,
    config_path: Option<PathBuf>,
    count: u32,
    seed: Option<u64>,
    depth: Option<u32>,
    save_config: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut parsed = Args {
        style: TreeStyle::Bonsai,
        config_path: None,
        count: 1,
        seed: None,
        depth: None,
        save_config: None,
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i).cloned().ok_or_else(|| format!("Missing value for {}", flag))
        };
        match flag {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-s" | "--style" => {
                let name = value()?;
                parsed.style = TreeStyle::parse(&name)
                    .ok_or_else(|| format!("Unknown style: {}. Valid styles: bonsai, windswept, sparse", name))?;
            }
            "-c" | "--config" => parsed.config_path = Some(PathBuf::from(value()?)),
            "-n" | "--count" => {
                let v = value()?;
                parsed.count = v.parse().map_err(|_| format!("Invalid count: {}", v))?;
            }
            "--seed" => {
                let v = value()?;
                parsed.seed = Some(v.parse().map_err(|_| format!("Invalid seed: {}", v))?);
            }
            "--depth" => {
                let v = value()?;
                parsed.depth = Some(v.parse().map_err(|_| format!("Invalid depth: {}", v))?);
            }
            "--save-config" => parsed.save_config = Some(PathBuf::from(value()?)),
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    if parsed.count == 0 {
        return Err("--count must be at least 1".to_string());
    }
    Ok(parsed)
}

fn base_config(args: &Args) -> bonsai::core::Result<TreeConfig> {
    let mut config = match &args.config_path {
        Some(path) => TreeConfig::load(path)?,
        None => TreeConfig::from_style(args.style),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(depth) = args.depth {
        config.max_depth = depth;
    }
    config.validate()?;
    Ok(config)
}

fn print_stats(label: &str, stats: &TreeStats) {
    println!(
        "{}: {} segments (depth {}), {} leaf clusters, wood {} verts / {} tris, leaves {} verts / {} tris",
        label,
        stats.segment_count,
        stats.max_depth,
        stats.leaf_cluster_count,
        stats.wood_vertices,
        stats.wood_triangles,
        stats.leaf_vertices,
        stats.leaf_triangles,
    );
}

/// One tree placed the way a viewer would show it
fn grow_single(config: TreeConfig) -> bonsai::core::Result<()> {
    let mut tree = TreeNode::new(config);
    tree.generate()?;
    tree.set_position(Vec3::new(0.0, -10.0, 0.0));
    tree.set_scale(Vec3::splat(0.65));

    let mut scene = SceneGraph::new();
    let id = scene.attach(scene.root(), &tree);

    if let Some(stats) = tree.stats() {
        print_stats(&format!("seed {}", tree.config().seed), stats);
    }
    for item in scene.flatten() {
        let size = item.world_bounds.size();
        println!(
            "  draw {:<7} {:>6} indices, world bounds {:.2} x {:.2} x {:.2}",
            item.mesh.kind.to_string(),
            item.mesh.buffer().indices.len(),
            size.x,
            size.y,
            size.z
        );
    }

    scene.detach(id);
    tree.dispose();
    Ok(())
}

fn grow_batch(config: &TreeConfig, count: u32) {
    let configs: Vec<_> = (0..u64::from(count))
        .map(|i| config.clone().with_seed(config.seed.wrapping_add(i)))
        .collect();

    let start = Instant::now();
    let results = generate_batch(&configs);
    let elapsed = start.elapsed();

    let mut failed = 0;
    for (config, result) in configs.iter().zip(results) {
        match result {
            Ok(tree) => print_stats(&format!("seed {}", config.seed), &tree.stats),
            Err(e) => {
                failed += 1;
                eprintln!("seed {}: {}", config.seed, e);
            }
        }
    }
    println!(
        "Generated {} trees in {:.2}s ({:.1} trees/sec), {} failed",
        count,
        elapsed.as_secs_f64(),
        f64::from(count) / elapsed.as_secs_f64().max(1e-9),
        failed
    );
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    let config = match base_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.save_config {
        if let Err(e) = config.save(path) {
            eprintln!("Error: failed to save config to {}: {}", path.display(), e);
            std::process::exit(1);
        }
        log::info!("Saved config to {}", path.display());
    }

    if args.count == 1 {
        if let Err(e) = grow_single(config) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    } else {
        grow_batch(&config, args.count);
    }
}
