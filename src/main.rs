use std::fs;
use std::path::Path;

use privad::engine::AdEngine;
use privad::history::RetentionPolicy;
use privad::net::page_fetch::fetch_page;
use privad::net::source::AdSource;
use privad::page;
use privad::store::{JsonFileStore, MemoryStore, StateStore};

const USAGE: &str = "\
privad — local interest ad engine

Usage:
  privad <url | page.html> [options]
  privad --category <name> [options]

Options:
  --category <name>    skip classification, use this category
  --server <url>       ad source base URL (default http://localhost:3000)
  --store <path>       persist state to a JSON file (default: in-memory)
  --retention <r>      history retention: week | month | year
  --offline            pick from the local weighted pools, no network
  -h, --help           show this help
";

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(msg) = run(&args) {
        eprintln!("privad: {}", msg);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let mut target: Option<String> = None;
    let mut category: Option<String> = None;
    let mut server = "http://localhost:3000".to_string();
    let mut store_path: Option<String> = None;
    let mut retention: Option<RetentionPolicy> = None;
    let mut offline = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--category" => category = Some(next_value(args, &mut i)?),
            "--server" => server = next_value(args, &mut i)?,
            "--store" => store_path = Some(next_value(args, &mut i)?),
            "--retention" => {
                let value = next_value(args, &mut i)?;
                retention = Some(
                    RetentionPolicy::parse(&value)
                        .ok_or_else(|| format!("unknown retention '{}'", value))?,
                );
            }
            "--offline" => offline = true,
            "-h" | "--help" => {
                print!("{}", USAGE);
                return Ok(());
            }
            other if !other.starts_with('-') => target = Some(other.to_string()),
            other => return Err(format!("unknown option '{}' (try --help)", other)),
        }
        i += 1;
    }

    let store: Box<dyn StateStore> = match store_path {
        Some(path) => Box::new(JsonFileStore::open(path)),
        None => Box::new(MemoryStore::new()),
    };
    let source = AdSource::new(&server).map_err(|e| e.to_string())?;

    let mut engine = AdEngine::new(store, source);
    if let Some(retention) = retention {
        engine = engine.with_retention(retention);
    }

    let category = match (category, target) {
        (Some(c), _) => c,
        (None, Some(t)) => {
            let html = if Path::new(&t).is_file() {
                fs::read_to_string(&t).map_err(|e| format!("cannot read {}: {}", t, e))?
            } else {
                fetch_page(&t).map_err(|e| e.to_string())?.html
            };
            let inferred = page::classify_page(&html);
            println!("Inferred interest: {}", inferred);
            inferred.to_string()
        }
        (None, None) => {
            return Err("expected a URL, an HTML file, or --category (try --help)".to_string())
        }
    };

    if offline {
        println!("Ad: {}", engine.local_ad(&category));
        return Ok(());
    }

    engine.fetch_ad(&category);

    match engine.current_ad() {
        Some(ad) => {
            println!("Ad: {}", ad.text);
            if let Some(prompt) = ad.prompt {
                println!("Prompt: {}", prompt);
            }
            if let Some(image) = ad.image {
                println!("Image: {} bytes embedded", image.len());
            }
        }
        None => println!("No ad available."),
    }
    if let Some(err) = engine.last_error() {
        eprintln!("Last error: {}", err);
    }

    let recent = engine.recent_history(5);
    if !recent.is_empty() {
        println!("\nRecent history:");
        for entry in &recent {
            println!("  [{}] {}", entry.category, entry.ad.text);
        }

        println!("\nCategory distribution:");
        for (cat, count, pct) in engine.category_distribution() {
            println!("  {:<24} {:>3}  ({:.1}%)", cat, count, pct);
        }
    }

    Ok(())
}

fn next_value(args: &[String], i: &mut usize) -> Result<String, String> {
    let flag = args[*i].clone();
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} expects a value", flag))
}
