use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dxrank_core::config::{expand_path, Config, Settings};
use dxrank_core::traits::VectorIndex;
use dxrank_core::types::{EntitySignal, IndexHit};
use dxrank_engine::{QueryOptions, RankingEngine};
use dxrank_hierarchy::code_format::{is_well_formed, normalize_code};
use dxrank_hierarchy::icd10::chapter_for_code;
use dxrank_hierarchy::{load_path, Hierarchy};

const USAGE: &str = "Usage: dxrank <validate [dataset] | chapter <code> | rank <request.json> [dataset]>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

/// Neighbours recorded from an external index, replayed for one request.
struct RecordedIndex {
    hits: Vec<IndexHit>,
}

impl VectorIndex for RecordedIndex {
    fn search_vec(&self, _query_vec: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>> {
        let mut hits = self.hits.clone();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct RankRequest {
    query_text: String,
    embedding: Vec<f32>,
    neighbors: Vec<IndexHit>,
    /// Raw extraction payload; anything unusable just disables fusion.
    #[serde(default)]
    entities: Option<serde_json::Value>,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    min_confidence: Option<f64>,
    #[serde(default)]
    enable_fusion: Option<bool>,
}

fn dataset_path(arg: Option<&String>, settings: &Settings) -> PathBuf {
    match arg {
        Some(p) => expand_path(p),
        None => expand_path(&settings.data.dataset_path),
    }
}

fn load_hierarchy(path: &Path) -> anyhow::Result<Hierarchy> {
    info!(path = %path.display(), "loading code hierarchy");
    load_path(path).with_context(|| format!("cannot load dataset {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "validate" => {
            let path = dataset_path(args.first(), &settings);
            let h = load_hierarchy(&path)?;
            println!("{}: ok", path.display());
            println!("  codes:      {}", h.code_count());
            println!("  categories: {}", h.category_count());
            println!("  chapters:   {}", h.chapter_count());
        }
        "chapter" => {
            let Some(raw) = args.first() else {
                eprintln!("Usage: dxrank chapter <code>");
                std::process::exit(1)
            };
            let code = normalize_code(raw);
            if !is_well_formed(&code) {
                anyhow::bail!("'{}' is not a well-formed code", raw);
            }
            let path = dataset_path(None, &settings);
            let from_dataset = match load_hierarchy(&path) {
                Ok(h) => h.lookup(&code).map(|idx| h.ancestors(idx).1.display_name()),
                Err(e) => {
                    warn!(error = %e, "dataset unavailable, using the built-in chapter table");
                    None
                }
            };
            match from_dataset.or_else(|| chapter_for_code(&code).map(|def| def.display_name())) {
                Some(chapter) => println!("{}\t{}", code, chapter),
                None => anyhow::bail!("no chapter covers '{}'", code),
            }
        }
        "rank" => {
            let Some(request_path) = args.first() else {
                eprintln!("Usage: dxrank rank <request.json> [dataset]");
                std::process::exit(1)
            };
            let text = fs::read_to_string(expand_path(request_path))
                .with_context(|| format!("cannot read request {}", request_path))?;
            let request: RankRequest = serde_json::from_str(&text).context("malformed rank request")?;

            let h = load_hierarchy(&dataset_path(args.get(1), &settings))?;
            let engine = RankingEngine::new(Arc::new(h), settings.ranking.clone())?
                .with_dimension(settings.embedding.dimension)?;
            let options = QueryOptions::new(request.top_k, request.min_confidence, request.enable_fusion)?;
            let signal = match &request.entities {
                Some(payload) => EntitySignal::from_json(payload),
                None => EntitySignal::none(),
            };
            let index = RecordedIndex { hits: request.neighbors };
            let outcome = engine.run(&index, &request.embedding, &request.query_text, &signal, &options)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        _ => {
            eprintln!("Unknown command: {}\n{}", cmd, USAGE);
            std::process::exit(1);
        }
    }
    Ok(())
}
