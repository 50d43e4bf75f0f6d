//! Memorai CLI
//!
//! Drives a `MemoryService` built from the TOML config (Qdrant + embedding
//! endpoint + SQLite) and the SQLite-backed knowledge graph.

mod output;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use log::LevelFilter;
use chrono::{DateTime, Utc};
use memorai::atoms::graph_types::{GraphEntity, NewRelation, Properties};
use memorai::engine::graph::SqliteGraphRepository;
use memorai::{
    EngineError, EngineResult, KnowledgeGraph, MemoraiConfig, MemoryService, MemoryType, NewRelationship,
    RecallOptions, RelationshipType, RememberOptions,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Memorai CLI
#[derive(Parser, Debug)]
#[command(name = "memorai")]
#[command(about = "Multi-tenant memory engine for AI agents")]
#[command(version)]
struct Cli {
    /// Enable verbose logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: <config dir>/memorai/config.toml)
    #[arg(long, env = "MEMORAI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Tenant every operation is scoped to
    #[arg(short, long, env = "MEMORAI_TENANT", global = true)]
    tenant: Option<String>,

    /// Agent identity for remember / recall / forget / context
    #[arg(short, long, env = "MEMORAI_AGENT", global = true)]
    agent: Option<String>,

    /// Output raw JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a memory
    Remember {
        content: String,

        /// Memory type; classified from the content when omitted
        #[arg(long = "type", value_parser = parse_memory_type)]
        memory_type: Option<MemoryType>,

        #[arg(long)]
        importance: Option<f32>,

        #[arg(long)]
        confidence: Option<f32>,

        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// −1.0 (negative) to 1.0 (positive)
        #[arg(long, allow_hyphen_values = true)]
        emotional_weight: Option<f32>,

        /// Expire the memory after this many hours
        #[arg(long)]
        ttl_hours: Option<f64>,

        /// Link the new memory under an existing one
        #[arg(long)]
        parent: Option<String>,
    },

    /// Semantic search over stored memories
    Recall {
        query: String,

        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity (0.0–1.0)
        #[arg(long)]
        threshold: Option<f32>,

        #[arg(long = "type", value_parser = parse_memory_type)]
        memory_type: Option<MemoryType>,

        /// Follow relationships from each hit
        #[arg(long)]
        expand: bool,

        #[arg(long)]
        depth: Option<usize>,
    },

    /// Delete a memory and its relationships
    Forget { memory_id: String },

    /// Assemble agent context
    Context {
        /// Focus query (default: recent conversation context)
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        max: Option<usize>,
    },

    /// Link two memories
    Relate {
        source: String,
        target: String,

        #[arg(long = "type", value_parser = parse_relationship_type, default_value = "related")]
        kind: RelationshipType,

        #[arg(long)]
        strength: Option<f32>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Parents, children and siblings of a memory
    Hierarchy { memory_id: String },

    /// Knowledge graph commands
    #[command(subcommand)]
    Graph(GraphCommands),

    /// Check vector store and embedding model
    Health,

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum GraphCommands {
    /// Add an entity
    AddEntity {
        name: String,

        #[arg(long = "type")]
        entity_type: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Add a directed relation between two entities
    AddRelation {
        source: String,
        target: String,

        #[arg(long = "type")]
        relation_type: String,

        #[arg(long)]
        weight: Option<f32>,

        #[arg(long)]
        confidence: Option<f32>,
    },

    /// Find entities by name and/or type
    Find {
        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        entity_type: Option<String>,
    },

    /// Enumerate paths between two entities
    Paths {
        source: String,
        target: String,

        #[arg(long, default_value_t = 3)]
        max_depth: usize,
    },

    /// Entity and relation counts
    Stats,
}

fn parse_memory_type(s: &str) -> Result<MemoryType, String> {
    s.parse()
}

fn parse_relationship_type(s: &str) -> Result<RelationshipType, String> {
    s.parse()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn require_tenant(tenant: &Option<String>) -> EngineResult<&str> {
    tenant
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| EngineError::validation("--tenant (or MEMORAI_TENANT) is required"))
}

async fn run(cli: Cli) -> EngineResult<()> {
    let Cli { config, tenant, agent, json, command, .. } = cli;

    let command = match command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "memorai", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Graph(cmd) => {
            let config = MemoraiConfig::load(config.as_deref())?;
            let tenant = require_tenant(&tenant)?;
            let repo = SqliteGraphRepository::open(&config.storage.resolved_database_path())?;
            let graph = KnowledgeGraph::new(Arc::new(repo))
                .with_max_paths(config.graph.max_paths)
                .with_max_expansions(config.graph.max_expansions);
            return run_graph(&graph, cmd, tenant, json);
        }
        other => other,
    };

    let config = MemoraiConfig::load(config.as_deref())?;
    let service = MemoryService::from_config(&config)?;
    let agent = agent.as_deref();

    if let Commands::Health = command {
        let health = service.health().await;
        return output::health(&health, json);
    }

    let tenant = require_tenant(&tenant)?;
    match command {
        Commands::Remember {
            content,
            memory_type,
            importance,
            confidence,
            tags,
            emotional_weight,
            ttl_hours,
            parent,
        } => {
            let ttl = ttl_hours.map(|h| expiry_after_hours(Utc::now(), h)).transpose()?;
            let options = RememberOptions {
                memory_type,
                importance,
                confidence,
                tags,
                emotional_weight,
                ttl,
                parent_id: parent,
            };
            let id = service.remember(&content, tenant, agent, options).await?;
            output::id("Remembered", &id, json)
        }
        Commands::Recall { query, limit, threshold, memory_type, expand, depth } => {
            let options = RecallOptions {
                limit,
                threshold,
                memory_type,
                expand_relationships: expand.then_some(true),
                expansion_depth: depth,
            };
            let results = service.recall(&query, tenant, agent, options).await?;
            output::results(&results, json)
        }
        Commands::Forget { memory_id } => {
            let removed = service.forget(&memory_id, tenant, agent).await?;
            output::forgot(&memory_id, removed, json)
        }
        Commands::Context { query, max } => {
            let ctx = service.context(tenant, agent, max, query.as_deref()).await?;
            output::context(&ctx, json)
        }
        Commands::Relate { source, target, kind, strength, note } => {
            let mut new = NewRelationship::new(source, target, kind, tenant);
            if let Some(s) = strength {
                new = new.with_strength(s);
            }
            if let Some(n) = note {
                new = new.with_note(n);
            }
            let rel = service.relationships().create_relationship(new)?;
            output::relationship(&rel, json)
        }
        Commands::Hierarchy { memory_id } => {
            let hierarchy = service.relationships().get_memory_hierarchy(&memory_id, tenant)?;
            output::hierarchy(&hierarchy, json)
        }
        Commands::Health | Commands::Graph(_) | Commands::Completions { .. } => Ok(()),
    }
}

/// `now + hours`, rejecting values that are not finite or overflow the clock.
fn expiry_after_hours(now: DateTime<Utc>, hours: f64) -> EngineResult<DateTime<Utc>> {
    let invalid = || EngineError::validation(format!("--ttl-hours {} is out of range", hours));
    let secs = hours * 3600.0;
    if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
        return Err(invalid());
    }
    chrono::Duration::try_seconds(secs as i64)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(invalid)
}

fn find_entities(
    graph: &KnowledgeGraph,
    tenant: &str,
    name: Option<&str>,
    entity_type: Option<&str>,
) -> EngineResult<Vec<GraphEntity>> {
    graph.find_entities(tenant, entity_type, name)
}

fn run_graph(graph: &KnowledgeGraph, cmd: GraphCommands, tenant: &str, json: bool) -> EngineResult<()> {
    match cmd {
        GraphCommands::AddEntity { name, entity_type, description } => {
            let mut props = Properties::default();
            props.description = description;
            let id = graph.add_entity(&name, &entity_type, props, tenant)?;
            output::id("Added entity", &id, json)
        }
        GraphCommands::AddRelation { source, target, relation_type, weight, confidence } => {
            let mut new = NewRelation::new(source, target, relation_type, tenant);
            if let Some(w) = weight {
                new = new.with_weight(w);
            }
            if let Some(c) = confidence {
                new = new.with_confidence(c);
            }
            let id = graph.add_relation(new)?;
            output::id("Added relation", &id, json)
        }
        GraphCommands::Find { name, entity_type } => {
            let entities = find_entities(graph, tenant, name.as_deref(), entity_type.as_deref())?;
            output::entities(&entities, json)
        }
        GraphCommands::Paths { source, target, max_depth } => {
            let report = graph.find_paths_report(tenant, &source, &target, max_depth)?;
            output::paths(&report, json)
        }
        GraphCommands::Stats => {
            let stats = graph.stats(tenant)?;
            output::graph_stats(&stats, json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_remember_flags() {
        let cli = Cli::try_parse_from([
            "memorai", "--tenant", "acme", "remember", "ship it friday", "--type", "task", "--tag", "release",
            "--tag", "q3", "--emotional-weight", "-0.4",
        ])
        .unwrap();
        assert_eq!(cli.tenant.as_deref(), Some("acme"));
        match cli.command {
            Commands::Remember { memory_type, tags, emotional_weight, .. } => {
                assert_eq!(memory_type, Some(MemoryType::Task));
                assert_eq!(tags, vec!["release", "q3"]);
                assert_eq!(emotional_weight, Some(-0.4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_relate_defaults_to_related() {
        let cli = Cli::try_parse_from(["memorai", "relate", "a", "b"]).unwrap();
        match cli.command {
            Commands::Relate { kind, .. } => assert_eq!(kind, RelationshipType::Related),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["memorai", "relate", "a", "b", "--type", "cousin"]).is_err());
    }

    fn graph_cmd(args: &[&str]) -> GraphCommands {
        let mut argv = vec!["memorai", "--tenant", "acme", "graph"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Graph(cmd) => cmd,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_graph_find_filters_by_name_and_type() {
        let graph = KnowledgeGraph::in_memory();
        let rust = graph.add_entity("Rust", "language", Properties::default(), "acme").unwrap();
        graph.add_entity("Rustacean meetup", "event", Properties::default(), "acme").unwrap();
        graph.add_entity("Go", "language", Properties::default(), "acme").unwrap();

        let GraphCommands::Find { name, entity_type } = graph_cmd(&["find", "--name", "rust", "--type", "language"])
        else {
            panic!("expected find");
        };
        let found = find_entities(&graph, "acme", name.as_deref(), entity_type.as_deref()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, rust);

        let by_name = find_entities(&graph, "acme", Some("rust"), None).unwrap();
        assert_eq!(by_name.len(), 2);
        let by_type = find_entities(&graph, "acme", None, Some("language")).unwrap();
        assert_eq!(by_type.len(), 2);

        run_graph(&graph, graph_cmd(&["find", "--name", "Rust"]), "acme", true).unwrap();
        run_graph(&graph, graph_cmd(&["stats"]), "acme", false).unwrap();
    }

    #[test]
    fn test_ttl_hours_out_of_range() {
        let now = Utc::now();
        assert_eq!(expiry_after_hours(now, 2.0).unwrap(), now + chrono::Duration::hours(2));
        assert!(expiry_after_hours(now, 1e300).unwrap_err().is_validation());
        assert!(expiry_after_hours(now, f64::NAN).unwrap_err().is_validation());
        assert!(expiry_after_hours(now, 1e12).unwrap_err().is_validation());

        let cli = Cli::try_parse_from(["memorai", "remember", "x", "--ttl-hours", "1e300"]).unwrap();
        assert!(matches!(cli.command, Commands::Remember { ttl_hours: Some(_), .. }));
    }

    #[test]
    fn test_require_tenant() {
        assert!(require_tenant(&None).unwrap_err().is_validation());
        assert!(require_tenant(&Some("  ".into())).is_err());
        assert_eq!(require_tenant(&Some("acme".into())).unwrap(), "acme");
    }
}
