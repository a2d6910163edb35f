use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for a command's result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

/// Top-level CLI parser for the `codegraph` binary.
#[derive(Debug, Parser)]
#[command(name = "codegraph", version, about = "Code-intelligence indexing and retrieval engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json or pretty
    #[arg(long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index a directory into the configured database, vector store, and graph.
    Index(IndexArgs),
    /// Run a hybrid search query against an already-indexed repository.
    Search(SearchArgs),
    /// Process one batch of files in-process and print `{success_count, error_count}`.
    ///
    /// This is the subprocess contract a [`crate::commands::consume`] loop
    /// dispatches to — never invoke it against a batch whose embedding
    /// models you don't want loaded in this process.
    Worker(WorkerArgs),
    /// Run the durable-stream batch consumer loop for one repository.
    Consume(ConsumeArgs),
    /// Graph construction and traversal.
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
    /// Free-form memory records.
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Debug, clap::Args)]
pub struct IndexArgs {
    /// Directory to walk and index.
    #[arg(default_value = ".")]
    pub path: PathBuf,
    /// Repository name recorded against every indexed chunk/node/edge.
    #[arg(long)]
    pub repository: Option<String>,
    /// Commit id recorded against every indexed chunk.
    #[arg(long)]
    pub commit: Option<String>,
    /// Skip LSP type-metadata enrichment.
    #[arg(long)]
    pub no_metadata: bool,
    /// Skip embedding generation.
    #[arg(long)]
    pub no_embeddings: bool,
    /// Skip graph construction.
    #[arg(long)]
    pub no_graph: bool,
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    /// Search query text.
    pub query: String,
    /// Repository to search within.
    #[arg(long)]
    pub repository: String,
    /// Maximum results to return.
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,
    /// Restrict results to this language.
    #[arg(long)]
    pub language: Option<String>,
    /// Disable lexical (FTS) candidates.
    #[arg(long)]
    pub no_lexical: bool,
    /// Disable vector (HNSW) candidates.
    #[arg(long)]
    pub no_vector: bool,
    /// Apply cross-encoder rerank to the fused head.
    #[arg(long)]
    pub rerank: bool,
}

#[derive(Debug, clap::Args)]
pub struct WorkerArgs {
    /// Repository these files belong to.
    #[arg(long)]
    pub repository: String,
    /// libSQL database URL to index into.
    #[arg(long)]
    pub db_url: String,
    /// Comma-separated file paths to index in this batch.
    #[arg(long, value_delimiter = ',')]
    pub files: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct ConsumeArgs {
    /// Repository whose stream to consume.
    #[arg(long)]
    pub repository: String,
    /// Name this consumer registers under in the consumer group.
    #[arg(long)]
    pub consumer_name: Option<String>,
    /// Run continuously, re-entering the loop whenever the stream drains
    /// empty, instead of returning after one pass.
    #[arg(long)]
    pub follow: bool,
}

#[derive(Debug, Subcommand)]
pub enum GraphAction {
    /// (Re)build the call/import/re-export graph for a repository.
    Build { repository: String },
    /// Walk edges out from a node to a fixed depth.
    Traverse {
        node_id: String,
        #[arg(long, default_value_t = 2)]
        depth: u32,
        #[arg(long, value_enum, default_value = "outgoing")]
        direction: TraverseDirection,
        #[arg(long, value_enum)]
        relation: Option<RelationArg>,
    },
    /// Find the shortest path between two nodes.
    Path {
        repository: String,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TraverseDirection {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RelationArg {
    Calls,
    Imports,
    ReExports,
    Extends,
    Implements,
}

#[derive(Debug, Subcommand)]
pub enum MemoryAction {
    /// Record a free-form memory (note, decision, or conversation snippet).
    Add {
        title: String,
        content: String,
        #[arg(long, value_enum, default_value = "note")]
        memory_type: MemoryTypeArg,
        #[arg(long)]
        project: Option<String>,
    },
    /// Lexical search over stored memory records.
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MemoryTypeArg {
    Note,
    Decision,
    Conversation,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Cli;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn worker_args_parse_comma_separated_files() {
        use clap::Parser;
        let cli = Cli::try_parse_from([
            "codegraph",
            "worker",
            "--repository",
            "acme",
            "--db-url",
            "file:codegraph.db",
            "--files",
            "a.py,b.py,c.py",
        ])
        .expect("worker args should parse");

        let super::Commands::Worker(args) = cli.command else {
            panic!("expected Worker command");
        };
        assert_eq!(args.files, vec!["a.py", "b.py", "c.py"]);
    }
}
