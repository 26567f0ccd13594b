/// Constants module to avoid magic numbers in the codebase

// Session lifecycle
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

// Request validation
pub const MAX_SESSION_ID_LEN: usize = 128;
pub const MAX_INPUT_BYTES: usize = 16 * 1024;

// Pipeline
/// Scores strictly above this branch into Socratic interrogation.
pub const AMBIGUITY_THRESHOLD: f64 = 0.7;
/// Inputs at or beyond this many words carry no length penalty.
pub const AMBIGUITY_LENGTH_HORIZON: f64 = 20.0;
pub const HISTORIAN_RECALL_LIMIT: usize = 3;

// Memory
/// Episodic memory keeps at most this many turns; the oldest go first.
pub const DEFAULT_MAX_EPISODES: usize = 1000;

pub const VAGUE_TERMS: &[&str] = &[
    "fix",
    "improve",
    "optimize",
    "better",
    "help",
    "manage",
    "handle",
    "deal with",
    "work on",
    "something",
    "stuff",
    "business",
];

/// Relationship kinds that count as a dependency edge in the knowledge graph
pub const DEPENDENCY_RELATIONS: &[&str] = &["BLOCKS", "DEPENDS_ON", "PRECEDES"];

// Network Configuration
pub const DEFAULT_LITELLM_PROXY_URL: &str = "http://localhost:4000";
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 600; // 10 minutes for large model requests
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 3;

// Default Model Configuration
pub const DEFAULT_MAX_TOKENS: usize = 2048;
pub const DEFAULT_MODEL_COST: f64 = 0.01;
