//! Veil CLI entry point.
//!
//! stdout carries command payloads (rewritten text or JSON); diagnostics and
//! logs go to stderr.

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use veil_alias::{
    generate_field_variations, AliasEngine, Direction, SubstituteMode, SubstituteOptions,
};
use veil_cli::config::{load_config, ConfigOptions, ResolvedConfig, VeilConfig};
use veil_cli::exit_codes::ExitCode;
use veil_cli::input::{load_profiles, load_rules, read_input};
use veil_cli::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use veil_cli::pipeline::Pipeline;
use veil_common::{
    has_errors, validate_profile, AiService, JsonProfileStore, PiiType, ProfileFile, ProfileIssue,
    RejectedRecord,
};
use veil_redact::{
    compile_pattern, create_rule_from_template, detect_conflicts, detect_format, mask_partial,
    redact, search_templates_by_tag, templates, templates_by_category, test_rule, ApiKeyDetector,
    CustomRule, DetectedKey, KeyFormat, RedactionEngine, RedactionMode, RuleCategory,
};

/// Veil: alias substitution and secret redaction for AI chat traffic
#[derive(Parser)]
#[command(name = "veil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (default: VEIL_CONFIG, VEIL_CONFIG_DIR or ~/.config/veil/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Profile file (overrides profiles_file in the config)
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    /// Custom rule file (overrides rules_file in the config)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Plain text (rewritten text as-is)
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace real identity values with their aliases
    Encode(SubstituteArgs),

    /// Replace aliases with the real identity values
    Decode(SubstituteArgs),

    /// Report real identity values without rewriting
    Find(FindArgs),

    /// Process an outbound chat request body
    Request(RequestArgs),

    /// Process an inbound chat response body
    Response(ResponseArgs),

    /// Detect and redact API keys
    #[command(subcommand)]
    Keys(KeysCommand),

    /// Validate, test and apply custom redaction rules
    #[command(subcommand)]
    Rules(RulesCommand),

    /// Generate the variations of an identity value
    Variations(VariationsArgs),

    /// Inspect profile files
    #[command(subcommand)]
    Profiles(ProfilesCommand),

    /// Print the JSON Schema of the profile file
    Schema,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct SubstituteArgs {
    /// Input file (default: stdin)
    input: Option<PathBuf>,

    /// Restrict matching to these profile ids
    #[arg(long = "profile")]
    profile_ids: Vec<String>,

    /// Report substitutions without rewriting
    #[arg(long)]
    detect_only: bool,
}

#[derive(Args, Debug)]
struct FindArgs {
    /// Input file (default: stdin)
    input: Option<PathBuf>,

    /// Exit with code 1 when anything is found
    #[arg(long)]
    fail_on_match: bool,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Request body file (default: stdin)
    input: Option<PathBuf>,

    /// Target service (chatgpt, claude, gemini, perplexity, poe, copilot, you)
    #[arg(long, default_value = "unknown")]
    service: AiService,

    /// Persist usage counters to the profile file
    #[arg(long)]
    record_usage: bool,
}

#[derive(Args, Debug)]
struct ResponseArgs {
    /// Response body file (default: stdin)
    input: Option<PathBuf>,

    /// Source service
    #[arg(long, default_value = "unknown")]
    service: AiService,
}

#[derive(Subcommand)]
enum KeysCommand {
    /// List API keys found in the input (values are masked)
    Detect(KeysDetectArgs),

    /// Rewrite API keys in the input
    Redact(KeysRedactArgs),

    /// Classify a single key
    Format {
        /// The key to classify
        key: String,
    },
}

#[derive(Args, Debug)]
struct KeyScanOpts {
    /// Input file (default: stdin)
    input: Option<PathBuf>,

    /// Also run the entropy-gated generic pattern
    #[arg(long)]
    generic: bool,

    /// Extra key pattern (repeatable)
    #[arg(long = "pattern")]
    patterns: Vec<String>,
}

#[derive(Args, Debug)]
struct KeysDetectArgs {
    #[command(flatten)]
    scan: KeyScanOpts,

    /// Exit with code 1 when a key is found
    #[arg(long)]
    fail_on_match: bool,
}

#[derive(Args, Debug)]
struct KeysRedactArgs {
    #[command(flatten)]
    scan: KeyScanOpts,

    /// full, partial or placeholder (default: from config)
    #[arg(long)]
    mode: Option<RedactionMode>,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Check every rule pattern in the rule file
    Validate,

    /// Try a pattern against sample text
    Test(RuleTestArgs),

    /// Apply the rule file (and templates) to the input
    Apply(RuleApplyArgs),

    /// Report rules that may match the same text
    Conflicts,

    /// List the built-in rule templates
    Templates(TemplateArgs),
}

#[derive(Args, Debug)]
struct RuleTestArgs {
    /// Regular expression to test
    #[arg(long)]
    pattern: String,

    /// Replacement template ($1, ${name}, $&, $$)
    #[arg(long, default_value = "[REDACTED]")]
    replacement: String,

    /// Match case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Sample file (default: stdin)
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RuleApplyArgs {
    /// Input file (default: stdin)
    input: Option<PathBuf>,

    /// Add a built-in template by name (repeatable)
    #[arg(long = "template")]
    templates: Vec<String>,

    /// Write match counts back to the rule file
    #[arg(long)]
    record: bool,
}

#[derive(Args, Debug)]
struct TemplateArgs {
    /// Only this category (financial, medical, personal, corporate, custom)
    #[arg(long)]
    category: Option<String>,

    /// Only templates carrying this tag
    #[arg(long)]
    tag: Option<String>,
}

#[derive(Args, Debug)]
struct VariationsArgs {
    /// Field type (name, email, phone, cellPhone, address, company, jobTitle, custom)
    #[arg(long = "type", default_value = "name")]
    pii_type: String,

    /// The value to expand
    value: String,
}

#[derive(Subcommand)]
enum ProfilesCommand {
    /// Parse and validate the profile file
    Check,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration and where it came from
    Show,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Clean,
                _ => ExitCode::ArgsError,
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let log_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(log_level, cli.global.log_format));

    let exit_code = match &cli.command {
        Commands::Encode(args) => run_substitute(&cli.global, args, Direction::Encode),
        Commands::Decode(args) => run_substitute(&cli.global, args, Direction::Decode),
        Commands::Find(args) => run_find(&cli.global, args),
        Commands::Request(args) => run_request(&cli.global, args),
        Commands::Response(args) => run_response(&cli.global, args),
        Commands::Keys(cmd) => run_keys(&cli.global, cmd),
        Commands::Rules(cmd) => run_rules(&cli.global, cmd),
        Commands::Variations(args) => run_variations(&cli.global, args),
        Commands::Profiles(ProfilesCommand::Check) => run_profiles_check(&cli.global),
        Commands::Schema => print_json(&schemars::schema_for!(ProfileFile)),
        Commands::Config(ConfigCommand::Show) => run_config_show(&cli.global),
    };

    tracing::debug!(exit_code = %exit_code, "done");
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Print an error to stderr and return `code`.
fn fail(message: impl std::fmt::Display, code: ExitCode) -> ExitCode {
    eprintln!("veil: {}", message);
    code
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Clean
        }
        Err(e) => fail(format!("failed to serialize output: {}", e), ExitCode::InternalError),
    }
}

fn resolve(global: &GlobalOpts) -> Result<ResolvedConfig, ExitCode> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
        profiles_path: global.profiles.clone(),
        rules_path: global.rules.clone(),
    };
    load_config(&options).map_err(|e| fail(e, ExitCode::ConfigError))
}

macro_rules! try_exit {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(code) => return code,
        }
    };
}

fn input_text(path: Option<&Path>) -> Result<String, ExitCode> {
    read_input(path).map_err(|e| fail(&e, e.exit_code()))
}

/// Engine over the configured profile file. No profile file means an empty
/// engine (every call passes text through unchanged).
fn build_engine(config: &VeilConfig) -> Result<Arc<AliasEngine>, ExitCode> {
    let Some(path) = &config.profiles_file else {
        tracing::warn!("no profile file configured; substitution disabled");
        let engine = AliasEngine::new(config.engine.clone());
        engine.set_profiles(Vec::new());
        return Ok(Arc::new(engine));
    };
    if !path.is_file() {
        return Err(fail(
            format!("profile file not found: {}", path.display()),
            ExitCode::IoError,
        ));
    }
    let store = Arc::new(JsonProfileStore::new(path));
    let engine = AliasEngine::with_store(config.engine.clone(), store);
    let loaded = engine.load_profiles();
    tracing::debug!(profiles = loaded, path = %path.display(), "profiles loaded");
    Ok(Arc::new(engine))
}

fn configured_rules(config: &VeilConfig) -> Result<Vec<CustomRule>, ExitCode> {
    match &config.rules_file {
        Some(path) => load_rules(path).map_err(|e| fail(&e, e.exit_code())),
        None => Ok(Vec::new()),
    }
}

fn required_rules_path(config: &VeilConfig) -> Result<&Path, ExitCode> {
    config.rules_file.as_deref().ok_or_else(|| {
        fail(
            "no rule file configured (use --rules or rules_file in config.toml)",
            ExitCode::ArgsError,
        )
    })
}

// ============================================================================
// Substitution
// ============================================================================

fn run_substitute(global: &GlobalOpts, args: &SubstituteArgs, direction: Direction) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let engine = try_exit!(build_engine(&resolved.config));
    let text = try_exit!(input_text(args.input.as_deref()));

    let options = SubstituteOptions {
        profile_ids: (!args.profile_ids.is_empty()).then(|| args.profile_ids.clone()),
        mode: if args.detect_only {
            SubstituteMode::DetectOnly
        } else {
            SubstituteMode::Replace
        },
    };
    let result = engine.substitute(&text, direction, &options);
    if let Some(error) = &result.error {
        eprintln!("veil: {} failed open: {}", direction, error);
    }

    match global.format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            print!("{}", result.text);
            ExitCode::Clean
        }
    }
}

fn run_find(global: &GlobalOpts, args: &FindArgs) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let engine = try_exit!(build_engine(&resolved.config));
    let text = try_exit!(input_text(args.input.as_deref()));

    let matches = engine.find_pii(&text);
    let code = match global.format {
        OutputFormat::Json => print_json(&matches),
        OutputFormat::Text => {
            println!("# PII matches ({})", matches.len());
            for m in &matches {
                println!(
                    "{}..{}\t{}\t{}\t-> {}",
                    m.start,
                    m.end,
                    m.pii_type.as_str(),
                    m.profile_name,
                    m.alias
                );
            }
            ExitCode::Clean
        }
    };
    if code == ExitCode::Clean && args.fail_on_match && !matches.is_empty() {
        return ExitCode::MatchesFound;
    }
    code
}

// ============================================================================
// Request / response
// ============================================================================

fn run_request(global: &GlobalOpts, args: &RequestArgs) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let engine = try_exit!(build_engine(&resolved.config));
    let rules = try_exit!(configured_rules(&resolved.config));
    let body = try_exit!(input_text(args.input.as_deref()));

    let pipeline = Pipeline::from_config(engine, &resolved.config, rules)
        .with_usage_recording(args.record_usage);
    let report = pipeline.process_request(&body, args.service);

    if report.needs_warning {
        eprintln!(
            "veil: {} API key(s) detected ({}); request left unchanged (warn-first mode)",
            report.keys_detected,
            join_formats(&report.key_formats)
        );
    }
    if let Some(error) = &report.error {
        eprintln!("veil: request processing failed open: {}", error);
    }

    match global.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{}", report.body);
            ExitCode::Clean
        }
    }
}

fn run_response(global: &GlobalOpts, args: &ResponseArgs) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let engine = try_exit!(build_engine(&resolved.config));
    let body = try_exit!(input_text(args.input.as_deref()));

    let pipeline = Pipeline::from_config(engine, &resolved.config, Vec::new());
    let report = pipeline.process_response(&body, args.service);
    if let Some(error) = &report.error {
        eprintln!("veil: response processing failed open: {}", error);
    }

    match global.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{}", report.body);
            ExitCode::Clean
        }
    }
}

fn join_formats(formats: &[KeyFormat]) -> String {
    formats
        .iter()
        .map(KeyFormat::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// API keys
// ============================================================================

/// Printable view of a detected key. Never carries the raw value.
#[derive(Debug, Serialize)]
struct KeyView {
    format: KeyFormat,
    start: usize,
    end: usize,
    masked: String,
}

impl From<&DetectedKey> for KeyView {
    fn from(key: &DetectedKey) -> Self {
        Self {
            format: key.format,
            start: key.start,
            end: key.end,
            masked: key.masked(),
        }
    }
}

fn key_scan(
    global: &GlobalOpts,
    scan: &KeyScanOpts,
) -> Result<(ResolvedConfig, ApiKeyDetector, String), ExitCode> {
    let resolved = resolve(global)?;
    let mut options = resolved.config.api_keys.detect_options();
    options.include_generic |= scan.generic;
    options.custom_patterns.extend(scan.patterns.iter().cloned());

    let detector = ApiKeyDetector::new(options);
    let rejected = detector.rejected_patterns();
    if !rejected.is_empty() {
        for r in rejected {
            eprintln!("veil: key pattern '{}' rejected: {}", r.pattern, r.reason);
        }
        return Err(ExitCode::ValidationFailed);
    }
    let text = input_text(scan.input.as_deref())?;
    Ok((resolved, detector, text))
}

fn run_keys(global: &GlobalOpts, cmd: &KeysCommand) -> ExitCode {
    match cmd {
        KeysCommand::Detect(args) => {
            let (_, detector, text) = try_exit!(key_scan(global, &args.scan));
            let keys = detector.detect(&text);
            let views: Vec<KeyView> = keys.iter().map(KeyView::from).collect();
            let code = match global.format {
                OutputFormat::Json => print_json(&views),
                OutputFormat::Text => {
                    println!("# API keys ({})", views.len());
                    for v in &views {
                        println!("{}..{}\t{}\t{}", v.start, v.end, v.format, v.masked);
                    }
                    ExitCode::Clean
                }
            };
            if code == ExitCode::Clean && args.fail_on_match && !keys.is_empty() {
                return ExitCode::MatchesFound;
            }
            code
        }
        KeysCommand::Redact(args) => {
            let (resolved, detector, text) = try_exit!(key_scan(global, &args.scan));
            let mode = args.mode.unwrap_or(resolved.config.api_keys.redaction);
            let keys = detector.detect(&text);
            let redacted = redact(&text, &keys, mode);
            match global.format {
                OutputFormat::Json => {
                    let views: Vec<KeyView> = keys.iter().map(KeyView::from).collect();
                    print_json(&serde_json::json!({
                        "text": redacted,
                        "mode": mode,
                        "keys": views,
                    }))
                }
                OutputFormat::Text => {
                    print!("{}", redacted);
                    ExitCode::Clean
                }
            }
        }
        KeysCommand::Format { key } => {
            let format = detect_format(key.trim());
            match global.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "format": format,
                    "placeholder": format.placeholder(),
                    "masked": mask_partial(key.trim()),
                })),
                OutputFormat::Text => {
                    println!("{}", format);
                    ExitCode::Clean
                }
            }
        }
    }
}

// ============================================================================
// Custom rules
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleCheck {
    id: String,
    name: String,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue: Option<veil_redact::PatternIssue>,
}

fn run_rules(global: &GlobalOpts, cmd: &RulesCommand) -> ExitCode {
    match cmd {
        RulesCommand::Validate => run_rules_validate(global),
        RulesCommand::Test(args) => run_rules_test(global, args),
        RulesCommand::Apply(args) => run_rules_apply(global, args),
        RulesCommand::Conflicts => run_rules_conflicts(global),
        RulesCommand::Templates(args) => run_rules_templates(global, args),
    }
}

fn run_rules_validate(global: &GlobalOpts) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let path = try_exit!(required_rules_path(&resolved.config));
    let rules = try_exit!(load_rules(path).map_err(|e| fail(&e, e.exit_code())));

    let checks: Vec<RuleCheck> = rules
        .iter()
        .map(|rule| RuleCheck {
            id: rule.id.clone(),
            name: rule.name.clone(),
            enabled: rule.enabled,
            issue: compile_pattern(&rule.pattern, rule.case_sensitive).err(),
        })
        .collect();
    let failed = checks.iter().filter(|c| c.issue.is_some()).count();

    let code = match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "path": path,
            "rules": checks,
            "failed": failed,
        })),
        OutputFormat::Text => {
            println!("# Rules: {} ({} invalid)", checks.len(), failed);
            for c in &checks {
                match &c.issue {
                    None => println!("ok\t{}\t{}", c.id, c.name),
                    Some(issue) => println!("FAIL\t{}\t{}: {}", c.id, c.name, issue),
                }
            }
            ExitCode::Clean
        }
    };
    if code == ExitCode::Clean && failed > 0 {
        return ExitCode::ValidationFailed;
    }
    code
}

fn run_rules_test(global: &GlobalOpts, args: &RuleTestArgs) -> ExitCode {
    let sample = try_exit!(input_text(args.input.as_deref()));
    let rule = CustomRule::new("test", "test", &args.pattern, &args.replacement)
        .with_case_sensitive(args.case_sensitive);
    let result = test_rule(&rule, &sample);

    let code = match global.format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            if let Some(error) = &result.error {
                eprintln!("veil: {}", error);
            } else {
                println!("# Matches ({})", result.matches.len());
                for (m, r) in result.matches.iter().zip(&result.replacements) {
                    println!("{}\t-> {}", m, r);
                }
            }
            ExitCode::Clean
        }
    };
    if code == ExitCode::Clean && result.error.is_some() {
        return ExitCode::ValidationFailed;
    }
    code
}

fn run_rules_apply(global: &GlobalOpts, args: &RuleApplyArgs) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let mut file_rules = try_exit!(configured_rules(&resolved.config));

    let mut rules = file_rules.clone();
    for name in &args.templates {
        match create_rule_from_template(name) {
            Ok(rule) => rules.push(rule),
            Err(e) => return fail(e, ExitCode::ArgsError),
        }
    }
    if rules.is_empty() {
        return fail(
            "no rules to apply (use --rules or --template)",
            ExitCode::ArgsError,
        );
    }
    let text = try_exit!(input_text(args.input.as_deref()));

    let mut engine = RedactionEngine::new();
    let result = engine.apply_rules(&text, &rules);
    for id in &result.skipped_rules {
        eprintln!("veil: rule '{}' skipped: invalid pattern", id);
    }

    if args.record && !result.matches.is_empty() {
        let path = try_exit!(required_rules_path(&resolved.config));
        RedactionEngine::record_matches(&mut file_rules, &result);
        if let Err(e) = write_rules(path, &file_rules) {
            return fail(
                format!("failed to write {}: {}", path.display(), e),
                ExitCode::IoError,
            );
        }
    }

    match global.format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            print!("{}", result.text);
            ExitCode::Clean
        }
    }
}

/// Replace the rule file via a temp file and rename.
fn write_rules(path: &Path, rules: &[CustomRule]) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(&serde_json::json!({ "rules": rules }))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}

fn run_rules_conflicts(global: &GlobalOpts) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let path = try_exit!(required_rules_path(&resolved.config));
    let rules = try_exit!(load_rules(path).map_err(|e| fail(&e, e.exit_code())));
    let conflicts = detect_conflicts(&rules);

    match global.format {
        OutputFormat::Json => print_json(&conflicts),
        OutputFormat::Text => {
            println!("# Conflicts ({})", conflicts.len());
            for c in &conflicts {
                println!("{} <-> {}: {}", c.rule1, c.rule2, c.reason);
            }
            ExitCode::Clean
        }
    }
}

fn run_rules_templates(global: &GlobalOpts, args: &TemplateArgs) -> ExitCode {
    let mut selected: Vec<_> = match &args.category {
        Some(raw) => match RuleCategory::parse_str(raw) {
            Some(category) => templates_by_category(category),
            None => return fail(format!("unknown category: {}", raw), ExitCode::ArgsError),
        },
        None => templates().iter().collect(),
    };
    if let Some(tag) = &args.tag {
        let tagged = search_templates_by_tag(tag);
        selected.retain(|t| tagged.iter().any(|x| x.name == t.name));
    }

    match global.format {
        OutputFormat::Json => print_json(&selected),
        OutputFormat::Text => {
            println!("# Rule templates ({})", selected.len());
            for t in &selected {
                println!(
                    "{}\t{}\t{}{}\t{}",
                    t.name,
                    t.category,
                    t.priority,
                    if t.enabled { "" } else { " (disabled)" },
                    t.pattern
                );
            }
            ExitCode::Clean
        }
    }
}

// ============================================================================
// Variations, profiles, config
// ============================================================================

fn run_variations(global: &GlobalOpts, args: &VariationsArgs) -> ExitCode {
    let Some(pii_type) = PiiType::parse_str(&args.pii_type) else {
        return fail(format!("unknown field type: {}", args.pii_type), ExitCode::ArgsError);
    };
    let variations = generate_field_variations(pii_type, &args.value);

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "type": pii_type,
            "variations": variations,
        })),
        OutputFormat::Text => {
            for v in &variations {
                println!("{}", v);
            }
            ExitCode::Clean
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileCheck {
    id: String,
    profile_name: String,
    enabled: bool,
    issues: Vec<ProfileIssue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilesReport {
    #[serde(rename = "generated_at")]
    generated_at: String,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    profiles: Vec<ProfileCheck>,
    rejected: Vec<RejectedRecord>,
}

fn run_profiles_check(global: &GlobalOpts) -> ExitCode {
    let resolved = try_exit!(resolve(global));
    let Some(path) = resolved.config.profiles_file.clone() else {
        return fail(
            "no profile file configured (use --profiles or profiles_file in config.toml)",
            ExitCode::ArgsError,
        );
    };
    let parsed = try_exit!(load_profiles(&path).map_err(|e| fail(&e, e.exit_code())));

    let profiles: Vec<ProfileCheck> = parsed
        .profiles
        .iter()
        .map(|p| ProfileCheck {
            id: p.id.clone(),
            profile_name: p.profile_name.clone(),
            enabled: p.enabled,
            issues: validate_profile(p),
        })
        .collect();
    let invalid = profiles.iter().filter(|p| has_errors(&p.issues)).count();
    let report = ProfilesReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        path,
        schema_version: parsed.schema_version,
        profiles,
        rejected: parsed.rejected,
    };

    let code = match global.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!(
                "# Profiles: {} loaded, {} invalid, {} rejected",
                report.profiles.len(),
                invalid,
                report.rejected.len()
            );
            for p in &report.profiles {
                let status = if has_errors(&p.issues) { "FAIL" } else { "ok" };
                println!("{}\t{}\t{}", status, p.id, p.profile_name);
                for issue in &p.issues {
                    println!("  {:?}: {}", issue.severity, issue.message);
                }
            }
            for r in &report.rejected {
                println!("REJECTED\t#{}\t{}", r.index, r.reason);
            }
            ExitCode::Clean
        }
    };
    if code == ExitCode::Clean && (invalid > 0 || !report.rejected.is_empty()) {
        return ExitCode::ValidationFailed;
    }
    code
}

fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let mut shown = try_exit!(resolve(global));
    shown.config.api_keys.keys = shown
        .config
        .api_keys
        .keys
        .iter()
        .map(|k| mask_partial(k))
        .collect();

    match global.format {
        OutputFormat::Json => print_json(&shown),
        OutputFormat::Text => match toml::to_string_pretty(&shown.config) {
            Ok(body) => {
                println!("# source: {}", shown.source);
                print!("{}", body);
                ExitCode::Clean
            }
            Err(e) => fail(format!("failed to render config: {}", e), ExitCode::InternalError),
        },
    }
}
