//! CLI subcommands: resolve, includes, requisites, collect, order, list,
//! validate, verify, completions.

use crate::core::collector::{collect_all_includes_with, CollectOptions};
use crate::core::config::{self, CookConfig};
use crate::core::document::RecipeDocument;
use crate::core::error::{CookError, Result};
use crate::core::includes::extract_includes;
use crate::core::paths::{recipe_name_for_path, resolve_recipe_file_path, resolve_relative};
use crate::core::planner::order_steps;
use crate::core::reader::{CancelToken, ContentReader, LocalFs};
use crate::core::requisites::extract_requisites;
use crate::core::types::{DependencyClosure, IncludePolicy, RecipeName, Sprout, StepId};
use crate::ingredients::file::{FileSpec, ProviderRegistry};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "cook.yaml";

/// Sprout name used with `--root` when no `--sprout` is given.
const ADHOC_SPROUT: &str = "local";

#[derive(Parser, Debug)]
#[command(
    name = "cook",
    version,
    about = "Resolve grlx recipes: includes, requisites and step order"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to cook.yaml
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Sprout to use (default: default_sprout from the config)
    #[arg(short, long, global = true)]
    pub sprout: Option<String>,

    /// Use this directory as the sprout instead of the config
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Log filter directive for the verbosity count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the file a recipe name resolves to
    Resolve {
        recipe: String,

        /// Resolve relative names against this recipe file
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Print the include names a recipe declares
    Includes { recipe: String },

    /// Print the requisite edges a recipe declares
    Requisites { recipe: String },

    /// Print the dependency closure of a recipe
    Collect {
        recipe: String,

        /// Record unresolvable includes instead of failing
        #[arg(long)]
        best_effort: bool,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the step execution order of a recipe's closure
    Order {
        recipe: String,

        #[arg(long)]
        best_effort: bool,
    },

    /// List every recipe in the sprout
    List,

    /// Validate cook.yaml
    Validate,

    /// Check file artifacts of a recipe's closure against their hashes
    Verify {
        recipe: String,

        /// Fetch artifacts that fail verification
        #[arg(long)]
        download: bool,

        #[arg(long)]
        best_effort: bool,
    },

    /// Generate shell completions
    Completions { shell: Shell },
}

/// Sprout and policy a command runs against.
#[derive(Debug, Clone)]
struct Context {
    sprout: Sprout,
    policy: IncludePolicy,
}

impl Context {
    fn options(&self, best_effort: bool) -> CollectOptions {
        let policy = if best_effort {
            IncludePolicy::BestEffort
        } else {
            self.policy
        };
        CollectOptions::with_policy(policy)
    }

    fn collect(&self, recipe: &str, best_effort: bool) -> Result<DependencyClosure> {
        collect_all_includes_with(
            &self.sprout,
            &RecipeName::from(recipe),
            &LocalFs,
            &self.options(best_effort),
        )
    }
}

/// Dispatch a CLI command.
pub fn dispatch(global: &GlobalArgs, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Validate => cmd_validate(&global.config),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
        Commands::Resolve { recipe, from } => {
            cmd_resolve(&load_context(global)?, &recipe, from.as_deref())
        }
        Commands::Includes { recipe } => cmd_includes(&load_context(global)?, &recipe),
        Commands::Requisites { recipe } => cmd_requisites(&load_context(global)?, &recipe),
        Commands::Collect {
            recipe,
            best_effort,
            json,
        } => cmd_collect(&load_context(global)?, &recipe, best_effort, json),
        Commands::Order {
            recipe,
            best_effort,
        } => cmd_order(&load_context(global)?, &recipe, best_effort),
        Commands::List => cmd_list(&load_context(global)?),
        Commands::Verify {
            recipe,
            download,
            best_effort,
        } => cmd_verify(&load_context(global)?, &recipe, download, best_effort),
    }
}

/// Build the command context: `--root` wins over the config file.
fn load_context(global: &GlobalArgs) -> Result<Context> {
    let config = if global.config.exists() {
        Some(parse_and_validate(&global.config)?)
    } else {
        None
    };
    let policy = config
        .as_ref()
        .map(|c| c.include_policy)
        .unwrap_or_default();

    let sprout = match (&global.root, &config) {
        (Some(root), _) => Sprout::new(
            global.sprout.as_deref().unwrap_or(ADHOC_SPROUT),
            root.clone(),
        ),
        (None, Some(config)) => config.sprout(global.sprout.as_deref())?,
        (None, None) => {
            return Err(CookError::Config(format!(
                "{} not found; pass --root or --config",
                global.config.display()
            )))
        }
    };
    Ok(Context { sprout, policy })
}

/// Parse and validate a cook.yaml file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<CookConfig> {
    let config = config::parse_config_file(file)?;
    let errors = config::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(CookError::Config(format!(
        "{} validation error(s) in {}",
        errors.len(),
        file.display()
    )))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    println!(
        "OK: {} ({} sprouts, include policy {:?})",
        file.display(),
        config.sprouts.len(),
        config.include_policy
    );
    Ok(())
}

fn cmd_resolve(ctx: &Context, recipe: &str, from: Option<&Path>) -> Result<()> {
    let base = ctx.sprout.base_path();
    let name = RecipeName::from(recipe);
    let path = match from {
        Some(referencing) => resolve_relative(base, referencing, &name)?,
        None => resolve_recipe_file_path(base, &name)?,
    };
    println!("{}", path.display());
    Ok(())
}

/// Resolve `recipe` and read its bytes.
fn read_recipe(ctx: &Context, recipe: &RecipeName) -> Result<Vec<u8>> {
    let path = resolve_recipe_file_path(ctx.sprout.base_path(), recipe)?;
    LocalFs.read(&path)
}

fn cmd_includes(ctx: &Context, recipe: &str) -> Result<()> {
    let name = RecipeName::from(recipe);
    let content = read_recipe(ctx, &name)?;
    for include in extract_includes(&ctx.sprout, &name, &content)? {
        println!("{}", include);
    }
    Ok(())
}

fn cmd_requisites(ctx: &Context, recipe: &str) -> Result<()> {
    let name = RecipeName::from(recipe);
    let content = read_recipe(ctx, &name)?;
    for edge in extract_requisites(&ctx.sprout, &name, &content)? {
        println!("{}", edge);
    }
    Ok(())
}

fn cmd_collect(ctx: &Context, recipe: &str, best_effort: bool, json: bool) -> Result<()> {
    let closure = ctx.collect(recipe, best_effort)?;
    if json {
        let out = serde_json::to_string_pretty(&closure)
            .map_err(|e| CookError::Config(format!("cannot encode closure: {e}")))?;
        println!("{}", out);
        return Ok(());
    }
    print_closure(&closure);
    Ok(())
}

/// Display a closure to stdout.
fn print_closure(closure: &DependencyClosure) {
    println!(
        "Closure: {} in sprout {} ({} recipes, {} steps)",
        closure.root,
        closure.sprout,
        closure.len(),
        closure.steps.len()
    );
    for name in closure.recipe_names() {
        println!("  {}", name);
    }
    if !closure.requisites.is_empty() {
        println!();
        println!("Requisites:");
        for edge in &closure.requisites {
            println!("  {}", edge);
        }
    }
    if !closure.unresolved.is_empty() {
        println!();
        println!("Unresolved:");
        for u in &closure.unresolved {
            println!("  {} (from {}): {}", u.name, u.from, u.reason);
        }
    }
}

fn cmd_order(ctx: &Context, recipe: &str, best_effort: bool) -> Result<()> {
    let closure = ctx.collect(recipe, best_effort)?;
    let order = order_steps(&closure)?;
    for (i, step) in order.order.iter().enumerate() {
        match order.triggers.get(step) {
            Some(watchers) => {
                let names: Vec<String> = watchers.iter().map(|w| w.to_string()).collect();
                println!("{:>3}. {}  (triggers {})", i + 1, step, names.join(", "));
            }
            None => println!("{:>3}. {}", i + 1, step),
        }
    }
    Ok(())
}

/// Canonical names of every recipe file under the sprout, sorted.
fn list_recipes(sprout: &Sprout) -> Result<Vec<RecipeName>> {
    let root = LocalFs.root(sprout.base_path())?;
    let pattern = root.join("**").join("*.grlx");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern)
        .map_err(|e| CookError::Config(format!("invalid glob {}: {}", pattern, e)))?;
    let mut names = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            CookError::io(path, e.into())
        })?;
        if path.is_file() {
            names.push(recipe_name_for_path(&root, &path)?);
        }
    }
    names.sort();
    Ok(names)
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let names = list_recipes(&ctx.sprout)?;
    if names.is_empty() {
        println!("No recipes in {}", ctx.sprout.base_path().display());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// Tally of a verify run.
#[derive(Debug, Default, PartialEq)]
struct VerifySummary {
    ok: usize,
    stale: usize,
    fetched: usize,
}

fn verify_closure(
    closure: &DependencyClosure,
    registry: &ProviderRegistry,
    download: bool,
) -> Result<VerifySummary> {
    let cancel = CancelToken::new();
    let mut summary = VerifySummary::default();
    for recipe in &closure.recipes {
        let doc = RecipeDocument::parse(&recipe.name, &recipe.content)?;
        for (id, step) in &doc.steps {
            let is_file = step
                .ingredient
                .as_deref()
                .is_some_and(|i| i.starts_with("file."));
            if !is_file || step.properties.source.is_none() {
                continue;
            }
            let step_id = StepId::new(recipe.name.clone(), id.as_str());
            let spec = FileSpec::from_step(&step_id, &step.properties)?;
            let provider = registry.provider_for(spec)?;
            if provider.verify(&cancel)? {
                println!("  ok      {}", step_id);
                summary.ok += 1;
            } else if download {
                provider.download(&cancel)?;
                println!("  fetched {}", step_id);
                summary.fetched += 1;
            } else {
                println!("  STALE   {}", step_id);
                summary.stale += 1;
            }
        }
    }
    Ok(summary)
}

fn cmd_verify(ctx: &Context, recipe: &str, download: bool, best_effort: bool) -> Result<()> {
    let closure = ctx.collect(recipe, best_effort)?;
    let registry = ProviderRegistry::with_defaults();
    let summary = verify_closure(&closure, &registry, download)?;
    println!();
    println!(
        "Verify: {} ok, {} fetched, {} stale.",
        summary.ok, summary.fetched, summary.stale
    );
    if summary.stale > 0 {
        return Err(CookError::StaleArtifacts {
            count: summary.stale,
        });
    }
    Ok(())
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "cook", &mut std::io::stdout());
}
