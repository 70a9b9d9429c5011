//! Bootstrap example: load layered configuration, bind typed settings and run
//! ordered configers.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bindery::cond::ConditionContext;
use bindery::configer::{Configer, ConfigerGraph};
use bindery::loader::{FileResourceLocator, PropertyLoader};
use bindery::store::Overlay;
use bindery::{Binder, Describe, Properties};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Load layered configuration and run ordered configers")]
struct Args {
    /// Directories searched for `application.*`; defaults to `app.config.locations`.
    #[arg(short, long = "config-dir")]
    config_dirs: Vec<String>,

    /// Active profiles; defaults to `app.profiles.active`.
    #[arg(short, long = "profile")]
    profiles: Vec<String>,

    /// Prefix of environment variables mapped onto properties.
    #[arg(long, default_value = "APP")]
    env_prefix: String,

    /// Property overrides as `key=value`.
    #[arg(short = 'D', long = "set", value_parser = parse_override)]
    overrides: Vec<(String, String)>,
}

fn parse_override(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{text}`"))?;
    Ok((key.trim().to_owned(), value.trim().to_owned()))
}

#[derive(Debug, Describe, Deserialize)]
#[describe(crate = "bindery::bind")]
struct ServerConfig {
    #[value("${host:=127.0.0.1}")]
    host: String,
    #[value("${port:=8080}")]
    #[validate(expr = "$ > 0")]
    port: u16,
    #[value("${timeout:=30s}")]
    timeout: Duration,
    #[value("${allowed-origins:=}")]
    allowed_origins: Vec<String>,
}

#[derive(Debug, Describe, Deserialize)]
#[describe(crate = "bindery::bind")]
struct PoolConfig {
    #[value("${size:=4}")]
    #[validate(expr = "$ > 0 && $ <= 128")]
    size: u32,
}

#[derive(Debug, Describe, Deserialize)]
#[describe(crate = "bindery::bind")]
struct DatabaseConfig {
    #[value("${url}")]
    url: String,
    pool: PoolConfig,
}

#[derive(Debug, Describe, Deserialize)]
#[describe(crate = "bindery::bind")]
struct CacheConfig {
    #[value("${ttl:=1m}")]
    ttl: Duration,
    #[value("${regions:=}")]
    regions: HashMap<String, u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let binder = Binder::default();
    let vars: Vec<(String, String)> = std::env::vars().collect();
    let properties = load_properties(&args, &binder, &vars)?;
    info!(count = properties.len(), "properties loaded");

    let graph = configers()?;
    info!(order = ?graph.sorted_names()?, "configer order");

    let ctx = ConditionContext::new(&properties);
    let ctx = if args.profiles.is_empty() {
        ctx
    } else {
        ctx.with_profiles(&args.profiles)
    };
    let report = graph.run(&binder, &ctx)?;
    info!(executed = ?report.executed(), skipped = ?report.skipped(), "bootstrap complete");
    Ok(())
}

fn load_properties(args: &Args, binder: &Binder, vars: &[(String, String)]) -> Result<Properties> {
    // Environment variables only steer file discovery here; they are merged
    // after the files so an env leaf cannot collide with a file subtree.
    let env_vars = || vars.iter().map(|(name, value)| (name.as_str(), value.as_str()));
    let mut env = PropertyLoader::new();
    env.load_env_vars(&args.env_prefix, env_vars())?;

    let locator = if args.config_dirs.is_empty() {
        FileResourceLocator::from_properties(binder, env.properties())?
    } else {
        FileResourceLocator::new(args.config_dirs.iter().cloned())
    };
    let mut loader = PropertyLoader::new();
    let found = loader
        .load_application(&locator, "application", &[])
        .with_context(|| format!("loading configuration from {:?}", locator.locations()))?;
    if found == 0 {
        bail!("no application.* file found in {:?}", locator.locations());
    }

    let profiles = if args.profiles.is_empty() {
        let layered = Overlay::new(env.properties(), loader.properties());
        ConditionContext::new(&layered).profiles()
    } else {
        args.profiles.clone()
    };
    for profile in &profiles {
        let found = loader.load_application(&locator, &format!("application-{profile}"), &[])?;
        info!(profile, files = found, "profile loaded");
    }

    // Environment and command line take precedence over files.
    loader.load_env_vars(&args.env_prefix, env_vars())?;
    let mut properties = loader.into_properties();
    for (key, value) in &args.overrides {
        properties
            .set(key.as_str(), value.as_str())
            .with_context(|| format!("applying override `{key}`"))?;
    }
    Ok(properties)
}

fn configers() -> Result<ConfigerGraph> {
    let mut graph = ConfigerGraph::new();

    graph.register(Configer::new(
        "banner",
        ["${app.name:=bindery}", "${app.profiles.active:=}"],
        |name: String, profiles: Vec<String>| {
            info!(%name, ?profiles, "starting application");
            Ok::<_, anyhow::Error>(())
        },
    )?)?;

    graph.register(
        Configer::new("database", ["${db}"], |db: DatabaseConfig| {
            if !db.url.contains("://") {
                bail!("database url `{}` has no scheme", db.url);
            }
            info!(url = %db.url, pool = db.pool.size, "database configured");
            Ok(())
        })?
        .after(["banner"])
        .condition_on_property("db.url"),
    )?;

    graph.register(
        Configer::new("cache", ["${cache}"], |cache: CacheConfig| {
            let capacity: u32 = cache.regions.values().sum();
            info!(ttl = ?cache.ttl, regions = cache.regions.len(), capacity, "cache configured");
            Ok::<_, anyhow::Error>(())
        })?
        .before(["server"])
        .condition_on_property_value("cache.enabled", "true"),
    )?;

    graph.register(
        Configer::new("server", ["${server}"], |server: ServerConfig| {
            info!(
                host = %server.host,
                port = server.port,
                timeout = ?server.timeout,
                origins = ?server.allowed_origins,
                "server configured"
            );
            Ok::<_, anyhow::Error>(())
        })?
        .after(["database"]),
    )?;

    graph.register(
        Configer::new("metrics", Vec::<String>::new(), || {
            info!("metrics exporter enabled");
            Ok::<_, anyhow::Error>(())
        })?
        .after(["server"])
        .condition_on_profile("prod")
        .or()
        .condition_on_property_value("metrics.port", "expr:$ > 1024"),
    )?;

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery::PropertySource;

    fn args(dir: &std::path::Path) -> Args {
        Args::parse_from(["bootstrap", "--config-dir", &dir.display().to_string()])
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn env_leaf_does_not_block_file_subtree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("application.properties"),
            "db.url=postgres://file\ndb.pool.size=8\n",
        )
        .unwrap();

        let props = load_properties(
            &args(dir.path()),
            &Binder::default(),
            &vars(&[("APP_DB", "x"), ("APP_DB_POOL_SIZE", "16")]),
        )
        .unwrap();

        assert_eq!(props.get("db.url"), Some("postgres://file"));
        assert_eq!(props.get("db.pool.size"), Some("16"));
        assert!(props.get("db").is_none());
    }

    #[test]
    fn env_selects_profiles_and_locations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("application.properties"), "server.port=80\n").unwrap();
        std::fs::write(
            dir.path().join("application-prod.properties"),
            "server.port=443\n",
        )
        .unwrap();
        let location = dir.path().display().to_string();
        let args = Args::parse_from(["bootstrap"]);

        let props = load_properties(
            &args,
            &Binder::default(),
            &vars(&[
                ("APP_APP_CONFIG_LOCATIONS", location.as_str()),
                ("APP_APP_PROFILES_ACTIVE", "prod"),
            ]),
        )
        .unwrap();

        assert_eq!(props.get("server.port"), Some("443"));
    }
}
