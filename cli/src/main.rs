use std::net::IpAddr;
use std::process;

use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use waypoint::{
    ConfigSnapshot, DataPlane, MatchEngine, Operator, ParamType, RequestContext,
    DEFAULT_MEMORY_CEILING_BYTES, DEFAULT_SEGMENT_CAPACITY,
};
use waypoint_http::HttpRequest;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "eval" => cmd_eval(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "info" => {
            cmd_info();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_eval(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("eval requires a snapshot file path".into());
    }

    let snapshot = load_snapshot(&args[0])?;
    let eval = parse_eval_args(&args[1..])?;
    let plane = DataPlane::from_snapshot(&snapshot);
    debug!(plugin = %eval.plugin, trace = eval.trace, "routing request");

    if eval.trace {
        print_traces(plane.engine(), &eval.plugin, &eval.request);
    }

    match plane.route(&eval.plugin, &eval.request) {
        Some(decision) => match decision.rule {
            Some(rule) => println!("selector {} / rule {}", decision.selector.id, rule.id),
            None => println!("selector {}", decision.selector.id),
        },
        None => println!("(no match)"),
    }

    plane.shutdown();
    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("check requires a snapshot file path".into());
    }

    let snapshot = load_snapshot(&args[0])?;
    let plane = DataPlane::from_snapshot(&snapshot);

    for selector in &snapshot.selectors {
        if plane.index().lookup_plugin(&selector.plugin_name).is_none() {
            eprintln!(
                "warning: selector {} references unknown plugin {}",
                selector.id, selector.plugin_name
            );
        }
    }
    for rule in &snapshot.rules {
        if plane.index().lookup_selector_plugin(&rule.selector_id).is_none() {
            eprintln!(
                "warning: rule {} references unknown selector {}",
                rule.id, rule.selector_id
            );
        }
    }

    println!("Snapshot valid: {}", plane.index().stats());
    let cache = plane.config().cache;
    println!(
        "Cache: {} entries per plugin, {} bytes ceiling",
        cache.segment_capacity, cache.memory_ceiling_bytes
    );
    Ok(())
}

fn cmd_info() {
    println!("Parameter types:");
    for param_type in ParamType::ALL {
        println!("  {param_type}");
    }

    println!();
    println!("Operators:");
    for operator in Operator::ALL {
        println!("  {operator}");
    }

    println!();
    println!("Cache defaults:");
    println!("  segment_capacity: {DEFAULT_SEGMENT_CAPACITY}");
    println!("  memory_ceiling_bytes: {DEFAULT_MEMORY_CEILING_BYTES}");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

fn load_snapshot(path: &str) -> Result<ConfigSnapshot, String> {
    let snapshot = ConfigSnapshot::from_path(path).map_err(|e| {
        error!(path, error = %e, "failed to load snapshot");
        e.to_string()
    })?;
    debug!(
        path,
        plugins = snapshot.plugins.len(),
        selectors = snapshot.selectors.len(),
        rules = snapshot.rules.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

fn print_traces(engine: &MatchEngine, plugin: &str, ctx: &dyn RequestContext) {
    let selectors = engine.trace_selectors(plugin, ctx);
    if selectors.is_empty() {
        println!("plugin {plugin}: no selectors");
        return;
    }
    for (selector, trace) in selectors {
        print!("selector {} (sort {}): {trace}", selector.id, selector.sort);
        if !trace.matched {
            continue;
        }
        for (rule, trace) in engine.trace_rules(&selector.id, ctx) {
            print!("  rule {} (sort {}): {trace}", rule.id, rule.sort);
        }
    }
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

struct EvalArgs {
    plugin: String,
    request: HttpRequest,
    trace: bool,
}

fn parse_eval_args(args: &[String]) -> Result<EvalArgs, String> {
    let mut plugin = None;
    let mut trace = false;
    let mut builder = HttpRequest::builder();
    let mut i = 0;

    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--trace" {
            trace = true;
            i += 1;
            continue;
        }

        let value = args
            .get(i + 1)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        builder = match flag {
            "--plugin" => {
                plugin = Some(value.clone());
                builder
            }
            "--uri" => builder.uri(value),
            "--host" => builder.host(value.as_str()),
            "--method" => builder.method(value.as_str()),
            "--scheme" => builder.scheme(value.as_str()),
            "--ip" => {
                let ip: IpAddr = value
                    .parse()
                    .map_err(|e| format!("invalid address \"{value}\": {e}"))?;
                builder.remote_ip(ip)
            }
            "--header" => {
                let (k, v) = split_pair(value)?;
                builder.header(k, v)
            }
            "--query" => {
                let (k, v) = split_pair(value)?;
                builder.query_param(k, v)
            }
            "--cookie" => {
                let (k, v) = split_pair(value)?;
                builder.cookie(k, v)
            }
            "--form" => {
                let (k, v) = split_pair(value)?;
                builder.form_field(k, v)
            }
            other => return Err(format!("unexpected argument \"{other}\"")),
        };
        i += 2;
    }

    let plugin = plugin.ok_or("eval requires --plugin <name>")?;
    Ok(EvalArgs {
        plugin,
        request: builder.build(),
        trace,
    })
}

fn split_pair(pair: &str) -> Result<(&str, &str), String> {
    pair.split_once('=')
        .ok_or_else(|| format!("invalid pair \"{pair}\", expected key=value"))
}

fn print_usage() {
    eprintln!(
        "Usage: waypoint <command> [options]

Commands:
  eval <snapshot> --plugin <name> [request...] [--trace]
                                 Route a request against a snapshot
  check <snapshot>               Validate a snapshot and print its size
  info                           Print parameter types, operators and cache defaults
  help                           Show this help

Request options:
  --uri <path?query>   --host <host>   --method <method>   --scheme <scheme>
  --ip <addr>          --header k=v    --query k=v         --cookie k=v
  --form k=v

Set RUST_LOG=waypoint=debug to log configuration events and cache activity."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parse_eval_requires_plugin() {
        let result = parse_eval_args(&args(&["--uri", "/api"]));
        assert!(result.is_err());
    }

    #[test]
    fn parse_eval_request_fields() {
        let eval = parse_eval_args(&args(&[
            "--plugin",
            "rate-limiter",
            "--uri",
            "/api/users?page=2",
            "--header",
            "X-Env=prod",
            "--cookie",
            "cohort=beta",
            "--ip",
            "10.0.0.1",
            "--trace",
        ]))
        .unwrap();

        assert_eq!(eval.plugin, "rate-limiter");
        assert!(eval.trace);
        let req = &eval.request;
        assert_eq!(req.path(), "/api/users");
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.header("x-env"), Some("prod"));
        assert_eq!(req.cookie("cohort"), Some("beta"));
        assert_eq!(req.remote_ip(), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn parse_eval_rejects_bad_input() {
        assert!(parse_eval_args(&args(&["--plugin"])).is_err());
        assert!(parse_eval_args(&args(&["--plugin", "p", "--header", "novalue"])).is_err());
        assert!(parse_eval_args(&args(&["--plugin", "p", "--ip", "nope"])).is_err());
        assert!(parse_eval_args(&args(&["--plugin", "p", "--bogus", "x"])).is_err());
    }

    #[test]
    fn load_and_route_yaml_snapshot() {
        let path = std::env::temp_dir().join(format!("waypoint-cli-{}.yaml", process::id()));
        std::fs::write(
            &path,
            r#"
plugins:
  - name: rate-limiter
selectors:
  - id: s1
    plugin_name: rate-limiter
    conditions:
      - { id: c1, param_type: header, operator: "=", param_name: x-env, param_value: prod }
rules:
  - id: r1
    selector_id: s1
"#,
        )
        .unwrap();

        let snapshot = load_snapshot(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        let plane = DataPlane::from_snapshot(&snapshot.unwrap());

        let eval = parse_eval_args(&args(&["--plugin", "rate-limiter", "--header", "x-env=prod"]))
            .unwrap();
        let decision = plane.route(&eval.plugin, &eval.request).unwrap();
        assert_eq!(decision.selector.id, "s1");
        assert_eq!(decision.rule.unwrap().id, "r1");
    }

    #[test]
    fn load_missing_snapshot() {
        let err = load_snapshot("/nonexistent/waypoint.yaml").unwrap_err();
        assert!(err.contains("/nonexistent/waypoint.yaml"));
    }
}
