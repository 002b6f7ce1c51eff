use clap::Parser;

#[derive(Parser)]
#[command(name = "simulab")]
#[command(version = "0.3.0")]
#[command(about = "AI-generated interactive science simulations with sandboxed serving")]
pub struct Args {
    /// Scientific topic to generate a simulation for (CLI mode)
    pub topic: Option<String>,

    /// Launch the web lab UI on localhost instead of a one-shot CLI run
    #[arg(long)]
    pub web: bool,

    /// Port for the web UI server
    #[arg(long, default_value = "8888")]
    pub port: u16,

    /// Origin rewritten module imports resolve against
    /// (defaults to the local server origin for the chosen port)
    #[arg(long)]
    pub origin: Option<String>,

    /// Output file for the processed simulation document (CLI mode)
    #[arg(long, default_value = "simulation.html")]
    pub output: String,

    /// Also write the raw, CDN-dependent variant to this file (CLI mode)
    #[arg(long)]
    pub raw_output: Option<String>,
}

/// Pick the rewrite origin: an explicit `--origin` wins, otherwise the local
/// server origin for `port`.
pub fn resolve_origin(origin: Option<&str>, port: u16) -> String {
    match origin {
        Some(o) => o.trim_end_matches('/').to_string(),
        None => format!("http://localhost:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_origin_default_uses_port() {
        assert_eq!(resolve_origin(None, 8888), "http://localhost:8888");
        assert_eq!(resolve_origin(None, 3000), "http://localhost:3000");
    }

    #[test]
    fn test_resolve_origin_explicit_wins() {
        assert_eq!(
            resolve_origin(Some("https://lab.example.org"), 8888),
            "https://lab.example.org"
        );
    }

    #[test]
    fn test_resolve_origin_strips_trailing_slash() {
        assert_eq!(
            resolve_origin(Some("https://lab.example.org/"), 8888),
            "https://lab.example.org"
        );
    }
}
