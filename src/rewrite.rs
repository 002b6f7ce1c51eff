//! Import-specifier rewriting for sandboxed execution.
//!
//! Documents presented through the sandbox store run from a transient
//! document handle, where bare specifiers and import maps do not resolve.
//! Two passes fix that: drop any `<script type="importmap">` block, then map
//! every known spelling of the three.js entry point and its addons to the
//! locally hosted copies under `/libs/` on the serving origin.
//!
//! Matching is plain substring replacement, not a parser. The universe of
//! spellings is small and pinned by the prompt contract, and the patterns are
//! mutually non-overlapping substrings, so application order does not matter.

use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_MAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script\s+type=["']importmap["'].*?</script>"#).expect("valid regex")
});

/// Static `from "..."` specifiers, each paired with its local target. The
/// `{origin}` placeholder is filled at rewrite time.
const STATIC_REWRITES: &[(&str, &str)] = &[
    // Core three entry point (bare, relative, CDN; both quote styles).
    (r#"from "three""#, r#"from "{origin}/libs/three.module.js""#),
    ("from 'three'", "from '{origin}/libs/three.module.js'"),
    (
        r#"from "./libs/three.module.js""#,
        r#"from "{origin}/libs/three.module.js""#,
    ),
    (
        "from './libs/three.module.js'",
        "from '{origin}/libs/three.module.js'",
    ),
    (
        r#"from "https://unpkg.com/three""#,
        r#"from "{origin}/libs/three.module.js""#,
    ),
    (
        r#"from "https://cdn.skypack.dev/three""#,
        r#"from "{origin}/libs/three.module.js""#,
    ),
    // OrbitControls addon (old and new upstream paths, relative form).
    (
        r#"from "three/examples/jsm/controls/OrbitControls""#,
        r#"from "{origin}/libs/OrbitControls.js""#,
    ),
    (
        "from 'three/examples/jsm/controls/OrbitControls'",
        "from '{origin}/libs/OrbitControls.js'",
    ),
    (
        r#"from "three/addons/controls/OrbitControls.js""#,
        r#"from "{origin}/libs/OrbitControls.js""#,
    ),
    (
        "from 'three/addons/controls/OrbitControls.js'",
        "from '{origin}/libs/OrbitControls.js'",
    ),
    (
        r#"from "./libs/OrbitControls.js""#,
        r#"from "{origin}/libs/OrbitControls.js""#,
    ),
    (
        "from './libs/OrbitControls.js'",
        "from '{origin}/libs/OrbitControls.js'",
    ),
    // GLTFLoader addon.
    (
        r#"from "three/examples/jsm/loaders/GLTFLoader""#,
        r#"from "{origin}/libs/GLTFLoader.js""#,
    ),
    (
        "from 'three/examples/jsm/loaders/GLTFLoader'",
        "from '{origin}/libs/GLTFLoader.js'",
    ),
    (
        r#"from "three/addons/loaders/GLTFLoader.js""#,
        r#"from "{origin}/libs/GLTFLoader.js""#,
    ),
    (
        "from 'three/addons/loaders/GLTFLoader.js'",
        "from '{origin}/libs/GLTFLoader.js'",
    ),
];

/// Dynamic `import(...)` specifiers.
const DYNAMIC_REWRITES: &[(&str, &str)] = &[
    ("import('three')", "import('{origin}/libs/three.module.js')"),
    (
        r#"import("three")"#,
        r#"import("{origin}/libs/three.module.js")"#,
    ),
    (
        "import('./libs/three.module.js')",
        "import('{origin}/libs/three.module.js')",
    ),
    (
        r#"import("./libs/three.module.js")"#,
        r#"import("{origin}/libs/three.module.js")"#,
    ),
    (
        "import('./libs/OrbitControls.js')",
        "import('{origin}/libs/OrbitControls.js')",
    ),
    (
        r#"import("./libs/OrbitControls.js")"#,
        r#"import("{origin}/libs/OrbitControls.js")"#,
    ),
];

/// Rewrite module imports in `html` so every known specifier resolves to a
/// locally hosted file on `origin`. Total: unexpected input degrades to a
/// passthrough, never an error.
pub fn rewrite_imports(html: &str, origin: &str) -> String {
    let mut out = String::new();
    let stripped = IMPORT_MAP_RE.replace_all(html, "");
    if stripped != html {
        tracing::debug!("removed import map script block");
    }
    out.push_str(&stripped);

    let mut rewritten = 0usize;
    for (pattern, target) in STATIC_REWRITES.iter().chain(DYNAMIC_REWRITES.iter()) {
        if out.contains(pattern) {
            let replacement = target.replace("{origin}", origin);
            out = out.replace(pattern, &replacement);
            rewritten += 1;
            tracing::debug!(pattern = *pattern, "rewrote import specifier");
        }
    }

    if rewritten == 0 && out == html {
        // Not an error: the generated document may use a script-tag library
        // that needs no module rewriting at all.
        tracing::warn!("no module imports rewritten; document left unchanged");
    }

    out
}
