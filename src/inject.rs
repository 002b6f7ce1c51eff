//! Responsiveness injection for generated documents.
//!
//! Generated code cannot be trusted to size itself for an iframe, so every
//! processed document gets a fixed head fragment: a viewport meta tag, a
//! defensive full-bleed stylesheet, and a resize script that probes the
//! well-known globals the prompt contract asks generated code to expose
//! (three.js camera/renderer, a p5 instance, a matter.js render object) and
//! falls back to resizing the first canvas it can find.

/// Viewport meta tag added to every processed document.
pub const VIEWPORT_META: &str =
    r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#;

/// Defensive stylesheet: border-box everywhere, no default margins, full
/// viewport root with hidden overflow, fluid canvas/SVG.
pub const RESPONSIVE_STYLE: &str = r#"<style>
  * {
    box-sizing: border-box;
  }
  html, body {
    margin: 0 !important;
    padding: 0 !important;
    width: 100% !important;
    height: 100% !important;
    overflow: hidden !important;
  }
  canvas, svg {
    display: block !important;
    max-width: 100% !important;
  }
  #simulation-container, .simulation-container, .canvas-container {
    position: relative;
  }
</style>"#;

/// Resize handler registered on deferred document-ready and on every window
/// resize. Probes engines in priority order; the generic canvas fallback runs
/// only when no known engine global is present.
pub const RESIZE_SCRIPT: &str = r#"<script type="module">
  const handleResize = () => {
    const container = document.body;
    if (!container) return;
    const width = container.clientWidth;
    const height = container.clientHeight;

    if (window.camera && window.renderer) {
      window.camera.aspect = width / height;
      window.camera.updateProjectionMatrix();
      window.renderer.setSize(width, height);
      return;
    }

    if (window.p5Instance && typeof window.p5Instance.resizeCanvas === 'function') {
      window.p5Instance.resizeCanvas(width, height);
      return;
    }

    if (window.render && window.render.canvas) {
      const render = window.render;
      render.bounds.max.x = width;
      render.bounds.max.y = height;
      render.options.width = width;
      render.options.height = height;
      render.canvas.width = width;
      render.canvas.height = height;
      if (typeof Matter !== 'undefined' && typeof Matter.Render.setPixelRatio === 'function') {
        Matter.Render.setPixelRatio(render, window.devicePixelRatio);
      }
      return;
    }

    const canvas = document.querySelector('canvas');
    if (canvas) {
      canvas.width = width;
      canvas.height = height;
    }
  };

  window.addEventListener('DOMContentLoaded', () => {
    setTimeout(handleResize, 50);
  });
  window.addEventListener('resize', handleResize);
</script>"#;

/// Insert the responsive fragment into `html`. Injection point, in order of
/// preference: right after an opening `<head>`, right before a closing
/// `</head>`, or a prepended head wrapping the fragment when the document has
/// neither. Total: succeeds on malformed and partial documents.
pub fn inject_responsiveness(html: &str) -> String {
    let fragment = format!("\n{VIEWPORT_META}\n{RESPONSIVE_STYLE}\n{RESIZE_SCRIPT}\n");

    if html.contains("<head>") {
        html.replacen("<head>", &format!("<head>{fragment}"), 1)
    } else if html.contains("</head>") {
        html.replacen("</head>", &format!("{fragment}</head>"), 1)
    } else {
        format!("<head>{fragment}</head>\n{html}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_injects_after_opening_head() {
        let html = "<html><head><title>x</title></head><body></body></html>";
        let out = inject_responsiveness(html);
        let head_at = out.find("<head>").unwrap();
        let meta_at = out.find(VIEWPORT_META).unwrap();
        let title_at = out.find("<title>").unwrap();
        assert!(head_at < meta_at && meta_at < title_at);
    }

    #[test]
    fn test_injects_before_closing_head_when_no_opening_tag() {
        // e.g. an opening head tag with attributes we do not match
        let html = "<html><head lang=\"en\"><title>x</title></head><body></body></html>";
        let out = inject_responsiveness(html);
        let meta_at = out.find(VIEWPORT_META).unwrap();
        let close_at = out.find("</head>").unwrap();
        assert!(meta_at < close_at);
    }

    #[test]
    fn test_prepends_head_when_document_has_none() {
        let html = "<body><canvas></canvas></body>";
        let out = inject_responsiveness(html);
        assert!(out.starts_with("<head>"));
        assert!(out.contains("</head>\n<body>"));
        assert_eq!(count(&out, VIEWPORT_META), 1);
    }

    #[test]
    fn test_viewport_meta_injected_exactly_once() {
        for html in [
            "<html><head></head><body></body></html>",
            "<html><body></body></html>",
            "no head at all",
            "<html><head><meta charset=\"UTF-8\"><meta name=\"author\" content=\"x\"></head></html>",
        ] {
            let out = inject_responsiveness(html);
            assert_eq!(count(&out, VIEWPORT_META), 1, "input: {html}");
        }
    }

    #[test]
    fn test_fragment_contains_style_and_script() {
        let out = inject_responsiveness("<head></head>");
        assert_eq!(count(&out, "box-sizing: border-box"), 1);
        assert_eq!(count(&out, "addEventListener('resize'"), 1);
        assert_eq!(count(&out, "DOMContentLoaded"), 1);
    }

    #[test]
    fn test_resize_script_probes_engines_in_priority_order() {
        let camera = RESIZE_SCRIPT.find("window.camera").unwrap();
        let p5 = RESIZE_SCRIPT.find("window.p5Instance").unwrap();
        let matter = RESIZE_SCRIPT.find("window.render").unwrap();
        let generic = RESIZE_SCRIPT.find("querySelector('canvas')").unwrap();
        assert!(camera < p5 && p5 < matter && matter < generic);
    }

    #[test]
    fn test_only_first_head_receives_fragment() {
        let html = "<head></head><head></head>";
        let out = inject_responsiveness(html);
        assert_eq!(count(&out, VIEWPORT_META), 1);
    }

    #[test]
    fn test_body_markup_preserved() {
        let html = "<html><head></head><body><div id=\"sim\">payload</div></body></html>";
        let out = inject_responsiveness(html);
        assert!(out.contains("<body><div id=\"sim\">payload</div></body>"));
    }
}
