//! Prompt construction for the two-stage generation workflow.
//!
//! These are pure functions: no network, no side effects, deterministic for a
//! given topic and research text. The simulation prompt also carries the
//! contract the rest of the pipeline relies on — fluid sizing, the rendering
//! library menu, well-known `window.*` globals for the injected resize
//! handler, and the local `./libs/` import spelling the rewriter targets.

/// Prompt for the research phase. Contains the topic verbatim.
pub fn research_prompt(topic: &str) -> String {
    format!(
        r#"Research the topic: "{topic}" and provide:

1. **Core Definition**: What is it?
2. **Key Physics/Science**: 3-4 main scientific principles
3. **Key Parameters**: Variables that can be controlled/changed
4. **Visual Behavior**: How it looks and moves
5. **Real Values**: Actual numbers, ranges, units

Keep it concise and simulation-focused."#
    )
}

/// Prompt for the embeddable simulation variant. The output of this prompt is
/// post-processed (fence strip, import rewrite, responsiveness injection) and
/// then displayed inside a restricted iframe.
pub fn simulation_prompt(topic: &str, research: &str) -> String {
    format!(
        r#"Create ONE interactive HTML simulation for: "{topic}"

Research: {research}

CRITICAL REQUIREMENTS:
- Single HTML file with embedded CSS and JavaScript.
- The simulation MUST be fully visible and responsive. It will be placed in an iframe.
- DO NOT set fixed pixel widths or heights on the body, canvas, or other main containers. Use percentages (100%) to fill the available space.
- The main canvas or SVG must fill its parent container (width: 100%, height: 100%).
- Add a window resize listener in your JavaScript to update the simulation's dimensions (e.g., camera aspect ratio, renderer size).
- Dark theme with vibrant colors suitable for a science lab.
- Only provide HTML code, no additional text or explanations.

VIEWPORT & RESIZING RULES:
- CRITICAL: Expose key variables to the global scope so they can be accessed by external scripts.
- For Three.js, ensure 'camera', 'renderer', and 'scene' are available as 'window.camera', 'window.renderer', and 'window.scene'.
- For P5.js, store the p5 instance in 'window.p5Instance'.
- For Matter.js, expose 'engine' and 'render' to the window object.
- For Pixi.js, expose 'app' as 'window.app'.

MODULE IMPORT RULES:
- For Three.js, use local imports: import * as THREE from './libs/three.module.js';
- For Pixi.js, use: <script src="https://cdnjs.cloudflare.com/ajax/libs/pixi.js/7.2.4/pixi.min.js"></script>
- For P5.js, use: <script src="https://cdnjs.cloudflare.com/ajax/libs/p5.js/1.6.0/p5.min.js"></script>
- For D3.js, use: <script src="https://d3js.org/d3.v7.min.js"></script>
- For Matter.js, use: <script src="https://cdnjs.cloudflare.com/ajax/libs/matter-js/0.19.0/matter.min.js"></script>

Make the simulation in pixi.js / p5.js / d3.js according to the need most of the time.
Choose pixi.js over p5.js for 2D simulations.
Use three.js only if the user has requested 3D simulation specifically.

Try to make the animation visually stunning!
Focus on core concept visualization with essential interactivity only."#
    )
}

/// Prompt for the freestanding full-screen variant. This document is opened
/// as a top-level page, so public CDN imports (including an import map for
/// three.js) work natively and no rewriting is applied to the result.
pub fn freestanding_prompt(topic: &str, research: &str) -> String {
    format!(
        r#"Create ONE interactive HTML simulation for: "{topic}"

Research: {research}

CRITICAL REQUIREMENTS:
- Complete, self-contained HTML document starting with <!DOCTYPE html>
- The simulation MUST be fully visible and responsive
- Dark theme with vibrant colors suitable for a science lab
- Only provide HTML code, no additional text or explanations

LIBRARY USAGE RULES:
- For Pixi.js: <script src="https://cdnjs.cloudflare.com/ajax/libs/pixi.js/7.2.4/pixi.min.js"></script>
- For P5.js: <script src="https://cdnjs.cloudflare.com/ajax/libs/p5.js/1.6.0/p5.min.js"></script>
- For Three.js: <script type="importmap">{{"imports":{{"three":"https://unpkg.com/three@0.158.0/build/three.module.js"}}}}</script>
- For D3.js: <script src="https://d3js.org/d3.v7.min.js"></script>

Make the simulation in pixi.js / p5.js / d3.js according to the need most of the time.
Choose pixi.js over p5.js for 2D simulations.
Use three.js only if the user has requested 3D simulation specifically.

Focus on core concept visualization with essential interactivity only."#
    )
}
