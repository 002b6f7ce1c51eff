//! Embedded web UI and serving surface.
//!
//! One raw TCP accept loop, hand-parsed requests, an embedded single-page
//! app. Routes:
//!
//! - `/`                  — the lab page
//! - `/generate?topic=`   — SSE stream of phase events driving one run
//! - `/sandbox/<handle>`  — a presented document, loaded into the iframe
//! - `/raw/<handle>`      — the unprocessed variant, opened top-level
//! - `/libs/<name>.js`    — locally hosted library files the rewriter targets
//! - `/session/start|end` — video-session collaborator passthrough

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::LabConfig;
use crate::error::LabError;
use crate::gateway::GeminiClient;
use crate::pipeline::{PhaseEvent, SimulationArtifact, SimulationPipeline};
use crate::sandbox::SandboxStore;
use crate::session::SessionClient;

/// Consumer names for the two views that present documents.
pub const PREVIEW_CONSUMER: &str = "preview";
pub const FULLSCREEN_CONSUMER: &str = "fullscreen";

struct WebState {
    pipeline: SimulationPipeline<Arc<GeminiClient>>,
    sandbox: SandboxStore,
    artifact: Mutex<Option<SimulationArtifact>>,
    session: Option<SessionClient>,
    libs_dir: PathBuf,
}

/// Embedded single-page lab application: topic entry with quick-start chips,
/// phase progress, sandboxed preview iframe, full-screen and screen-share
/// hooks, video-session controls.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Simulab</title>
<style>
*{margin:0;padding:0;box-sizing:border-box}
body{background:#0d1117;color:#c9d1d9;font-family:'Cascadia Code','Fira Code',monospace;height:100vh;display:flex;flex-direction:column}
header{padding:14px 24px;border-bottom:1px solid #21262d;display:flex;align-items:center;justify-content:space-between}
header h1{font-size:1.2rem;color:#f0883e}
#share-badge{display:none;align-items:center;gap:6px;font-size:.75rem;color:#f0883e;border:1px solid #6e3b1f;border-radius:12px;padding:2px 10px}
#share-badge.show{display:flex}
.controls{display:flex;gap:10px;padding:12px 24px;flex-wrap:wrap;align-items:end;border-bottom:1px solid #21262d;background:#161b22}
.field{display:flex;flex-direction:column;gap:3px}
.field label{font-size:.7rem;color:#8b949e;text-transform:uppercase;letter-spacing:.5px}
.field input{background:#0d1117;border:1px solid #30363d;color:#c9d1d9;padding:6px 10px;border-radius:6px;font-family:inherit;font-size:.85rem;min-width:280px}
.field input:focus{outline:none;border-color:#f0883e}
.btn{border:none;padding:6px 14px;border-radius:6px;font-family:inherit;font-size:.85rem;cursor:pointer;color:#fff}
.btn-go{background:#9e4a12}.btn-go:hover{background:#bd5b17}
.btn-go:disabled{background:#21262d;color:#484f58;cursor:not-allowed}
.btn-alt{background:#30363d}.btn-alt:hover{background:#484f58}
.btn-alt:disabled{background:#21262d;color:#484f58;cursor:not-allowed}
#chips{display:flex;gap:6px;flex-wrap:wrap;padding:8px 24px;background:#161b22;border-bottom:1px solid #21262d}
.chip{font-size:.72rem;color:#f0883e;border:1px solid #6e3b1f;border-radius:12px;padding:2px 10px;cursor:pointer;background:none}
.chip:hover{background:#2a1709}
#main{flex:1;display:grid;grid-template-columns:280px 1fr;min-height:0}
#side{border-right:1px solid #21262d;padding:16px;display:flex;flex-direction:column;gap:12px;overflow-y:auto}
.phase{display:flex;align-items:center;gap:10px;border:1px solid #30363d;border-radius:6px;padding:10px 12px;font-size:.8rem}
.phase .dot{width:10px;height:10px;border-radius:50%;background:#30363d;flex-shrink:0}
.phase.active .dot{background:#f0883e;animation:pulse 1s infinite}
.phase.completed .dot{background:#3fb950}
.phase.error .dot{background:#f85149}
@keyframes pulse{0%,100%{opacity:1}50%{opacity:.3}}
#bar-wrap{height:6px;background:#21262d;border-radius:3px;overflow:hidden}
#bar{height:100%;width:0;background:#f0883e;transition:width .3s}
#concepts{font-size:.72rem;color:#8b949e;line-height:1.5;white-space:pre-wrap}
#session-box{margin-top:auto;border-top:1px solid #21262d;padding-top:12px;display:flex;flex-direction:column;gap:6px;font-size:.75rem}
#session-link{color:#58a6ff;word-break:break-all}
#stage{position:relative;display:flex;flex-direction:column;min-width:0}
#stage-bar{display:flex;justify-content:space-between;align-items:center;padding:6px 12px;background:#161b22;border-bottom:1px solid #21262d;font-size:.75rem;color:#8b949e}
#frame{flex:1;border:0;width:100%;background:#000}
#placeholder{position:absolute;inset:34px 0 0 0;display:flex;align-items:center;justify-content:center;color:#484f58;font-size:.85rem}
#toast{position:fixed;bottom:16px;right:16px;display:flex;flex-direction:column;gap:8px;z-index:50}
.toast{background:#161b22;border:1px solid #30363d;border-left:3px solid #3fb950;border-radius:6px;padding:10px 14px;font-size:.78rem;max-width:320px}
.toast.warn{border-left-color:#f85149}
</style>
</head>
<body>
<header>
  <h1>Simulab — Experiment Lab</h1>
  <div id="share-badge">screen sharing active</div>
</header>
<div class="controls">
  <div class="field">
    <label for="topic">Scientific topic</label>
    <input id="topic" type="text" placeholder="e.g. Pendulum Motion" />
  </div>
  <button class="btn btn-go" id="go">Generate</button>
  <button class="btn btn-alt" id="fullscreen" disabled>Full Screen</button>
  <button class="btn btn-alt" id="session-start">Start Call</button>
  <button class="btn btn-alt" id="session-end" disabled>End Call</button>
</div>
<div id="chips"></div>
<div id="main">
  <div id="side">
    <div id="bar-wrap"><div id="bar"></div></div>
    <div class="phase" id="phase-research"><div class="dot"></div>Researching Topic</div>
    <div class="phase" id="phase-analysis"><div class="dot"></div>Analyzing Information</div>
    <div class="phase" id="phase-simulation"><div class="dot"></div>Building Simulation</div>
    <div id="concepts"></div>
    <div id="session-box">
      <span>Video session</span>
      <a id="session-link" target="_blank"></a>
    </div>
  </div>
  <div id="stage">
    <div id="stage-bar"><span>Interactive Preview</span><span id="topic-label"></span></div>
    <iframe id="frame" sandbox="allow-scripts" title="simulation preview"></iframe>
    <div id="placeholder">Enter a topic to generate a simulation</div>
  </div>
</div>
<div id="toast"></div>
<script>
const SUGGESTED=["Pendulum Motion","Wave Interference","Planetary Orbits","Double Slit Experiment","Electromagnetic Induction","Chemical Reactions","DNA Replication","Projectile Motion"];
const chips=document.getElementById('chips');
SUGGESTED.forEach(t=>{const b=document.createElement('button');b.className='chip';b.textContent=t;b.onclick=()=>{document.getElementById('topic').value=t;};chips.appendChild(b);});
function toast(msg,warn){const d=document.createElement('div');d.className='toast'+(warn?' warn':'');d.textContent=msg;document.getElementById('toast').appendChild(d);setTimeout(()=>d.remove(),5000);}
function setPhase(name,status){const el=document.getElementById('phase-'+name);el.className='phase '+status;}
function resetPhases(){['research','analysis','simulation'].forEach(p=>setPhase(p,''));document.getElementById('bar').style.width='0%';}
let fullscreenUrl=null;
let es=null;
document.getElementById('go').onclick=()=>{
  const topic=document.getElementById('topic').value.trim();
  if(!topic){toast('Please enter a topic',true);return;}
  const go=document.getElementById('go');
  go.disabled=true; // one run at a time
  resetPhases();
  document.getElementById('concepts').textContent='';
  es=new EventSource('/generate?topic='+encodeURIComponent(topic));
  es.addEventListener('phase',e=>{
    const ev=JSON.parse(e.data);
    setPhase(ev.phase,ev.status);
    document.getElementById('bar').style.width=ev.progress+'%';
  });
  es.addEventListener('artifact',e=>{
    const a=JSON.parse(e.data);
    document.getElementById('frame').src=a.preview_url;
    document.getElementById('placeholder').style.display='none';
    document.getElementById('topic-label').textContent=a.topic;
    document.getElementById('concepts').textContent=a.concepts;
    fullscreenUrl=a.fullscreen_url;
    document.getElementById('fullscreen').disabled=false;
    toast('Simulation generated for "'+a.topic+'"');
  });
  es.addEventListener('capture',()=>startScreenShare());
  es.addEventListener('fail',e=>{toast('Generation failed: '+JSON.parse(e.data).message,true);});
  es.addEventListener('done',()=>{es.close();go.disabled=false;});
  es.onerror=()=>{es.close();go.disabled=false;};
};
document.getElementById('fullscreen').onclick=()=>{if(fullscreenUrl)window.open(fullscreenUrl,'_blank');};
async function startScreenShare(){
  try{
    if(!navigator.mediaDevices||!navigator.mediaDevices.getDisplayMedia)return;
    const stream=await navigator.mediaDevices.getDisplayMedia({video:true,audio:false});
    document.getElementById('share-badge').classList.add('show');
    stream.getVideoTracks()[0].addEventListener('ended',()=>{
      document.getElementById('share-badge').classList.remove('show');
    });
    toast('Screen sharing started');
  }catch(e){
    toast('Screen share failed; you can share manually later',true);
  }
}
let sessionId=null;
document.getElementById('session-start').onclick=async()=>{
  try{
    const r=await fetch('/session/start');
    if(!r.ok){toast('Session start failed: '+await r.text(),true);return;}
    const s=await r.json();
    sessionId=s.conversation_id;
    const link=document.getElementById('session-link');
    link.href=s.conversation_url;link.textContent=s.conversation_url;
    document.getElementById('session-end').disabled=false;
    toast('Video session ready — open the join link');
  }catch(e){toast('Session start failed',true);}
};
document.getElementById('session-end').onclick=async()=>{
  if(!sessionId)return;
  try{await fetch('/session/end?id='+encodeURIComponent(sessionId));}catch(e){}
  sessionId=null;
  document.getElementById('session-link').textContent='';
  document.getElementById('session-end').disabled=true;
  toast('Video session ended');
};
</script>
</body>
</html>"##;

// ---------------------------------------------------------------------------
// Small HTTP helpers
// ---------------------------------------------------------------------------

pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(v) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                    out.push(v);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn parse_query(query: &str) -> std::collections::HashMap<String, String> {
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| match pair.find('=') {
            Some(idx) => (url_decode(&pair[..idx]), url_decode(&pair[idx + 1..])),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Format one server-sent event.
pub fn sse_event(name: &str, data: &str) -> String {
    format!("event: {name}\ndata: {data}\n\n")
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Serve the lab on `127.0.0.1:port` until the process is stopped.
pub async fn serve(port: u16, config: &LabConfig) -> Result<(), LabError> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let origin = format!("http://localhost:{port}");

    let gateway = Arc::new(GeminiClient::new(
        &config.gemini_api_key,
        &config.gemini_endpoint,
    ));
    let session = config
        .tavus_api_key
        .as_deref()
        .map(|key| SessionClient::new(key, &config.persona_id));

    let state = Arc::new(WebState {
        pipeline: SimulationPipeline::new(gateway, &origin),
        sandbox: SandboxStore::new(),
        artifact: Mutex::new(None),
        session,
        libs_dir: config.libs_dir.clone(),
    });

    tracing::info!(%origin, "lab UI running");
    eprintln!("  Lab running at {origin}");
    eprintln!("  Press Ctrl+C to stop.");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::warn!(error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection(
    mut stream: tokio::net::TcpStream,
    state: Arc<WebState>,
) -> Result<(), LabError> {
    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    // Request line: "GET /path?query HTTP/1.1"
    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(());
    }
    let path_and_query = parts[1];
    let (path, query_str) = match path_and_query.find('?') {
        Some(idx) => (&path_and_query[..idx], &path_and_query[idx + 1..]),
        None => (path_and_query, ""),
    };

    match path {
        "/" => {
            stream
                .write_all(
                    http_response("200 OK", "text/html; charset=utf-8", INDEX_HTML).as_bytes(),
                )
                .await?;
        }
        "/generate" => {
            let params = parse_query(query_str);
            let topic = params.get("topic").cloned().unwrap_or_default();
            handle_generate(&mut stream, state, topic).await?;
        }
        p if p.starts_with("/sandbox/") => {
            serve_document(&mut stream, &state, p.trim_start_matches("/sandbox/")).await?;
        }
        p if p.starts_with("/raw/") => {
            serve_document(&mut stream, &state, p.trim_start_matches("/raw/")).await?;
        }
        p if p.starts_with("/libs/") => {
            serve_lib(&mut stream, &state, p.trim_start_matches("/libs/")).await?;
        }
        "/artifact" => {
            // Last successfully published artifact; a failed regeneration
            // never clears this.
            let response = {
                let slot = state.artifact.lock().expect("artifact lock poisoned");
                match slot.as_ref() {
                    Some(artifact) => http_response(
                        "200 OK",
                        "application/json",
                        &serde_json::to_string(artifact).unwrap_or_default(),
                    ),
                    None => http_response("404 Not Found", "text/plain", "no artifact yet"),
                }
            };
            stream.write_all(response.as_bytes()).await?;
        }
        "/session/start" => {
            let response = match &state.session {
                None => http_response(
                    "503 Service Unavailable",
                    "text/plain",
                    "video session collaborator not configured (set TAVUS_API_KEY)",
                ),
                Some(client) => match client.create_session().await {
                    Ok(session) => http_response(
                        "200 OK",
                        "application/json",
                        &serde_json::to_string(&session).unwrap_or_default(),
                    ),
                    Err(e) => http_response("502 Bad Gateway", "text/plain", &e.to_string()),
                },
            };
            stream.write_all(response.as_bytes()).await?;
        }
        "/session/end" => {
            let params = parse_query(query_str);
            let id = params.get("id").cloned().unwrap_or_default();
            let response = match (&state.session, id.is_empty()) {
                (Some(client), false) => match client.end_session(&id).await {
                    Ok(()) => http_response("200 OK", "text/plain", "ended"),
                    Err(e) => http_response("502 Bad Gateway", "text/plain", &e.to_string()),
                },
                _ => http_response("400 Bad Request", "text/plain", "missing session id"),
            };
            stream.write_all(response.as_bytes()).await?;
        }
        _ => {
            stream
                .write_all(http_response("404 Not Found", "text/plain", "not found").as_bytes())
                .await?;
        }
    }

    Ok(())
}

/// Drive one generation run, mirroring phase events onto the SSE stream and
/// presenting the results through the sandbox store on success.
async fn handle_generate(
    stream: &mut tokio::net::TcpStream,
    state: Arc<WebState>,
    topic: String,
) -> Result<(), LabError> {
    let headers = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\nAccess-Control-Allow-Origin: *\r\n\r\n";
    stream.write_all(headers.as_bytes()).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<PhaseEvent>();
    let run_state = Arc::clone(&state);
    let run_topic = topic.clone();
    let run = tokio::spawn(async move {
        run_state
            .pipeline
            .run_with_events(&run_topic, Some(tx))
            .await
    });

    while let Some(event) = rx.recv().await {
        let data = serde_json::to_string(&event).unwrap_or_default();
        stream
            .write_all(sse_event("phase", &data).as_bytes())
            .await?;
    }

    match run.await {
        Ok(Ok(output)) => {
            let preview = state
                .sandbox
                .present(PREVIEW_CONSUMER, output.artifact.html_code.clone());
            let fullscreen = state.sandbox.present(FULLSCREEN_CONSUMER, output.raw_html);

            {
                let mut slot = state.artifact.lock().expect("artifact lock poisoned");
                *slot = Some(output.artifact.clone());
            }

            let payload = serde_json::json!({
                "topic": output.artifact.topic,
                "concepts": output.artifact.concepts,
                "preview_url": format!("/sandbox/{preview}"),
                "fullscreen_url": format!("/raw/{fullscreen}"),
            });
            stream
                .write_all(sse_event("artifact", &payload.to_string()).as_bytes())
                .await?;
            // Best-effort screen-capture nudge; the page is free to ignore it.
            stream
                .write_all(sse_event("capture", "{}").as_bytes())
                .await?;
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, topic, "generation run failed");
            let payload = serde_json::json!({ "message": e.to_string() });
            stream
                .write_all(sse_event("fail", &payload.to_string()).as_bytes())
                .await?;
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "generation task panicked");
            let payload = serde_json::json!({ "message": "internal error" });
            stream
                .write_all(sse_event("fail", &payload.to_string()).as_bytes())
                .await?;
        }
    }

    stream.write_all(sse_event("done", "{}").as_bytes()).await?;
    Ok(())
}

async fn serve_document(
    stream: &mut tokio::net::TcpStream,
    state: &WebState,
    handle: &str,
) -> Result<(), LabError> {
    let response = match state.sandbox.fetch(handle) {
        Some(html) => http_response("200 OK", "text/html; charset=utf-8", &html),
        None => http_response("404 Not Found", "text/plain", "no such document"),
    };
    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

async fn serve_lib(
    stream: &mut tokio::net::TcpStream,
    state: &WebState,
    name: &str,
) -> Result<(), LabError> {
    // Flat file names only; no traversal.
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        stream
            .write_all(
                http_response("400 Bad Request", "text/plain", "bad library name").as_bytes(),
            )
            .await?;
        return Ok(());
    }

    let path = state.libs_dir.join(name);
    let response = match tokio::fs::read_to_string(&path).await {
        Ok(body) => http_response("200 OK", "application/javascript; charset=utf-8", &body),
        Err(_) => {
            tracing::warn!(library = name, "requested library file not found");
            http_response("404 Not Found", "text/plain", "library not hosted")
        }
    };
    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
