//! Inline single-page UI. The browser keeps the conversation state and the
//! active session in memory and passes both back on every call, so the
//! server stays stateless about conversations.

/// The whole front-end: sidebar with connection and education settings, main
/// column with image, chat, checklist, progress, and attempts.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>VisoLearn Local Interface</title>
<style>
  body { margin: 0; font-family: sans-serif; background: #101418; color: #e8e8e8; display: flex; }
  aside { width: 320px; min-height: 100vh; background: #161c22; padding: 18px; box-sizing: border-box; }
  main { flex: 1; padding: 18px 28px; max-width: 960px; }
  h1 { font-size: 1.3em; } h2 { font-size: 1.05em; margin-top: 24px; }
  label { display: block; margin-top: 10px; font-size: 0.85em; color: #9ab; }
  input, select, textarea { width: 100%; box-sizing: border-box; margin-top: 4px; padding: 6px;
    background: #0c1014; color: #e8e8e8; border: 1px solid #2a333c; border-radius: 4px; }
  button { margin-top: 10px; padding: 7px 14px; background: #2a5db0; color: #fff; border: 0;
    border-radius: 4px; cursor: pointer; }
  button:disabled { background: #333; cursor: default; }
  #banner { display: none; background: #5a3c00; color: #ffd37f; padding: 10px 14px; border-radius: 6px; margin-bottom: 14px; }
  #error { display: none; background: #4a1414; color: #ff9f9f; padding: 10px 14px; border-radius: 6px; margin-bottom: 14px; }
  #image-pane img { max-width: 100%; border-radius: 8px; }
  .turn { border: 1px solid #2a333c; border-radius: 6px; padding: 8px 12px; margin-top: 8px; }
  .turn.child { background: #15232e; } .turn.teacher { background: #1b2a1b; }
  .row { display: flex; gap: 24px; } .col { flex: 1; }
  #checklist-pane, #progress-pane, #attempts-pane, #difficulty-pane { margin-top: 8px; }
  .status-ok { color: #7fff7f; } .status-bad { color: #ff9f9f; }
</style>
</head>
<body>
<aside>
  <h1>VisoLearn Local Interface</h1>
  <div id="connection-status" class="status-bad">Not connected</div>

  <label>Hugging Face Token
    <input id="token" type="password" placeholder="Leave empty to use HF_TOKEN from .env">
  </label>
  <button id="connect">Connect</button>
  <button id="validate">Validate</button>
  <label><input id="fallback" type="checkbox" style="width:auto"> Use fallback mode</label>

  <h2>Child's Information</h2>
  <label>Child's Age <input id="age" value="3"></label>
  <label>Autism Level
    <select id="autism-level">
      <option>Level 1</option><option>Level 2</option><option>Level 3</option>
    </select>
  </label>

  <h2>Education Settings</h2>
  <label>Topic Focus <input id="topic" placeholder="Enter a specific topic..."></label>
  <label>Treatment Plan <textarea id="plan" rows="3" placeholder="Enter the treatment plan..."></textarea></label>
  <label>Allowed Attempts <input id="attempts" type="number" min="1" max="10" value="3"></label>
  <label>Details Threshold (%) <input id="threshold" type="number" min="10" max="100" step="5" value="70"></label>
  <label>Image Style
    <select id="style">
      <option>Realistic</option><option>Illustration</option><option>Cartoon</option>
      <option>Watercolor</option><option>3D Rendering</option>
    </select>
  </label>

  <button id="generate">Generate Image</button>
  <hr>
  <button id="save-log" disabled>Save Log</button>
  <button id="save-images" disabled>Save Images</button>
</aside>

<main>
  <div id="banner">FALLBACK MODE: running with locally simulated results. Some features are unavailable.</div>
  <div id="error"></div>

  <h2>Generated Image</h2>
  <div id="image-pane"><em>Generate an image to start the session</em></div>

  <h2>Child's Description</h2>
  <textarea id="message" rows="3" placeholder="Type what the child says about the image..."></textarea>
  <button id="send" disabled>Submit Description</button>

  <div class="row">
    <div class="col">
      <h2>Conversation</h2>
      <div id="conversation"><em>No conversation yet.</em></div>
    </div>
    <div class="col">
      <h2>Details to Identify</h2>
      <div id="checklist-pane"><em>Generate an image first</em></div>
      <h2>Progress</h2>
      <div id="progress-pane"></div>
      <h2>Attempts</h2>
      <div id="attempts-pane"></div>
      <div id="difficulty-pane"></div>
    </div>
  </div>
</main>

<script>
let session = null;
let conversation = { turns: [], identified_details: 0 };

const $ = (id) => document.getElementById(id);

async function api(path, body) {
  const res = await fetch('/api/v1' + path, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body || {}),
  });
  const json = await res.json().catch(() => ({}));
  if (!res.ok) throw new Error(json.error || ('HTTP ' + res.status));
  return json;
}

function showError(text) {
  const el = $('error');
  el.textContent = text;
  el.style.display = text ? 'block' : 'none';
}

function setDegraded(degraded) {
  $('banner').style.display = degraded ? 'block' : 'none';
}

function sessionConfig() {
  return {
    age: $('age').value || '3',
    autism_level: $('autism-level').value,
    topic_focus: $('topic').value,
    treatment_plan: $('plan').value,
    attempt_limit: parseInt($('attempts').value, 10) || 3,
    details_threshold: parseInt($('threshold').value, 10) || 70,
    image_style: $('style').value,
  };
}

async function refreshStatus() {
  const res = await fetch('/api/v1/status');
  const status = await res.json();
  const el = $('connection-status');
  if (status.connected) {
    el.textContent = 'Connected to VisoLearn API';
    el.className = 'status-ok';
  } else {
    el.textContent = status.fallback ? 'Fallback mode (no API connection)' : 'Not connected';
    el.className = 'status-bad';
  }
  $('fallback').checked = status.fallback;
  const canSave = status.connected && !status.fallback && session !== null;
  $('save-log').disabled = !canSave;
  $('save-images').disabled = !canSave;
}

function renderImage() {
  const pane = $('image-pane');
  if (session && session.image) {
    pane.innerHTML = '<img alt="generated image">';
    pane.querySelector('img').src = session.image.url;
  } else {
    pane.innerHTML = '<em>Generate an image to start the session</em>';
  }
}

function renderConversation() {
  const pane = $('conversation');
  if (!conversation.turns.length) {
    pane.innerHTML = '<em>No conversation yet.</em>';
    return;
  }
  pane.innerHTML = '';
  for (const turn of conversation.turns) {
    const div = document.createElement('div');
    div.className = 'turn ' + (turn.role === 'Child' ? 'child' : 'teacher');
    div.textContent = (turn.role === 'Child' ? 'Child: ' : 'Teacher: ') + turn.message;
    pane.appendChild(div);
  }
}

async function renderFragments() {
  if (!session) return;
  const body = { session: session };
  $('checklist-pane').innerHTML = (await api('/fragments/checklist', body)).html;
  $('progress-pane').innerHTML = (await api('/fragments/progress', body)).html;
  $('attempts-pane').innerHTML = (await api('/fragments/attempts', body)).html;
  $('difficulty-pane').innerHTML = (await api('/fragments/difficulty', body)).html;
}

$('connect').onclick = async () => {
  showError('');
  try {
    await api('/connect', { token: $('token').value || null });
  } catch (err) {
    showError(err.message);
  }
  await refreshStatus();
};

$('validate').onclick = async () => {
  showError('');
  $('validate').disabled = true;
  try {
    const res = await api('/validate');
    if (!res.ready) showError('The space is still waking up. Try Validate again in a moment.');
  } catch (err) {
    showError(err.message);
  }
  $('validate').disabled = false;
  await refreshStatus();
};

$('fallback').onchange = async () => {
  await api('/fallback', { enabled: $('fallback').checked });
  await refreshStatus();
};

$('generate').onclick = async () => {
  showError('');
  $('generate').disabled = true;
  try {
    const outcome = await api('/generate', sessionConfig());
    session = outcome.value.session;
    conversation = outcome.value.conversation;
    setDegraded(outcome.degraded);
    renderImage();
    renderConversation();
    await renderFragments();
    $('send').disabled = false;
  } catch (err) {
    showError(err.message);
  }
  $('generate').disabled = false;
  await refreshStatus();
};

$('send').onclick = async () => {
  const message = $('message').value.trim();
  if (!message) { showError('Please enter a description first'); return; }
  showError('');
  $('send').disabled = true;
  try {
    const outcome = await api('/chat', { conversation: conversation, session: session, message: message });
    session = outcome.value.session;
    conversation = outcome.value.conversation;
    setDegraded(outcome.degraded);
    $('message').value = '';
    renderImage();
    renderConversation();
    await renderFragments();
  } catch (err) {
    showError(err.message);
  }
  $('send').disabled = false;
};

$('save-log').onclick = async () => {
  showError('');
  try {
    const res = await api('/save/log', { session: session, conversation: conversation });
    showError('Session log saved: ' + res.paths.join(', '));
  } catch (err) {
    showError('Save failed: ' + err.message);
  }
};

$('save-images').onclick = async () => {
  showError('');
  try {
    const res = await api('/save/images', { session: session, conversation: conversation });
    showError('Images saved: ' + res.paths.join(', '));
  } catch (err) {
    showError('Save failed: ' + err.message);
  }
};

refreshStatus();
</script>
</body>
</html>
"#;
