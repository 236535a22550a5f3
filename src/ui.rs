use crate::config::Config;

pub fn render_index(config: &Config) -> String {
    let reply = config
        .reply_url
        .as_deref()
        .map(|url| format!(r#"<a class="reply" href="{}">Reply</a>"#, escape_attr(url)))
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{COUNTER_PATH}}", &js_string(&config.counter_path))
        .replace("{{REPLY}}", &reply)
}

// Config values are trusted, but must not close the script element.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string().replace("</", "<\\/")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Claps</title>
  <style>
    :root {
      --primary: #fff;
      --secondary: #000;
      --clap: #ff718d;
    }

    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      place-items: center;
      background: #e4e4e7;
      font-family: system-ui, sans-serif;
    }

    .claps {
      display: flex;
      align-items: center;
      gap: 8px;
      padding: 6px;
      border-radius: 999px;
      background: var(--primary);
      box-shadow: 0 8px 24px rgba(0, 0, 0, 0.12);
    }

    .claps-button {
      display: flex;
      align-items: center;
      gap: 6px;
      border: 0;
      border-radius: 999px;
      padding: 8px 14px;
      background: transparent;
      color: var(--secondary);
      font: inherit;
      cursor: pointer;
    }

    .claps-button:disabled { opacity: 0.5; cursor: default; }
    .claps-button.cached { color: var(--clap); }
    .claps-button.yes { animation: beat 0.6s; }
    .claps-button.no { animation: shake 0.6s; }

    .reply { color: var(--secondary); text-decoration: none; padding: 8px 14px; }

    @keyframes beat {
      50% { transform: scale(1.2); }
    }

    @keyframes shake {
      25% { transform: translateX(-4px); }
      75% { transform: translateX(4px); }
    }
  </style>
</head>
<body>
  <div class="claps">
    <button class="claps-button" id="clap" disabled aria-label="Clap">
      <svg width="18" height="18" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="1.6" aria-hidden="true">
        <path d="M20.84 4.61a5.5 5.5 0 0 0-7.78 0L12 5.67l-1.06-1.06a5.5 5.5 0 0 0-7.78 7.78l1.06 1.06L12 21.23l7.78-7.78 1.06-1.06a5.5 5.5 0 0 0 0-7.78z"></path>
      </svg>
      <span id="total">0</span>
    </button>
    {{REPLY}}
  </div>

  <script>
    const apiPath = {{COUNTER_PATH}};
    const DEBOUNCE_MS = 1000;
    const REACTION_MS = 600;

    const button = document.getElementById('clap');
    const totalEl = document.getElementById('total');

    let confirmed = { totalScore: 0, userScore: 0, totalUsers: 0, maxClaps: 0 };
    let buffered = 0;
    let timer = null;

    const render = () => {
      totalEl.textContent = String(confirmed.totalScore + buffered);
      button.classList.toggle('cached', buffered > 0);
    };

    const pulse = (name) => {
      button.classList.add(name);
      setTimeout(() => button.classList.remove(name), REACTION_MS);
    };

    const submit = async (score) => {
      try {
        if (confirmed.userScore >= confirmed.maxClaps) {
          pulse('no');
          return;
        }
        const res = await fetch(apiPath, {
          method: 'PATCH',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify({ score })
        });
        if (!res.ok) {
          pulse('no');
          return;
        }
        confirmed = await res.json();
        pulse('yes');
      } catch (err) {
        console.error('clap failed', err);
        pulse('no');
      } finally {
        buffered = 0;
        render();
      }
    };

    button.addEventListener('click', () => {
      if (confirmed.userScore + buffered < confirmed.maxClaps) {
        buffered += 1;
      }
      render();
      clearTimeout(timer);
      const score = buffered;
      timer = setTimeout(() => submit(score), DEBOUNCE_MS);
    });

    fetch(apiPath)
      .then((res) => (res.ok ? res.json() : Promise.reject(new Error(res.statusText))))
      .then((data) => { confirmed = data; })
      .catch((err) => console.error('failed to load claps', err))
      .finally(() => {
        button.disabled = false;
        render();
      });
  </script>
</body>
</html>
"#;
