use vault_contract::ServiceType;

use crate::pending::PendingEntryView;

/// Renders the loopback-only HTML form a human fills in to hand a secret to
/// a waiting `add` call. Deliberately minimal — styling and UX polish are out
/// of scope; this page only needs to exist and post the right JSON body to
/// `/api/credentials`.
pub fn render_entry_form(view: &PendingEntryView) -> String {
    let (fields, payload_js) = match view.service_type {
        ServiceType::WebLogin => (
            r#"<label>Email<input type="email" name="email" required autofocus></label>
  <label>Password<input type="password" name="password" required></label>"#,
            "{ email: data.get('email'), password: data.get('password') }",
        ),
        ServiceType::ApiKey => (
            r#"<label>API key<input type="password" name="api_key" required autofocus></label>"#,
            "{ api_key: data.get('api_key'), headers: {} }",
        ),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>vault-mcp: add credential</title>
  <style>
    body {{ font-family: sans-serif; max-width: 28rem; margin: 3rem auto; padding: 0 1rem; }}
    label {{ display: block; margin-bottom: 1rem; }}
    input {{ width: 100%; padding: 0.4rem; box-sizing: border-box; }}
    button {{ padding: 0.5rem 1rem; }}
  </style>
</head>
<body>
  <h1>Add credential for {site_id}</h1>
  <p>Entered here, this secret is never shown to the requesting agent.</p>
  <form id="entry-form">
    {fields}
    <button type="submit">Save</button>
  </form>
  <script>
    (function () {{
      var form = document.getElementById('entry-form');
      form.addEventListener('submit', function (event) {{
        event.preventDefault();
        var data = new FormData(form);
        var payload = {payload_js};
        fetch('/api/credentials', {{
          method: 'POST',
          headers: {{ 'Content-Type': 'application/json' }},
          body: JSON.stringify({{ token: '{token}', site: '{site_js}', payload: payload }}),
        }}).then(function (response) {{
          return response.text();
        }}).then(function (text) {{
          document.open();
          document.write(text);
          document.close();
        }});
      }});
    }})();
  </script>
</body>
</html>"#,
        site_id = html_escape(&view.site_id),
        token = view.token,
        site_js = js_escape(&view.site_id),
        fields = fields,
        payload_js = payload_js,
    )
}

/// Page shown after a successful or failed submission.
pub fn render_entry_result(success: bool) -> String {
    let (heading, body) = if success {
        ("Credential saved", "You can close this tab and return to your agent.")
    } else {
        ("This link has expired", "Ask the agent to retry the add request.")
    };
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>vault-mcp</title></head>
<body style="font-family: sans-serif; max-width: 28rem; margin: 3rem auto; padding: 0 1rem;">
  <h1>{heading}</h1>
  <p>{body}</p>
</body>
</html>"#
    )
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn js_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn unit_render_entry_form_includes_password_field_for_web_login() {
        let view = PendingEntryView {
            token: Uuid::new_v4(),
            site_id: "example.com".to_string(),
            service_type: ServiceType::WebLogin,
        };
        let html = render_entry_form(&view);
        assert!(html.contains(r#"name="password""#));
        assert!(html.contains(r#"name="email""#));
        assert!(html.contains("/api/credentials"));
    }

    #[test]
    fn unit_render_entry_form_includes_api_key_field_for_api_key() {
        let view = PendingEntryView {
            token: Uuid::new_v4(),
            site_id: "api.example.com".to_string(),
            service_type: ServiceType::ApiKey,
        };
        let html = render_entry_form(&view);
        assert!(html.contains(r#"name="api_key""#));
        assert!(!html.contains(r#"name="password""#));
    }

    #[test]
    fn regression_render_entry_form_escapes_site_id() {
        let view = PendingEntryView {
            token: Uuid::new_v4(),
            site_id: "<script>alert(1)</script>".to_string(),
            service_type: ServiceType::WebLogin,
        };
        let html = render_entry_form(&view);
        assert!(!html.contains("<h1>Add credential for <script>"));
        assert!(!html.contains("</script>alert"));
    }

    #[test]
    fn regression_render_entry_form_escapes_quotes_in_js_string() {
        let view = PendingEntryView {
            token: Uuid::new_v4(),
            site_id: "it's-a-test.com".to_string(),
            service_type: ServiceType::WebLogin,
        };
        let html = render_entry_form(&view);
        assert!(html.contains("it\\'s-a-test.com"));
    }
}
