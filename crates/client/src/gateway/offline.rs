//! Responses built locally when neither the network nor a store can answer.

use larder_core::ResponseSnapshot;

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Recettes - Hors ligne</title>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      display: flex;
      align-items: center;
      justify-content: center;
      font-family: system-ui, -apple-system, sans-serif;
      background: #fff7ed;
      color: #7c2d12;
      text-align: center;
    }
    main { max-width: 26rem; padding: 2rem; }
    h1 { color: #ea580c; }
    .retry {
      display: inline-block;
      padding: 0.75rem 1.5rem;
      border-radius: 0.5rem;
      background: #ea580c;
      color: #fff;
      text-decoration: none;
    }
  </style>
</head>
<body>
  <main>
    <h1>Recettes</h1>
    <p>Vous êtes hors ligne. Vérifiez votre connexion internet puis réessayez.</p>
    <a class="retry" href="/" onclick="window.location.reload(); return false;">Réessayer</a>
  </main>
</body>
</html>
"#;

/// Empty recipes listing flagged as offline.
///
/// Status 200 so the listing view renders an empty state instead of failing.
pub fn listing(message: &str) -> ResponseSnapshot {
    let body = serde_json::json!({
        "message": message,
        "offline": true,
        "recettes": [],
    });
    ResponseSnapshot::new(200, "OK")
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

/// Self-contained offline page for navigations.
pub fn page() -> ResponseSnapshot {
    ResponseSnapshot::new(200, "OK")
        .with_header("Content-Type", "text/html")
        .with_body(OFFLINE_PAGE)
}
