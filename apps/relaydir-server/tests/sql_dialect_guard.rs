//! Guards every sqlx query literal in the workspace against SQLite-isms
//! sneaking into what must stay Postgres-dialect SQL.

use std::fs;
use std::path::{Path, PathBuf};

fn source_roots() -> Vec<PathBuf> {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    vec![
        manifest.join("src"),
        manifest.join("../../libs/relaydir-db/src"),
        manifest.join("../../libs/relaydir-db/migrations"),
    ]
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("rs") || ext == Some("sql") {
                out.push(path);
            }
        }
    }
}

/// Extracts the first string literal after each `sqlx::query` call site.
/// Handles plain and raw (`r#"..."#`) literals; .sql files are taken whole.
fn sql_literals(path: &Path, content: &str) -> Vec<(usize, String)> {
    if path.extension().and_then(|s| s.to_str()) == Some("sql") {
        return vec![(1, content.to_string())];
    }

    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(rel) = content[pos..].find("sqlx::query") {
        let call = pos + rel;
        pos = call + "sqlx::query".len();
        let line = content[..call].bytes().filter(|b| *b == b'\n').count() + 1;

        let Some(open_rel) = content[pos..].find('(') else {
            continue;
        };
        let rest = content[pos + open_rel + 1..].trim_start();

        let literal = if let Some(raw) = rest.strip_prefix("r#\"") {
            raw.split("\"#").next()
        } else if let Some(plain) = rest.strip_prefix('"') {
            plain.split('"').next()
        } else {
            None
        };

        if let Some(sql) = literal {
            found.push((line, sql.to_string()));
        }
    }
    found
}

fn scan(check: impl Fn(&str) -> bool, label: &str) {
    let mut violations = Vec::new();
    for root in source_roots() {
        let mut files = Vec::new();
        collect_files(&root, &mut files);
        for file in files {
            let Ok(content) = fs::read_to_string(&file) else {
                continue;
            };
            for (line, sql) in sql_literals(&file, &content) {
                if check(&sql) {
                    violations.push(format!("{}:{} {}", file.display(), line, label));
                }
            }
        }
    }
    assert!(violations.is_empty(), "{}", violations.join("\n"));
}

#[test]
fn queries_use_postgres_placeholders() {
    scan(
        |sql| sql.contains('?'),
        "contains '?' placeholder; use $N binds",
    );
}

#[test]
fn queries_avoid_sqlite_only_syntax() {
    scan(
        |sql| {
            let lower = sql.to_lowercase();
            lower.contains("insert or ignore")
                || lower.contains("autoincrement")
                || lower.contains("strftime(")
                || lower.contains("datetime(")
        },
        "contains SQLite-only SQL syntax",
    );
}
