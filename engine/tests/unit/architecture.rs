//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application talks to the outside world only through
//! ports, and infra stays quiet on stdout.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with 1-based line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            let comment = trimmed.starts_with("//") || trimmed.starts_with("/*");
            (!in_test && !comment).then(|| (i + 1, line.to_string()))
        })
        .collect()
}

fn src_dir(parts: &[&str]) -> PathBuf {
    parts
        .iter()
        .fold(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), |dir, p| {
            dir.join(p)
        })
}

/// Report every production line under `dir` that contains a forbidden pattern.
fn scan(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (lineno, line) in production_lines(&file) {
            for pattern in forbidden {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{lineno}: `{pattern}`: {}", line.trim()));
                }
            }
        }
    }
    violations
}

#[test]
fn domain_has_no_io_or_outer_layer_imports() {
    let violations = scan(
        &src_dir(&["domain"]),
        &[
            "crate::infra",
            "crate::application",
            "tokio::",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );

    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_never_imports_infra() {
    let violations = scan(&src_dir(&["application"]), &["crate::infra"]);

    assert!(
        violations.is_empty(),
        "application/ must reach infra only through ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_do_not_spawn_processes_directly() {
    let violations = scan(
        &src_dir(&["application", "services"]),
        &["tokio::process", "std::process::Command", "TokioProcessSpawner"],
    );

    assert!(
        violations.is_empty(),
        "services must start processes through ProcessSpawner:\n{}",
        violations.join("\n")
    );
}

#[test]
fn library_has_no_print_macros_outside_tests() {
    let mut violations = Vec::new();
    for dir in ["domain", "application", "infra"] {
        violations.extend(scan(&src_dir(&[dir]), &["println!", "eprintln!"]));
    }

    assert!(
        violations.is_empty(),
        "the engine reports through messages and tracing, not stdout:\n{}",
        violations.join("\n")
    );
}
