//! Shared utilities for rollcheck.

/// Keys whose values never appear in logs or reports.
const SECRET_ASSIGNMENTS: &[&str] = &[
    "ARGOCD_AUTH_TOKEN=",
    "ARGOCD_PASSWORD=",
    "KUBE_TOKEN=",
    "REGISTRY_PASSWORD=",
    "DOCKER_PASSWORD=",
    "GITHUB_TOKEN=",
    "API_KEY=",
    "SECRET=",
    "PASSWORD=",
    "TOKEN=",
];

/// Flags whose argument is a credential.
const SECRET_FLAGS: &[&str] = &["--auth-token", "--token", "--password", "--client-key-data"];

const MASK: &str = "***";

/// Byte length of the value at the start of `s`, honoring quotes and escapes.
fn value_len(s: &str) -> usize {
    let mut quote = None;
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '"' || c == '\'' {
            quote = Some(c);
        } else if c.is_whitespace() {
            return idx;
        }
    }
    s.len()
}

/// Replace every value that follows `marker` with the mask.
fn mask_after(input: &str, marker: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(marker) {
        let value_start = pos + marker.len();
        out.push_str(&rest[..value_start]);
        out.push_str(MASK);
        let tail = &rest[value_start..];
        rest = &tail[value_len(tail)..];
    }
    out.push_str(rest);
    out
}

/// Mask credentials in a command line before it is logged or recorded.
///
/// Handles `KEY=value` assignments as well as `--flag value` and
/// `--flag=value` forms of credential flags.
pub fn mask_sensitive_command(cmd: &str) -> String {
    let mut masked = cmd.to_string();
    for assignment in SECRET_ASSIGNMENTS {
        masked = mask_after(&masked, assignment);
    }
    for flag in SECRET_FLAGS {
        masked = mask_after(&masked, &format!("{flag}="));
        masked = mask_after(&masked, &format!("{flag} "));
    }
    masked
}

/// Last `max_lines` non-empty lines of command output, for stage messages.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
