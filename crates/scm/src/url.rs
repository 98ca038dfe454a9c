/// Remote URL with credentials embedded as basic auth:
/// `https://<user>:<secret>@<host>/<owner>/<repo>/`.
///
/// User and secret are percent-encoded so tokens containing `@` or `:` do not
/// break the authority section.
pub fn authenticated_url(host: &str, user: &str, secret: &str, owner: &str, repo: &str) -> String {
    format!(
        "https://{}:{}@{}/{}/{}/",
        urlencoding::encode(user),
        urlencoding::encode(secret),
        host,
        owner,
        repo
    )
}

/// Browser URL of a branch, e.g. `https://github.com/org/repo/tree/alice-20240101-120000`.
pub fn tree_url(host: &str, owner: &str, repo: &str, branch: &str) -> String {
    format!("https://{host}/{owner}/{repo}/tree/{branch}")
}

/// Replace the `user:secret@` part of every URL in `text` with `***@`.
///
/// git echoes the remote URL in its error messages, so diagnostics are
/// passed through here before they are logged.
pub fn redact_credentials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("://") {
        let (head, tail) = rest.split_at(pos + 3);
        out.push_str(head);
        let authority_end = tail
            .find(|c: char| c == '/' || c == '\'' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        rest = match tail[..authority_end].rfind('@') {
            Some(at) => {
                out.push_str("***@");
                &tail[at + 1..]
            }
            None => tail,
        };
    }
    out.push_str(rest);
    out
}
