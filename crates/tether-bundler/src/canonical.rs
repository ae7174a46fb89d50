//! Module name canonicalization
//!
//! Module names are slash-delimited regardless of host platform. These helpers
//! reduce `.`/`..` segments and resolve relative requests against the
//! requesting module, using the same rules as the embedded loader runtime.

/// Reduce a slash-delimited path to its canonical form
///
/// Empty and `.` segments are dropped; `..` pops the previously accumulated
/// segment. Popping past the start is absorbed silently, so `"../x"` becomes
/// `"x"`.
///
/// # Example
/// ```
/// # use tether_bundler::canonical::canonicalize;
/// assert_eq!(canonicalize("a/./b/../c"), "a/c");
/// assert_eq!(canonicalize("../x"), "x");
/// ```
pub fn canonicalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    segments.join("/")
}

/// Directory part of a module name
///
/// Everything before the last `/`. A name without any `/` is returned as is,
/// which is how the embedded runtime computes a requester's directory.
pub fn dirname(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Whether a request is relative to the requesting module (`./` or `../`)
pub fn is_relative(request: &str) -> bool {
    request.starts_with("./") || request.starts_with("../")
}

/// Resolve a request made from inside module `requester`
///
/// Relative requests are joined onto the requester's directory and
/// canonicalized; anything else is an absolute module name and passes through
/// unchanged.
pub fn resolve_request(requester: &str, request: &str) -> String {
    if is_relative(request) {
        canonicalize(&format!("{}/{}", dirname(requester), request))
    } else {
        request.to_string()
    }
}

/// Join path segments with `/` and canonicalize the result
pub fn join(base: &str, rest: &str) -> String {
    canonicalize(&format!("{}/{}", base, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_dot_segments() {
        assert_eq!(canonicalize("a/./b/../c"), "a/c");
        assert_eq!(canonicalize("./a//b/"), "a/b");
    }

    #[test]
    fn test_canonicalize_excess_parent_is_absorbed() {
        assert_eq!(canonicalize("../x"), "x");
        assert_eq!(canonicalize("../../.."), "");
        assert_eq!(canonicalize("a/../../b"), "b");
    }

    #[test]
    fn test_canonicalize_idempotent() {
        for path in ["a/c", "widgets/lib/foo", "", "x"] {
            let once = canonicalize(path);
            assert_eq!(canonicalize(&once), once);
        }
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("widgets/lib/foo"), "widgets/lib");
        assert_eq!(dirname("widgets/foo"), "widgets");
        assert_eq!(dirname("widgets"), "widgets");
    }

    #[test]
    fn test_resolve_relative_request() {
        assert_eq!(resolve_request("widgets/lib/foo", "./bar"), "widgets/lib/bar");
        assert_eq!(resolve_request("widgets/lib/foo", "../util"), "widgets/util");
        assert_eq!(resolve_request("widgets/lib/foo", "../../../x"), "x");
    }

    #[test]
    fn test_resolve_absolute_request_unchanged() {
        assert_eq!(resolve_request("widgets/lib/foo", "lodash"), "lodash");
        assert_eq!(resolve_request("widgets/lib/foo", "a/./b"), "a/./b");
        assert_eq!(resolve_request("widgets/lib/foo", ".hidden"), ".hidden");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("widgets", "./index"), "widgets/index");
        assert_eq!(join("widgets", "lib/../main"), "widgets/main");
    }
}
