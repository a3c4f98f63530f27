use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static HASH_FUNC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^(.*)::h[a-f0-9]{16}$
    "#,
    )
    .unwrap()
});

static CRATE_HASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(\[[a-f0-9]{16}\])
    ",
    )
    .unwrap()
});

static MODULE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?:_?<)?           # trait impl syntax
        (?:\w+\ as \ )?    # anonymous implementor
        ([a-zA-Z0-9_]+?)   # crate name
        (?:\.\.|::|\[)     # crate delimiter (.. or :: or [)
    ",
    )
    .unwrap()
});

/// Tries to parse the containing crate out of a symbolicated function name.
pub fn parse_module_name(func_name: &str) -> Option<String> {
    MODULE_RE
        .captures(func_name)
        .and_then(|caps| caps.get(1))
        .map(|cr| cr.as_str().into())
}

/// Returns the basename of a path in either separator convention.
pub fn filename(s: &str) -> &str {
    s.rsplit(['/', '\\']).next().unwrap()
}

/// Strips the trailing symbol hash and any embedded crate disambiguator
/// hashes from a symbolicated function name.
pub fn strip_symbol(s: &str) -> Cow<'_, str> {
    let stripped_trailing_hash = HASH_FUNC_RE
        .captures(s)
        .map(|c| c.get(1).unwrap().as_str())
        .unwrap_or(s);

    CRATE_HASH_RE.replace_all(stripped_trailing_hash, "")
}

/// Checks whether the function name starts with the given pattern.
///
/// In trait implementations the implementing type is wrapped in `_< ... >`
/// and colons are replaced with dots; this check accounts for both spellings.
pub fn function_starts_with(func_name: &str, pattern: &str) -> bool {
    let mut func = func_name;
    let mut pattern = pattern;

    if pattern.starts_with('<') {
        // an impl pattern only matches the wrapped spelling
        while let Some(rest) = pattern.strip_prefix('<') {
            pattern = rest;
            func = match func.strip_prefix('<').or_else(|| func.strip_prefix("_<")) {
                Some(stripped) => stripped,
                None => return false,
            };
        }
    } else {
        while let Some(stripped) = func.strip_prefix('<').or_else(|| func.strip_prefix("_<")) {
            func = stripped;
        }
    }

    let mut func_chars = func.chars();
    for wanted in pattern.chars() {
        match func_chars.next() {
            Some(got) if got == wanted || (got == '.' && wanted == ':') => {}
            _ => return false,
        }
    }
    true
}
