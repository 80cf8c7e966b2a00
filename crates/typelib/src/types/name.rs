// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type name grammar and namespace helpers.
//!
//! Names are `/`-separated paths. The last component may carry template
//! arguments (`/std/vector</double>`, separators inside `<>` do not split
//! namespaces) followed by pointer (`*`) and array (`[n]`) modifiers.
//!
//! ```text
//! name       := ['/'] segment ('/' segment)* modifier*
//! segment    := identifier ['<' name (',' name)* '>']
//! modifier   := '*' | '[' digits ']'
//! namespace  := '/' (identifier '/')*
//! ```

use crate::config::NAMESPACE_SEPARATOR;

/// Pointer / array suffix of a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Pointer,
    Array(usize),
}

/// Split `s` on `sep` occurrences that are not nested inside `<>`.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Byte index of the last top-level separator.
fn last_separator(name: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut last = None;
    for (i, c) in name.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            NAMESPACE_SEPARATOR if depth == 0 => last = Some(i),
            _ => {}
        }
    }
    last
}

/// Namespace part of `name`, separator included (`/A/B/C` -> `/A/B/`).
pub fn namespace_of(name: &str) -> &str {
    match last_separator(name) {
        Some(i) => &name[..=i],
        None => "",
    }
}

/// Last component of `name` (`/A/B/C` -> `C`).
pub fn basename(name: &str) -> &str {
    match last_separator(name) {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Number of top-level separators (`/C` -> 1, `/A/B/C` -> 3).
pub fn depth(name: &str) -> usize {
    split_top_level(name, NAMESPACE_SEPARATOR).len() - 1
}

/// Add the leading and trailing separators a namespace needs.
pub fn normalize_namespace(namespace: &str) -> String {
    let mut ns = String::with_capacity(namespace.len() + 2);
    if !namespace.starts_with(NAMESPACE_SEPARATOR) {
        ns.push(NAMESPACE_SEPARATOR);
    }
    ns.push_str(namespace);
    if !ns.ends_with(NAMESPACE_SEPARATOR) {
        ns.push(NAMESPACE_SEPARATOR);
    }
    ns
}

/// Every namespace from the root down to `namespace` (`/A/B/` ->
/// `["/", "/A/", "/A/B/"]`). `namespace` must be normalized.
pub fn namespace_levels(namespace: &str) -> Vec<&str> {
    namespace
        .char_indices()
        .filter(|(_, c)| *c == NAMESPACE_SEPARATOR)
        .map(|(i, _)| &namespace[..=i])
        .collect()
}

/// Whether `name` lives in `namespace` (or one of its children when
/// `recursive`). `namespace` must be normalized.
pub fn is_in_namespace(name: &str, namespace: &str, recursive: bool) -> bool {
    if recursive {
        name.len() > namespace.len() && name.starts_with(namespace)
    } else {
        namespace_of(name) == namespace
    }
}

/// `name` relative to `namespace`, if it lives below it.
pub fn relative_name<'a>(name: &'a str, namespace: &str) -> Option<&'a str> {
    if is_in_namespace(name, namespace, true) {
        Some(&name[namespace.len()..])
    } else {
        None
    }
}

/// Canonical name of a pointer to `base`.
pub fn pointer_name(base: &str) -> String {
    format!("{base}*")
}

/// Canonical name of an array of `dimension` `base` elements.
pub fn array_name(base: &str, dimension: usize) -> String {
    format!("{base}[{dimension}]")
}

/// Canonical name of a container instance.
pub fn container_name(kind: &str, arguments: &[&str]) -> String {
    format!("{kind}<{}>", arguments.join(","))
}

/// Split trailing modifiers off `name`.
///
/// Modifiers are scanned right to left and returned in application order,
/// innermost first: `/int[4]*` gives `("/int", [Array(4), Pointer])`.
pub fn split_modifiers(name: &str) -> (&str, Vec<Modifier>) {
    let mut base = name;
    let mut modifiers = Vec::new();
    loop {
        if let Some(rest) = base.strip_suffix('*') {
            modifiers.push(Modifier::Pointer);
            base = rest;
            continue;
        }
        if let Some(rest) = base.strip_suffix(']') {
            if let Some(open) = rest.rfind('[') {
                if let Ok(dimension) = rest[open + 1..].parse::<usize>() {
                    if rest[open + 1..].bytes().all(|b| b.is_ascii_digit()) {
                        modifiers.push(Modifier::Array(dimension));
                        base = &rest[..open];
                        continue;
                    }
                }
            }
        }
        break;
    }
    modifiers.reverse();
    (base, modifiers)
}

/// Split a templated name into its kind and arguments
/// (`/std/vector</double>` -> `("/std/vector", ["/double"])`).
pub fn split_template(name: &str) -> Option<(&str, Vec<&str>)> {
    let base = basename(name);
    let open = base.find('<')?;
    let body = base.strip_suffix('>')?;
    let kind = &name[..name.len() - base.len() + open];
    let arguments = split_top_level(&body[open + 1..], ',')
        .into_iter()
        .map(str::trim)
        .collect();
    Some((kind, arguments))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_segment(segment: &str) -> bool {
    let Some(open) = segment.find('<') else {
        return is_identifier(segment);
    };
    let Some(body) = segment[open + 1..].strip_suffix('>') else {
        return false;
    };
    is_identifier(&segment[..open])
        && split_top_level(body, ',')
            .into_iter()
            .all(|arg| is_valid_type_name(arg.trim(), false))
}

/// Grammar check of a type name. Absolute names must start with `/`.
pub fn is_valid_type_name(name: &str, absolute: bool) -> bool {
    let body = match name.strip_prefix(NAMESPACE_SEPARATOR) {
        Some(rest) => rest,
        None if absolute => return false,
        None => name,
    };
    let (base, _) = split_modifiers(body);
    !base.is_empty()
        && split_top_level(base, NAMESPACE_SEPARATOR)
            .into_iter()
            .all(is_valid_segment)
}

/// Grammar check of a namespace. Absolute namespaces must start with `/`.
pub fn is_valid_namespace(namespace: &str, absolute: bool) -> bool {
    if absolute && !namespace.starts_with(NAMESPACE_SEPARATOR) {
        return false;
    }
    namespace
        .split(NAMESPACE_SEPARATOR)
        .filter(|s| !s.is_empty())
        .all(is_identifier)
        && !namespace.contains("//")
}
